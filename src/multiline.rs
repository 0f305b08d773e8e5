//! Deciding when buffered input forms one statement, and joining continued lines.

const BRACKET_PAIRS: [(char, char); 2] = [('(', ')'), ('{', '}')];

/// Returns false when `text` needs more input before it can be parsed.
///
/// That is the case when the text ends in a `\` continuation marker preceded by
/// whitespace, or when (outside quoted strings) there is exactly one more opening
/// `(` or `{` than closing ones. Anything else counts as complete, malformed input
/// included, so the parser reports the error instead of the prompt waiting forever.
pub fn is_complete(text: &str) -> bool {
    if ends_with_continuation(text) {
        return false;
    }

    let unquoted = strip_strings(text);
    for (open, close) in BRACKET_PAIRS {
        let opened = count_unescaped(&unquoted, open);
        let closed = count_unescaped(&unquoted, close);
        if opened == closed + 1 {
            return false;
        }
    }
    true
}

/// Joins lines typed at the primary and continuation prompts into one line.
///
/// Lines accumulate in a buffer until the buffer is complete; each complete
/// buffer becomes one statement. A continuation marker is stripped before a line
/// is carried over. Statements are joined with single spaces.
pub fn concatenate_incomplete_lines<S: AsRef<str>>(lines: &[S]) -> String {
    let mut complete: Vec<String> = Vec::new();
    let mut buffer = String::new();

    for line in lines {
        let line = line.as_ref();
        let candidate = format!("{buffer}{line}");
        if is_complete(&candidate) {
            complete.push(candidate.trim().to_string());
            buffer.clear();
        } else {
            let mut carried = line.trim();
            if ends_with_continuation(carried) {
                carried = carried[..carried.len() - 1].trim_end();
            }
            buffer.push_str(carried);
            buffer.push(' ');
        }
    }

    let rest = buffer.trim();
    if !rest.is_empty() {
        complete.push(rest.to_string());
    }
    complete.retain(|s| !s.is_empty());
    complete.join(" ")
}

fn ends_with_continuation(text: &str) -> bool {
    let trimmed = text.trim();
    match trimmed.strip_suffix('\\') {
        Some(rest) => rest.ends_with(char::is_whitespace),
        None => false,
    }
}

/// Removes every closed `"…"` / `'…'` span. A quote with no closing partner is
/// kept as an ordinary character, so brackets after it still count.
fn strip_strings(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' || c == '\'' {
            if let Some(end) = closing_quote(&chars, i) {
                i = end + 1;
                continue;
            }
        }
        out.push(c);
        i += 1;
    }
    out
}

fn closing_quote(chars: &[char], start: usize) -> Option<usize> {
    let quote = chars[start];
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            c if c == quote => return Some(i),
            _ => i += 1,
        }
    }
    None
}

fn count_unescaped(text: &str, target: char) -> usize {
    let mut count = 0;
    let mut escaped = false;
    for c in text.chars() {
        if c == target && !escaped {
            count += 1;
        }
        escaped = c == '\\' && !escaped;
    }
    count
}
