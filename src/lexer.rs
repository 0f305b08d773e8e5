//! Lexical analysis (tokenization) of one complete statement.

use crate::error::ParseError;
use crate::value::Number;

/// Kind of a lexeme. Named grammar terminals map onto these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LexKind {
    /// A bare word: command names, options, paths, keywords, operators.
    Word,
    /// A quoted string, quotes included in the text.
    Str,
    Int,
    Float,
    /// `$NAME`, the `$` included in the text.
    EnvVar,
    /// `=`, `+=`, `-=`, `*=` or `/=`.
    AssignOp,
    /// One of `(`, `)`, `{`, `}`, `;`.
    Punct,
}

impl LexKind {
    pub fn terminal_name(self) -> &'static str {
        match self {
            LexKind::Word => "WORD",
            LexKind::Str => "STRING",
            LexKind::Int => "INT",
            LexKind::Float => "FLOAT",
            LexKind::EnvVar => "ENV_VAR",
            LexKind::AssignOp => "ASSIGN_OP",
            LexKind::Punct => "PUNCT",
        }
    }

    pub fn from_terminal_name(name: &str) -> Option<Self> {
        Some(match name {
            "WORD" => LexKind::Word,
            "STRING" => LexKind::Str,
            "INT" => LexKind::Int,
            "FLOAT" => LexKind::Float,
            "ENV_VAR" => LexKind::EnvVar,
            "ASSIGN_OP" => LexKind::AssignOp,
            _ => return None,
        })
    }

    /// Whether the lexeme's text may be matched against a literal terminal.
    /// Quoted strings and variable references never are: `"if"` is a string.
    pub fn may_be_literal(self) -> bool {
        !matches!(self, LexKind::Str | LexKind::EnvVar)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lexeme {
    pub kind: LexKind,
    /// Source text exactly as typed.
    pub text: String,
    /// Byte offset into the statement.
    pub offset: usize,
}

const ASSIGN_OPS: [&str; 5] = ["=", "+=", "-=", "*=", "/="];
const PUNCT: [char; 5] = ['(', ')', '{', '}', ';'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexingState {
    Start,
    ReadingWord,
    ReadingQuote(char),
    ReadingEnvVar,
}

struct LexingFSM<'a> {
    input: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
    state: LexingState,
    token_start: usize,
    escaped: bool,
}

impl<'a> LexingFSM<'a> {
    fn new(input: &'a str) -> Self {
        LexingFSM {
            input,
            chars: input.char_indices().collect(),
            pos: 0,
            state: LexingState::Start,
            token_start: 0,
            escaped: false,
        }
    }

    fn make_tokens(&mut self) -> Result<Vec<Lexeme>, ParseError> {
        let mut out = Vec::new();

        while let Some((offset, ch)) = self.chars.get(self.pos).copied() {
            let consumed = match self.state {
                LexingState::Start => self.handle_start(offset, ch, &mut out),
                LexingState::ReadingWord => self.handle_word(offset, ch, &mut out),
                LexingState::ReadingQuote(quote) => self.handle_quote(offset, ch, quote, &mut out),
                LexingState::ReadingEnvVar => self.handle_env_var(offset, ch, &mut out)?,
            };
            if consumed {
                self.pos += 1;
            }
        }

        let end = self.input.len();
        match self.state {
            LexingState::ReadingQuote(_) => {
                return Err(ParseError::UnterminatedString {
                    offset: self.token_start,
                });
            }
            LexingState::ReadingWord => self.finish_word(end, &mut out),
            LexingState::ReadingEnvVar => self.finish_env_var(end, &mut out)?,
            LexingState::Start => {}
        }
        Ok(out)
    }

    fn handle_start(&mut self, offset: usize, ch: char, out: &mut Vec<Lexeme>) -> bool {
        self.token_start = offset;
        match ch {
            c if c.is_whitespace() => {}
            c if PUNCT.contains(&c) => out.push(Lexeme {
                kind: LexKind::Punct,
                text: c.to_string(),
                offset,
            }),
            '"' | '\'' => {
                self.escaped = false;
                self.state = LexingState::ReadingQuote(ch);
            }
            '$' => self.state = LexingState::ReadingEnvVar,
            _ => self.state = LexingState::ReadingWord,
        }
        true
    }

    /// Returns whether `ch` was consumed; a delimiter is handed back to `Start`.
    fn handle_word(&mut self, offset: usize, ch: char, out: &mut Vec<Lexeme>) -> bool {
        if is_delimiter(ch) {
            self.finish_word(offset, out);
            self.state = LexingState::Start;
            return false;
        }
        true
    }

    fn handle_quote(&mut self, offset: usize, ch: char, quote: char, out: &mut Vec<Lexeme>) -> bool {
        if self.escaped {
            self.escaped = false;
        } else if ch == '\\' {
            self.escaped = true;
        } else if ch == quote {
            let end = offset + ch.len_utf8();
            out.push(Lexeme {
                kind: LexKind::Str,
                text: self.input[self.token_start..end].to_string(),
                offset: self.token_start,
            });
            self.state = LexingState::Start;
        }
        true
    }

    fn handle_env_var(
        &mut self,
        offset: usize,
        ch: char,
        out: &mut Vec<Lexeme>,
    ) -> Result<bool, ParseError> {
        let first = offset == self.token_start + 1;
        let valid = ch == '_' || ch.is_ascii_alphabetic() || (!first && ch.is_ascii_digit());
        if valid {
            return Ok(true);
        }
        self.finish_env_var(offset, out)?;
        self.state = LexingState::Start;
        Ok(false)
    }

    fn finish_word(&mut self, end: usize, out: &mut Vec<Lexeme>) {
        let text = &self.input[self.token_start..end];
        out.push(Lexeme {
            kind: classify_word(text),
            text: text.to_string(),
            offset: self.token_start,
        });
    }

    fn finish_env_var(&mut self, end: usize, out: &mut Vec<Lexeme>) -> Result<(), ParseError> {
        if end == self.token_start + 1 {
            return Err(ParseError::UnexpectedCharacter {
                ch: '$',
                offset: self.token_start,
            });
        }
        out.push(Lexeme {
            kind: LexKind::EnvVar,
            text: self.input[self.token_start..end].to_string(),
            offset: self.token_start,
        });
        Ok(())
    }
}

fn is_delimiter(ch: char) -> bool {
    ch.is_whitespace() || PUNCT.contains(&ch) || matches!(ch, '"' | '\'' | '$')
}

fn classify_word(text: &str) -> LexKind {
    if ASSIGN_OPS.contains(&text) {
        return LexKind::AssignOp;
    }
    match Number::parse(text) {
        Some(Number::Int(_)) => LexKind::Int,
        Some(Number::Float(_)) => LexKind::Float,
        None => LexKind::Word,
    }
}

/// Splits one statement into lexemes.
pub fn split_into_tokens(line: &str) -> Result<Vec<Lexeme>, ParseError> {
    LexingFSM::new(line).make_tokens()
}

/// Strips the quotes from a string lexeme and resolves escaped quote characters.
/// Other backslash sequences are kept for the consumer (e.g. `print -e`).
pub fn unquote(text: &str) -> String {
    let inner = text
        .get(1..text.len().saturating_sub(1))
        .unwrap_or_default();
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        let next = chars.peek().copied();
        match (c, next) {
            ('\\', Some(q)) if q == '"' || q == '\'' => {
                out.push(q);
                chars.next();
            }
            ('\\', Some('\\')) => {
                out.push_str("\\\\");
                chars.next();
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(line: &str) -> Vec<(LexKind, String)> {
        split_into_tokens(line)
            .unwrap()
            .into_iter()
            .map(|l| (l.kind, l.text))
            .collect()
    }

    #[test]
    fn command_with_string_option() {
        assert_eq!(
            kinds("print \"hi there\" -n"),
            vec![
                (LexKind::Word, "print".to_string()),
                (LexKind::Str, "\"hi there\"".to_string()),
                (LexKind::Word, "-n".to_string()),
            ]
        );
    }

    #[test]
    fn numbers_and_operators() {
        assert_eq!(
            kinds("x += -2.5 == 3"),
            vec![
                (LexKind::Word, "x".to_string()),
                (LexKind::AssignOp, "+=".to_string()),
                (LexKind::Float, "-2.5".to_string()),
                (LexKind::Word, "==".to_string()),
                (LexKind::Int, "3".to_string()),
            ]
        );
    }

    #[test]
    fn punctuation_splits_words() {
        assert_eq!(
            kinds("if ($x==1){a;b}"),
            vec![
                (LexKind::Word, "if".to_string()),
                (LexKind::Punct, "(".to_string()),
                (LexKind::EnvVar, "$x".to_string()),
                (LexKind::Word, "==1".to_string()),
                (LexKind::Punct, ")".to_string()),
                (LexKind::Punct, "{".to_string()),
                (LexKind::Word, "a".to_string()),
                (LexKind::Punct, ";".to_string()),
                (LexKind::Word, "b".to_string()),
                (LexKind::Punct, "}".to_string()),
            ]
        );
    }

    #[test]
    fn escaped_quote_stays_inside_string() {
        let tokens = split_into_tokens(r#"print "say \"hi\"" 'it\'s'"#).unwrap();
        assert_eq!(tokens.len(), 3);
        assert_eq!(unquote(&tokens[1].text), "say \"hi\"");
        assert_eq!(unquote(&tokens[2].text), "it's");
    }

    #[test]
    fn offsets_point_into_source() {
        let tokens = split_into_tokens("cd  /tmp").unwrap();
        assert_eq!(tokens[1].offset, 4);
    }

    #[test]
    fn env_var_name_stops_at_non_word_char() {
        assert_eq!(
            kinds("$HOME/bin"),
            vec![
                (LexKind::EnvVar, "$HOME".to_string()),
                (LexKind::Word, "/bin".to_string()),
            ]
        );
    }

    #[test]
    fn lone_dollar_is_an_error() {
        assert_eq!(
            split_into_tokens("print $ x"),
            Err(ParseError::UnexpectedCharacter { ch: '$', offset: 6 })
        );
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert_eq!(
            split_into_tokens("print \"oops"),
            Err(ParseError::UnterminatedString { offset: 6 })
        );
    }

    #[test]
    fn words_keep_equals_signs() {
        assert_eq!(kinds("--opt=1"), vec![(LexKind::Word, "--opt=1".to_string())]);
    }
}
