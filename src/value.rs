use crate::command::ExitCode;
use chrono::{DateTime, Local};
use std::fmt;
use std::path::PathBuf;

/// Anything a statement can evaluate to or a variable can hold.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Path(PathBuf),
    /// Rendered as a Unix timestamp.
    DateTime(DateTime<Local>),
    Result(CommandResult),
}

impl Value {
    /// Numeric view used by compound assignment.
    ///
    /// Strings take part when their whole text is a number, so `x = "10"; x += 1`
    /// gives `11`. Equality never parses strings: `"10" == 10` is false.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Int(n) => Some(Number::Int(*n)),
            Value::Float(f) => Some(Number::Float(*f)),
            Value::Str(s) => Number::parse(s.trim()),
            _ => None,
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Str(String::new())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<PathBuf> for Value {
    fn from(p: PathBuf) -> Self {
        Value::Path(p)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(_) | Float(_), Int(_) | Float(_)) => self.as_number() == other.as_number(),
            (Str(a), Str(b)) => a == b,
            (Path(a), Path(b)) => a == b,
            (Path(p), Str(s)) | (Str(s), Path(p)) => p.as_os_str() == s.as_str(),
            (DateTime(a), DateTime(b)) => a == b,
            (Result(a), Result(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x:?}"),
            Value::Str(s) => f.write_str(s),
            Value::Path(p) => write!(f, "{}", p.display()),
            Value::DateTime(d) => write!(f, "{}", d.timestamp()),
            Value::Result(r) => write!(f, "{r}"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    /// Accepts `-?digits` and `-?digits.digits`, the same shapes the lexer
    /// recognises as numeric literals.
    pub fn parse(s: &str) -> Option<Self> {
        let digits = s.strip_prefix('-').unwrap_or(s);
        let all_digits = |t: &str| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit());
        match digits.split_once('.') {
            None if all_digits(digits) => s.parse().ok().map(Number::Int),
            Some((whole, frac)) if all_digits(whole) && all_digits(frac) => {
                s.parse().ok().map(Number::Float)
            }
            _ => None,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(f) => f,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl From<Number> for Value {
    fn from(n: Number) -> Self {
        match n {
            Number::Int(n) => Value::Int(n),
            Number::Float(f) => Value::Float(f),
        }
    }
}

/// Outcome of running a command: exit code plus captured streams.
///
/// Displays as its stdout; counts as success when the exit code is zero.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandResult {
    pub exit_code: ExitCode,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl CommandResult {
    pub fn new(exit_code: ExitCode, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

impl fmt::Display for CommandResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.stdout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_compare_across_int_and_float() {
        assert_eq!(Value::Int(1), Value::Float(1.0));
        assert_ne!(Value::Int(1), Value::Float(1.5));
        assert_ne!(Value::Int(1), Value::Str("1".into()));
    }

    #[test]
    fn numeric_strings_are_numbers_only_for_arithmetic() {
        let text = Value::from("10");
        assert_eq!(text.as_number(), Some(Number::Int(10)));
        assert_ne!(text, Value::Int(10));
    }

    #[test]
    fn path_compares_with_its_text() {
        let p = Value::Path(PathBuf::from("/tmp"));
        assert_eq!(p, Value::Str("/tmp".into()));
        assert_eq!(Value::Str("/tmp".into()), p);
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Bool(true).to_string(), "true");
        assert_eq!(Value::Float(2.0).to_string(), "2.0");
        assert_eq!(Value::Int(-3).to_string(), "-3");
    }

    #[test]
    fn number_parse_shapes() {
        assert_eq!(Number::parse("42"), Some(Number::Int(42)));
        assert_eq!(Number::parse("-1.5"), Some(Number::Float(-1.5)));
        assert_eq!(Number::parse("+5"), None);
        assert_eq!(Number::parse("1."), None);
        assert_eq!(Number::parse("abc"), None);
    }

    #[test]
    fn command_result_displays_stdout_and_truthiness() {
        let ok = CommandResult::new(0, "hello\n", "");
        assert_eq!(ok.to_string(), "hello\n");
        assert!(ok.success());
        let failed = CommandResult::new(2, Vec::new(), "boom");
        assert_eq!(failed.to_string(), "");
        assert!(!failed.success());
        assert_eq!(failed.stderr_lossy(), "boom");
    }
}
