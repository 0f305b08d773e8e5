use std::io;
use thiserror::Error;

/// Errors that abort evaluation of the current statement.
///
/// None of these end the session: the REPL prints the `Display` form as a
/// one-line diagnostic and goes back to reading input.
#[derive(Debug, Error)]
pub enum ShellError {
    /// No builtin and no executable on `PATH` matched the name.
    #[error("{0}: command not found")]
    CommandNotFound(String),

    /// Write or delete of a read-only variable, or a compound assignment
    /// whose operands cannot be combined.
    #[error("{0}")]
    InvalidAssignment(String),

    /// Malformed options passed to a builtin.
    #[error("{command}: {message}")]
    Argument { command: String, message: String },

    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The executable was found but the OS refused to start it.
    #[error("{name}: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ShellError {
    pub(crate) fn argument(command: &str, message: impl Into<String>) -> Self {
        ShellError::Argument {
            command: command.to_string(),
            message: message.into(),
        }
    }
}

/// Input text that does not conform to the grammar.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// A token that no parser state accepts at this point.
    #[error("unexpected {found:?} at offset {offset} (expected one of: {})", expected.join(", "))]
    UnexpectedToken {
        found: String,
        offset: usize,
        expected: Vec<String>,
    },

    /// Input ran out while a production was still open.
    #[error("unexpected end of input (expected one of: {})", expected.join(", "))]
    UnexpectedEnd { expected: Vec<String> },

    /// A quote was opened and never closed.
    #[error("unterminated string starting at offset {offset}")]
    UnterminatedString { offset: usize },

    /// A character that cannot start any token, e.g. a lone `$`.
    #[error("unexpected character {ch:?} at offset {offset}")]
    UnexpectedCharacter { ch: char, offset: usize },

    /// A reduction produced a shape the AST builder does not know.
    #[error("malformed {rule}")]
    Malformed { rule: String },
}

/// A grammar definition that cannot be turned into a parser.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("rule {0:?} is referenced but never defined")]
    UndefinedRule(String),

    #[error("unknown terminal {0:?}")]
    UnknownTerminal(String),

    #[error("grammar has no `start` rule")]
    MissingStart,

    /// Two actions compete for the same table cell.
    #[error("{kind} conflict in state {state} on {symbol}")]
    Conflict {
        kind: &'static str,
        state: usize,
        symbol: String,
    },
}
