//! A small interactive shell with a grammar-driven parser.
//!
//! A line of input goes through three stages: [`multiline`] decides whether
//! it is complete, [`parser`] turns it into an [`ast::Program`] using an SLR
//! table built from the grammar in `turtle.grammar`, and [`eval`] walks the
//! program against an [`env::Environment`], dispatching commands to the
//! builtins first and to executables found on `PATH` otherwise.
//!
//! The main entry point is [`Interpreter`], which owns a whole session and
//! runs either single lines or the interactive loop. The public modules
//! [`command`] and [`env`] expose the traits and types needed to implement
//! your own commands.

pub mod args;
pub mod ast;
mod builtin;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod eval;
mod external;
pub mod grammar;
mod interpreter;
pub mod lexer;
pub mod logging;
pub mod multiline;
pub mod parser;
mod prompt;
pub mod table;
pub mod value;

pub use config::Config;
pub use env::Environment;
pub use error::{GrammarError, ParseError, ShellError};
pub use interpreter::Interpreter;
pub use multiline::{concatenate_incomplete_lines, is_complete};
pub use parser::Parser;
pub use value::{CommandResult, Value};
