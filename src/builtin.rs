use crate::args::{ArgParser, ParsedArgs};
use crate::command::{CommandFactory, ExecutableCommand, Streams};
use crate::dispatch::Factory;
use crate::env::{Environment, expand_home, home_dir};
use crate::error::ShellError;
use crate::value::CommandResult;
use std::env;
use std::fs;

/// Built-in commands known to the shell at compile time.
///
/// Builtins declare their options with an [`ArgParser`] and run in-process
/// without spawning a child process.
pub(crate) trait BuiltinCommand: Sized {
    /// Canonical name of the command, e.g. "print" or "cd".
    fn name() -> &'static str;

    fn arg_parser() -> ArgParser;

    /// Builds the command from options already checked by [`Self::arg_parser`].
    fn from_args(args: ParsedArgs) -> Self;

    /// Runs the command. Builtins that print do so through `streams` and
    /// return `None`; the others report through a [`CommandResult`].
    fn run(
        self,
        streams: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<Option<CommandResult>, ShellError>;
}

impl<T: BuiltinCommand> ExecutableCommand for T {
    fn execute(
        self: Box<Self>,
        streams: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<Option<CommandResult>, ShellError> {
        T::run(*self, streams, env)
    }
}

impl<T: BuiltinCommand + 'static> CommandFactory for Factory<T> {
    fn try_create(
        &self,
        _env: &Environment,
        name: &str,
        args: &[String],
    ) -> Result<Option<Box<dyn ExecutableCommand>>, ShellError> {
        if name != T::name() {
            return Ok(None);
        }
        let parsed = T::arg_parser().parse(args)?;
        Ok(Some(Box::new(T::from_args(parsed))))
    }
}

/// Print a string to standard output.
pub struct Print {
    pub string: String,
    pub trailing_newline: bool,
    pub enable_escapes: bool,
}

impl BuiltinCommand for Print {
    fn name() -> &'static str {
        "print"
    }

    fn arg_parser() -> ArgParser {
        ArgParser::new(Self::name())
            .positional("string")
            .flag("trailing_newline", false, &["-n"])
            .flag("enable_escapes", true, &["-e"])
            .flag("enable_escapes", false, &["-E"])
    }

    fn from_args(args: ParsedArgs) -> Self {
        Print {
            string: args.str("string").unwrap_or_default().to_string(),
            trailing_newline: args.flag("trailing_newline"),
            enable_escapes: args.flag("enable_escapes"),
        }
    }

    fn run(
        self,
        streams: &mut Streams<'_>,
        _env: &mut Environment,
    ) -> Result<Option<CommandResult>, ShellError> {
        let text = if self.enable_escapes {
            interpret_escapes(&self.string)
        } else {
            self.string
        };
        streams.stdout.write_all(text.as_bytes())?;
        if self.trailing_newline {
            streams.stdout.write_all(b"\n")?;
        }
        streams.stdout.flush()?;
        Ok(None)
    }
}

fn interpret_escapes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('a') => out.push('\x07'),
            Some('b') => out.push('\x08'),
            Some('e') => out.push('\x1b'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Report the current working directory.
pub struct Cwd {
    /// When false, symlinks in the path are resolved.
    pub allow_symlinks: bool,
}

impl BuiltinCommand for Cwd {
    fn name() -> &'static str {
        "cwd"
    }

    fn arg_parser() -> ArgParser {
        ArgParser::new(Self::name()).flag("allow_symlinks", false, &["-P", "--physical"])
    }

    fn from_args(args: ParsedArgs) -> Self {
        Cwd {
            allow_symlinks: args.flag("allow_symlinks"),
        }
    }

    fn run(
        self,
        _streams: &mut Streams<'_>,
        _env: &mut Environment,
    ) -> Result<Option<CommandResult>, ShellError> {
        let dir = env::current_dir().and_then(|dir| {
            if self.allow_symlinks {
                Ok(dir)
            } else {
                fs::canonicalize(dir)
            }
        });
        Ok(Some(match dir {
            Ok(dir) => CommandResult::new(0, dir.to_string_lossy().into_owned(), ""),
            Err(e) => CommandResult::new(1, "", format!("cwd: {e}\n")),
        }))
    }
}

/// Change the working directory of the shell process.
/// Without a target, changes to the home directory.
pub struct Cd {
    pub target: Option<String>,
}

impl BuiltinCommand for Cd {
    fn name() -> &'static str {
        "cd"
    }

    fn arg_parser() -> ArgParser {
        ArgParser::new(Self::name()).optional("dir")
    }

    fn from_args(args: ParsedArgs) -> Self {
        Cd {
            target: args.str("dir").map(str::to_string),
        }
    }

    fn run(
        self,
        _streams: &mut Streams<'_>,
        _env: &mut Environment,
    ) -> Result<Option<CommandResult>, ShellError> {
        let target = match self.target.as_deref() {
            Some(t) if !t.is_empty() => expand_home(t),
            _ => match home_dir() {
                Some(home) => home,
                None => return Ok(Some(CommandResult::new(1, "", "cd: HOME not set\n"))),
            },
        };

        let changed = fs::canonicalize(&target).and_then(|dir| {
            env::set_current_dir(&dir)?;
            Ok(dir)
        });
        Ok(Some(match changed {
            Ok(dir) => {
                log::debug!("cd {}", dir.display());
                CommandResult::default()
            }
            Err(e) => CommandResult::new(1, "", format!("cd: {}: {e}\n", target.display())),
        }))
    }
}

/// Remove shell variables.
pub struct Unset {
    pub names: Vec<String>,
}

impl BuiltinCommand for Unset {
    fn name() -> &'static str {
        "unset"
    }

    fn arg_parser() -> ArgParser {
        ArgParser::new(Self::name()).rest("names")
    }

    fn from_args(args: ParsedArgs) -> Self {
        Unset {
            names: args.list("names").to_vec(),
        }
    }

    fn run(
        self,
        _streams: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<Option<CommandResult>, ShellError> {
        if self.names.is_empty() {
            return Err(ShellError::argument(Self::name(), "expected a variable name"));
        }
        for name in &self.names {
            env.delete(name)?;
        }
        Ok(None)
    }
}
