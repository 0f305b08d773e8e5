use crate::env::Environment;
use crate::error::ShellError;
use crate::value::CommandResult;
use std::io::Write;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
pub type ExitCode = i32;

/// Output streams a command writes to while it runs.
///
/// Captured output of external commands is not written here; it comes back
/// inside the [`CommandResult`] and the evaluator decides what to print.
pub struct Streams<'a> {
    pub stdout: &'a mut dyn Write,
    pub stderr: &'a mut dyn Write,
}

impl<'a> Streams<'a> {
    pub fn new(stdout: &'a mut dyn Write, stderr: &'a mut dyn Write) -> Self {
        Self { stdout, stderr }
    }
}

/// Object-safe trait for any command the shell can run: builtins via a
/// blanket impl, and external executables.
pub trait ExecutableCommand {
    /// Runs the command. `None` means the command has no result to print.
    fn execute(
        self: Box<Self>,
        streams: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<Option<CommandResult>, ShellError>;
}

/// Factory that tries to create a command from a name and its options.
///
/// Returns `Ok(None)` when the factory doesn't recognize `name`, and an error
/// when it does but cannot build the command (bad options, nothing on `PATH`).
pub trait CommandFactory {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[String],
    ) -> Result<Option<Box<dyn ExecutableCommand>>, ShellError>;
}
