use crate::command::{CommandFactory, ExecutableCommand, ExitCode, Streams};
use crate::dispatch::Factory;
use crate::env::{Environment, is_executable};
use crate::error::ShellError;
use crate::value::CommandResult;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;

/// Command that is not a builtin: an executable run as a child process with
/// its output captured.
pub struct ExternalCommand {
    path: PathBuf,
    args: Vec<String>,
}

impl ExternalCommand {
    pub fn new(path: PathBuf, args: Vec<String>) -> Self {
        Self { path, args }
    }
}

impl CommandFactory for Factory<ExternalCommand> {
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[String],
    ) -> Result<Option<Box<dyn ExecutableCommand>>, ShellError> {
        let path = find_command_path(env, Path::new(name))?;
        Ok(Some(Box::new(ExternalCommand::new(path, args.to_vec()))))
    }
}

impl ExecutableCommand for ExternalCommand {
    fn execute(
        self: Box<Self>,
        _streams: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<Option<CommandResult>, ShellError> {
        log::debug!("spawning {} {:?}", self.path.display(), self.args);
        let output = std::process::Command::new(&self.path)
            .args(&self.args)
            .envs(env.exported())
            .output()
            .map_err(|source| ShellError::Spawn {
                name: self.path.display().to_string(),
                source,
            })?;
        let exit_code = match output.status.code() {
            Some(x) => x,
            None => terminated_by_signal(output.status),
        };
        Ok(Some(CommandResult::new(exit_code, output.stdout, output.stderr)))
    }
}

#[cfg(unix)]
fn terminated_by_signal(exit_status: ExitStatus) -> ExitCode {
    use std::os::unix::process::ExitStatusExt;
    if let Some(signal) = ExitStatusExt::signal(&exit_status) {
        128 + signal
    } else if ExitStatusExt::core_dumped(&exit_status) {
        255
    } else {
        -1
    }
}

#[cfg(not(unix))]
fn terminated_by_signal(_exit_status: ExitStatus) -> ExitCode {
    -1
}

/// Resolve a command name the way a typical shell would.
///
/// - A single component (`ls`) is looked up on `PATH`.
/// - Anything else (`/usr/bin/true`, `./script`, `bin/tool`) names the file
///   directly, relative to the working directory, and must be executable.
pub fn find_command_path(env: &Environment, path: &Path) -> Result<PathBuf, ShellError> {
    let mut components = path.components();
    match (components.next(), components.next()) {
        (None, _) => Err(ShellError::CommandNotFound(String::new())),
        (Some(_), None) if !path.is_absolute() => env.executable_for(&path.to_string_lossy()),
        _ if is_executable(path) => Ok(path.to_path_buf()),
        _ => Err(ShellError::CommandNotFound(path.display().to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt;

    fn streams_run(cmd: Box<dyn ExecutableCommand>, env: &mut Environment) -> CommandResult {
        let (mut out, mut err) = (Vec::new(), Vec::new());
        cmd.execute(&mut Streams::new(&mut out, &mut err), env)
            .unwrap()
            .unwrap()
    }

    #[test]
    #[cfg(unix)]
    fn absolute_existing() {
        let env = Environment::default();
        let found = find_command_path(&env, Path::new("/bin/sh")).unwrap();
        assert_eq!(found, Path::new("/bin/sh"));
    }

    #[test]
    #[cfg(unix)]
    fn absolute_nonexisting() {
        let env = Environment::default();
        let res = find_command_path(&env, Path::new("/bin/nonexisting"));
        assert!(matches!(res, Err(ShellError::CommandNotFound(_))));
    }

    #[test]
    #[cfg(unix)]
    fn single_component_found_in_path() {
        let mut env = Environment::default();
        env.set("PATH", "/bin").unwrap();
        let found = find_command_path(&env, Path::new("sh")).unwrap();
        assert!(found.starts_with("/bin"), "expected path in /bin, got {found:?}");
    }

    #[test]
    #[cfg(unix)]
    fn single_component_not_found_in_path() {
        let mut env = Environment::default();
        env.set("PATH", "/bin").unwrap();
        let res = find_command_path(&env, Path::new("nonexisting"));
        assert!(matches!(res, Err(ShellError::CommandNotFound(name)) if name == "nonexisting"));
    }

    #[test]
    fn empty_path_is_not_found() {
        let env = Environment::default();
        assert!(find_command_path(&env, Path::new("")).is_err());
    }

    #[test]
    #[cfg(unix)]
    fn output_and_exit_code_are_captured() {
        let base = std::env::temp_dir().join(format!("external_tests_{}_run", std::process::id()));
        let _ = fs::remove_dir_all(&base);
        fs::create_dir_all(&base).unwrap();
        let script = base.join("greet");
        fs::write(&script, "#!/bin/sh\necho \"hi $1\"\necho oops >&2\nexit 3\n").unwrap();
        fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).unwrap();

        let mut env = Environment::default();
        let cmd = Box::new(ExternalCommand::new(script, vec!["there".to_string()]));
        let result = streams_run(cmd, &mut env);
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.to_string(), "hi there\n");
        assert_eq!(result.stderr_lossy(), "oops\n");
        let _ = fs::remove_dir_all(base);
    }

    #[test]
    #[cfg(unix)]
    fn shell_variables_reach_the_child() {
        let mut env = Environment::default();
        env.set("TURTLE_TEST_VAR", 42i64).unwrap();
        let cmd = Box::new(ExternalCommand::new(
            PathBuf::from("/bin/sh"),
            vec!["-c".to_string(), "printf %s \"$TURTLE_TEST_VAR\"".to_string()],
        ));
        assert_eq!(streams_run(cmd, &mut env).to_string(), "42");
    }

    #[test]
    fn missing_binary_is_a_spawn_error() {
        let mut env = Environment::default();
        let cmd = Box::new(ExternalCommand::new(
            PathBuf::from("/definitely/not/here"),
            Vec::new(),
        ));
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let res = cmd.execute(&mut Streams::new(&mut out, &mut err), &mut env);
        assert!(matches!(res, Err(ShellError::Spawn { .. })));
    }
}
