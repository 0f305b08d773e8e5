//! Command dispatch: builtins first, then executables.

use crate::builtin::{BuiltinCommand, Cd, Cwd, Print, Unset};
use crate::command::{CommandFactory, Streams};
use crate::env::Environment;
use crate::error::ShellError;
use crate::external::ExternalCommand;
use crate::value::CommandResult;

/// Factory allows creating instances of ExecutableCommand.
///
/// Only supports commands defined in this crate: builtins and [`ExternalCommand`].
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Ordered registry of command factories. The first factory that recognises
/// a name wins, so builtins shadow executables of the same name.
pub struct Dispatcher {
    builtins: Vec<&'static str>,
    commands: Vec<Box<dyn CommandFactory>>,
}

impl Default for Dispatcher {
    fn default() -> Self {
        let mut dispatcher = Self {
            builtins: Vec::new(),
            commands: Vec::new(),
        };
        dispatcher.register_builtin::<Print>();
        dispatcher.register_builtin::<Cwd>();
        dispatcher.register_builtin::<Cd>();
        dispatcher.register_builtin::<Unset>();
        dispatcher
            .commands
            .push(Box::new(Factory::<ExternalCommand>::default()));
        dispatcher
    }
}

impl Dispatcher {
    fn register_builtin<T: BuiltinCommand + 'static>(&mut self) {
        self.builtins.push(T::name());
        // builtins stay ahead of the external factory
        let at = self.builtins.len() - 1;
        self.commands.insert(at, Box::new(Factory::<T>::default()));
    }

    /// Names of all builtin commands, in lookup order.
    pub fn builtin_names(&self) -> &[&'static str] {
        &self.builtins
    }

    pub fn is_builtin(&self, name: &str) -> bool {
        self.builtins.contains(&name)
    }

    /// Runs `name` with `options`. Returns the command's result, or `None`
    /// for builtins that produce nothing to print.
    pub fn dispatch(
        &self,
        name: &str,
        options: &[String],
        streams: &mut Streams<'_>,
        env: &mut Environment,
    ) -> Result<Option<CommandResult>, ShellError> {
        for factory in &self.commands {
            if let Some(cmd) = factory.try_create(env, name, options)? {
                log::debug!(
                    "dispatching {name} ({})",
                    if self.is_builtin(name) { "builtin" } else { "external" }
                );
                return cmd.execute(streams, env);
            }
        }
        Err(ShellError::CommandNotFound(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_registered_in_order() {
        let dispatcher = Dispatcher::default();
        assert_eq!(dispatcher.builtin_names(), ["print", "cwd", "cd", "unset"]);
        assert_eq!(dispatcher.commands.len(), 5);
        assert!(dispatcher.is_builtin("cd"));
        assert!(!dispatcher.is_builtin("ls"));
    }

    #[test]
    fn unknown_command_is_not_found() {
        let dispatcher = Dispatcher::default();
        let mut env = Environment::default();
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let res = dispatcher.dispatch(
            "frobnicate123",
            &[],
            &mut Streams::new(&mut out, &mut err),
            &mut env,
        );
        let Err(err) = res else {
            panic!("expected an error");
        };
        assert_eq!(err.to_string(), "frobnicate123: command not found");
    }

    #[test]
    fn builtin_runs_in_process() {
        let dispatcher = Dispatcher::default();
        let mut env = Environment::default();
        let (mut out, mut err) = (Vec::new(), Vec::new());
        let res = dispatcher
            .dispatch(
                "print",
                &["hi".to_string()],
                &mut Streams::new(&mut out, &mut err),
                &mut env,
            )
            .unwrap();
        assert!(res.is_none());
        assert_eq!(out, b"hi\n");
    }
}
