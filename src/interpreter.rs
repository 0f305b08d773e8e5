use crate::command::Streams;
use crate::config::Config;
use crate::dispatch::Dispatcher;
use crate::env::Environment;
use crate::error::{GrammarError, ShellError};
use crate::eval::Evaluator;
use crate::multiline::{concatenate_incomplete_lines, is_complete};
use crate::parser::Parser;
use crate::prompt;
use anyhow::Context;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::{self, Write};
use std::path::PathBuf;

/// A shell session: the parser, the variable store and the command registry.
///
/// Example
/// ```
/// use turtleshell::{Config, Interpreter};
/// let mut sh = Interpreter::new(&Config::default_config().unwrap()).unwrap();
/// let (mut out, mut err) = (Vec::new(), Vec::new());
/// sh.run_line("x = 10; $x", &mut out, &mut err).unwrap();
/// assert_eq!(out, b"10\n");
/// ```
pub struct Interpreter {
    env: Environment,
    dispatcher: Dispatcher,
    parser: Parser,
    history_file: Option<PathBuf>,
    history_size: usize,
}

impl Interpreter {
    /// Builds a session from `config`. Fails only when the grammar does not load.
    pub fn new(config: &Config) -> Result<Self, GrammarError> {
        Ok(Self {
            env: Environment::with_defaults(config.defaults()),
            dispatcher: Dispatcher::default(),
            parser: Parser::new()?,
            history_file: config.history_path(),
            history_size: config.settings.history_size,
        })
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn env_mut(&mut self) -> &mut Environment {
        &mut self.env
    }

    /// Parses and evaluates one complete line, printing statement results to
    /// `stdout`. The first error aborts the rest of the line.
    pub fn run_line(
        &mut self,
        text: &str,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> Result<(), ShellError> {
        let program = self.parser.parse(text)?;
        log::debug!("parsed {text:?} into {} statement(s)", program.statements.len());
        Evaluator::new(&mut self.env, &self.dispatcher, Streams::new(stdout, stderr)).run(&program)
    }

    /// Prompt variable `name` with its `$NAME` references substituted.
    pub fn prompt(&self, name: &str) -> String {
        prompt::render(&self.env.get(name).to_string(), &self.env)
    }

    /// Interactive Read-Eval-Print Loop. Returns when the user types `exit`
    /// or closes input.
    pub fn repl(&mut self) -> anyhow::Result<()> {
        let config = rustyline::Config::builder()
            .max_history_size(self.history_size)?
            .build();
        let mut rl = DefaultEditor::with_config(config)?;
        if let Some(path) = &self.history_file {
            match rl.load_history(path) {
                Ok(()) => {}
                Err(ReadlineError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => log::warn!("can't load history from {}: {e}", path.display()),
            }
        }

        println!("🐢 turtle version {}", env!("CARGO_PKG_VERSION"));
        let mut pending: Vec<String> = Vec::new();
        loop {
            let prompt = if pending.is_empty() {
                self.prompt("PROMPT1")
            } else {
                self.prompt("PROMPT2")
            };
            match rl.readline(&prompt) {
                Ok(line) => {
                    if pending.is_empty() {
                        pending.push(line.trim().to_string());
                    } else {
                        pending.push(line);
                    }
                    if !is_complete(&pending.join(" ")) {
                        continue;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    pending.clear();
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(err) => return Err(err).context("can't read input"),
            }

            let text = concatenate_incomplete_lines(&pending);
            pending.clear();
            if text.is_empty() {
                continue;
            }
            rl.add_history_entry(text.as_str())?;
            if let Some(path) = &self.history_file {
                if let Err(e) = rl.append_history(path) {
                    log::warn!("can't append to history {}: {e}", path.display());
                }
            }
            if text == "exit" {
                break;
            }

            let mut stdout = io::stdout();
            let mut stderr = io::stderr();
            if let Err(e) = self.run_line(&text, &mut stdout, &mut stderr) {
                log::debug!("statement failed: {e:?}");
                writeln!(stderr, "{e}")?;
            }
        }
        Ok(())
    }
}
