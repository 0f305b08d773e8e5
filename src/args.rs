//! Option parsing for builtin commands.
//!
//! A builtin declares its arguments once with [`ArgParser`]: positionals,
//! boolean flags and options taking values. Positionals are consumed first,
//! in declaration order; after them every token must either open a flag or
//! option (it starts with `-`) or be a value for the option opened last.

use crate::error::ShellError;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgValue {
    Str(String),
    Bool(bool),
    List(Vec<String>),
}

/// Parsed arguments keyed by destination name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArgs {
    values: HashMap<String, ArgValue>,
}

impl ParsedArgs {
    pub fn str(&self, dest: &str) -> Option<&str> {
        match self.values.get(dest) {
            Some(ArgValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Value of a flag; `false` when `dest` is not a flag.
    pub fn flag(&self, dest: &str) -> bool {
        matches!(self.values.get(dest), Some(ArgValue::Bool(true)))
    }

    pub fn list(&self, dest: &str) -> &[String] {
        match self.values.get(dest) {
            Some(ArgValue::List(items)) => items,
            _ => &[],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Arity {
    Required,
    Optional,
    /// Every leading value up to the first flag or option.
    Rest,
}

#[derive(Debug, Clone)]
struct Positional {
    dest: &'static str,
    arity: Arity,
}

#[derive(Debug, Clone)]
enum Named {
    /// Presence stores `store` into `dest`.
    Flag { dest: &'static str, store: bool },
    /// Collects the values that follow; `nargs` pins their number.
    Opt {
        dest: &'static str,
        nargs: Option<usize>,
    },
}

#[derive(Debug, Clone)]
pub struct ArgParser {
    command: &'static str,
    positionals: Vec<Positional>,
    named: Vec<Named>,
    names: HashMap<&'static str, usize>,
}

impl ArgParser {
    pub fn new(command: &'static str) -> Self {
        Self {
            command,
            positionals: Vec::new(),
            named: Vec::new(),
            names: HashMap::new(),
        }
    }

    pub fn positional(mut self, dest: &'static str) -> Self {
        self.positionals.push(Positional {
            dest,
            arity: Arity::Required,
        });
        self
    }

    pub fn optional(mut self, dest: &'static str) -> Self {
        self.positionals.push(Positional {
            dest,
            arity: Arity::Optional,
        });
        self
    }

    pub fn rest(mut self, dest: &'static str) -> Self {
        self.positionals.push(Positional {
            dest,
            arity: Arity::Rest,
        });
        self
    }

    /// Boolean flag: present stores `store`, absent leaves the opposite.
    ///
    /// Several flags may share a `dest` (`-e` / `-E`); the default comes from
    /// the first one declared and the last one given on the line wins.
    pub fn flag(self, dest: &'static str, store: bool, names: &[&'static str]) -> Self {
        self.named_arg(Named::Flag { dest, store }, names)
    }

    pub fn option(self, dest: &'static str, nargs: Option<usize>, names: &[&'static str]) -> Self {
        self.named_arg(Named::Opt { dest, nargs }, names)
    }

    fn named_arg(mut self, arg: Named, names: &[&'static str]) -> Self {
        let index = self.named.len();
        self.named.push(arg);
        for name in names {
            self.names.insert(*name, index);
        }
        self
    }

    pub fn parse(&self, args: &[String]) -> Result<ParsedArgs, ShellError> {
        let mut parsed = ParsedArgs::default();
        for named in &self.named {
            if let Named::Flag { dest, store } = named {
                parsed
                    .values
                    .entry(dest.to_string())
                    .or_insert(ArgValue::Bool(!store));
            }
        }

        let mut rest = args.iter().peekable();
        for positional in &self.positionals {
            let value = match positional.arity {
                Arity::Required => {
                    let value = rest.next().ok_or_else(|| {
                        self.error(format!("missing required argument '{}'", positional.dest))
                    })?;
                    ArgValue::Str(value.clone())
                }
                Arity::Optional => match rest.next() {
                    Some(value) => ArgValue::Str(value.clone()),
                    None => continue,
                },
                Arity::Rest => {
                    let mut items = Vec::new();
                    while let Some(value) = rest.next_if(|v| !is_arg(v)) {
                        items.push(value.clone());
                    }
                    ArgValue::List(items)
                }
            };
            parsed.values.insert(positional.dest.to_string(), value);
        }

        let mut open: Option<(&str, &Named)> = None;
        let mut buffer: Vec<String> = Vec::new();
        for value in rest {
            if !is_arg(value) {
                if open.is_none() {
                    return Err(self.error(format!("Expected new argument; got {value}")));
                }
                buffer.push(value.clone());
                continue;
            }
            if let Some((name, arg)) = open.take() {
                self.close(&mut parsed, name, arg, std::mem::take(&mut buffer))?;
            }
            let arg = self
                .names
                .get(value.as_str())
                .map(|&i| &self.named[i])
                .ok_or_else(|| self.error(format!("Unrecognized arg '{value}'")))?;
            match arg {
                Named::Flag { dest, store } => {
                    parsed.values.insert(dest.to_string(), ArgValue::Bool(*store));
                }
                Named::Opt { .. } => open = Some((value.as_str(), arg)),
            }
        }
        if let Some((name, arg)) = open {
            self.close(&mut parsed, name, arg, buffer)?;
        }
        Ok(parsed)
    }

    fn close(
        &self,
        parsed: &mut ParsedArgs,
        name: &str,
        arg: &Named,
        values: Vec<String>,
    ) -> Result<(), ShellError> {
        if let Named::Opt { dest, nargs } = arg {
            if let Some(n) = nargs.filter(|&n| n != values.len()) {
                return Err(self.error(format!(
                    "'{name}' expects {n} value(s), got {}",
                    values.len()
                )));
            }
            parsed.values.insert(dest.to_string(), ArgValue::List(values));
        }
        Ok(())
    }

    fn error(&self, message: String) -> ShellError {
        ShellError::argument(self.command, message)
    }
}

/// Whether a token opens a flag or option. Negative numbers are values.
fn is_arg(token: &str) -> bool {
    match token.strip_prefix('-') {
        Some(rest) => !rest.is_empty() && !rest.starts_with(|c: char| c.is_ascii_digit() || c == '.'),
        None => false,
    }
}
