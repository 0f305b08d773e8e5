//! Shell variable store.
//!
//! Reads go through three tiers: computed read-only variables, then variables
//! the user has set, then configured defaults. Writes only ever touch the
//! middle tier.

use crate::error::ShellError;
use crate::value::Value;
use chrono::Local;
use std::collections::HashMap;
use std::env as stdenv;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Variables whose value is computed on every read and that cannot be
/// assigned or unset.
pub const READ_ONLY: [&str; 7] = ["CWD", "DATE", "HOME", "HOST", "OS", "TMP", "USER"];

/// Writes and deletes of the first name are redirected to the second.
#[cfg(windows)]
const ALIASES: &[(&str, &str)] = &[("PROMPT", "PROMPT1")];
#[cfg(not(windows))]
const ALIASES: &[(&str, &str)] = &[("PS1", "PROMPT1"), ("PS2", "PROMPT2")];

#[derive(Debug, Clone)]
pub struct Environment {
    vars: HashMap<String, Value>,
    defaults: HashMap<String, Value>,
}

impl Default for Environment {
    fn default() -> Self {
        Self::with_defaults(HashMap::new())
    }
}

impl Environment {
    /// Store whose fallback tier holds `defaults`. `PATH` falls back to the
    /// search path this process was started with unless `defaults` sets it.
    pub fn with_defaults(mut defaults: HashMap<String, Value>) -> Self {
        if !defaults.contains_key("PATH") {
            let path = stdenv::var_os("PATH").unwrap_or_default();
            defaults.insert("PATH".to_string(), Value::Str(path.to_string_lossy().into_owned()));
        }
        Self {
            vars: HashMap::new(),
            defaults,
        }
    }

    pub fn is_read_only(name: &str) -> bool {
        READ_ONLY.contains(&name)
    }

    /// Current value of `name`; the empty string when it is set nowhere.
    pub fn get(&self, name: &str) -> Value {
        if let Some(value) = computed(name) {
            return value;
        }
        self.vars
            .get(name)
            .or_else(|| self.defaults.get(name))
            .cloned()
            .unwrap_or_default()
    }

    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<(), ShellError> {
        if Self::is_read_only(name) {
            return Err(read_only(name));
        }
        let target = resolve_alias(name);
        let value = value.into();
        log::debug!("set {target} = {value:?}");
        self.vars.insert(target.to_string(), value);
        Ok(())
    }

    /// Removes a user-set variable, following the same aliases as [`set`].
    /// Unsetting a name that was never set is not an error; its default, if
    /// any, becomes visible again.
    ///
    /// [`set`]: Environment::set
    pub fn delete(&mut self, name: &str) -> Result<(), ShellError> {
        if Self::is_read_only(name) {
            return Err(read_only(name));
        }
        let target = resolve_alias(name);
        if self.vars.remove(target).is_some() {
            log::debug!("unset {target}");
        }
        Ok(())
    }

    /// User-set variables in string form, for the environment of child processes.
    pub fn exported(&self) -> impl Iterator<Item = (&str, String)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.to_string()))
    }

    /// Finds `name` in the directories listed in `PATH`.
    ///
    /// Directories are searched in order and the entries of each one in file
    /// name order. An entry matches when its file name, or its file name
    /// without extension, equals `name` and it is executable.
    pub fn executable_for(&self, name: &str) -> Result<PathBuf, ShellError> {
        let search_paths = OsString::from(self.get("PATH").to_string());
        for dir in stdenv::split_paths(&search_paths) {
            let Ok(entries) = fs::read_dir(&dir) else {
                continue;
            };
            let mut entries: Vec<PathBuf> = entries.filter_map(|e| e.ok().map(|e| e.path())).collect();
            entries.sort();
            let found = entries.into_iter().find(|path| {
                let named = path.file_name().is_some_and(|f| f == name)
                    || path.file_stem().is_some_and(|s| s == name);
                named && is_executable(path)
            });
            if let Some(path) = found {
                log::debug!("resolved {name} to {}", path.display());
                return Ok(path);
            }
        }
        Err(ShellError::CommandNotFound(name.to_string()))
    }
}

fn resolve_alias(name: &str) -> &str {
    ALIASES
        .iter()
        .find(|(alias, _)| *alias == name)
        .map_or(name, |(_, target)| *target)
}

fn read_only(name: &str) -> ShellError {
    ShellError::InvalidAssignment(format!(
        "Shell variable '{name}' is read-only and cannot be written to."
    ))
}

fn computed(name: &str) -> Option<Value> {
    let value = match name {
        "CWD" => stdenv::current_dir().map_or(Value::Null, Value::Path),
        "DATE" => Value::DateTime(Local::now()),
        "HOME" => home_dir().map_or(Value::Null, Value::Path),
        "HOST" => Value::Str(hostname()),
        "OS" => Value::Str(stdenv::consts::OS.to_string()),
        "TMP" => Value::Path(stdenv::temp_dir()),
        "USER" => Value::Str(username()),
        _ => return None,
    };
    Some(value)
}

pub(crate) fn home_dir() -> Option<PathBuf> {
    ["HOME", "USERPROFILE"]
        .iter()
        .find_map(|key| stdenv::var_os(key).filter(|v| !v.is_empty()))
        .map(PathBuf::from)
}

/// Expands a leading `~` to the home directory.
pub fn expand_home(path: &str) -> PathBuf {
    let rest = match path.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with(['/', '\\']) => rest,
        _ => return PathBuf::from(path),
    };
    match home_dir() {
        Some(home) => home.join(rest.trim_start_matches(['/', '\\'])),
        None => PathBuf::from(path),
    }
}

#[cfg(unix)]
fn hostname() -> String {
    let mut buf = [0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast(), buf.len()) };
    if rc == 0 {
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        return String::from_utf8_lossy(&buf[..end]).into_owned();
    }
    stdenv::var("HOSTNAME").unwrap_or_default()
}

#[cfg(not(unix))]
fn hostname() -> String {
    stdenv::var("COMPUTERNAME").unwrap_or_default()
}

fn username() -> String {
    if let Some(user) = ["LOGNAME", "USER", "USERNAME"]
        .iter()
        .find_map(|key| stdenv::var(key).ok().filter(|v| !v.is_empty()))
    {
        return user;
    }
    fallback_username()
}

#[cfg(unix)]
fn fallback_username() -> String {
    unsafe { libc::getuid() }.to_string()
}

#[cfg(not(unix))]
fn fallback_username() -> String {
    String::new()
}

#[cfg(unix)]
pub(crate) fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
pub(crate) fn is_executable(path: &Path) -> bool {
    path.is_file()
}
