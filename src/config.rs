use crate::env::{expand_home, home_dir};
use crate::value::Value;
use anyhow::{Context, Result, anyhow};
use log::LevelFilter;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

/// Environment variable naming a user configuration file.
pub const CONFIG_ENV_VAR: &str = "TURTLE_CONFIG";

// ── Final (merged) config types ──

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub settings: Settings,
    /// Default-value tier of the variable store.
    #[serde(default)]
    pub variables: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub history_file: String,
    pub history_size: usize,
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<String>,
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Default, Deserialize)]
struct ConfigOverlay {
    #[serde(default)]
    settings: SettingsOverlay,
    #[serde(default)]
    variables: BTreeMap<String, toml::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsOverlay {
    history_file: Option<String>,
    history_size: Option<usize>,
    log_level: Option<String>,
    log_file: Option<String>,
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Result<Self> {
        toml::from_str(DEFAULT_CONFIG).context("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge the overlay from `explicit`, else `$TURTLE_CONFIG`, else
    ///    `~/.config/turtle/config.toml`, when that file exists
    ///
    /// An explicitly named file must exist; the implicit ones are optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default_config()?;
        let path = match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => user_config_path().filter(|p| p.exists()),
        };
        if let Some(path) = path {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("can't read config {}", path.display()))?;
            config.apply_toml(&text)
                .with_context(|| format!("can't parse config {}", path.display()))?;
            log::debug!("loaded config overlay from {}", path.display());
        }
        Ok(config)
    }

    /// Merges an overlay document: scalar settings override, variables are
    /// added or replaced.
    pub fn apply_toml(&mut self, text: &str) -> Result<()> {
        let overlay: ConfigOverlay = toml::from_str(text)?;
        self.apply_overlay(overlay);
        Ok(())
    }

    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        let s = overlay.settings;
        if let Some(v) = s.history_file {
            self.settings.history_file = v;
        }
        if let Some(v) = s.history_size {
            self.settings.history_size = v;
        }
        if let Some(v) = s.log_level {
            self.settings.log_level = v;
        }
        if s.log_file.is_some() {
            self.settings.log_file = s.log_file;
        }
        self.variables.extend(overlay.variables);
    }

    pub fn history_path(&self) -> Option<PathBuf> {
        let file = self.settings.history_file.trim();
        (!file.is_empty()).then(|| expand_home(file))
    }

    pub fn log_path(&self) -> Option<PathBuf> {
        self.settings
            .log_file
            .as_deref()
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(expand_home)
    }

    pub fn log_level(&self) -> Result<LevelFilter> {
        self.settings
            .log_level
            .parse()
            .map_err(|_| anyhow!("invalid log level {:?}", self.settings.log_level))
    }

    /// The `[variables]` table as shell values.
    pub fn defaults(&self) -> HashMap<String, Value> {
        self.variables
            .iter()
            .map(|(name, value)| (name.clone(), to_value(value)))
            .collect()
    }
}

fn to_value(value: &toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::Str(s.clone()),
        toml::Value::Integer(n) => Value::Int(*n),
        toml::Value::Float(f) => Value::Float(*f),
        toml::Value::Boolean(b) => Value::Bool(*b),
        other => Value::Str(other.to_string()),
    }
}

fn user_config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV_VAR).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    home_dir().map(|home| home.join(".config/turtle/config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults_parse() {
        let config = Config::default_config().unwrap();
        assert_eq!(config.settings.history_size, 100);
        assert_eq!(config.log_level().unwrap(), LevelFilter::Warn);
        assert!(config.log_path().is_none());
        let defaults = config.defaults();
        assert_eq!(defaults["PROMPT2"], Value::from("> "));
        assert_eq!(defaults["PROMPT1"], Value::from("$USER@$HOST: $CWD $ "));
        assert!(!defaults.contains_key("PATH"));
    }

    #[test]
    fn overlay_overrides_scalars_and_extends_variables() {
        let mut config = Config::default_config().unwrap();
        config
            .apply_toml(
                r#"
                [settings]
                history_size = 5
                log_file = "/tmp/turtle.log"

                [variables]
                PROMPT2 = "... "
                ANSWER = 42
                "#,
            )
            .unwrap();
        assert_eq!(config.settings.history_size, 5);
        assert_eq!(config.settings.log_level, "warn");
        assert_eq!(config.log_path(), Some(PathBuf::from("/tmp/turtle.log")));
        let defaults = config.defaults();
        assert_eq!(defaults["PROMPT2"], Value::from("... "));
        assert_eq!(defaults["ANSWER"], Value::Int(42));
        assert_eq!(defaults["PROMPT4"], Value::from("+"));
    }

    #[test]
    fn invalid_overlay_is_an_error() {
        let mut config = Config::default_config().unwrap();
        assert!(config.apply_toml("[settings]\nhistory_size = \"lots\"").is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let missing = std::env::temp_dir().join(format!("turtle_no_such_config_{}.toml", std::process::id()));
        assert!(Config::load(Some(&missing)).is_err());
    }

    #[test]
    fn bad_log_level_is_reported() {
        let mut config = Config::default_config().unwrap();
        config.settings.log_level = "loud".to_string();
        assert!(config.log_level().is_err());
    }
}
