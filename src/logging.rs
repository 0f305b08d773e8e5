use anyhow::{Context, Result};
use log::LevelFilter;
use simplelog::{ColorChoice, ConfigBuilder, TermLogger, TerminalMode, WriteLogger};
use std::fs::{self, OpenOptions};
use std::path::Path;

/// Installs the global logger: appends to `file` when given, otherwise
/// writes to stderr. Records from other crates (rustyline) are left out.
pub fn init(level: LevelFilter, file: Option<&Path>) -> Result<()> {
    let config = ConfigBuilder::new()
        .add_filter_allow_str(env!("CARGO_CRATE_NAME"))
        .build();
    match file {
        Some(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)
                    .with_context(|| format!("can't create log directory {}", dir.display()))?;
            }
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("can't open log file {}", path.display()))?;
            WriteLogger::init(level, config, file)?;
        }
        None => TermLogger::init(level, config, TerminalMode::Stderr, ColorChoice::Auto)?,
    }
    Ok(())
}
