use anyhow::Context;
use argh::FromArgs;
use log::LevelFilter;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use turtleshell::{Config, Interpreter, logging};

/// turtle: a small interactive shell.
#[derive(FromArgs)]
struct Cli {
    /// run a single line and exit
    #[argh(option, short = 'c')]
    command: Option<String>,

    /// configuration file merged over the defaults
    #[argh(option)]
    config: Option<PathBuf>,

    /// log debug records
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// print the version and exit
    #[argh(switch)]
    version: bool,
}

fn main() -> ExitCode {
    let cli: Cli = argh::from_env();
    if cli.version {
        println!("turtle {}", env!("CARGO_PKG_VERSION"));
        return ExitCode::SUCCESS;
    }
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("turtle: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = Config::load(cli.config.as_deref())?;
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        config.log_level()?
    };
    logging::init(level, config.log_path().as_deref())?;

    let mut shell = Interpreter::new(&config).context("can't load the shell grammar")?;
    match cli.command {
        Some(line) => {
            let (mut stdout, mut stderr) = (io::stdout(), io::stderr());
            if let Err(e) = shell.run_line(&line, &mut stdout, &mut stderr) {
                eprintln!("{e}");
                return Ok(ExitCode::FAILURE);
            }
        }
        None => shell.repl()?,
    }
    Ok(ExitCode::SUCCESS)
}
