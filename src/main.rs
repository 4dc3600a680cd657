//! ephemeral - run a command inside the terminal's alternate screen
//!
//! ephemeral switches to the alternate screen buffer, asks for extra
//! arguments there, runs the command while showing its output live, then
//! switches back and prints only the captured output. Whatever was typed at
//! the prompt never lands in the primary screen's scrollback.
//!
//! # Quick Start
//!
//! ```text
//! ephemeral ./deploy.sh --env prod      # prompt for more args, then run
//! ephemeral mytool                      # type "| grep x" at the prompt to filter
//! ```
//!
//! The target and its default arguments are quoted for the shell; the line
//! typed at the prompt is appended raw, so pipes and redirections work.

mod config;
mod core;
mod interrupt;
mod ui;

use std::env;
use std::fs::{self, OpenOptions};
use std::io;
use std::sync::Mutex;

use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::config::Config;
use crate::core::capture::ShellCommand;
use crate::core::command::{CommandSpec, UsageError};
use crate::core::session::ScreenSession;

/// Version string from Cargo.toml
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Environment variable overriding the log filter
const LOG_ENV: &str = "EPHEMERAL_LOG";

/// What the command line asked for
#[derive(Debug, PartialEq, Eq)]
enum Invocation {
    Help,
    Version,
    Run(CommandSpec),
}

fn print_version() {
    eprintln!("ephemeral {}", VERSION);
}

fn print_usage() {
    eprintln!("Usage: ephemeral <target-script> [default-argument ...]");
}

fn print_help() {
    eprintln!("ephemeral {} - run a command in the alternate screen", VERSION);
    eprintln!();
    print_usage();
    eprintln!();
    eprintln!("Switches to the alternate screen, prompts for additional arguments,");
    eprintln!("runs the command through the shell while showing its output, then");
    eprintln!("returns to the primary screen and prints only the captured output.");
    eprintln!();
    eprintln!("Options (first argument only):");
    eprintln!("  -h, --help            Show this help");
    eprintln!("  -V, --version         Show version");
    eprintln!("  --                    Treat the next argument as the target");
    eprintln!();
    eprintln!("Configuration: ~/.ephemeral/config.toml");
    eprintln!("Log file:      ~/.ephemeral/ephemeral.log ({} overrides the level)", LOG_ENV);
}

/// Parse the arguments after the program name
///
/// Options are only recognised in first position; everything from the
/// target on belongs to the command.
fn parse_args<I>(args: I) -> Result<Invocation, UsageError>
where
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter().peekable();
    match args.peek().map(String::as_str) {
        Some("-h" | "--help") => return Ok(Invocation::Help),
        Some("-V" | "--version") => return Ok(Invocation::Version),
        Some("--") => {
            args.next();
        }
        _ => {}
    }
    CommandSpec::from_args(args).map(Invocation::Run)
}

/// Initialize logging to `~/.ephemeral/ephemeral.log`
fn init_logging(config: &Config) {
    let Some(dir) = config::app_dir() else {
        return;
    };
    if fs::create_dir_all(&dir).is_err() {
        return;
    }

    // Open log file (append mode)
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("ephemeral.log"))
        .ok();

    if let Some(file) = log_file {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(filter)
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }
}

fn main() -> anyhow::Result<()> {
    let spec = match parse_args(env::args().skip(1)) {
        Ok(Invocation::Run(spec)) => spec,
        Ok(Invocation::Help) => {
            print_help();
            return Ok(());
        }
        Ok(Invocation::Version) => {
            print_version();
            return Ok(());
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            print_usage();
            std::process::exit(1);
        }
    };

    let config = Config::load();
    init_logging(&config);
    info!("ephemeral {} starting...", VERSION);

    interrupt::init();

    let shell = ShellCommand::from_config(config.shell.as_deref());
    info!("Shell: {} {}", shell.program(), shell.flag());

    let session = ScreenSession::new(spec)
        .with_shell(shell)
        .with_prompt(config.prompt)
        .on_phase(interrupt::set_phase);
    info!(
        "Target: {} ({} default args)",
        session.spec().target(),
        session.spec().defaults().len()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let report = match session.run(stdin.lock(), &mut stdout) {
        Ok(report) => report,
        Err(e) => {
            error!("Session failed: {}", e);
            return Err(e.into());
        }
    };

    if interrupt::is_interrupted() {
        warn!("Command was interrupted");
    }
    info!(
        "Session complete: {} lines, child {}, extra args: {}",
        report.lines, report.status, report.had_extra_args
    );
    Ok(())
}
