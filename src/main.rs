//! CLI entry point for spp-nidaq.
//!
//! # Usage
//!
//! Execute a single command:
//! ```bash
//! spp-nidaq task_create
//! spp-nidaq task_add_chan_aivolt 0x5ee00010 Dev1/ai0 -10 10
//! ```
//!
//! Interactive SPP session on stdin/stdout:
//! ```bash
//! spp-nidaq -i
//! ```

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{anyhow, Result};
use clap::{CommandFactory, Parser};
use spp_nidaq::{logging, Command, Session, SppConfig};
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "spp-nidaq", version)]
#[command(about = "SPP interface to NI DAQ devices (via NI-DAQmx)", long_about = None)]
struct Cli {
    /// Interactive mode (SPP communication). Type "help" to list commands
    #[arg(short, long)]
    interactive: bool,

    /// Configuration file [default: ./spp-nidaq.toml if present]
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Command to execute once, followed by its arguments
    #[arg(
        value_name = "COMMAND",
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    command: Vec<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = SppConfig::load(cli.config.as_deref())?;
    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(ExitCode::SUCCESS);
    }
    logging::init(&config.logging).map_err(|e| anyhow!(e))?;

    let single = if cli.interactive {
        if !cli.command.is_empty() {
            warn!(words = cli.command.len(), "Ignoring command words in interactive mode");
        }
        None
    } else {
        match Command::from_words(cli.command) {
            Some(command) => Some(command),
            None => {
                Cli::command().print_help()?;
                return Ok(ExitCode::FAILURE);
            }
        }
    };

    let backend = config.build_backend()?;
    info!(backend = backend.name(), "Backend ready");
    let mut session = Session::new(backend);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    match single {
        Some(command) => {
            let succeeded = session.run_single(&command, &mut out)?;
            Ok(if succeeded {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        None => {
            let summary = session.run_interactive(io::stdin().lock(), &mut out)?;
            info!(commands = summary.total(), failed = summary.failed, "Session finished");
            Ok(ExitCode::SUCCESS)
        }
    }
}
