pub mod commands;
pub mod util;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::commands::{decode, parse, plan};
use crate::util::{CliResult, load_config};

#[derive(Parser, Debug)]
#[command(name = "uiaquery", version, about = "Compile and inspect XPath selectors for UI Automation hosts")]
pub struct Cli {
    /// Log filter, e.g. `debug` or `uiaquery_runtime=trace`. Falls back to `RUST_LOG`.
    #[arg(long = "log-level", value_name = "FILTER", global = true)]
    pub log_level: Option<String>,
    /// JSON session configuration file.
    #[arg(long = "config", value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the expression tree of a selector.
    Parse(parse::ParseArgs),
    /// Resolve a selector against canned host output and print each remote script.
    Plan(plan::PlanArgs),
    /// Unwrap base64 remote commands.
    Decode(decode::DecodeArgs),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

pub fn run() -> CliResult<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref())?;
    let output = execute(&cli)?;
    print!("{output}");
    Ok(())
}

/// Run a parsed command line and return what it prints.
pub fn execute(cli: &Cli) -> CliResult<String> {
    match &cli.command {
        Command::Parse(args) => parse::run(args),
        Command::Plan(args) => {
            let config = load_config(cli.config.as_deref())?;
            plan::run(&config, args)
        }
        Command::Decode(args) => decode::run(args),
    }
}

fn init_tracing(level: Option<&str>) -> CliResult<()> {
    let filter = match level {
        Some(level) => EnvFilter::try_new(level)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| err.to_string())?;
    Ok(())
}
