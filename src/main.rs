// Entrypoint for the `pk` CLI.
// - Keeps `main` small: parse global flags, build the context and hand
//   the remaining arguments to the dispatcher.
// - A failing command prints "<command> error: <message>" and exits 1.

use clap::Parser;
use crossterm::style::Stylize;
use pk_cli::commands::{dispatch, Outcome, Registry};
use pk_cli::config::Config;
use pk_cli::context::Context;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Command-line client for managing SSH keys and projects.
#[derive(Parser, Debug)]
#[command(name = "pk", version, disable_help_subcommand = true)]
struct Cli {
    /// Print the list of commands and exit
    #[arg(short = 'w')]
    words: bool,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Command followed by its own options
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let registry = Registry::standard();
    if cli.words {
        println!("{}", registry.names());
        return Ok(ExitCode::SUCCESS);
    }

    // Configuration comes from `PK_*` environment variables. See
    // `config::Config::from_env`.
    let config = Config::from_env()?;
    let mut ctx = Context::from_config(&config)?;

    match dispatch(&mut ctx, &registry, &cli.args) {
        Ok(Outcome::Usage(text)) => {
            print!("{}", text);
            Ok(ExitCode::SUCCESS)
        }
        Ok(Outcome::Done) => Ok(ExitCode::SUCCESS),
        Ok(Outcome::Failed { command, error }) => {
            eprintln!("{} {}", format!("{} error:", command).red(), error);
            Ok(ExitCode::FAILURE)
        }
        Err(error) => {
            eprintln!("{} {}", "authorization error:".red(), error);
            Ok(ExitCode::FAILURE)
        }
    }
}
