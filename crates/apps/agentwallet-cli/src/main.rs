//! AgentWallet CLI binary entry point.

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use agentwallet_cli::{
    cli::{Cli, Commands},
    commands,
    config::{default_config_path, CliConfig},
    error::{CliError, CliResult},
    output::OutputFormat,
};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli).await {
        print_error(&e);
        std::process::exit(e.exit_code());
    }
}

/// `--verbose` turns on debug logs for the agentwallet crates; otherwise
/// `RUST_LOG` decides, defaulting to warnings only.
fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("warn,agentwallet=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Print a user-friendly error message with error code and recovery hint.
fn print_error(e: &CliError) {
    let code = e.error_code();

    eprintln!(
        "{} [{}]: {}",
        "Error".red().bold(),
        format!("0x{:04X}", code.code()).yellow(),
        e
    );

    if let Some(suggestion) = e.suggestion() {
        eprintln!("{}: {}", "Hint".cyan(), suggestion);
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let format: OutputFormat = cli.format.into();

    let output = match cli.command {
        Commands::Init { force } => commands::init(CliConfig::default(), format, &config_path, force)?,

        Commands::Workers => commands::workers(CliConfig::load(&config_path)?, format).await?,

        Commands::DerivePda { org_pubkey, seed } => commands::derive_pda(format, &org_pubkey, &seed)?,

        Commands::PdaState { address } => {
            commands::pda_state(CliConfig::load(&config_path)?, format, &address).await?
        }

        Commands::Balance { address } => {
            commands::balance(CliConfig::load(&config_path)?, format, &address).await?
        }

        Commands::Fee { amount, tier } => {
            commands::fee(&CliConfig::load(&config_path)?, format, amount, tier.into())?
        }
    };

    println!("{}", output);
    Ok(())
}
