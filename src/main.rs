use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use conversor::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for conversor::AppCommand {
    fn from(cmd: Commands) -> conversor::AppCommand {
        match cmd {
            Commands::Convert { amount, unit } => conversor::AppCommand::Convert { amount, unit },
            Commands::History { unit } => conversor::AppCommand::History { unit },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Convert a CLP amount and chart the unit's recent history
    Convert {
        /// Amount in Chilean pesos
        #[arg(allow_hyphen_values = true)]
        amount: String,
        /// Target unit: dolar, euro or uf
        #[arg(short, long, default_value = "dolar")]
        unit: String,
    },
    /// Chart the recent history of a unit
    History {
        /// Unit: dolar, euro or uf
        #[arg(short, long, default_value = "dolar")]
        unit: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => conversor::cli::setup::setup(),
        Some(cmd) => conversor::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
