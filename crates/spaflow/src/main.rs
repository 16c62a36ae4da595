mod commands;
mod prompt;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spaflow")]
#[command(about = "Deploy a single page app on AWS", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Deploy a built single page app on <domain[/subfolder]>
    Deploy(commands::deploy::DeployArgs),
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // logs go to stderr, stdout is for the report
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Version => {
            println!("spaflow {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Deploy(args) => commands::deploy::handle(args).await,
    };

    if let Err(e) = result {
        eprintln!("{} {:#}", "💥".red(), e);
        std::process::exit(1);
    }
    Ok(())
}
