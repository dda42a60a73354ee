//! Main entry point for the horizon CLI.

use anyhow::Result;
use clap::Parser;
use horizon_core::{batch, cli, settings::Settings, telemetry};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    let settings = Settings::load_from(args.settings.as_deref())?;

    telemetry::init(&settings.logging)?;

    match args.command {
        cli::Commands::Graph { skill } => {
            print!("{}", cli::describe_graph(&settings, skill.as_deref())?);
            Ok(())
        }
        cli::Commands::Plan { event } => {
            print!("{}", cli::describe_plan(&event)?);
            Ok(())
        }
        cli::Commands::Gaps {
            snapshot,
            pursue,
            direction,
        } => {
            print!(
                "{}",
                cli::describe_gaps(&settings, &snapshot, &pursue, direction.as_deref())?
            );
            Ok(())
        }
        cli::Commands::Run { config } => batch::run(config, settings).await,
    }
}
