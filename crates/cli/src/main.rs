use anyhow::Context;
use clap::{Parser, Subcommand};
use shelf_app::Application;
use shelf_kernel::settings::Settings;

/// Operate the SHELF book catalog service.
#[derive(Debug, Parser)]
#[command(name = "shelf", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Initialize the schema and serve the HTTP API (default)
    Serve,
    /// Create or upgrade the schema, then exit
    Migrate,
    /// Create the schema and insert example books into an empty catalog
    Seed,
    /// Print the effective configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings = Settings::load().with_context(|| "failed to load SHELF settings")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Config => {
            let rendered = serde_json::to_string_pretty(&settings)
                .context("failed to render configuration")?;
            println!("{rendered}");
        }
        Command::Migrate => {
            shelf_telemetry::init(&settings.telemetry)?;
            let applied = shelf_app::app::migrate(&settings).await?;
            tracing::info!(applied, "schema is up to date");
        }
        Command::Seed => {
            shelf_telemetry::init(&settings.telemetry)?;
            let inserted = shelf_app::app::seed(&settings).await?;
            tracing::info!(inserted, "seeding finished");
        }
        Command::Serve => {
            shelf_telemetry::init(&settings.telemetry)?;
            tracing::info!(env = ?settings.environment, "shelf serve starting");
            Application::bootstrap(settings)
                .await
                .context("failed to bootstrap service")?
                .serve()
                .await?;
        }
    }

    Ok(())
}
