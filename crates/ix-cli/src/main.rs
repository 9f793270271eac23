use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use ix_cli::commands::{control, export, simulate, status};
use ix_cli::{App, Cli, Commands, Config};

/// Load config and open the coordinator over the configured database.
fn open_app(config_path: Option<&Path>) -> Result<App> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");
    App::open(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let mut app = open_app(cli.config.as_deref())?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = match command {
        Commands::Start => control::start(&mut out, &app).await,
        Commands::Stop => control::stop(&mut out, &app).await,
        Commands::Clear => control::clear(&mut out, &app).await,
        Commands::Status { json } => status::run(&mut out, &app, *json).await,
        Commands::Export { out: dir } => export::run(&mut out, &app, dir.as_deref()).await,
        Commands::Simulate { script, url, until } => {
            simulate::run(&mut out, &mut app, script, url, *until).await
        }
    };
    // Queued writes must land even when the command failed.
    app.close().await?;
    result
}
