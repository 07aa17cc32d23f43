mod app;
mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use lapsebox::config::resolve_path;
use lapsebox::observability::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // a missing .env is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config_path = resolve_path(cli.config);

    match cli.command {
        Commands::Run => app::run(&config_path).await?,
        Commands::CheckConfig => app::check_config(&config_path)?,
        Commands::TestNotify => app::test_notify(&config_path).await?,
        Commands::Sweep => app::sweep_once(&config_path)?,
        Commands::Upload(args) => app::upload_once(&config_path, args.date).await?,
    }

    Ok(())
}
