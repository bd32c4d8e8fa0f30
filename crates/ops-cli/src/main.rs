//! lightcommit-ops 入口

use clap::Parser;
use lightcommit_shared::{config::AppConfig, observability};
use ops_cli::cli::{Cli, CommandRunner, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    observability::tracing::init_console(&cli.log_level)?;

    let config = AppConfig::load("lightcommit-ops")?;
    let runner = CommandRunner::new(config);

    match cli.command {
        Commands::DbCheck => runner.db_check().await?,
        Commands::CheckTables => {
            if !runner.check_tables().await? {
                std::process::exit(1);
            }
        }
        Commands::Migrate => runner.migrate().await?,
        Commands::SignWebhook {
            event,
            file,
            secret,
            url,
        } => runner.sign_webhook(&event, &file, secret, url).await?,
        Commands::MintOnce { limit } => runner.mint_once(limit).await?,
        Commands::ChainInfo => {
            if !runner.chain_info().await? {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
