use achievement_client::{
    client::AppController,
    rpc::EvmClient,
    wallet::WalletConnector,
};
use clap::Parser;
use color_eyre::eyre::{
    Result,
    WrapErr,
};
use std::path::Path;
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling,
};
use tracing_subscriber::{
    EnvFilter,
    fmt,
};

mod cli;

fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match log_dir {
        Some(dir) => {
            let appender = rolling::daily(dir, "achievement-client.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init();
            Some(guard)
        }
        None => {
            let _ = fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let config = cli::AppConfig::try_from(cli::Args::parse())?;
    let _guard = init_tracing(config.log_dir.as_deref());
    tracing::info!(rpc = config.network.url(), "starting achievement client");

    let rpc = EvmClient::new(config.network.url())
        .wrap_err("failed to build HTTP client for the rpc endpoint")?;
    let mut controller = AppController::new(WalletConnector::with_provider(rpc.clone()), rpc);
    cli::run(&mut controller, config.command).await
}
