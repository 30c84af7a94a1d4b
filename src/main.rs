use anyhow::{Context, Result};
use tokio::signal::unix::{SignalKind, signal};

use certificate_wallet::{
    app::WalletRuntime, cli::config_path_from_args, config::Config, logging::init_tracing,
};

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = config_path_from_args()?;
    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;
    let logging = init_tracing(&config.logging).context("failed to initialize logging")?;

    let runtime = WalletRuntime::start(&config);

    let mut sigint =
        signal(SignalKind::interrupt()).context("unable to listen for SIGINT (Ctrl+C)")?;
    let mut sigterm = signal(SignalKind::terminate()).context("unable to listen for SIGTERM")?;
    let signal_name = tokio::select! {
        _ = sigint.recv() => "SIGINT",
        _ = sigterm.recv() => "SIGTERM",
    };

    tracing::info!(
        target: "wallet",
        run_id = %logging.run_id(),
        signal = signal_name,
        "shutdown_requested"
    );
    runtime.shutdown().await;
    Ok(())
}
