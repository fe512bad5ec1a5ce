//! shakerd - GT7 telemetry to shaker haptics daemon

#![deny(clippy::unwrap_used)]

use anyhow::{Context, Result};
use clap::Parser;
use shaker_config::ShakerConfig;
use shaker_service::{BackendKind, Cli, Command, ShakerApp, play_test_tone};
use shaker_synth::ToneSide;
use std::time::Duration;
use tracing::info;

const METRICS_LOG_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    shaker_service::logging::init(cli.verbose)?;

    let config = cli.resolve_config().context("loading configuration")?;
    info!("Starting shakerd v{}", env!("CARGO_PKG_VERSION"));

    match cli.command() {
        Command::Run => run(config, cli.backend).await,
        Command::TestTone { side } => test_tone(&config, cli.backend, side),
    }
}

async fn run(config: ShakerConfig, backend: BackendKind) -> Result<()> {
    let mut app = ShakerApp::new(config);
    app.start(backend)?;

    let mut ticker = tokio::time::interval(METRICS_LOG_INTERVAL);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = ticker.tick() => app.log_metrics(),
            result = &mut ctrl_c => {
                result.context("waiting for ctrl-c")?;
                info!("Shutdown requested");
                break;
            }
        }
    }

    tokio::task::block_in_place(|| app.stop());
    Ok(())
}

fn test_tone(config: &ShakerConfig, backend: BackendKind, side: ToneSide) -> Result<()> {
    match backend {
        BackendKind::Null => play_test_tone(&mut shaker_stream::NullBackend::new(), config, side),
        #[cfg(feature = "cpal")]
        BackendKind::Cpal => play_test_tone(&mut shaker_stream::CpalBackend::new(), config, side),
    }
}
