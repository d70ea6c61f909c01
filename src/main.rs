use tracing_subscriber::{EnvFilter, fmt};

use recorded_events::config::RecorderConfig;
use recorded_events::shell::session::RecordingSession;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = RecorderConfig::from_env()?;
    let session = RecordingSession::start(&config).await?;
    if let Some(addr) = session.local_addr() {
        tracing::info!("Recording endpoint: http://{}/", addr);
    }

    tokio::signal::ctrl_c().await?;
    session.release().await;
    let recorded = session.snapshot().await?.len();
    tracing::info!(recorded, "recording session shut down");
    Ok(())
}
