use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use home_mind::config::AppConfig;
use home_mind::kernel::bus::EventBus;
use home_mind::kernel::event::HomeEvent;
use home_mind::kernel::time::SystemClock;
use home_mind::services::home_assistant::HomeAssistantClient;
use home_mind::services::Services;
use home_mind::Integration;

const DEFAULT_CONFIG_PATH: &str = "home_mind.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("HOME_MIND_CONFIG").ok())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let config = AppConfig::load(&path).with_context(|| format!("failed to load {path}"))?;

    let client = Arc::new(HomeAssistantClient::new(&config.home_assistant, &config.entry)?);
    let bus = EventBus::default();
    let integration = Integration::setup(
        &config.entry,
        Services::from_host(client),
        Arc::new(SystemClock),
        &bus,
    )?;

    // Events arrive as newline-delimited JSON, one bus event per line.
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Interrupted, shutting down");
                break;
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match HomeEvent::from_json(&line) {
                        Ok(event) => {
                            bus.publish(event);
                        }
                        Err(e) => tracing::warn!("Dropping event: {}", e),
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::error!("Failed to read events: {}", e);
                    break;
                }
            }
        }
    }

    integration.unload().await;
    Ok(())
}
