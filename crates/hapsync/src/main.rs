use anyhow::Context;
use tracing_subscriber::filter::LevelFilter;

use hapsync::sync;
use hapsync::Config;
use hapsync::HttpObjectClient;
use hapsync::MqttDeviceDirectory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse config file path from CLI or use default
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "hapsync.toml".to_string());

    // Load configuration
    let config = Config::from_file(&config_path)
        .with_context(|| format!("Failed to load {}", config_path))?;

    // Initialize tracing/logging
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(config.logging.level))
        .init();

    tracing::info!("hapsync starting");
    tracing::info!("Loaded config from: {}", config_path);
    tracing::info!(
        "Object store: {}, zigbee broker: {}:{}",
        config.gateway.base_url,
        config.zigbee.broker,
        config.zigbee.port
    );

    let client =
        HttpObjectClient::new(&config.gateway).context("Failed to create object store client")?;
    let directory = MqttDeviceDirectory::new(&config.zigbee);

    sync::run(&config.mapping, &client, &directory).await?;

    // One run per invocation; the scheduler starts the next one
    tracing::info!("bridge configuration updated, exiting until the next scheduled run");

    Ok(())
}
