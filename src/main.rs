//! metervision - analog water meter reader
//!
//! Main entry point: load configuration, construct the clients, run the
//! cycle scheduler forever.

use metervision::camera_client::CameraClient;
use metervision::config::{
    AppConfig, CAMERA_TIMEOUT, STATE_STORE_TIMEOUT, VISION_TIMEOUT,
};
use metervision::extractor::ReadingExtractor;
use metervision::illumination::IlluminationController;
use metervision::orchestrator::ReadCycleOrchestrator;
use metervision::scheduler::Scheduler;
use metervision::state_store::StateStoreClient;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "metervision=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting metervision v{}", env!("CARGO_PKG_VERSION"));

    // Missing mandatory credentials abort startup; no cycles run.
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "invalid configuration, aborting");
            return Err(e.into());
        }
    };

    tracing::info!(
        ha_url = %config.ha_url,
        camera_url = %config.camera_url,
        vision_api_url = %config.vision_api_url,
        vision_model = %config.vision_model,
        meter_entity_id = %config.meter_entity_id,
        write_mode = ?config.write_mode,
        parse_policy = ?config.parse_policy,
        switch_entity_id = ?config.switch_entity_id,
        interval_minutes = config.interval_minutes,
        active_hours_start = config.active_hours.start,
        active_hours_end = config.active_hours.end,
        max_reading_difference = config.max_reading_difference,
        "Configuration loaded"
    );

    let camera = CameraClient::new(config.camera_url.clone(), CAMERA_TIMEOUT)?;

    let illumination: Option<IlluminationController> = match &config.switch_entity_id {
        Some(entity_id) => Some(IlluminationController::new(
            config.ha_url.clone(),
            config.ha_token.clone(),
            entity_id.clone(),
            STATE_STORE_TIMEOUT,
        )?),
        None => {
            tracing::info!("no switch entity configured, illumination step disabled");
            None
        }
    };

    let extractor = ReadingExtractor::new(
        config.vision_api_url.clone(),
        config.vision_api_key.clone(),
        config.vision_model.clone(),
        config.reader_prompt.clone(),
        config.parse_policy,
        VISION_TIMEOUT,
    )?;

    let state_store = StateStoreClient::new(
        config.ha_url.clone(),
        config.ha_token.clone(),
        config.meter_entity_id.clone(),
        config.write_mode,
        STATE_STORE_TIMEOUT,
    )?;

    let orchestrator = ReadCycleOrchestrator::new(
        camera,
        illumination,
        extractor,
        state_store,
        config.camera_settings.clone(),
        config.active_hours,
        config.max_reading_difference,
        config.switch_on_delay,
    );

    let interval = Duration::from_secs(config.interval_minutes * 60);
    Scheduler::new(orchestrator, interval).run().await;

    Ok(())
}
