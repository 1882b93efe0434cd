//! Application configuration
//!
//! Loaded once at startup from the environment (`.env` supported via
//! dotenvy in `main`). Missing mandatory credentials abort startup; no
//! cycles run with a partial configuration.

use crate::error::{Error, Result};
use crate::extractor::ParsePolicy;
use crate::models::{ActiveWindow, CameraSettings};
use crate::state_store::WriteMode;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

/// Timeout for camera requests (capture can be slow on ESP32-class boards)
pub const CAMERA_TIMEOUT: Duration = Duration::from_secs(15);
/// Timeout for Home Assistant API requests
pub const STATE_STORE_TIMEOUT: Duration = Duration::from_secs(10);
/// Timeout for the vision-inference call
pub const VISION_TIMEOUT: Duration = Duration::from_secs(60);

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Home Assistant base URL
    pub ha_url: String,
    /// Home Assistant long-lived access token (mandatory)
    pub ha_token: String,
    /// Camera base URL (`/capture` and `/control` are appended)
    pub camera_url: String,
    /// OpenAI-compatible inference endpoint base URL
    pub vision_api_url: String,
    /// Inference API key (mandatory)
    pub vision_api_key: String,
    /// Model identifier
    pub vision_model: String,
    /// Override for the meter-reading instruction prompt
    pub reader_prompt: Option<String>,
    /// Response parsing policy (strict | lenient)
    pub parse_policy: ParsePolicy,
    /// Entity the reading is published to
    pub meter_entity_id: String,
    /// Publish form (sensor | input_number)
    pub write_mode: WriteMode,
    /// Switch entity for the meter lamp; None means the camera needs no light
    pub switch_entity_id: Option<String>,
    /// Delay between lamp on and capture, letting the light stabilize
    pub switch_on_delay: Duration,
    /// Camera settings applied before each capture
    pub camera_settings: CameraSettings,
    /// Minutes between read cycles
    pub interval_minutes: u64,
    /// Hours of the day during which cycles may run
    pub active_hours: ActiveWindow,
    /// Maximum accepted increase between consecutive readings (m³)
    pub max_reading_difference: f64,
}

impl AppConfig {
    /// Load configuration from the environment.
    pub fn from_env() -> Result<Self> {
        let ha_token = required("HOME_ASSISTANT_TOKEN")?;
        let vision_api_key = required("VISION_API_KEY")?;

        let active_hours = ActiveWindow::new(
            parsed("ACTIVE_HOURS_START", 6)?,
            parsed("ACTIVE_HOURS_END", 23)?,
        )?;

        let camera_settings = match std::env::var("CAMERA_SETTINGS") {
            Ok(raw) => CameraSettings::parse(&raw)?,
            Err(_) => CameraSettings::new(),
        };

        Ok(Self {
            ha_url: var_or("HOME_ASSISTANT_URL", "http://localhost:8123"),
            ha_token,
            camera_url: var_or("CAMERA_URL", "http://esp32-cam.local"),
            vision_api_url: var_or("VISION_API_URL", "https://api.openai.com/v1"),
            vision_api_key,
            vision_model: var_or("VISION_MODEL", "gpt-4.1"),
            reader_prompt: std::env::var("READER_PROMPT").ok(),
            parse_policy: parsed("EXTRACT_PARSE_MODE", ParsePolicy::Strict)?,
            meter_entity_id: var_or("METER_ENTITY_ID", "sensor.water_meter_reading"),
            write_mode: parsed("HA_WRITE_MODE", WriteMode::Sensor)?,
            switch_entity_id: std::env::var("SWITCH_ENTITY_ID").ok(),
            switch_on_delay: Duration::from_secs(parsed("SWITCH_ON_DELAY_SECONDS", 5)?),
            camera_settings,
            interval_minutes: parsed("READING_INTERVAL_MINUTES", 60)?,
            active_hours,
            max_reading_difference: parsed("MAX_READING_DIFFERENCE", 1000.0)?,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn required(key: &str) -> Result<String> {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| Error::Config(format!("{key} not set")))
}

fn parsed<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| Error::Config(format!("invalid {key}: {e}"))),
        Err(_) => Ok(default),
    }
}
