//! CameraClient - snapshot capture from the meter camera
//!
//! ## Responsibilities
//!
//! - Apply camera settings one key at a time (`GET /control?var=<k>&val=<v>`)
//! - Fetch a single JPEG snapshot (`GET /capture`)
//!
//! Stateless request/response wrapper; no retries. The orchestrator owns
//! retry policy across whole cycles.

use crate::error::{Error, Result};
use crate::models::{CameraSettings, CaptureImage};
use std::time::Duration;

/// JPEG start-of-image marker
const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];

/// Camera HTTP client
pub struct CameraClient {
    client: reqwest::Client,
    base_url: String,
}

impl CameraClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Apply every configured setting, in order. Fire-and-forget: any
    /// success status counts as applied.
    pub async fn apply_settings(&self, settings: &CameraSettings) -> Result<()> {
        let url = format!("{}/control", self.base_url);
        for (key, value) in settings.iter() {
            let resp = self
                .client
                .get(&url)
                .query(&[("var", key), ("val", value)])
                .send()
                .await?;

            if !resp.status().is_success() {
                return Err(Error::Transport(format!(
                    "camera rejected setting {key}={value}: {}",
                    resp.status()
                )));
            }

            tracing::debug!(key = key, value = value, "camera setting applied");
        }
        Ok(())
    }

    /// Fetch one snapshot and verify it is a JPEG.
    pub async fn capture(&self) -> Result<CaptureImage> {
        let url = format!("{}/capture", self.base_url);
        let resp = self.client.get(&url).send().await?;

        if !resp.status().is_success() {
            return Err(Error::Capture(format!(
                "camera returned {}",
                resp.status()
            )));
        }

        let data = resp.bytes().await?.to_vec();
        if !is_jpeg(&data) {
            return Err(Error::Capture(format!(
                "response is not a JPEG ({} bytes)",
                data.len()
            )));
        }

        tracing::debug!(size = data.len(), "image captured");
        Ok(CaptureImage::jpeg(data))
    }
}

impl crate::orchestrator::CameraPort for CameraClient {
    async fn apply_settings(&self, settings: &CameraSettings) -> Result<()> {
        CameraClient::apply_settings(self, settings).await
    }

    async fn capture(&self) -> Result<CaptureImage> {
        CameraClient::capture(self).await
    }
}

fn is_jpeg(data: &[u8]) -> bool {
    data.len() > 2 && data[..2] == JPEG_SOI
}
