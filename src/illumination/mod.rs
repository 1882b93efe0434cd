//! IlluminationController - meter lamp switch
//!
//! Toggles a Home Assistant switch entity before/after capture, for
//! cameras without an onboard light. One request per toggle, no retries.

use crate::error::{Error, Result};
use serde_json::json;
use std::time::Duration;

/// Home Assistant switch client
pub struct IlluminationController {
    client: reqwest::Client,
    base_url: String,
    token: String,
    entity_id: String,
}

impl IlluminationController {
    pub fn new(
        base_url: String,
        token: String,
        entity_id: String,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            entity_id,
        })
    }

    pub async fn turn_on(&self) -> Result<()> {
        self.call_service("turn_on").await
    }

    pub async fn turn_off(&self) -> Result<()> {
        self.call_service("turn_off").await
    }

    async fn call_service(&self, service: &str) -> Result<()> {
        let url = format!("{}/api/services/switch/{service}", self.base_url);
        let resp = self
            .client
            .post(&url)
            .bearer_auth(&self.token)
            .json(&json!({ "entity_id": self.entity_id }))
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Error::Transport(format!(
                "switch {service} failed for {}: {}",
                self.entity_id,
                resp.status()
            )));
        }

        tracing::info!(entity_id = %self.entity_id, service = service, "switch toggled");
        Ok(())
    }
}

impl crate::orchestrator::IlluminationPort for IlluminationController {
    async fn turn_on(&self) -> Result<()> {
        IlluminationController::turn_on(self).await
    }

    async fn turn_off(&self) -> Result<()> {
        IlluminationController::turn_off(self).await
    }
}
