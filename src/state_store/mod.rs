//! StateStoreClient - Home Assistant state adapter
//!
//! ## Responsibilities
//!
//! - Read the previously published reading (`GET /api/states/<entity>`)
//! - Publish a new reading, either as a sensor state with attributes or
//!   through the `input_number.set_value` service
//!
//! The external store is authoritative: the previous value is re-read
//! every cycle, never cached in memory.

use crate::error::{Error, Result};
use crate::models::MeterReading;
use serde::Deserialize;
use serde_json::json;
use std::str::FromStr;
use std::time::Duration;

/// Longest raw model reply kept in the published attributes
const MAX_RAW_RESPONSE_CHARS: usize = 500;

/// Which Home Assistant write form to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// `POST /api/states/<entity>` with a state + attributes payload
    Sensor,
    /// `POST /api/services/input_number/set_value`
    InputNumber,
}

impl FromStr for WriteMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sensor" => Ok(WriteMode::Sensor),
            "input_number" => Ok(WriteMode::InputNumber),
            other => Err(format!("unknown write mode: {other}")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct EntityState {
    state: String,
}

/// Home Assistant API client
pub struct StateStoreClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
    entity_id: String,
    write_mode: WriteMode,
}

impl StateStoreClient {
    pub fn new(
        base_url: String,
        token: String,
        entity_id: String,
        write_mode: WriteMode,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            entity_id,
            write_mode,
        })
    }

    /// Fetch the last accepted reading from the store.
    ///
    /// Fails when the entity is missing or its state is not numeric
    /// (e.g. `unknown` on a fresh install); callers treat that as
    /// "no history" rather than a fatal condition.
    pub async fn last_reading(&self) -> Result<MeterReading> {
        let url = format!("{}/api/states/{}", self.base_url, self.entity_id);
        let resp = self
            .client
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(Error::Transport(format!(
                "state read for {} returned {}",
                self.entity_id,
                resp.status()
            )));
        }

        let entity: EntityState = resp.json().await?;
        let value: f64 = entity.state.parse().map_err(|_| {
            Error::Parse(format!(
                "state of {} is not numeric: {}",
                self.entity_id, entity.state
            ))
        })?;
        MeterReading::new(value)
    }

    /// Publish a new reading using the configured write form.
    pub async fn publish(&self, reading: MeterReading, raw_response: &str) -> Result<()> {
        let resp = match self.write_mode {
            WriteMode::Sensor => {
                let url = format!("{}/api/states/{}", self.base_url, self.entity_id);
                let body = json!({
                    "state": reading.to_string(),
                    "attributes": {
                        "unit_of_measurement": "m³",
                        "friendly_name": "Water Meter Reading",
                        "last_updated": chrono::Local::now().to_rfc3339(),
                        "model_response": truncate(raw_response, MAX_RAW_RESPONSE_CHARS),
                    }
                });
                self.client
                    .post(&url)
                    .bearer_auth(&self.token)
                    .json(&body)
                    .send()
                    .await?
            }
            WriteMode::InputNumber => {
                let url = format!("{}/api/services/input_number/set_value", self.base_url);
                let body = json!({
                    "entity_id": self.entity_id,
                    "value": reading.value(),
                });
                self.client
                    .post(&url)
                    .bearer_auth(&self.token)
                    .json(&body)
                    .send()
                    .await?
            }
        };

        if !resp.status().is_success() {
            return Err(Error::Transport(format!(
                "state write for {} returned {}",
                self.entity_id,
                resp.status()
            )));
        }

        tracing::info!(
            entity_id = %self.entity_id,
            reading = %reading,
            "reading published to state store"
        );
        Ok(())
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

impl crate::orchestrator::StateStorePort for StateStoreClient {
    async fn last_reading(&self) -> Result<MeterReading> {
        StateStoreClient::last_reading(self).await
    }

    async fn publish(&self, reading: MeterReading, raw_response: &str) -> Result<()> {
        StateStoreClient::publish(self, reading, raw_response).await
    }
}
