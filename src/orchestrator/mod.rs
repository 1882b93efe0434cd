//! ReadCycleOrchestrator - sequential read-cycle execution
//!
//! ## Responsibilities
//!
//! - Active-hours gate (zero outbound calls outside the window)
//! - Sequencing: lamp on → settings → capture → lamp off → extract →
//!   validate → publish
//! - Failure containment: every step error becomes a cycle-local
//!   [`CycleOutcome`]; a cycle never takes the process down
//! - Guaranteed lamp release: whenever the lamp was turned on, it is
//!   turned off exactly once, on every exit path
//!
//! The orchestrator consumes the leaf clients through port traits so
//! tests substitute in-process fakes.

use crate::error::Result;
use crate::extractor::ExtractedReading;
use crate::models::{ActiveWindow, CameraSettings, CaptureImage, CycleOutcome, MeterReading};
use chrono::Timelike;
use std::time::Duration;

/// Camera port: configure and capture.
#[allow(async_fn_in_trait)]
pub trait CameraPort {
    async fn apply_settings(&self, settings: &CameraSettings) -> Result<()>;
    async fn capture(&self) -> Result<CaptureImage>;
}

/// Meter lamp port.
#[allow(async_fn_in_trait)]
pub trait IlluminationPort {
    async fn turn_on(&self) -> Result<()>;
    async fn turn_off(&self) -> Result<()>;
}

/// Vision-inference port.
#[allow(async_fn_in_trait)]
pub trait ExtractorPort {
    async fn extract(&self, image: &CaptureImage) -> Result<ExtractedReading>;
}

/// State-store port: last accepted value in, new value out.
#[allow(async_fn_in_trait)]
pub trait StateStorePort {
    async fn last_reading(&self) -> Result<MeterReading>;
    async fn publish(&self, reading: MeterReading, raw_response: &str) -> Result<()>;
}

/// Read-cycle orchestrator
pub struct ReadCycleOrchestrator<C, I, E, S> {
    camera: C,
    illumination: Option<I>,
    extractor: E,
    state_store: S,
    settings: CameraSettings,
    window: ActiveWindow,
    max_difference: f64,
    stabilization_delay: Duration,
}

impl<C, I, E, S> ReadCycleOrchestrator<C, I, E, S>
where
    C: CameraPort,
    I: IlluminationPort,
    E: ExtractorPort,
    S: StateStorePort,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        camera: C,
        illumination: Option<I>,
        extractor: E,
        state_store: S,
        settings: CameraSettings,
        window: ActiveWindow,
        max_difference: f64,
        stabilization_delay: Duration,
    ) -> Self {
        Self {
            camera,
            illumination,
            extractor,
            state_store,
            settings,
            window,
            max_difference,
            stabilization_delay,
        }
    }

    /// Run one full read cycle at the current local hour.
    pub async fn run_cycle(&self) -> CycleOutcome {
        self.run_cycle_at(chrono::Local::now().hour()).await
    }

    /// Run one full read cycle as if the local hour were `hour`.
    pub async fn run_cycle_at(&self, hour: u32) -> CycleOutcome {
        if !self.window.contains(hour) {
            tracing::debug!(
                hour = hour,
                start = self.window.start,
                end = self.window.end,
                "outside active hours, skipping cycle"
            );
            return CycleOutcome::SkippedInactiveHours;
        }

        tracing::info!(hour = hour, "starting read cycle");

        // The store is authoritative; re-read every cycle, never cache.
        // Failure here is non-fatal: validation is skipped and the new
        // reading accepted unconditionally.
        let previous = match self.state_store.last_reading().await {
            Ok(reading) => Some(reading),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "previous reading unavailable, drift validation will be skipped"
                );
                None
            }
        };

        // Lamp on before exposure. Without light the image is unreadable,
        // so a failed turn-on ends the cycle as a capture failure.
        let lamp_engaged = match &self.illumination {
            Some(lamp) => {
                if let Err(e) = lamp.turn_on().await {
                    tracing::error!(error = %e, "failed to turn on illumination, aborting cycle");
                    return CycleOutcome::SkippedCaptureFailed;
                }
                tokio::time::sleep(self.stabilization_delay).await;
                true
            }
            None => false,
        };

        let capture_result = self.configure_and_capture().await;

        // Lamp off exactly once, regardless of how the capture went.
        if lamp_engaged {
            if let Some(lamp) = &self.illumination {
                if let Err(e) = lamp.turn_off().await {
                    tracing::error!(error = %e, "failed to turn off illumination");
                }
            }
        }

        let image = match capture_result {
            Ok(image) => image,
            Err(e) => {
                tracing::error!(error = %e, "capture failed");
                return CycleOutcome::SkippedCaptureFailed;
            }
        };

        let extracted = match self.extractor.extract(&image).await {
            Ok(extracted) => extracted,
            Err(e) => {
                tracing::warn!(error = %e, "could not extract reading from image");
                return CycleOutcome::SkippedExtractionFailed;
            }
        };
        drop(image);

        if let Err(e) =
            crate::validation::validate_drift(extracted.value, previous, self.max_difference)
        {
            tracing::warn!(
                reading = %extracted.value,
                error = %e,
                "reading failed drift validation, not publishing"
            );
            return CycleOutcome::SkippedValidationFailed(e.to_string());
        }

        // Publish errors end the cycle too; the next scheduled cycle is
        // the retry.
        if let Err(e) = self
            .state_store
            .publish(extracted.value, &extracted.raw_response)
            .await
        {
            tracing::error!(error = %e, "failed to publish reading");
        } else {
            tracing::info!(reading = %extracted.value, "read cycle complete");
        }

        CycleOutcome::Published(extracted.value)
    }

    async fn configure_and_capture(&self) -> Result<CaptureImage> {
        if !self.settings.is_empty() {
            // Fire-and-forget: a rejected setting is logged, not fatal.
            if let Err(e) = self.camera.apply_settings(&self.settings).await {
                tracing::warn!(error = %e, "failed to apply camera settings");
            }
        }
        self.camera.capture().await
    }
}
