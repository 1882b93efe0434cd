//! metervision
//!
//! Reads an analog water meter through a networked camera and a
//! vision-capable language model, then publishes the dial value to
//! Home Assistant.
//!
//! ## Components
//!
//! 1. CameraClient - settings + JPEG snapshot from the meter camera
//! 2. IlluminationController - optional meter lamp (HA switch)
//! 3. ReadingExtractor - vision inference + response parsing
//! 4. StateStoreClient - previous value in, new value out (HA API)
//! 5. ReadCycleOrchestrator - sequencing, gating, drift validation,
//!    failure containment
//! 6. Scheduler - one cycle at startup, then fixed-interval forever

pub mod camera_client;
pub mod config;
pub mod error;
pub mod extractor;
pub mod illumination;
pub mod models;
pub mod orchestrator;
pub mod scheduler;
pub mod state_store;
pub mod validation;

pub use error::{Error, Result};
