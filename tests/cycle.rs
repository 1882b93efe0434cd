//! Full read-cycle integration tests over in-process fakes.
//!
//! The fakes implement the orchestrator port traits and record every
//! call into a shared journal, so the tests can assert both the outcome
//! and the exact step sequence of a cycle.

use metervision::error::{Error, Result};
use metervision::extractor::{parse_response, ExtractedReading, ParsePolicy};
use metervision::models::{
    ActiveWindow, CameraSettings, CaptureImage, CycleOutcome, MeterReading,
};
use metervision::orchestrator::{
    CameraPort, ExtractorPort, IlluminationPort, ReadCycleOrchestrator, StateStorePort,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Journal = Arc<Mutex<Vec<String>>>;

fn record(journal: &Journal, step: &str) {
    journal.lock().unwrap().push(step.to_string());
}

struct FakeCamera {
    journal: Journal,
}

impl CameraPort for FakeCamera {
    async fn apply_settings(&self, _settings: &CameraSettings) -> Result<()> {
        record(&self.journal, "settings");
        Ok(())
    }

    async fn capture(&self) -> Result<CaptureImage> {
        record(&self.journal, "capture");
        Ok(CaptureImage::jpeg(vec![0xFF, 0xD8, 0xFF, 0xE0]))
    }
}

struct FakeLamp {
    journal: Journal,
}

impl IlluminationPort for FakeLamp {
    async fn turn_on(&self) -> Result<()> {
        record(&self.journal, "lamp_on");
        Ok(())
    }

    async fn turn_off(&self) -> Result<()> {
        record(&self.journal, "lamp_off");
        Ok(())
    }
}

/// Plays back a canned model reply through the real response parser.
struct FakeVision {
    journal: Journal,
    reply: String,
    policy: ParsePolicy,
}

impl ExtractorPort for FakeVision {
    async fn extract(&self, _image: &CaptureImage) -> Result<ExtractedReading> {
        record(&self.journal, "extract");
        let value = parse_response(self.policy, &self.reply)?;
        Ok(ExtractedReading {
            value,
            raw_response: self.reply.clone(),
        })
    }
}

struct FakeStore {
    journal: Journal,
    previous: Option<f64>,
    published: Arc<Mutex<Vec<f64>>>,
}

impl StateStorePort for FakeStore {
    async fn last_reading(&self) -> Result<MeterReading> {
        record(&self.journal, "read_previous");
        match self.previous {
            Some(value) => MeterReading::new(value),
            None => Err(Error::Transport("entity not found".to_string())),
        }
    }

    async fn publish(&self, reading: MeterReading, _raw_response: &str) -> Result<()> {
        record(&self.journal, "publish");
        self.published.lock().unwrap().push(reading.value());
        Ok(())
    }
}

struct Harness {
    journal: Journal,
    published: Arc<Mutex<Vec<f64>>>,
    orchestrator: ReadCycleOrchestrator<FakeCamera, FakeLamp, FakeVision, FakeStore>,
}

fn harness(
    reply: &str,
    policy: ParsePolicy,
    previous: Option<f64>,
    window: ActiveWindow,
) -> Harness {
    let journal: Journal = Arc::new(Mutex::new(Vec::new()));
    let published = Arc::new(Mutex::new(Vec::new()));

    let mut settings = CameraSettings::new();
    settings.set("framesize", "9");
    settings.set("quality", "10");

    let orchestrator = ReadCycleOrchestrator::new(
        FakeCamera {
            journal: journal.clone(),
        },
        Some(FakeLamp {
            journal: journal.clone(),
        }),
        FakeVision {
            journal: journal.clone(),
            reply: reply.to_string(),
            policy,
        },
        FakeStore {
            journal: journal.clone(),
            previous,
            published: published.clone(),
        },
        settings,
        window,
        1000.0,
        Duration::ZERO,
    );

    Harness {
        journal,
        published,
        orchestrator,
    }
}

fn daytime() -> ActiveWindow {
    ActiveWindow::new(6, 23).unwrap()
}

#[tokio::test]
async fn successful_cycle_runs_steps_in_order() {
    let h = harness("0053.2000", ParsePolicy::Strict, Some(50.0), daytime());
    let outcome = h.orchestrator.run_cycle_at(12).await;

    assert_eq!(
        outcome,
        CycleOutcome::Published(MeterReading::new(53.2).unwrap())
    );
    assert_eq!(*h.published.lock().unwrap(), vec![53.2]);
    assert_eq!(
        *h.journal.lock().unwrap(),
        vec![
            "read_previous",
            "lamp_on",
            "settings",
            "capture",
            "lamp_off",
            "extract",
            "publish"
        ]
    );
}

#[tokio::test]
async fn lenient_reply_with_labels_publishes() {
    let h = harness(
        "Reading: 0123.4567 m3\nUnit: m3\nConfidence: high",
        ParsePolicy::Lenient,
        Some(100.0),
        daytime(),
    );
    let outcome = h.orchestrator.run_cycle_at(12).await;

    assert_eq!(
        outcome,
        CycleOutcome::Published(MeterReading::new(123.4567).unwrap())
    );
}

#[tokio::test]
async fn sentinel_reply_skips_publication_but_releases_lamp() {
    let h = harness(
        "ERROR: glare across the dial",
        ParsePolicy::Strict,
        Some(50.0),
        daytime(),
    );
    let outcome = h.orchestrator.run_cycle_at(12).await;

    assert_eq!(outcome, CycleOutcome::SkippedExtractionFailed);
    assert!(h.published.lock().unwrap().is_empty());

    let journal = h.journal.lock().unwrap();
    assert_eq!(journal.iter().filter(|s| *s == "lamp_on").count(), 1);
    assert_eq!(journal.iter().filter(|s| *s == "lamp_off").count(), 1);
    assert!(!journal.iter().any(|s| s == "publish"));
}

#[tokio::test]
async fn decreased_reading_is_validation_failure() {
    let h = harness("0099.9000", ParsePolicy::Strict, Some(100.0), daytime());
    let outcome = h.orchestrator.run_cycle_at(12).await;

    assert!(matches!(outcome, CycleOutcome::SkippedValidationFailed(_)));
    assert!(h.published.lock().unwrap().is_empty());
}

#[tokio::test]
async fn missing_history_still_publishes() {
    let h = harness("2000.0000", ParsePolicy::Strict, None, daytime());
    let outcome = h.orchestrator.run_cycle_at(12).await;

    assert_eq!(
        outcome,
        CycleOutcome::Published(MeterReading::new(2000.0).unwrap())
    );
    assert_eq!(*h.published.lock().unwrap(), vec![2000.0]);
}

#[tokio::test]
async fn overnight_window_allows_night_cycles() {
    let window = ActiveWindow::new(22, 6).unwrap();

    let h = harness("0053.2000", ParsePolicy::Strict, Some(50.0), window);
    assert!(matches!(
        h.orchestrator.run_cycle_at(23).await,
        CycleOutcome::Published(_)
    ));

    let h = harness("0053.2000", ParsePolicy::Strict, Some(50.0), window);
    assert!(matches!(
        h.orchestrator.run_cycle_at(5).await,
        CycleOutcome::Published(_)
    ));

    let h = harness("0053.2000", ParsePolicy::Strict, Some(50.0), window);
    assert_eq!(
        h.orchestrator.run_cycle_at(10).await,
        CycleOutcome::SkippedInactiveHours
    );
    assert!(h.journal.lock().unwrap().is_empty());
}
