//! Shared domain types
//!
//! One cycle produces a `CaptureImage`, the extractor turns it into a
//! `MeterReading`, and the orchestrator reports a `CycleOutcome`.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use std::fmt;

/// A validated dial reading in cubic meters.
///
/// Non-negative, at most four fractional digits (the meter shows
/// 4 integer wheels + 4 decimal pointers).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct MeterReading(f64);

impl MeterReading {
    pub fn new(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(Error::Parse(format!("reading is not finite: {value}")));
        }
        if value < 0.0 {
            return Err(Error::Parse(format!("reading is negative: {value}")));
        }
        // Snap to the meter's 4-digit decimal resolution
        Ok(Self((value * 10_000.0).round() / 10_000.0))
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for MeterReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}", self.0)
    }
}

/// One captured frame. Owned by the cycle that captured it and dropped
/// as soon as the extractor has consumed it.
#[derive(Debug, Clone)]
pub struct CaptureImage {
    pub data: Vec<u8>,
    pub mime_type: &'static str,
}

impl CaptureImage {
    pub fn jpeg(data: Vec<u8>) -> Self {
        Self {
            data,
            mime_type: "image/jpeg",
        }
    }
}

/// Ordered camera configuration applied before each capture
/// (frame size, JPEG quality, mirror/flip, lamp intensity).
///
/// Fire-and-forget: each entry becomes one `/control?var=<k>&val=<v>`
/// request with no acknowledgement beyond HTTP success.
#[derive(Debug, Clone, Default)]
pub struct CameraSettings(IndexMap<String, String>);

impl CameraSettings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a `key=value,key=value` list (e.g. `framesize=9,quality=10`).
    pub fn parse(raw: &str) -> Result<Self> {
        let mut map = IndexMap::new();
        for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, value) = entry
                .split_once('=')
                .ok_or_else(|| Error::Config(format!("invalid camera setting: {entry}")))?;
            map.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(Self(map))
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Wall-clock window during which read cycles are permitted.
///
/// `start > end` means an overnight window, e.g. 22→6.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWindow {
    pub start: u32,
    pub end: u32,
}

impl ActiveWindow {
    pub fn new(start: u32, end: u32) -> Result<Self> {
        if start >= 24 || end >= 24 {
            return Err(Error::Config(format!(
                "active hours out of range: start={start} end={end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// Whether `hour` falls inside the window.
    pub fn contains(&self, hour: u32) -> bool {
        if self.start <= self.end {
            self.start <= hour && hour < self.end
        } else {
            hour >= self.start || hour < self.end
        }
    }
}

/// Result of one read cycle, used for logging only.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    Published(MeterReading),
    SkippedInactiveHours,
    SkippedCaptureFailed,
    SkippedExtractionFailed,
    SkippedValidationFailed(String),
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Published(reading) => write!(f, "published {reading}"),
            CycleOutcome::SkippedInactiveHours => write!(f, "skipped (inactive hours)"),
            CycleOutcome::SkippedCaptureFailed => write!(f, "skipped (capture failed)"),
            CycleOutcome::SkippedExtractionFailed => write!(f, "skipped (extraction failed)"),
            CycleOutcome::SkippedValidationFailed(reason) => {
                write!(f, "skipped (validation failed: {reason})")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_regular_bounds() {
        let window = ActiveWindow::new(6, 23).unwrap();
        assert!(!window.contains(5));
        assert!(window.contains(6));
        assert!(window.contains(22));
        assert!(!window.contains(23));
    }

    #[test]
    fn window_overnight_wraparound() {
        let window = ActiveWindow::new(22, 6).unwrap();
        assert!(window.contains(23));
        assert!(window.contains(22));
        assert!(window.contains(5));
        assert!(!window.contains(6));
        assert!(!window.contains(10));
    }

    #[test]
    fn window_rejects_out_of_range_hours() {
        assert!(ActiveWindow::new(24, 6).is_err());
        assert!(ActiveWindow::new(6, 24).is_err());
    }

    #[test]
    fn reading_rejects_negative_and_non_finite() {
        assert!(MeterReading::new(-0.1).is_err());
        assert!(MeterReading::new(f64::NAN).is_err());
        assert!(MeterReading::new(f64::INFINITY).is_err());
    }

    #[test]
    fn reading_snaps_to_four_decimals() {
        let reading = MeterReading::new(123.456_789).unwrap();
        assert_eq!(reading.value(), 123.4568);
        assert_eq!(reading.to_string(), "123.4568");
    }

    #[test]
    fn settings_parse_preserves_order() {
        let settings = CameraSettings::parse("framesize=9, quality=10,vflip=1").unwrap();
        let entries: Vec<_> = settings.iter().collect();
        assert_eq!(
            entries,
            vec![("framesize", "9"), ("quality", "10"), ("vflip", "1")]
        );
    }

    #[test]
    fn settings_parse_rejects_bare_key() {
        assert!(CameraSettings::parse("framesize").is_err());
    }
}
