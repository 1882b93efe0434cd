//! Drift validation
//!
//! A water meter dial is monotonically non-decreasing, and one polling
//! interval can only plausibly consume so much water. A decrease or an
//! oversized jump indicates a misread (or a meter swap needing manual
//! intervention) and blocks publication.

use crate::error::{Error, Result};
use crate::models::MeterReading;

/// Check a new reading against the last accepted one.
///
/// A missing previous value passes: meters only ever increase, but the
/// system tolerates missing history.
pub fn validate_drift(
    new: MeterReading,
    previous: Option<MeterReading>,
    max_difference: f64,
) -> Result<()> {
    let Some(old) = previous else {
        return Ok(());
    };

    if new < old {
        return Err(Error::ReadingDecreased {
            old: old.value(),
            new: new.value(),
        });
    }

    let diff = new.value() - old.value();
    if diff > max_difference {
        return Err(Error::ReadingJumpTooLarge {
            diff,
            max: max_difference,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reading(value: f64) -> MeterReading {
        MeterReading::new(value).unwrap()
    }

    #[test]
    fn decreased_reading_rejected() {
        let err = validate_drift(reading(99.9), Some(reading(100.0)), 1000.0).unwrap_err();
        assert!(matches!(err, Error::ReadingDecreased { .. }));
    }

    #[test]
    fn oversized_jump_rejected() {
        let err = validate_drift(reading(1200.0), Some(reading(100.0)), 1000.0).unwrap_err();
        assert!(matches!(err, Error::ReadingJumpTooLarge { .. }));
    }

    #[test]
    fn plausible_increase_passes() {
        assert!(validate_drift(reading(150.0), Some(reading(100.0)), 1000.0).is_ok());
    }

    #[test]
    fn equal_reading_passes() {
        assert!(validate_drift(reading(100.0), Some(reading(100.0)), 1000.0).is_ok());
    }

    #[test]
    fn jump_exactly_at_limit_passes() {
        assert!(validate_drift(reading(1100.0), Some(reading(100.0)), 1000.0).is_ok());
    }

    #[test]
    fn missing_history_passes() {
        assert!(validate_drift(reading(123456.0), None, 1000.0).is_ok());
    }
}
