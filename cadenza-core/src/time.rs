//! Time and duration conversion utilities.
//!
//! Clock strings follow the player's `m:ss` display format.

use std::time::Duration;

/// Display helpers for Duration.
pub trait DurationExt {
    /// Format as a player clock, `m:ss` (minutes are not wrapped into hours).
    fn to_clock(&self) -> String;
}

impl DurationExt for Duration {
    fn to_clock(&self) -> String {
        let secs = self.as_secs();
        format!("{}:{:02}", secs / 60, secs % 60)
    }
}

/// Build a duration from fractional seconds reported by a media element.
///
/// Negative, NaN and infinite inputs map to `None`.
#[must_use]
pub fn duration_from_secs_f64(secs: f64) -> Option<Duration> {
    if secs.is_finite() && secs >= 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

/// Fraction of `total` covered by `position`, clamped to `0.0..=1.0`.
///
/// Returns `0.0` when the total is unknown or zero.
#[must_use]
pub fn progress_fraction(position: Duration, total: Option<Duration>) -> f64 {
    match total {
        Some(total) if !total.is_zero() => {
            (position.as_secs_f64() / total.as_secs_f64()).clamp(0.0, 1.0)
        }
        _ => 0.0,
    }
}
