// SPDX-License-Identifier: MIT OR Apache-2.0

//! Distance-to-confidence mapping.
//!
//! Squared L2 distances between normalized embeddings are turned into a
//! 0-100 similarity percentage using three piecewise-linear zones:
//!
//! | zone   | distance                  | percentage |
//! |--------|---------------------------|------------|
//! | High   | `d <= high`               | 100 .. 90  |
//! | Medium | `high < d < medium`       | 90 .. 60   |
//! | Low    | `d >= medium`             | 60 .. 30   |
//!
//! The low zone bottoms out at `medium + low_span` and stays at 30 beyond it.

use crate::errors::StartupError;

/// Confidence zone a distance falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    High,
    Medium,
    Low,
}

/// Distance cutoffs for the three confidence zones.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceZones {
    /// Upper bound (inclusive) of the high zone
    pub high: f64,
    /// Upper bound (exclusive) of the medium zone
    pub medium: f64,
    /// Width of the low zone before the score floors at 30
    pub low_span: f64,
}

impl ConfidenceZones {
    pub const DEFAULT: ConfidenceZones = ConfidenceZones {
        high: 0.3,
        medium: 1.0,
        low_span: 0.5,
    };

    /// Build zones from configured thresholds.
    pub fn new(high: f64, medium: f64, low_span: f64) -> Result<Self, StartupError> {
        let zones = Self {
            high,
            medium,
            low_span,
        };
        zones.validate()?;
        Ok(zones)
    }

    fn validate(&self) -> Result<(), StartupError> {
        if !(self.high.is_finite() && self.medium.is_finite() && self.low_span.is_finite()) {
            return Err(StartupError::InvalidScoring(
                "thresholds must be finite".to_string(),
            ));
        }
        if self.high <= 0.0 {
            return Err(StartupError::InvalidScoring(format!(
                "high_distance must be positive, got {}",
                self.high
            )));
        }
        if self.medium <= self.high {
            return Err(StartupError::InvalidScoring(format!(
                "medium_distance ({}) must exceed high_distance ({})",
                self.medium, self.high
            )));
        }
        if self.low_span <= 0.0 {
            return Err(StartupError::InvalidScoring(format!(
                "low_span must be positive, got {}",
                self.low_span
            )));
        }
        Ok(())
    }

    pub fn zone(&self, distance: f64) -> Zone {
        if distance <= self.high {
            Zone::High
        } else if distance < self.medium {
            Zone::Medium
        } else {
            Zone::Low
        }
    }

    /// Convert a raw distance into a similarity percentage in `[0, 100]`,
    /// rounded to two decimal places.
    pub fn score(&self, distance: f64) -> f64 {
        let percent = match self.zone(distance) {
            Zone::High => {
                let t = distance / self.high;
                90.0 + 10.0 * (1.0 - t)
            }
            Zone::Medium => {
                let t = (distance - self.high) / (self.medium - self.high);
                60.0 + 30.0 * (1.0 - t)
            }
            Zone::Low => {
                let t = ((distance - self.medium) / self.low_span).min(1.0);
                30.0 + 30.0 * (1.0 - t)
            }
        };

        round2(percent.clamp(0.0, 100.0))
    }
}

impl Default for ConfidenceZones {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Score a distance with the default zone thresholds.
pub fn score(distance: f64) -> f64 {
    ConfidenceZones::DEFAULT.score(distance)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
