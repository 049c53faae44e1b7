//! Measuring instrument (syringe) models.

use serde::{Deserialize, Serialize};

/// A syringe with discrete graduations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instrument {
    /// Stable slug, e.g. "3cc-0-1"
    pub id: String,
    /// Barrel capacity in mL (one full draw)
    pub capacity_ml: f64,
    /// Smallest graduation ("tick") in mL
    pub increment_ml: f64,
    /// Display label, e.g. "3 cc (0.1 mL ticks)"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Instrument {
    /// Create an instrument with required fields.
    pub fn new(id: impl Into<String>, capacity_ml: f64, increment_ml: f64) -> Self {
        Self {
            id: id.into(),
            capacity_ml,
            increment_ml,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Number of draws needed to measure `volume_ml`.
    pub fn fills_for(&self, volume_ml: f64) -> u32 {
        (volume_ml / self.capacity_ml).ceil().max(0.0) as u32
    }

    /// Volume of `ticks` graduations.
    pub fn volume_of(&self, ticks: i64) -> f64 {
        ticks as f64 * self.increment_ml
    }

    /// Round a volume to the nearest graduation.
    pub fn snap(&self, volume_ml: f64) -> f64 {
        (volume_ml / self.increment_ml).round() * self.increment_ml
    }

    /// Why this instrument cannot be used, if anything.
    pub fn defect(&self) -> Option<String> {
        if !(self.increment_ml.is_finite() && self.increment_ml > 0.0) {
            return Some(format!("increment must be positive, got {}", self.increment_ml));
        }
        if !(self.capacity_ml.is_finite() && self.capacity_ml >= self.increment_ml) {
            return Some(format!(
                "capacity {} mL is smaller than its increment {} mL",
                self.capacity_ml, self.increment_ml
            ));
        }
        None
    }
}
