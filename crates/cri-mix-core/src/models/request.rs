//! Planning requests and their tuning knobs.
//!
//! Requests borrow the medication and instrument catalog; the planner never
//! owns or mutates reference data.

use serde::{Deserialize, Serialize};

use super::{DoseRateUnit, Instrument, Medication};

/// Informational tolerance thresholds, in percent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToleranceConfig {
    /// Relative concentration error allowed before warning (default 1%)
    pub concentration_pct: f64,
    /// Relative total-volume error allowed before warning (default 5%)
    pub total_volume_pct: f64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            concentration_pct: 1.0,
            total_volume_pct: 5.0,
        }
    }
}

/// Objective weights of the two-component search. Must sum to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchWeights {
    pub concentration: f64,
    pub volume: f64,
}

impl Default for SearchWeights {
    fn default() -> Self {
        Self {
            concentration: 0.8,
            volume: 0.2,
        }
    }
}

/// Bounds of the two-component tick-snap search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SearchConfig {
    /// Maximum draws per liquid before a combination is rejected
    pub max_fills_per_liquid: u32,
    /// Stock ticks searched on each side of the estimated center
    pub half_width_ticks: u32,
    pub weights: SearchWeights,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_fills_per_liquid: 20,
            half_width_ticks: 400,
            weights: SearchWeights::default(),
        }
    }
}

/// A two-component (stock + diluent) infusion request.
#[derive(Debug, Clone)]
pub struct MixtureRequest<'a> {
    pub weight_kg: f64,
    pub medication: &'a Medication,
    pub desired_dose: f64,
    pub dose_unit: DoseRateUnit,
    /// Pump rate at which the mL/hr figure should equal the dose
    pub desired_rate_ml_per_hr: f64,
    pub desired_duration_hr: f64,
    pub instruments: &'a [Instrument],
    /// Rate used to size the bag; defaults to the desired rate
    pub planning_rate_ml_per_hr: Option<f64>,
    pub tolerance: ToleranceConfig,
    pub search: SearchConfig,
}

impl<'a> MixtureRequest<'a> {
    /// Create a request with default tolerances and search bounds.
    pub fn new(
        weight_kg: f64,
        medication: &'a Medication,
        desired_dose: f64,
        dose_unit: DoseRateUnit,
        desired_rate_ml_per_hr: f64,
        desired_duration_hr: f64,
        instruments: &'a [Instrument],
    ) -> Self {
        Self {
            weight_kg,
            medication,
            desired_dose,
            dose_unit,
            desired_rate_ml_per_hr,
            desired_duration_hr,
            instruments,
            planning_rate_ml_per_hr: None,
            tolerance: ToleranceConfig::default(),
            search: SearchConfig::default(),
        }
    }

    /// Rate used for bag sizing.
    pub fn planning_rate(&self) -> f64 {
        self.planning_rate_ml_per_hr
            .unwrap_or(self.desired_rate_ml_per_hr)
    }
}

/// Allowed final concentration of the secondary agent, in mg/mL.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConcentrationBand {
    pub target_mg_per_ml: f64,
    /// Half-width of the band
    pub tolerance_mg_per_ml: f64,
}

impl ConcentrationBand {
    pub fn new(target_mg_per_ml: f64, tolerance_mg_per_ml: f64) -> Self {
        Self {
            target_mg_per_ml,
            tolerance_mg_per_ml,
        }
    }

    /// Band expressed in percent w/v (1% = 10 mg/mL), e.g. 5% ± 0.25%.
    pub fn from_percent(target_pct: f64, tolerance_pct: f64) -> Self {
        Self::new(target_pct * 10.0, tolerance_pct * 10.0)
    }

    pub fn min_mg_per_ml(&self) -> f64 {
        self.target_mg_per_ml - self.tolerance_mg_per_ml
    }

    pub fn max_mg_per_ml(&self) -> f64 {
        self.target_mg_per_ml + self.tolerance_mg_per_ml
    }

    /// Membership with an absolute slack on both edges.
    pub fn contains(&self, mg_per_ml: f64, slack: f64) -> bool {
        mg_per_ml >= self.min_mg_per_ml() - slack && mg_per_ml <= self.max_mg_per_ml() + slack
    }
}

/// Objective weights of the multi-component search. Must sum to 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MultiSearchWeights {
    pub active: f64,
    pub secondary: f64,
    pub volume: f64,
}

impl Default for MultiSearchWeights {
    fn default() -> Self {
        Self {
            active: 0.6,
            secondary: 0.3,
            volume: 0.1,
        }
    }
}

/// Bounds of the multi-component search.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MultiSearchConfig {
    /// Draws per component above which an informational warning is added
    pub max_fills_per_component: u32,
    /// Hard cap on the half-width of each component window
    pub max_half_width_ticks: u32,
    /// Floor on the half-width of each component window
    pub min_half_width_ticks: u32,
    /// Half-width as a fraction of the component's center tick count
    pub half_width_fraction: f64,
    pub weights: MultiSearchWeights,
}

impl Default for MultiSearchConfig {
    fn default() -> Self {
        Self {
            max_fills_per_component: 20,
            max_half_width_ticks: 250,
            min_half_width_ticks: 3,
            half_width_fraction: 0.05,
            weights: MultiSearchWeights::default(),
        }
    }
}

/// Active drug + secondary agent + inert filler.
#[derive(Debug, Clone)]
pub struct MultiComponentRequest<'a> {
    pub weight_kg: f64,
    pub active: &'a Medication,
    pub desired_dose: f64,
    pub dose_unit: DoseRateUnit,
    pub desired_rate_ml_per_hr: f64,
    pub desired_duration_hr: f64,
    /// Secondary agent stock, e.g. 50% dextrose
    pub secondary: &'a Medication,
    pub secondary_band: ConcentrationBand,
    pub instruments: &'a [Instrument],
    pub tolerance: ToleranceConfig,
    pub search: MultiSearchConfig,
}

impl<'a> MultiComponentRequest<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        weight_kg: f64,
        active: &'a Medication,
        desired_dose: f64,
        dose_unit: DoseRateUnit,
        desired_rate_ml_per_hr: f64,
        desired_duration_hr: f64,
        secondary: &'a Medication,
        secondary_band: ConcentrationBand,
        instruments: &'a [Instrument],
    ) -> Self {
        Self {
            weight_kg,
            active,
            desired_dose,
            dose_unit,
            desired_rate_ml_per_hr,
            desired_duration_hr,
            secondary,
            secondary_band,
            instruments,
            tolerance: ToleranceConfig::default(),
            search: MultiSearchConfig::default(),
        }
    }
}

/// Undiluted stock run at whatever rate delivers the dose.
#[derive(Debug, Clone)]
pub struct StockOnlyRequest<'a> {
    pub weight_kg: f64,
    pub medication: &'a Medication,
    pub desired_dose: f64,
    pub dose_unit: DoseRateUnit,
    pub desired_duration_hr: f64,
    pub instruments: &'a [Instrument],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let search: SearchConfig = serde_json::from_str(r#"{"half_width_ticks": 50}"#).unwrap();
        assert_eq!(search.half_width_ticks, 50);
        assert_eq!(search.max_fills_per_liquid, 20);
        assert_eq!(search.weights, SearchWeights::default());

        let tolerance: ToleranceConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(tolerance, ToleranceConfig::default());
    }

    #[test]
    fn test_band_from_percent() {
        let band = ConcentrationBand::from_percent(5.0, 0.25);
        assert!((band.min_mg_per_ml() - 47.5).abs() < 1e-9);
        assert!((band.max_mg_per_ml() - 52.5).abs() < 1e-9);
        assert!(band.contains(52.5000001, 1e-6));
        assert!(!band.contains(53.0, 1e-6));
    }
}
