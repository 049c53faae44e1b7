//! Mixing plans returned to the caller.
//!
//! Plans are built once per request and never retained by the planner.

use serde::{Deserialize, Serialize};

use super::{ConcentrationBand, DoseRateUnit, Instrument};

/// How to measure one liquid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DrawInstruction {
    pub instrument: Instrument,
    pub volume_ml: f64,
    /// ceil(volume / capacity)
    pub fills: u32,
}

impl DrawInstruction {
    pub fn new(instrument: &Instrument, volume_ml: f64) -> Self {
        Self {
            instrument: instrument.clone(),
            volume_ml,
            fills: instrument.fills_for(volume_ml),
        }
    }
}

/// Two-component (stock + diluent) mixing plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MixturePlan {
    /// False when stock is too weak to dilute for the desired rate
    pub feasible_at_desired_rate: bool,
    /// Non-fatal findings, in the order they were raised
    pub warnings: Vec<String>,

    pub needed_concentration_mg_per_ml: f64,
    /// Needed concentration capped at stock strength
    pub target_concentration_mg_per_ml: f64,
    /// Concentration actually produced by the snapped volumes
    pub chosen_concentration_mg_per_ml: f64,
    pub stock_concentration_mg_per_ml: f64,

    pub desired_rate_ml_per_hr: f64,
    pub planning_rate_ml_per_hr: f64,
    /// Rate that delivers the requested dose at the chosen concentration
    pub mapped_rate_ml_per_hr: Option<f64>,
    /// Dose delivered at the desired rate, in `dose_unit`
    pub delivered_dose_at_desired_rate: f64,
    pub dose_unit: DoseRateUnit,

    pub target_total_volume_ml: f64,
    pub final_total_volume_ml: f64,
    pub raw_stock_volume_ml: f64,
    pub raw_diluent_volume_ml: f64,
    pub snapped_stock_volume_ml: f64,
    pub snapped_diluent_volume_ml: f64,

    pub stock_draw: DrawInstruction,
    pub diluent_draw: DrawInstruction,

    pub rel_concentration_error_pct: f64,
    pub rel_total_volume_error_pct: f64,
    /// True when the search found nothing and plain rounding was used
    pub used_fallback: bool,
}

/// Snapped volumes of a three-component mixture.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SnappedMixture {
    pub active_volume_ml: f64,
    pub secondary_volume_ml: f64,
    pub filler_volume_ml: f64,
    pub final_total_volume_ml: f64,

    pub active_concentration_mg_per_ml: f64,
    pub secondary_concentration_mg_per_ml: f64,

    /// In the request's dose unit
    pub delivered_dose_at_desired_rate: f64,
    /// How long the bag lasts at the desired rate
    pub delivered_duration_hr: f64,
    pub mapped_rate_ml_per_hr: Option<f64>,

    /// Active, secondary, filler
    pub draws: Vec<DrawInstruction>,

    pub rel_active_error_pct: f64,
    pub rel_secondary_error_pct: f64,
    pub rel_total_volume_error_pct: f64,
}

/// Active drug + secondary agent + filler plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MultiComponentPlan {
    /// True when a mixture inside the secondary band was found
    pub feasible: bool,
    pub feasible_at_desired_rate: bool,
    pub warnings: Vec<String>,

    pub needed_concentration_mg_per_ml: f64,
    pub target_concentration_mg_per_ml: f64,
    pub active_stock_concentration_mg_per_ml: f64,
    pub secondary_stock_concentration_mg_per_ml: f64,
    pub secondary_band: ConcentrationBand,

    pub desired_rate_ml_per_hr: f64,
    pub dose_unit: DoseRateUnit,
    pub target_total_volume_ml: f64,
    pub raw_active_volume_ml: f64,
    pub raw_secondary_volume_ml: f64,
    pub raw_filler_volume_ml: f64,

    /// Absent when no combination satisfies the band
    pub mixture: Option<SnappedMixture>,
}

impl MultiComponentPlan {
    /// Draws to perform; empty when there is no mixture.
    pub fn draws(&self) -> &[DrawInstruction] {
        self.mixture
            .as_ref()
            .map(|m| m.draws.as_slice())
            .unwrap_or(&[])
    }
}

/// Undiluted-stock plan.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockOnlyPlan {
    pub stock_concentration_mg_per_ml: f64,
    /// Rate that delivers the dose with full-strength stock
    pub pump_rate_ml_per_hr: f64,
    pub target_volume_ml: f64,
    pub draw: DrawInstruction,
    /// Dose delivered at `pump_rate_ml_per_hr`, in `dose_unit`
    pub delivered_dose: f64,
    pub dose_unit: DoseRateUnit,
}
