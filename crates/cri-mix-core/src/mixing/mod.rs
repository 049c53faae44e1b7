//! Infusion mixing planner.
//!
//! Pipeline: Unit Normalization → Feasibility → Syringe Selection →
//! Tick-Snap Search (→ Fallback Rounding) → Tolerance Evaluation → Plan Assembly
//!
//! Every stage is a pure function of its inputs; identical requests produce
//! identical plans, tie-breaks included.

mod fallback;
mod feasibility;
mod multi;
mod planner;
mod search;
mod selector;
mod stock_only;
mod tolerance;
mod units;

pub use fallback::*;
pub use feasibility::*;
pub use multi::*;
pub use planner::*;
pub use search::*;
pub use selector::*;
pub use stock_only::*;
pub use tolerance::*;
pub use units::*;

use thiserror::Error;

use crate::models::{Instrument, ToleranceConfig};

/// Hard input errors. Soft conditions are plan warnings, never errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MixError {
    #[error("Patient weight must be positive, got {0} kg")]
    NonPositiveWeight(f64),

    #[error("Pump rate must be positive, got {0} mL/hr")]
    NonPositiveRate(f64),

    #[error("Planning rate must be positive when given, got {0} mL/hr")]
    NonPositivePlanningRate(f64),

    #[error("Infusion duration must be positive, got {0} hr")]
    NonPositiveDuration(f64),

    #[error("Dose must be a finite non-negative number, got {0}")]
    InvalidDose(f64),

    #[error("Stock concentration of {id} must be positive, got {value}")]
    NonPositiveStock { id: String, value: f64 },

    #[error("Instrument catalog is empty")]
    EmptyCatalog,

    #[error("Invalid instrument {id}: {reason}")]
    InvalidInstrument { id: String, reason: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid concentration band: {0}")]
    InvalidBand(String),
}

pub type MixResult<T> = Result<T, MixError>;

/// Allowed drift of objective weights from summing to 1.
const WEIGHT_SUM_SLACK: f64 = 1e-9;

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

pub(crate) fn check_weight(weight_kg: f64) -> MixResult<()> {
    if is_positive(weight_kg) {
        Ok(())
    } else {
        Err(MixError::NonPositiveWeight(weight_kg))
    }
}

pub(crate) fn check_rate(rate_ml_per_hr: f64) -> MixResult<()> {
    if is_positive(rate_ml_per_hr) {
        Ok(())
    } else {
        Err(MixError::NonPositiveRate(rate_ml_per_hr))
    }
}

pub(crate) fn check_duration(duration_hr: f64) -> MixResult<()> {
    if is_positive(duration_hr) {
        Ok(())
    } else {
        Err(MixError::NonPositiveDuration(duration_hr))
    }
}

pub(crate) fn check_dose(dose: f64) -> MixResult<()> {
    if dose.is_finite() && dose >= 0.0 {
        Ok(())
    } else {
        Err(MixError::InvalidDose(dose))
    }
}

/// Non-empty, and every instrument has a positive tick no larger than its barrel.
pub(crate) fn check_instruments(instruments: &[Instrument]) -> MixResult<()> {
    if instruments.is_empty() {
        return Err(MixError::EmptyCatalog);
    }
    for instrument in instruments {
        if let Some(reason) = instrument.defect() {
            return Err(MixError::InvalidInstrument {
                id: instrument.id.clone(),
                reason,
            });
        }
    }
    Ok(())
}

pub(crate) fn check_tolerance(tolerance: &ToleranceConfig) -> MixResult<()> {
    let ok = |pct: f64| pct.is_finite() && pct >= 0.0;
    if ok(tolerance.concentration_pct) && ok(tolerance.total_volume_pct) {
        Ok(())
    } else {
        Err(MixError::InvalidConfig(format!(
            "tolerances must be non-negative percentages, got {}% / {}%",
            tolerance.concentration_pct, tolerance.total_volume_pct
        )))
    }
}

/// Weights must be non-negative and sum to 1.
pub(crate) fn check_weights(weights: &[f64]) -> MixResult<()> {
    if weights.iter().any(|w| !(w.is_finite() && *w >= 0.0)) {
        return Err(MixError::InvalidConfig(format!(
            "search weights must be non-negative, got {:?}",
            weights
        )));
    }
    let sum: f64 = weights.iter().sum();
    if (sum - 1.0).abs() > WEIGHT_SUM_SLACK {
        return Err(MixError::InvalidConfig(format!(
            "search weights must sum to 1, got {}",
            sum
        )));
    }
    Ok(())
}
