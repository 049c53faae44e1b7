//! Unit normalization to mg/mL and mg/kg/hr.

use crate::models::{DoseRateUnit, Medication};

use super::{MixError, MixResult};

/// Stock strength in mg/mL. Fails if the labeled strength is not positive.
pub fn stock_concentration_mg_per_ml(medication: &Medication) -> MixResult<f64> {
    let conc = &medication.concentration;
    let mg_per_ml = conc.value * conc.units.to_mg_per_ml_factor();
    if mg_per_ml.is_finite() && mg_per_ml > 0.0 {
        Ok(mg_per_ml)
    } else {
        Err(MixError::NonPositiveStock {
            id: medication.id.clone(),
            value: conc.value,
        })
    }
}

/// Express a canonical mg/kg/hr dose in every supported unit.
///
/// Order follows [`DoseRateUnit::ALL`].
pub fn dose_equivalents(dose_mg_per_kg_hr: f64) -> Vec<(DoseRateUnit, f64)> {
    DoseRateUnit::ALL
        .iter()
        .map(|unit| (*unit, unit.from_mg_per_kg_hr(dose_mg_per_kg_hr)))
        .collect()
}

/// Dose delivered by `concentration` at `rate`, in `unit`.
///
/// Rearranged from `C = U·D·W / r`: `D = C·r / (U·W)`.
pub fn delivered_dose(concentration_mg_per_ml: f64, rate_ml_per_hr: f64, weight_kg: f64, unit: DoseRateUnit) -> f64 {
    (concentration_mg_per_ml * rate_ml_per_hr) / (unit.to_mg_per_kg_hr_factor() * weight_kg)
}

/// Rate at which `concentration` delivers `dose`; `None` for a zero concentration.
pub fn rate_for_dose(dose: f64, unit: DoseRateUnit, weight_kg: f64, concentration_mg_per_ml: f64) -> Option<f64> {
    if concentration_mg_per_ml > 0.0 {
        Some(unit.to_mg_per_kg_hr(dose) * weight_kg / concentration_mg_per_ml)
    } else {
        None
    }
}
