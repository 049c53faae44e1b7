//! Concentration needed for the pump rate to equal the dose.

use crate::models::DoseRateUnit;

/// Slack before needed concentration counts as stronger than stock.
pub const STOCK_EXCESS_EPSILON: f64 = 1e-9;

/// Outcome of the feasibility check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Feasibility {
    /// `U·D·W / r` at the desired rate
    pub needed_mg_per_ml: f64,
    /// Needed concentration, capped at stock strength
    pub target_mg_per_ml: f64,
    /// Rate that delivers the dose with undiluted stock; set only when capped
    pub mapped_rate_ml_per_hr: Option<f64>,
}

impl Feasibility {
    pub fn is_feasible(&self) -> bool {
        self.mapped_rate_ml_per_hr.is_none()
    }

    /// Warning text for a capped target, if any.
    pub fn warning(&self, desired_rate_ml_per_hr: f64, dose: f64, unit: DoseRateUnit) -> Option<String> {
        self.mapped_rate_ml_per_hr.map(|r_map| {
            format!(
                "Stock too weak to achieve mapping at {} mL/hr. Use {:.3} mL/hr for {} {} instead, or get stronger stock.",
                desired_rate_ml_per_hr, r_map, dose, unit
            )
        })
    }
}

/// Solve for the target concentration.
///
/// Inputs are assumed validated: positive weight, rate and stock.
pub fn solve_feasibility(
    dose: f64,
    unit: DoseRateUnit,
    weight_kg: f64,
    desired_rate_ml_per_hr: f64,
    stock_mg_per_ml: f64,
) -> Feasibility {
    let mass_rate = unit.to_mg_per_kg_hr(dose) * weight_kg;
    let needed = mass_rate / desired_rate_ml_per_hr;

    if needed - stock_mg_per_ml > STOCK_EXCESS_EPSILON {
        Feasibility {
            needed_mg_per_ml: needed,
            target_mg_per_ml: stock_mg_per_ml,
            mapped_rate_ml_per_hr: Some(mass_rate / stock_mg_per_ml),
        }
    } else {
        Feasibility {
            needed_mg_per_ml: needed,
            target_mg_per_ml: needed,
            mapped_rate_ml_per_hr: None,
        }
    }
}
