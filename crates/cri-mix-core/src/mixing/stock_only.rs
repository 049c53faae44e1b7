//! Undiluted stock at the rate that delivers the dose.

use crate::models::{DrawInstruction, StockOnlyPlan, StockOnlyRequest};

use super::{
    check_dose, check_duration, check_instruments, check_weight, delivered_dose, rate_for_dose, select_instrument,
    stock_concentration_mg_per_ml, MixError, MixResult,
};

/// Size a stock-only infusion: pump rate, bag volume and a single draw.
pub fn compute_stock_only_plan(request: &StockOnlyRequest<'_>) -> MixResult<StockOnlyPlan> {
    check_weight(request.weight_kg)?;
    check_dose(request.desired_dose)?;
    check_duration(request.desired_duration_hr)?;
    check_instruments(request.instruments)?;

    let stock = stock_concentration_mg_per_ml(request.medication)?;
    let unit = request.dose_unit;
    // Stock was checked positive, so a rate always exists.
    let rate = rate_for_dose(request.desired_dose, unit, request.weight_kg, stock).unwrap_or(0.0);
    let target_volume = rate * request.desired_duration_hr;

    let syringe = select_instrument(target_volume, request.instruments).ok_or(MixError::EmptyCatalog)?;
    let draw = DrawInstruction::new(syringe, syringe.snap(target_volume));

    Ok(StockOnlyPlan {
        stock_concentration_mg_per_ml: stock,
        pump_rate_ml_per_hr: rate,
        target_volume_ml: target_volume,
        draw,
        delivered_dose: delivered_dose(stock, rate, request.weight_kg, unit),
        dose_unit: unit,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_instruments;
    use crate::models::{Concentration, DoseRateUnit, Medication};

    #[test]
    fn test_lidocaine_stock_only() {
        // 2 mg/kg/hr × 10 kg = 20 mg/hr at 20 mg/mL → 1 mL/hr
        let lido = Medication::new("lidocaine-20", "Lidocaine", Concentration::mg_per_ml(20.0));
        let syringes = builtin_instruments();
        let request = StockOnlyRequest {
            weight_kg: 10.0,
            medication: &lido,
            desired_dose: 2.0,
            dose_unit: DoseRateUnit::MgPerKgPerHr,
            desired_duration_hr: 8.0,
            instruments: &syringes,
        };

        let plan = compute_stock_only_plan(&request).unwrap();
        assert!((plan.pump_rate_ml_per_hr - 1.0).abs() < 1e-12);
        assert!((plan.target_volume_ml - 8.0).abs() < 1e-12);
        assert_eq!(plan.draw.instrument.id, "12cc-0-2");
        assert!((plan.draw.volume_ml - 8.0).abs() < 1e-9);
        assert_eq!(plan.draw.fills, 1);
        assert!((plan.delivered_dose - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_dose_draws_nothing() {
        let lido = Medication::new("lidocaine-20", "Lidocaine", Concentration::mg_per_ml(20.0));
        let syringes = builtin_instruments();
        let request = StockOnlyRequest {
            weight_kg: 10.0,
            medication: &lido,
            desired_dose: 0.0,
            dose_unit: DoseRateUnit::McgPerKgPerMin,
            desired_duration_hr: 8.0,
            instruments: &syringes,
        };

        let plan = compute_stock_only_plan(&request).unwrap();
        assert_eq!(plan.pump_rate_ml_per_hr, 0.0);
        assert_eq!(plan.draw.volume_ml, 0.0);
        assert_eq!(plan.draw.fills, 0);
    }
}
