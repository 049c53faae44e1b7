//! Two-component plan assembly.

use crate::models::{DrawInstruction, Medication, MixturePlan, MixtureRequest};

use super::{
    check_dose, check_duration, check_instruments, check_rate, check_tolerance, check_weight, check_weights,
    delivered_dose, fill_warning, rate_for_dose, round_to_increments, select_instrument, solve_feasibility,
    stock_concentration_mg_per_ml, tolerance_warnings, MixError, MixResult, SnapTarget, TickSnapSearch,
    FALLBACK_WARNING, MAX_HALF_WIDTH_TICKS,
};

/// Compute a stock + diluent mixing plan.
///
/// Hard input problems return `Err`; everything else (weak stock, fallback
/// rounding, tolerance or fill-count exceedance) is reported in
/// [`MixturePlan::warnings`].
pub fn compute_mixture_plan(request: &MixtureRequest<'_>) -> MixResult<MixturePlan> {
    validate(request)?;

    let mut warnings = Vec::new();
    let weight = request.weight_kg;
    let desired_rate = request.desired_rate_ml_per_hr;
    let unit = request.dose_unit;

    // 1) Normalize
    let stock_conc = stock_concentration_mg_per_ml(request.medication)?;
    if let Some(w) = dose_range_warning(request.medication, unit.to_mg_per_kg_hr(request.desired_dose)) {
        warnings.push(w);
    }

    // 2) Feasibility at the desired rate
    let feasibility = solve_feasibility(request.desired_dose, unit, weight, desired_rate, stock_conc);
    if let Some(w) = feasibility.warning(desired_rate, request.desired_dose, unit) {
        warnings.push(w);
    }

    // 3) Bag size and raw volumes
    let planning_rate = request.planning_rate();
    let target = SnapTarget {
        stock_mg_per_ml: stock_conc,
        target_mg_per_ml: feasibility.target_mg_per_ml,
        target_total_volume_ml: request.desired_duration_hr * planning_rate,
    };
    let raw_stock = target.ratio() * target.target_total_volume_ml;
    let raw_diluent = target.target_total_volume_ml - raw_stock;

    // 4) Syringes, chosen per liquid
    let stock_syringe = select_instrument(raw_stock, request.instruments).ok_or(MixError::EmptyCatalog)?;
    let diluent_syringe = select_instrument(raw_diluent, request.instruments).ok_or(MixError::EmptyCatalog)?;

    // 5) Snap to ticks
    let search = TickSnapSearch::new(stock_syringe, diluent_syringe, &request.search);
    let (snapped, used_fallback) = match search.run(&target) {
        Some(best) => (best, false),
        None => {
            warnings.push(FALLBACK_WARNING.to_string());
            (
                round_to_increments(raw_stock, stock_syringe, diluent_syringe, &target),
                true,
            )
        }
    };

    // 6) Informational checks
    let max_fills = request.search.max_fills_per_liquid;
    warnings.extend(fill_warning("Stock", snapped.stock_volume_ml, stock_syringe, max_fills));
    warnings.extend(fill_warning("Diluent", snapped.diluent_volume_ml, diluent_syringe, max_fills));
    warnings.extend(tolerance_warnings(
        (feasibility.target_mg_per_ml > 0.0).then_some(snapped.concentration_error),
        snapped.volume_error,
        &request.tolerance,
    ));

    // 7) Package
    let final_conc = snapped.concentration_mg_per_ml;
    Ok(MixturePlan {
        feasible_at_desired_rate: feasibility.is_feasible(),
        warnings,

        needed_concentration_mg_per_ml: feasibility.needed_mg_per_ml,
        target_concentration_mg_per_ml: feasibility.target_mg_per_ml,
        chosen_concentration_mg_per_ml: final_conc,
        stock_concentration_mg_per_ml: stock_conc,

        desired_rate_ml_per_hr: desired_rate,
        planning_rate_ml_per_hr: planning_rate,
        mapped_rate_ml_per_hr: rate_for_dose(request.desired_dose, unit, weight, final_conc),
        delivered_dose_at_desired_rate: delivered_dose(final_conc, desired_rate, weight, unit),
        dose_unit: unit,

        target_total_volume_ml: target.target_total_volume_ml,
        final_total_volume_ml: snapped.total_volume_ml,
        raw_stock_volume_ml: raw_stock,
        raw_diluent_volume_ml: raw_diluent,
        snapped_stock_volume_ml: snapped.stock_volume_ml,
        snapped_diluent_volume_ml: snapped.diluent_volume_ml,

        stock_draw: DrawInstruction::new(stock_syringe, snapped.stock_volume_ml),
        diluent_draw: DrawInstruction::new(diluent_syringe, snapped.diluent_volume_ml),

        rel_concentration_error_pct: snapped.concentration_error * 100.0,
        rel_total_volume_error_pct: snapped.volume_error * 100.0,
        used_fallback,
    })
}

fn validate(request: &MixtureRequest<'_>) -> MixResult<()> {
    check_weight(request.weight_kg)?;
    check_dose(request.desired_dose)?;
    check_rate(request.desired_rate_ml_per_hr)?;
    check_duration(request.desired_duration_hr)?;
    if let Some(rate) = request.planning_rate_ml_per_hr {
        if !(rate.is_finite() && rate > 0.0) {
            return Err(MixError::NonPositivePlanningRate(rate));
        }
    }
    check_instruments(request.instruments)?;
    check_tolerance(&request.tolerance)?;
    if request.search.max_fills_per_liquid == 0 {
        return Err(MixError::InvalidConfig("max fills per liquid must be at least 1".into()));
    }
    if request.search.half_width_ticks > MAX_HALF_WIDTH_TICKS {
        return Err(MixError::InvalidConfig(format!(
            "search half-width {} exceeds cap {}",
            request.search.half_width_ticks, MAX_HALF_WIDTH_TICKS
        )));
    }
    let weights = request.search.weights;
    check_weights(&[weights.concentration, weights.volume])
}

/// Informational warning when a dose is outside the medication's CRI range.
pub(crate) fn dose_range_warning(medication: &Medication, dose_mg_per_kg_hr: f64) -> Option<String> {
    match (medication.is_dose_in_range(dose_mg_per_kg_hr), medication.cri_dose_range) {
        (Some(false), Some(range)) => Some(format!(
            "Dose {:.4} mg/kg/hr is outside the usual {} CRI range of {}-{} mg/kg/hr.",
            dose_mg_per_kg_hr, medication.name, range.min_mg_per_kg_hr, range.max_mg_per_kg_hr
        )),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_instruments;
    use crate::models::{Concentration, DoseRateUnit, Instrument};

    fn norepi() -> Medication {
        Medication::new("norepinephrine-1", "Norepinephrine", Concentration::mg_per_ml(1.0))
    }

    #[test]
    fn test_hard_errors_are_distinguishable() {
        let med = norepi();
        let syringes = builtin_instruments();

        let mut request = MixtureRequest::new(0.0, &med, 0.1, DoseRateUnit::MgPerKgPerHr, 5.0, 2.0, &syringes);
        assert_eq!(compute_mixture_plan(&request), Err(MixError::NonPositiveWeight(0.0)));

        request.weight_kg = 10.0;
        request.desired_rate_ml_per_hr = 0.0;
        assert_eq!(compute_mixture_plan(&request), Err(MixError::NonPositiveRate(0.0)));

        request.desired_rate_ml_per_hr = 5.0;
        request.planning_rate_ml_per_hr = Some(-1.0);
        assert_eq!(
            compute_mixture_plan(&request),
            Err(MixError::NonPositivePlanningRate(-1.0))
        );

        let empty: Vec<Instrument> = Vec::new();
        let request = MixtureRequest::new(10.0, &med, 0.1, DoseRateUnit::MgPerKgPerHr, 5.0, 2.0, &empty);
        assert_eq!(compute_mixture_plan(&request), Err(MixError::EmptyCatalog));
    }

    #[test]
    fn test_bad_weights_rejected() {
        let med = norepi();
        let syringes = builtin_instruments();
        let mut request = MixtureRequest::new(10.0, &med, 0.1, DoseRateUnit::MgPerKgPerHr, 5.0, 2.0, &syringes);
        request.search.weights.volume = 0.5;
        assert!(matches!(compute_mixture_plan(&request), Err(MixError::InvalidConfig(_))));
    }

    #[test]
    fn test_search_width_is_capped() {
        let med = norepi();
        let syringes = builtin_instruments();
        let mut request = MixtureRequest::new(10.0, &med, 0.1, DoseRateUnit::MgPerKgPerHr, 5.0, 2.0, &syringes);

        request.search.half_width_ticks = MAX_HALF_WIDTH_TICKS;
        assert!(compute_mixture_plan(&request).is_ok());

        request.search.half_width_ticks = u32::MAX;
        assert!(matches!(compute_mixture_plan(&request), Err(MixError::InvalidConfig(_))));
    }

    #[test]
    fn test_planning_rate_sizes_bag() {
        let med = norepi();
        let syringes = builtin_instruments();
        let mut request = MixtureRequest::new(10.0, &med, 0.1, DoseRateUnit::MgPerKgPerHr, 5.0, 2.0, &syringes);
        request.planning_rate_ml_per_hr = Some(10.0);

        let plan = compute_mixture_plan(&request).unwrap();
        assert_eq!(plan.planning_rate_ml_per_hr, 10.0);
        assert!((plan.target_total_volume_ml - 20.0).abs() < 1e-9);
        // Concentration still tracks the desired rate, not the planning rate.
        assert!((plan.target_concentration_mg_per_ml - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_dose_outside_range_is_flagged() {
        let med = norepi().with_cri_dose_range(0.003, 0.06);
        let syringes = builtin_instruments();
        let request = MixtureRequest::new(10.0, &med, 0.1, DoseRateUnit::MgPerKgPerHr, 5.0, 2.0, &syringes);

        let plan = compute_mixture_plan(&request).unwrap();
        assert!(plan.warnings[0].contains("outside the usual Norepinephrine CRI range"));
        assert!(plan.feasible_at_desired_rate);
    }
}
