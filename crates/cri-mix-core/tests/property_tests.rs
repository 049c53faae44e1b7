//! Property-based tests for planner invariants.

use proptest::prelude::*;

use cri_mix_core::mixing::{dose_equivalents, STOCK_EXCESS_EPSILON};
use cri_mix_core::{
    builtin_instruments, builtin_medications, compute_mixture_plan, compute_multi_component_plan, Concentration,
    ConcentrationBand, DoseRateUnit, DrawInstruction, Medication, MixturePlan, MixtureRequest, MultiComponentRequest,
    ToleranceConfig,
};

// ============================================================================
// Generators
// ============================================================================

fn arb_unit() -> impl Strategy<Value = DoseRateUnit> {
    prop_oneof![
        Just(DoseRateUnit::MgPerKgPerHr),
        Just(DoseRateUnit::MgPerKgPerMin),
        Just(DoseRateUnit::MgPerKgPerDay),
        Just(DoseRateUnit::McgPerKgPerHr),
        Just(DoseRateUnit::McgPerKgPerMin),
    ]
}

/// Index into the built-in medication table.
fn arb_medication() -> impl Strategy<Value = usize> {
    0..builtin_medications().len()
}

/// (weight kg, dose, unit, rate mL/hr, duration hr)
fn arb_request_inputs() -> impl Strategy<Value = (f64, f64, DoseRateUnit, f64, f64)> {
    (0.5f64..80.0, 0.0f64..5.0, arb_unit(), 0.5f64..20.0, 0.5f64..24.0)
}

fn plan_for(med: &Medication, inputs: (f64, f64, DoseRateUnit, f64, f64)) -> MixturePlan {
    let syringes = builtin_instruments();
    let (weight, dose, unit, rate, duration) = inputs;
    let request = MixtureRequest::new(weight, med, dose, unit, rate, duration, &syringes);
    compute_mixture_plan(&request).unwrap()
}

fn on_tick(draw: &DrawInstruction) -> bool {
    let ticks = draw.volume_ml / draw.instrument.increment_ml;
    (ticks - ticks.round()).abs() < 1e-6
}

// ============================================================================
// Two-component plans
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_volumes_are_conserved(idx in arb_medication(), inputs in arb_request_inputs()) {
        let med = &builtin_medications()[idx];
        let plan = plan_for(med, inputs);

        let sum = plan.snapped_stock_volume_ml + plan.snapped_diluent_volume_ml;
        prop_assert!((sum - plan.final_total_volume_ml).abs() < 1e-9);
        prop_assert!(plan.snapped_stock_volume_ml >= 0.0);
        prop_assert!(plan.snapped_diluent_volume_ml >= 0.0);
    }

    #[test]
    fn prop_concentration_follows_volumes(idx in arb_medication(), inputs in arb_request_inputs()) {
        let med = &builtin_medications()[idx];
        let plan = plan_for(med, inputs);

        if plan.final_total_volume_ml > 0.0 {
            let expected = plan.stock_concentration_mg_per_ml
                * (plan.snapped_stock_volume_ml / plan.final_total_volume_ml);
            prop_assert!((plan.chosen_concentration_mg_per_ml - expected).abs() <= 1e-12 * expected.max(1.0));
        } else {
            prop_assert_eq!(plan.chosen_concentration_mg_per_ml, 0.0);
            prop_assert!(plan.mapped_rate_ml_per_hr.is_none());
        }
    }

    #[test]
    fn prop_target_never_exceeds_stock(idx in arb_medication(), inputs in arb_request_inputs()) {
        let med = &builtin_medications()[idx];
        let plan = plan_for(med, inputs);

        let stock = plan.stock_concentration_mg_per_ml;
        prop_assert!(plan.target_concentration_mg_per_ml <= stock + STOCK_EXCESS_EPSILON);
        prop_assert!(plan.chosen_concentration_mg_per_ml <= stock + STOCK_EXCESS_EPSILON);
        prop_assert_eq!(
            plan.feasible_at_desired_rate,
            plan.needed_concentration_mg_per_ml - stock <= STOCK_EXCESS_EPSILON
        );
    }

    #[test]
    fn prop_draws_match_volumes(idx in arb_medication(), inputs in arb_request_inputs()) {
        let med = &builtin_medications()[idx];
        let plan = plan_for(med, inputs);

        for draw in [&plan.stock_draw, &plan.diluent_draw] {
            let expected = (draw.volume_ml / draw.instrument.capacity_ml).ceil() as u32;
            prop_assert_eq!(draw.fills, expected);
            prop_assert!(on_tick(draw));
        }
        prop_assert_eq!(plan.stock_draw.volume_ml, plan.snapped_stock_volume_ml);
        prop_assert_eq!(plan.diluent_draw.volume_ml, plan.snapped_diluent_volume_ml);

        if !plan.used_fallback {
            prop_assert!(plan.stock_draw.fills <= 20);
            prop_assert!(plan.diluent_draw.fills <= 20);
        }
    }

    #[test]
    fn prop_planning_is_deterministic(idx in arb_medication(), inputs in arb_request_inputs()) {
        let med = &builtin_medications()[idx];
        let first = serde_json::to_string(&plan_for(med, inputs)).unwrap();
        let second = serde_json::to_string(&plan_for(med, inputs)).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_looser_tolerance_never_adds_warnings(idx in arb_medication(), inputs in arb_request_inputs()) {
        let med = &builtin_medications()[idx];
        let syringes = builtin_instruments();
        let (weight, dose, unit, rate, duration) = inputs;

        let mut strict = MixtureRequest::new(weight, med, dose, unit, rate, duration, &syringes);
        strict.tolerance = ToleranceConfig { concentration_pct: 0.0, total_volume_pct: 0.0 };
        let mut loose = strict.clone();
        loose.tolerance = ToleranceConfig { concentration_pct: 50.0, total_volume_pct: 50.0 };

        let strict_plan = compute_mixture_plan(&strict).unwrap();
        let loose_plan = compute_mixture_plan(&loose).unwrap();

        // Tolerances are informational: the volumes do not move.
        prop_assert_eq!(strict_plan.snapped_stock_volume_ml, loose_plan.snapped_stock_volume_ml);
        prop_assert_eq!(strict_plan.snapped_diluent_volume_ml, loose_plan.snapped_diluent_volume_ml);

        let count = |plan: &MixturePlan| {
            plan.warnings
                .iter()
                .filter(|w| w.contains("exceeds tolerance"))
                .count()
        };
        prop_assert!(count(&loose_plan) <= count(&strict_plan));
    }

    #[test]
    fn prop_dose_equivalents_round_trip(dose in 0.0f64..1000.0, unit in arb_unit()) {
        let canonical = unit.to_mg_per_kg_hr(dose);
        let back = unit.from_mg_per_kg_hr(canonical);
        prop_assert!((back - dose).abs() <= 1e-12 * dose.max(1.0));

        let equivalents = dose_equivalents(canonical);
        prop_assert_eq!(equivalents.len(), 5);
        let listed = equivalents.iter().find(|(u, _)| *u == unit).map(|(_, v)| *v);
        prop_assert!(listed.is_some());
        prop_assert!((listed.unwrap_or_default() - dose).abs() <= 1e-12 * dose.max(1.0));
    }
}

// ============================================================================
// Multi-component plans
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_banded_mixture_respects_band(
        weight in 2.0f64..60.0,
        dose_mcg_per_kg_min in 0.05f64..1.0,
        rate in 2.0f64..15.0,
        duration in 4.0f64..24.0,
    ) {
        let active = Medication::new("norepinephrine-1", "Norepinephrine", Concentration::mg_per_ml(1.0));
        let dextrose = Medication::new("dextrose-500", "Dextrose", Concentration::mg_per_ml(500.0));
        let syringes = builtin_instruments();
        let request = MultiComponentRequest::new(
            weight,
            &active,
            dose_mcg_per_kg_min,
            DoseRateUnit::McgPerKgPerMin,
            rate,
            duration,
            &dextrose,
            ConcentrationBand::from_percent(5.0, 0.25),
            &syringes,
        );

        let plan = compute_multi_component_plan(&request).unwrap();
        prop_assert_eq!(plan.feasible, plan.mixture.is_some());

        match &plan.mixture {
            Some(mixture) => {
                prop_assert!(plan.secondary_band.contains(mixture.secondary_concentration_mg_per_ml, 1e-6));
                let sum = mixture.active_volume_ml + mixture.secondary_volume_ml + mixture.filler_volume_ml;
                prop_assert!((sum - mixture.final_total_volume_ml).abs() < 1e-9);
                prop_assert_eq!(mixture.draws.len(), 3);
                for draw in &mixture.draws {
                    prop_assert!(on_tick(draw));
                }
            }
            None => prop_assert!(plan.draws().is_empty()),
        }
    }
}
