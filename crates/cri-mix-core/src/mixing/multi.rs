//! Three-component search: active drug + band-constrained secondary agent + filler.
//!
//! The active and secondary tick counts are searched over windows around
//! their raw volumes. For each pair, the filler range that keeps the
//! secondary agent inside its band is solved directly and a handful of filler
//! tick counts inside that range are tried. Band violations are rejected
//! outright; there is no rounding fallback, since any volumes outside the band
//! would be unsafe.

use crate::models::{
    ConcentrationBand, DrawInstruction, Instrument, MultiComponentPlan, MultiComponentRequest, MultiSearchConfig,
    SnappedMixture,
};

use super::planner::dose_range_warning;
use super::{
    check_dose, check_duration, check_instruments, check_rate, check_tolerance, check_weight, check_weights,
    delivered_dose, fill_warning, rate_for_dose, relative_error, select_instrument, solve_feasibility,
    stock_concentration_mg_per_ml, tolerance_warnings, MixError, MixResult,
};

/// Absolute slack (mg/mL) on the secondary band edges.
pub const BAND_SLACK_MG_PER_ML: f64 = 1e-6;

/// Largest accepted half-width cap for either searched component.
pub const MAX_BANDED_HALF_WIDTH_TICKS: u32 = 1_000;

/// Slack when comparing the solved filler bounds.
const FILLER_RANGE_SLACK_ML: f64 = 1e-9;

pub const NO_BANDED_MIXTURE_WARNING: &str =
    "Could not find volumes that meet the dose and secondary-agent band constraints with syringe increments.";

/// What the banded search is aiming for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandedTarget {
    pub active_stock_mg_per_ml: f64,
    pub active_target_mg_per_ml: f64,
    pub secondary_stock_mg_per_ml: f64,
    pub band: ConcentrationBand,
    pub target_total_volume_ml: f64,
}

/// One admissible three-way combination.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixtureCandidate {
    pub active_volume_ml: f64,
    pub secondary_volume_ml: f64,
    pub filler_volume_ml: f64,
    pub total_volume_ml: f64,
    pub active_mg_per_ml: f64,
    pub secondary_mg_per_ml: f64,
    pub active_error: f64,
    pub secondary_error: f64,
    pub volume_error: f64,
}

/// Banded search over one syringe per component.
pub struct BandedMixSearch<'a> {
    active_syringe: &'a Instrument,
    secondary_syringe: &'a Instrument,
    filler_syringe: &'a Instrument,
    config: &'a MultiSearchConfig,
}

impl<'a> BandedMixSearch<'a> {
    pub fn new(
        active_syringe: &'a Instrument,
        secondary_syringe: &'a Instrument,
        filler_syringe: &'a Instrument,
        config: &'a MultiSearchConfig,
    ) -> Self {
        Self {
            active_syringe,
            secondary_syringe,
            filler_syringe,
            config,
        }
    }

    /// Tick window around `raw_ml`, never starting below `floor`.
    pub fn window(&self, raw_ml: f64, syringe: &Instrument, floor: i64) -> (i64, i64) {
        let center = raw_ml / syringe.increment_ml;
        let proportional = (center * self.config.half_width_fraction).ceil() as i64;
        let span = proportional
            .max(i64::from(self.config.min_half_width_ticks))
            .min(i64::from(self.config.max_half_width_ticks));
        let mid = center.round() as i64;
        let start = mid.saturating_sub(span).max(floor);
        (start, mid.saturating_add(span).max(start))
    }

    /// Filler tick range keeping the secondary agent inside its band.
    fn filler_range(&self, active_ml: f64, secondary_ml: f64, target: &BandedTarget) -> Option<(i64, i64)> {
        let lower_ratio = target.band.min_mg_per_ml() / target.secondary_stock_mg_per_ml;
        let upper_ratio = target.band.max_mg_per_ml() / target.secondary_stock_mg_per_ml;

        let fixed = active_ml + secondary_ml;
        let min_filler = (secondary_ml / upper_ratio - fixed).max(0.0);
        let max_filler = (secondary_ml / lower_ratio - fixed).max(0.0);
        if min_filler > max_filler + FILLER_RANGE_SLACK_ML {
            return None;
        }

        let inc = self.filler_syringe.increment_ml;
        let lo = (min_filler / inc).ceil() as i64;
        let hi = (max_filler / inc).floor() as i64;
        (hi >= lo).then_some((lo, hi))
    }

    /// Filler ticks to try, in evaluation order, without repeats.
    fn filler_candidates(ideal_ticks: i64, lo: i64, hi: i64) -> Vec<i64> {
        let at = ideal_ticks.clamp(lo, hi);
        let mut ticks = Vec::with_capacity(5);
        for t in [at, at.saturating_sub(1).clamp(lo, hi), at.saturating_add(1).clamp(lo, hi), lo, hi] {
            if !ticks.contains(&t) {
                ticks.push(t);
            }
        }
        ticks
    }

    fn evaluate(&self, active_ml: f64, secondary_ml: f64, filler_ml: f64, target: &BandedTarget) -> Option<MixtureCandidate> {
        let total = active_ml + secondary_ml + filler_ml;
        if total <= 0.0 {
            return None;
        }
        let secondary_conc = target.secondary_stock_mg_per_ml * (secondary_ml / total);
        if !target.band.contains(secondary_conc, BAND_SLACK_MG_PER_ML) {
            return None;
        }
        let active_conc = target.active_stock_mg_per_ml * (active_ml / total);

        Some(MixtureCandidate {
            active_volume_ml: active_ml,
            secondary_volume_ml: secondary_ml,
            filler_volume_ml: filler_ml,
            total_volume_ml: total,
            active_mg_per_ml: active_conc,
            secondary_mg_per_ml: secondary_conc,
            active_error: relative_error(active_conc, target.active_target_mg_per_ml),
            secondary_error: relative_error(secondary_conc, target.band.target_mg_per_ml),
            volume_error: relative_error(total, target.target_total_volume_ml),
        })
    }

    fn score(&self, c: &MixtureCandidate) -> f64 {
        let w = &self.config.weights;
        w.active * c.active_error + w.secondary * c.secondary_error + w.volume * c.volume_error
    }

    /// Best band-respecting combination; earliest wins on exact ties.
    pub fn run(&self, raw_active_ml: f64, raw_secondary_ml: f64, target: &BandedTarget) -> Option<MixtureCandidate> {
        let (a_start, a_end) = self.window(raw_active_ml, self.active_syringe, 0);
        let (s_start, s_end) = self.window(raw_secondary_ml, self.secondary_syringe, 1);

        let mut best: Option<(f64, MixtureCandidate)> = None;
        let mut evaluated = 0usize;

        for a in a_start..=a_end {
            let active = self.active_syringe.volume_of(a);

            for s in s_start..=s_end {
                let secondary = self.secondary_syringe.volume_of(s);
                let Some((lo, hi)) = self.filler_range(active, secondary, target) else {
                    continue;
                };

                let remaining = target.target_total_volume_ml - active - secondary;
                let ideal = (remaining / self.filler_syringe.increment_ml).round() as i64;

                for f in Self::filler_candidates(ideal, lo, hi) {
                    let filler = self.filler_syringe.volume_of(f);
                    evaluated += 1;
                    let Some(candidate) = self.evaluate(active, secondary, filler, target) else {
                        continue;
                    };
                    let score = self.score(&candidate);
                    if best.map_or(true, |(best_score, _)| score < best_score) {
                        best = Some((score, candidate));
                    }
                }
            }
        }

        tracing::debug!(
            a_start,
            a_end,
            s_start,
            s_end,
            evaluated,
            best_score = best.map(|(s, _)| s),
            "banded mixture search finished"
        );

        best.map(|(_, candidate)| candidate)
    }
}

/// Compute an active + secondary + filler plan.
///
/// A plan without a mixture (`feasible == false`, no draws) is returned when
/// no combination keeps the secondary agent inside its band.
pub fn compute_multi_component_plan(request: &MultiComponentRequest<'_>) -> MixResult<MultiComponentPlan> {
    validate(request)?;

    let mut warnings = Vec::new();
    let weight = request.weight_kg;
    let desired_rate = request.desired_rate_ml_per_hr;
    let unit = request.dose_unit;

    let active_stock = stock_concentration_mg_per_ml(request.active)?;
    let secondary_stock = stock_concentration_mg_per_ml(request.secondary)?;
    if let Some(w) = dose_range_warning(request.active, unit.to_mg_per_kg_hr(request.desired_dose)) {
        warnings.push(w);
    }

    let feasibility = solve_feasibility(request.desired_dose, unit, weight, desired_rate, active_stock);
    if let Some(w) = feasibility.warning(desired_rate, request.desired_dose, unit) {
        warnings.push(w);
    }

    let target = BandedTarget {
        active_stock_mg_per_ml: active_stock,
        active_target_mg_per_ml: feasibility.target_mg_per_ml,
        secondary_stock_mg_per_ml: secondary_stock,
        band: request.secondary_band,
        target_total_volume_ml: desired_rate * request.desired_duration_hr,
    };
    let volume = target.target_total_volume_ml;
    let raw_active = (target.active_target_mg_per_ml / active_stock) * volume;
    let raw_secondary = (target.band.target_mg_per_ml / secondary_stock) * volume;
    let raw_filler = (volume - raw_active - raw_secondary).max(0.0);

    let pick = |ml: f64| select_instrument(ml, request.instruments).ok_or(MixError::EmptyCatalog);
    let active_syringe = pick(raw_active)?;
    let secondary_syringe = pick(raw_secondary)?;
    let filler_syringe = pick(raw_filler)?;

    let search = BandedMixSearch::new(active_syringe, secondary_syringe, filler_syringe, &request.search);
    let mixture = match search.run(raw_active, raw_secondary, &target) {
        Some(best) => {
            let max_fills = request.search.max_fills_per_component;
            let components = [
                (request.active.name.as_str(), best.active_volume_ml, active_syringe),
                (request.secondary.name.as_str(), best.secondary_volume_ml, secondary_syringe),
                ("Filler", best.filler_volume_ml, filler_syringe),
            ];
            for (name, ml, syringe) in components {
                warnings.extend(fill_warning(name, ml, syringe, max_fills));
            }
            warnings.extend(tolerance_warnings(
                (target.active_target_mg_per_ml > 0.0).then_some(best.active_error),
                best.volume_error,
                &request.tolerance,
            ));

            Some(SnappedMixture {
                active_volume_ml: best.active_volume_ml,
                secondary_volume_ml: best.secondary_volume_ml,
                filler_volume_ml: best.filler_volume_ml,
                final_total_volume_ml: best.total_volume_ml,
                active_concentration_mg_per_ml: best.active_mg_per_ml,
                secondary_concentration_mg_per_ml: best.secondary_mg_per_ml,
                delivered_dose_at_desired_rate: delivered_dose(best.active_mg_per_ml, desired_rate, weight, unit),
                delivered_duration_hr: best.total_volume_ml / desired_rate,
                mapped_rate_ml_per_hr: rate_for_dose(request.desired_dose, unit, weight, best.active_mg_per_ml),
                draws: components
                    .iter()
                    .map(|(_, ml, syringe)| DrawInstruction::new(syringe, *ml))
                    .collect(),
                rel_active_error_pct: best.active_error * 100.0,
                rel_secondary_error_pct: best.secondary_error * 100.0,
                rel_total_volume_error_pct: best.volume_error * 100.0,
            })
        }
        None => {
            tracing::warn!(
                band_min = target.band.min_mg_per_ml(),
                band_max = target.band.max_mg_per_ml(),
                "no mixture satisfies the secondary band"
            );
            warnings.push(NO_BANDED_MIXTURE_WARNING.to_string());
            None
        }
    };

    Ok(MultiComponentPlan {
        feasible: mixture.is_some(),
        feasible_at_desired_rate: feasibility.is_feasible(),
        warnings,
        needed_concentration_mg_per_ml: feasibility.needed_mg_per_ml,
        target_concentration_mg_per_ml: feasibility.target_mg_per_ml,
        active_stock_concentration_mg_per_ml: active_stock,
        secondary_stock_concentration_mg_per_ml: secondary_stock,
        secondary_band: request.secondary_band,
        desired_rate_ml_per_hr: desired_rate,
        dose_unit: unit,
        target_total_volume_ml: volume,
        raw_active_volume_ml: raw_active,
        raw_secondary_volume_ml: raw_secondary,
        raw_filler_volume_ml: raw_filler,
        mixture,
    })
}

fn validate(request: &MultiComponentRequest<'_>) -> MixResult<()> {
    check_weight(request.weight_kg)?;
    check_dose(request.desired_dose)?;
    check_rate(request.desired_rate_ml_per_hr)?;
    check_duration(request.desired_duration_hr)?;
    check_instruments(request.instruments)?;
    check_tolerance(&request.tolerance)?;

    let band = &request.secondary_band;
    if !(band.target_mg_per_ml.is_finite() && band.tolerance_mg_per_ml.is_finite()) {
        return Err(MixError::InvalidBand("band values must be finite".into()));
    }
    if band.tolerance_mg_per_ml < 0.0 {
        return Err(MixError::InvalidBand(format!(
            "tolerance must be non-negative, got {} mg/mL",
            band.tolerance_mg_per_ml
        )));
    }
    if band.min_mg_per_ml() <= 0.0 {
        return Err(MixError::InvalidBand(format!(
            "lower edge must be positive, got {} mg/mL",
            band.min_mg_per_ml()
        )));
    }

    let config = &request.search;
    if config.min_half_width_ticks > config.max_half_width_ticks {
        return Err(MixError::InvalidConfig(format!(
            "minimum half-width {} exceeds cap {}",
            config.min_half_width_ticks, config.max_half_width_ticks
        )));
    }
    if config.max_half_width_ticks > MAX_BANDED_HALF_WIDTH_TICKS {
        return Err(MixError::InvalidConfig(format!(
            "half-width cap {} exceeds {}",
            config.max_half_width_ticks, MAX_BANDED_HALF_WIDTH_TICKS
        )));
    }
    if !(config.half_width_fraction.is_finite() && config.half_width_fraction >= 0.0) {
        return Err(MixError::InvalidConfig(format!(
            "half-width fraction must be non-negative, got {}",
            config.half_width_fraction
        )));
    }
    let w = config.weights;
    check_weights(&[w.active, w.secondary, w.volume])
}
