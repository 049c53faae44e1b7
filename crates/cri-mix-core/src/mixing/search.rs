//! Tick-snap search over syringe graduations.
//!
//! Candidates are parametrized by `m`, the number of stock ticks. For each `m`
//! the ideal total follows from the stock/total ratio; the diluent is snapped
//! to its own ticks and the five nearest tick counts are scored.
//!
//! Evaluation order is ascending `m`, then ascending diluent offset, and only
//! a strictly better score replaces the incumbent, so the earliest of equally
//! scored candidates wins. Cost is bounded by `(2W + 1) × 5` evaluations.

use crate::models::{Instrument, SearchConfig, SearchWeights};

use super::relative_error;

/// Diluent tick offsets tried around the ideal tick count.
pub const DILUENT_OFFSETS: std::ops::RangeInclusive<i64> = -2..=2;

/// Largest accepted stock half-width; keeps one search under about 100k evaluations.
pub const MAX_HALF_WIDTH_TICKS: u32 = 10_000;

/// A snapped (stock, diluent) pair and how far it misses the targets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeCandidate {
    pub stock_volume_ml: f64,
    pub diluent_volume_ml: f64,
    pub total_volume_ml: f64,
    pub concentration_mg_per_ml: f64,
    pub concentration_error: f64,
    pub volume_error: f64,
}

impl VolumeCandidate {
    /// Build a candidate, deriving total and concentration from the volumes.
    pub fn from_volumes(stock_volume_ml: f64, diluent_volume_ml: f64, target: &SnapTarget) -> Self {
        let total = stock_volume_ml + diluent_volume_ml;
        let concentration = if total > 0.0 {
            target.stock_mg_per_ml * (stock_volume_ml / total)
        } else {
            0.0
        };
        Self {
            stock_volume_ml,
            diluent_volume_ml,
            total_volume_ml: total,
            concentration_mg_per_ml: concentration,
            concentration_error: relative_error(concentration, target.target_mg_per_ml),
            volume_error: relative_error(total, target.target_total_volume_ml),
        }
    }

    /// Weighted objective; lower is better.
    pub fn score(&self, weights: &SearchWeights) -> f64 {
        weights.concentration * self.concentration_error + weights.volume * self.volume_error
    }
}

/// What the search is aiming for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapTarget {
    pub stock_mg_per_ml: f64,
    pub target_mg_per_ml: f64,
    pub target_total_volume_ml: f64,
}

impl SnapTarget {
    /// Fraction of the total that must be stock.
    pub fn ratio(&self) -> f64 {
        self.target_mg_per_ml / self.stock_mg_per_ml
    }

    /// Ideal diluent for a given stock volume; never negative.
    pub fn ideal_diluent_ml(&self, stock_volume_ml: f64) -> f64 {
        let ratio = self.ratio();
        let ideal_total = if ratio > 0.0 {
            stock_volume_ml / ratio
        } else {
            self.target_total_volume_ml
        };
        (ideal_total - stock_volume_ml).max(0.0)
    }
}

/// Bounded grid search for one stock syringe and one diluent syringe.
pub struct TickSnapSearch<'a> {
    stock_syringe: &'a Instrument,
    diluent_syringe: &'a Instrument,
    config: &'a SearchConfig,
}

impl<'a> TickSnapSearch<'a> {
    pub fn new(stock_syringe: &'a Instrument, diluent_syringe: &'a Instrument, config: &'a SearchConfig) -> Self {
        Self {
            stock_syringe,
            diluent_syringe,
            config,
        }
    }

    /// Stock tick window `[max(1, m0 − W), m0 + W]`.
    pub fn stock_window(&self, target: &SnapTarget) -> (i64, i64) {
        let raw_stock = target.ratio() * target.target_total_volume_ml;
        let center = ((raw_stock / self.stock_syringe.increment_ml).round() as i64).max(1);
        let half_width = i64::from(self.config.half_width_ticks);
        (center.saturating_sub(half_width).max(1), center.saturating_add(half_width))
    }

    /// True when neither liquid needs more draws than allowed.
    fn within_fill_cap(&self, stock_ml: f64, diluent_ml: f64) -> bool {
        let cap = self.config.max_fills_per_liquid;
        self.stock_syringe.fills_for(stock_ml) <= cap && self.diluent_syringe.fills_for(diluent_ml) <= cap
    }

    /// Best admissible candidate, or `None` if every combination breaks the fill cap.
    pub fn run(&self, target: &SnapTarget) -> Option<VolumeCandidate> {
        let (m_min, m_max) = self.stock_window(target);
        let weights = &self.config.weights;

        let mut best: Option<(f64, VolumeCandidate)> = None;
        let mut evaluated = 0usize;

        for m in m_min..=m_max {
            let stock = self.stock_syringe.volume_of(m);
            let ideal_ticks = (target.ideal_diluent_ml(stock) / self.diluent_syringe.increment_ml).round() as i64;

            for offset in DILUENT_OFFSETS {
                let n = ideal_ticks.saturating_add(offset).max(0);
                let diluent = self.diluent_syringe.volume_of(n);
                if stock + diluent <= 0.0 || !self.within_fill_cap(stock, diluent) {
                    continue;
                }

                evaluated += 1;
                let candidate = VolumeCandidate::from_volumes(stock, diluent, target);
                let score = candidate.score(weights);
                if best.map_or(true, |(best_score, _)| score < best_score) {
                    best = Some((score, candidate));
                }
            }
        }

        tracing::debug!(
            m_min,
            m_max,
            evaluated,
            best_score = best.map(|(s, _)| s),
            "tick-snap search finished"
        );

        best.map(|(_, candidate)| candidate)
    }
}
