//! CRI Mix Core Library
//!
//! Turns a continuous-rate-infusion request (drug, patient weight, dose, pump
//! rate, duration) into volumes an operator can actually draw with graduated
//! syringes.
//!
//! # Architecture
//!
//! ```text
//! MixtureRequest ──► Unit Normalizer ──► Feasibility Solver
//!                                              │
//!                                      Syringe Selector (per liquid)
//!                                              │
//!                                      Tick-Snap Search ──(nothing admissible)──► Fallback Rounder
//!                                              │                                        │
//!                                              ▼                                        │
//!                                      Tolerance Evaluator ◄────────────────────────────┘
//!                                              │
//!                                      Plan Assembler ──► MixturePlan
//! ```
//!
//! # Core Principle
//!
//! **Planning is a pure function.** Reference data is borrowed, nothing is
//! retained, and identical requests yield identical plans, tie-breaks included.
//! Only malformed input is an error; weak stock, degraded rounding and
//! tolerance exceedance are warnings on the plan.
//!
//! # Modules
//!
//! - [`models`]: Domain types (Medication, Instrument, MixtureRequest, MixturePlan, etc.)
//! - [`catalog`]: Reference medications and syringes, JSON loading
//! - [`mixing`]: Planner pipeline, tick-snap and banded multi-component searches

pub mod catalog;
pub mod mixing;
pub mod models;

// Re-export commonly used types
pub use catalog::{builtin_instruments, builtin_medications, CatalogError, ReferenceCatalog};
pub use mixing::{
    compute_mixture_plan, compute_multi_component_plan, compute_stock_only_plan, dose_equivalents, MixError,
    MixResult,
};
pub use models::{
    Concentration, ConcentrationBand, ConcentrationUnit, DoseRateUnit, DrawInstruction, Instrument, Medication,
    MixturePlan, MixtureRequest, MultiComponentPlan, MultiComponentRequest, SearchConfig, SnappedMixture,
    StockOnlyPlan, StockOnlyRequest, ToleranceConfig,
};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum CriMixError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Catalog error: {0}")]
    CatalogError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<MixError> for CriMixError {
    fn from(e: MixError) -> Self {
        CriMixError::InvalidInput(e.to_string())
    }
}

impl From<models::UnknownUnit> for CriMixError {
    fn from(e: models::UnknownUnit) -> Self {
        CriMixError::InvalidInput(e.to_string())
    }
}

impl From<CatalogError> for CriMixError {
    fn from(e: CatalogError) -> Self {
        CriMixError::CatalogError(e.to_string())
    }
}

impl From<serde_json::Error> for CriMixError {
    fn from(e: serde_json::Error) -> Self {
        CriMixError::SerializationError(e.to_string())
    }
}

// =========================================================================
// Exported Functions
// =========================================================================

/// Plan a stock + diluent mixture.
#[uniffi::export]
pub fn compute_mixture_plan_ffi(request: FfiMixtureRequest) -> Result<FfiMixturePlan, CriMixError> {
    let medication = Medication::try_from(request.medication)?;
    let instruments: Vec<Instrument> = request.instruments.into_iter().map(Into::into).collect();

    let mut core = MixtureRequest::new(
        request.weight_kg,
        &medication,
        request.desired_dose,
        request.dose_unit.parse()?,
        request.desired_rate_ml_per_hr,
        request.desired_duration_hr,
        &instruments,
    );
    core.planning_rate_ml_per_hr = request.planning_rate_ml_per_hr;
    if let Some(pct) = request.concentration_tolerance_pct {
        core.tolerance.concentration_pct = pct;
    }
    if let Some(pct) = request.total_volume_tolerance_pct {
        core.tolerance.total_volume_pct = pct;
    }
    if let Some(fills) = request.max_fills_per_liquid {
        core.search.max_fills_per_liquid = fills;
    }
    if let Some(ticks) = request.search_half_width_ticks {
        core.search.half_width_ticks = ticks;
    }

    Ok(compute_mixture_plan(&core)?.into())
}

/// Plan an active drug + band-constrained secondary agent + filler mixture.
#[uniffi::export]
pub fn compute_multi_component_plan_ffi(
    request: FfiMultiComponentRequest,
) -> Result<FfiMultiComponentPlan, CriMixError> {
    let active = Medication::try_from(request.active)?;
    let secondary = Medication::try_from(request.secondary)?;
    let instruments: Vec<Instrument> = request.instruments.into_iter().map(Into::into).collect();

    let mut core = MultiComponentRequest::new(
        request.weight_kg,
        &active,
        request.desired_dose,
        request.dose_unit.parse()?,
        request.desired_rate_ml_per_hr,
        request.desired_duration_hr,
        &secondary,
        ConcentrationBand::new(
            request.secondary_target_mg_per_ml,
            request.secondary_tolerance_mg_per_ml,
        ),
        &instruments,
    );
    if let Some(pct) = request.concentration_tolerance_pct {
        core.tolerance.concentration_pct = pct;
    }
    if let Some(pct) = request.total_volume_tolerance_pct {
        core.tolerance.total_volume_pct = pct;
    }
    if let Some(fills) = request.max_fills_per_component {
        core.search.max_fills_per_component = fills;
    }
    if let Some(ticks) = request.max_half_width_ticks {
        core.search.max_half_width_ticks = ticks;
    }

    Ok(compute_multi_component_plan(&core)?.into())
}

/// Size an undiluted-stock infusion.
#[uniffi::export]
pub fn compute_stock_only_plan_ffi(request: FfiStockOnlyRequest) -> Result<FfiStockOnlyPlan, CriMixError> {
    let medication = Medication::try_from(request.medication)?;
    let instruments: Vec<Instrument> = request.instruments.into_iter().map(Into::into).collect();

    let core = StockOnlyRequest {
        weight_kg: request.weight_kg,
        medication: &medication,
        desired_dose: request.desired_dose,
        dose_unit: request.dose_unit.parse()?,
        desired_duration_hr: request.desired_duration_hr,
        instruments: &instruments,
    };

    Ok(compute_stock_only_plan(&core)?.into())
}

/// Convert a dose between rate units.
#[uniffi::export]
pub fn convert_dose(value: f64, from_unit: String, to_unit: String) -> Result<f64, CriMixError> {
    let from: DoseRateUnit = from_unit.parse()?;
    let to: DoseRateUnit = to_unit.parse()?;
    Ok(to.from_mg_per_kg_hr(from.to_mg_per_kg_hr(value)))
}

/// The standard syringe table.
#[uniffi::export]
pub fn list_builtin_instruments() -> Vec<FfiInstrument> {
    builtin_instruments().into_iter().map(Into::into).collect()
}

/// The standard medication table.
#[uniffi::export]
pub fn list_builtin_medications() -> Vec<FfiMedication> {
    builtin_medications().into_iter().map(Into::into).collect()
}

/// Parse and validate a catalog document.
#[uniffi::export]
pub fn load_catalog_json(json: String) -> Result<FfiReferenceCatalog, CriMixError> {
    let catalog = ReferenceCatalog::from_json(&json)?;
    Ok(FfiReferenceCatalog {
        medications: catalog.medications.into_iter().map(Into::into).collect(),
        instruments: catalog.instruments.into_iter().map(Into::into).collect(),
    })
}

/// Serialize a plan as JSON for archiving or display layers.
#[uniffi::export]
pub fn mixture_plan_to_json(plan: FfiMixturePlan) -> Result<String, CriMixError> {
    Ok(serde_json::to_string(&plan)?)
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe medication. Units travel as their canonical tags.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMedication {
    pub id: String,
    pub name: String,
    pub concentration_value: f64,
    pub concentration_units: String,
    pub cri_min_mg_per_kg_hr: Option<f64>,
    pub cri_max_mg_per_kg_hr: Option<f64>,
}

impl From<Medication> for FfiMedication {
    fn from(med: Medication) -> Self {
        Self {
            id: med.id,
            name: med.name,
            concentration_value: med.concentration.value,
            concentration_units: med.concentration.units.to_string(),
            cri_min_mg_per_kg_hr: med.cri_dose_range.map(|r| r.min_mg_per_kg_hr),
            cri_max_mg_per_kg_hr: med.cri_dose_range.map(|r| r.max_mg_per_kg_hr),
        }
    }
}

impl TryFrom<FfiMedication> for Medication {
    type Error = CriMixError;

    fn try_from(med: FfiMedication) -> Result<Self, Self::Error> {
        let concentration = Concentration {
            value: med.concentration_value,
            units: med.concentration_units.parse()?,
        };
        let mut medication = Medication::new(med.id, med.name, concentration);
        match (med.cri_min_mg_per_kg_hr, med.cri_max_mg_per_kg_hr) {
            (Some(min), Some(max)) => medication = medication.with_cri_dose_range(min, max),
            (None, None) => {}
            _ => {
                return Err(CriMixError::InvalidInput(format!(
                    "{}: CRI dose range needs both bounds",
                    medication.id
                )))
            }
        }
        Ok(medication)
    }
}

/// FFI-safe syringe.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiInstrument {
    pub id: String,
    pub capacity_ml: f64,
    pub increment_ml: f64,
    pub label: Option<String>,
}

impl From<Instrument> for FfiInstrument {
    fn from(i: Instrument) -> Self {
        Self {
            id: i.id,
            capacity_ml: i.capacity_ml,
            increment_ml: i.increment_ml,
            label: i.label,
        }
    }
}

impl From<FfiInstrument> for Instrument {
    fn from(i: FfiInstrument) -> Self {
        Instrument {
            id: i.id,
            capacity_ml: i.capacity_ml,
            increment_ml: i.increment_ml,
            label: i.label,
        }
    }
}

/// FFI-safe catalog contents.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiReferenceCatalog {
    pub medications: Vec<FfiMedication>,
    pub instruments: Vec<FfiInstrument>,
}

/// FFI-safe draw instruction.
#[derive(Debug, Clone, serde::Serialize, uniffi::Record)]
pub struct FfiDrawInstruction {
    pub instrument_id: String,
    pub instrument_label: Option<String>,
    pub capacity_ml: f64,
    pub increment_ml: f64,
    pub volume_ml: f64,
    pub fills: u32,
}

impl From<DrawInstruction> for FfiDrawInstruction {
    fn from(d: DrawInstruction) -> Self {
        Self {
            instrument_id: d.instrument.id,
            instrument_label: d.instrument.label,
            capacity_ml: d.instrument.capacity_ml,
            increment_ml: d.instrument.increment_ml,
            volume_ml: d.volume_ml,
            fills: d.fills,
        }
    }
}

/// FFI-safe two-component request. Optional knobs fall back to defaults.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMixtureRequest {
    pub weight_kg: f64,
    pub medication: FfiMedication,
    pub desired_dose: f64,
    pub dose_unit: String,
    pub desired_rate_ml_per_hr: f64,
    pub desired_duration_hr: f64,
    pub instruments: Vec<FfiInstrument>,
    pub planning_rate_ml_per_hr: Option<f64>,
    pub concentration_tolerance_pct: Option<f64>,
    pub total_volume_tolerance_pct: Option<f64>,
    pub max_fills_per_liquid: Option<u32>,
    pub search_half_width_ticks: Option<u32>,
}

/// FFI-safe two-component plan.
#[derive(Debug, Clone, serde::Serialize, uniffi::Record)]
pub struct FfiMixturePlan {
    pub feasible_at_desired_rate: bool,
    pub warnings: Vec<String>,
    pub needed_concentration_mg_per_ml: f64,
    pub target_concentration_mg_per_ml: f64,
    pub chosen_concentration_mg_per_ml: f64,
    pub stock_concentration_mg_per_ml: f64,
    pub desired_rate_ml_per_hr: f64,
    pub mapped_rate_ml_per_hr: Option<f64>,
    pub delivered_dose_at_desired_rate: f64,
    pub dose_unit: String,
    pub target_total_volume_ml: f64,
    pub final_total_volume_ml: f64,
    pub raw_stock_volume_ml: f64,
    pub raw_diluent_volume_ml: f64,
    pub snapped_stock_volume_ml: f64,
    pub snapped_diluent_volume_ml: f64,
    pub stock_draw: FfiDrawInstruction,
    pub diluent_draw: FfiDrawInstruction,
    pub rel_concentration_error_pct: f64,
    pub rel_total_volume_error_pct: f64,
    pub used_fallback: bool,
}

impl From<MixturePlan> for FfiMixturePlan {
    fn from(plan: MixturePlan) -> Self {
        Self {
            feasible_at_desired_rate: plan.feasible_at_desired_rate,
            warnings: plan.warnings,
            needed_concentration_mg_per_ml: plan.needed_concentration_mg_per_ml,
            target_concentration_mg_per_ml: plan.target_concentration_mg_per_ml,
            chosen_concentration_mg_per_ml: plan.chosen_concentration_mg_per_ml,
            stock_concentration_mg_per_ml: plan.stock_concentration_mg_per_ml,
            desired_rate_ml_per_hr: plan.desired_rate_ml_per_hr,
            mapped_rate_ml_per_hr: plan.mapped_rate_ml_per_hr,
            delivered_dose_at_desired_rate: plan.delivered_dose_at_desired_rate,
            dose_unit: plan.dose_unit.to_string(),
            target_total_volume_ml: plan.target_total_volume_ml,
            final_total_volume_ml: plan.final_total_volume_ml,
            raw_stock_volume_ml: plan.raw_stock_volume_ml,
            raw_diluent_volume_ml: plan.raw_diluent_volume_ml,
            snapped_stock_volume_ml: plan.snapped_stock_volume_ml,
            snapped_diluent_volume_ml: plan.snapped_diluent_volume_ml,
            stock_draw: plan.stock_draw.into(),
            diluent_draw: plan.diluent_draw.into(),
            rel_concentration_error_pct: plan.rel_concentration_error_pct,
            rel_total_volume_error_pct: plan.rel_total_volume_error_pct,
            used_fallback: plan.used_fallback,
        }
    }
}

/// FFI-safe multi-component request. Optional knobs fall back to defaults.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMultiComponentRequest {
    pub weight_kg: f64,
    pub active: FfiMedication,
    pub desired_dose: f64,
    pub dose_unit: String,
    pub desired_rate_ml_per_hr: f64,
    pub desired_duration_hr: f64,
    pub secondary: FfiMedication,
    pub secondary_target_mg_per_ml: f64,
    pub secondary_tolerance_mg_per_ml: f64,
    pub instruments: Vec<FfiInstrument>,
    pub concentration_tolerance_pct: Option<f64>,
    pub total_volume_tolerance_pct: Option<f64>,
    pub max_fills_per_component: Option<u32>,
    pub max_half_width_ticks: Option<u32>,
}

/// FFI-safe snapped three-component mixture.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiSnappedMixture {
    pub active_volume_ml: f64,
    pub secondary_volume_ml: f64,
    pub filler_volume_ml: f64,
    pub final_total_volume_ml: f64,
    pub active_concentration_mg_per_ml: f64,
    pub secondary_concentration_mg_per_ml: f64,
    pub delivered_dose_at_desired_rate: f64,
    pub delivered_duration_hr: f64,
    pub mapped_rate_ml_per_hr: Option<f64>,
    /// Active, secondary, filler
    pub draws: Vec<FfiDrawInstruction>,
    pub rel_active_error_pct: f64,
    pub rel_secondary_error_pct: f64,
    pub rel_total_volume_error_pct: f64,
}

impl From<SnappedMixture> for FfiSnappedMixture {
    fn from(m: SnappedMixture) -> Self {
        Self {
            active_volume_ml: m.active_volume_ml,
            secondary_volume_ml: m.secondary_volume_ml,
            filler_volume_ml: m.filler_volume_ml,
            final_total_volume_ml: m.final_total_volume_ml,
            active_concentration_mg_per_ml: m.active_concentration_mg_per_ml,
            secondary_concentration_mg_per_ml: m.secondary_concentration_mg_per_ml,
            delivered_dose_at_desired_rate: m.delivered_dose_at_desired_rate,
            delivered_duration_hr: m.delivered_duration_hr,
            mapped_rate_ml_per_hr: m.mapped_rate_ml_per_hr,
            draws: m.draws.into_iter().map(Into::into).collect(),
            rel_active_error_pct: m.rel_active_error_pct,
            rel_secondary_error_pct: m.rel_secondary_error_pct,
            rel_total_volume_error_pct: m.rel_total_volume_error_pct,
        }
    }
}

/// FFI-safe multi-component plan. `mixture` is `None` when infeasible.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMultiComponentPlan {
    pub feasible: bool,
    pub feasible_at_desired_rate: bool,
    pub warnings: Vec<String>,
    pub needed_concentration_mg_per_ml: f64,
    pub target_concentration_mg_per_ml: f64,
    pub active_stock_concentration_mg_per_ml: f64,
    pub secondary_stock_concentration_mg_per_ml: f64,
    pub secondary_target_mg_per_ml: f64,
    pub secondary_tolerance_mg_per_ml: f64,
    pub desired_rate_ml_per_hr: f64,
    pub dose_unit: String,
    pub target_total_volume_ml: f64,
    pub raw_active_volume_ml: f64,
    pub raw_secondary_volume_ml: f64,
    pub raw_filler_volume_ml: f64,
    pub mixture: Option<FfiSnappedMixture>,
}

impl From<MultiComponentPlan> for FfiMultiComponentPlan {
    fn from(plan: MultiComponentPlan) -> Self {
        Self {
            feasible: plan.feasible,
            feasible_at_desired_rate: plan.feasible_at_desired_rate,
            warnings: plan.warnings,
            needed_concentration_mg_per_ml: plan.needed_concentration_mg_per_ml,
            target_concentration_mg_per_ml: plan.target_concentration_mg_per_ml,
            active_stock_concentration_mg_per_ml: plan.active_stock_concentration_mg_per_ml,
            secondary_stock_concentration_mg_per_ml: plan.secondary_stock_concentration_mg_per_ml,
            secondary_target_mg_per_ml: plan.secondary_band.target_mg_per_ml,
            secondary_tolerance_mg_per_ml: plan.secondary_band.tolerance_mg_per_ml,
            desired_rate_ml_per_hr: plan.desired_rate_ml_per_hr,
            dose_unit: plan.dose_unit.to_string(),
            target_total_volume_ml: plan.target_total_volume_ml,
            raw_active_volume_ml: plan.raw_active_volume_ml,
            raw_secondary_volume_ml: plan.raw_secondary_volume_ml,
            raw_filler_volume_ml: plan.raw_filler_volume_ml,
            mixture: plan.mixture.map(Into::into),
        }
    }
}

/// FFI-safe stock-only request.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStockOnlyRequest {
    pub weight_kg: f64,
    pub medication: FfiMedication,
    pub desired_dose: f64,
    pub dose_unit: String,
    pub desired_duration_hr: f64,
    pub instruments: Vec<FfiInstrument>,
}

/// FFI-safe stock-only plan.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiStockOnlyPlan {
    pub stock_concentration_mg_per_ml: f64,
    pub pump_rate_ml_per_hr: f64,
    pub target_volume_ml: f64,
    pub draw: FfiDrawInstruction,
    pub delivered_dose: f64,
    pub dose_unit: String,
}

impl From<StockOnlyPlan> for FfiStockOnlyPlan {
    fn from(plan: StockOnlyPlan) -> Self {
        Self {
            stock_concentration_mg_per_ml: plan.stock_concentration_mg_per_ml,
            pump_rate_ml_per_hr: plan.pump_rate_ml_per_hr,
            target_volume_ml: plan.target_volume_ml,
            draw: plan.draw.into(),
            delivered_dose: plan.delivered_dose,
            dose_unit: plan.dose_unit.to_string(),
        }
    }
}
