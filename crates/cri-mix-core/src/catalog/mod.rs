//! Reference catalog of medications and syringes.
//!
//! Loaded once, read-only afterwards. Clinic defaults for tolerances and
//! search bounds may travel in the same document.

mod builtin;

pub use builtin::*;

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Instrument, Medication, SearchConfig, ToleranceConfig};

/// Catalog errors.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Invalid entry {id}: {reason}")]
    InvalidEntry { id: String, reason: String },
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Medications, syringes and clinic defaults.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReferenceCatalog {
    pub medications: Vec<Medication>,
    pub instruments: Vec<Instrument>,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

impl Default for ReferenceCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ReferenceCatalog {
    /// The standard built-in tables with default settings.
    pub fn builtin() -> Self {
        Self {
            medications: builtin_medications(),
            instruments: builtin_instruments(),
            tolerance: ToleranceConfig::default(),
            search: SearchConfig::default(),
        }
    }

    /// Parse and validate a catalog document.
    pub fn from_json(json: &str) -> CatalogResult<Self> {
        let catalog: Self = serde_json::from_str(json)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Read a catalog document from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> CatalogResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> CatalogResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Look up a medication by id.
    pub fn medication(&self, id: &str) -> Option<&Medication> {
        self.medications.iter().find(|m| m.id == id)
    }

    /// Look up a syringe by id.
    pub fn instrument(&self, id: &str) -> Option<&Instrument> {
        self.instruments.iter().find(|i| i.id == id)
    }

    /// Unique ids, usable syringes, positive stock strengths.
    pub fn validate(&self) -> CatalogResult<()> {
        let mut seen = HashSet::new();
        for med in &self.medications {
            if !seen.insert(med.id.as_str()) {
                return Err(CatalogError::DuplicateId(med.id.clone()));
            }
            let value = med.concentration.value;
            if !(value.is_finite() && value > 0.0) {
                return Err(CatalogError::InvalidEntry {
                    id: med.id.clone(),
                    reason: format!("stock concentration must be positive, got {}", value),
                });
            }
            if let Some(range) = &med.cri_dose_range {
                if range.min_mg_per_kg_hr > range.max_mg_per_kg_hr {
                    return Err(CatalogError::InvalidEntry {
                        id: med.id.clone(),
                        reason: "CRI dose range minimum exceeds maximum".into(),
                    });
                }
            }
        }

        let mut seen = HashSet::new();
        for instrument in &self.instruments {
            if !seen.insert(instrument.id.as_str()) {
                return Err(CatalogError::DuplicateId(instrument.id.clone()));
            }
            if let Some(reason) = instrument.defect() {
                return Err(CatalogError::InvalidEntry {
                    id: instrument.id.clone(),
                    reason,
                });
            }
        }
        Ok(())
    }
}
