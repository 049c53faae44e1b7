//! Stock medication models and the unit vocabulary they are expressed in.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Unit a stock concentration is labeled in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ConcentrationUnit {
    #[serde(rename = "mg/mL", alias = "mg/ml")]
    MgPerMl,
    #[serde(rename = "mcg/mL", alias = "mcg/ml")]
    McgPerMl,
}

impl ConcentrationUnit {
    /// Multiplier that takes a value in this unit to mg/mL.
    pub fn to_mg_per_ml_factor(self) -> f64 {
        match self {
            ConcentrationUnit::MgPerMl => 1.0,
            ConcentrationUnit::McgPerMl => 1.0 / 1000.0,
        }
    }

    /// Canonical tag, as printed on the vial.
    pub fn as_str(self) -> &'static str {
        match self {
            ConcentrationUnit::MgPerMl => "mg/mL",
            ConcentrationUnit::McgPerMl => "mcg/mL",
        }
    }
}

impl fmt::Display for ConcentrationUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConcentrationUnit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "mg/mL" | "mg/ml" => Ok(ConcentrationUnit::MgPerMl),
            "mcg/mL" | "mcg/ml" => Ok(ConcentrationUnit::McgPerMl),
            other => Err(UnknownUnit(other.to_string())),
        }
    }
}

/// Dose-rate units accepted for a continuous infusion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum DoseRateUnit {
    #[serde(rename = "mg/kg/hr")]
    MgPerKgPerHr,
    #[serde(rename = "mg/kg/min")]
    MgPerKgPerMin,
    #[serde(rename = "mg/kg/day")]
    MgPerKgPerDay,
    #[serde(rename = "mcg/kg/hr")]
    McgPerKgPerHr,
    #[serde(rename = "mcg/kg/min")]
    McgPerKgPerMin,
}

impl DoseRateUnit {
    /// Every unit, in the order dose equivalents are listed.
    pub const ALL: [DoseRateUnit; 5] = [
        DoseRateUnit::MgPerKgPerHr,
        DoseRateUnit::MgPerKgPerMin,
        DoseRateUnit::MgPerKgPerDay,
        DoseRateUnit::McgPerKgPerMin,
        DoseRateUnit::McgPerKgPerHr,
    ];

    /// Multiplier that takes a dose in this unit to mg/kg/hr.
    ///
    /// This is also the dose-rate constant `U` in `C = U·D·W / r`.
    pub fn to_mg_per_kg_hr_factor(self) -> f64 {
        match self {
            DoseRateUnit::MgPerKgPerHr => 1.0,
            DoseRateUnit::MgPerKgPerMin => 60.0,
            DoseRateUnit::MgPerKgPerDay => 1.0 / 24.0,
            DoseRateUnit::McgPerKgPerHr => 1.0 / 1000.0,
            DoseRateUnit::McgPerKgPerMin => 60.0 / 1000.0,
        }
    }

    /// Convert a dose in this unit to mg/kg/hr.
    pub fn to_mg_per_kg_hr(self, dose: f64) -> f64 {
        dose * self.to_mg_per_kg_hr_factor()
    }

    /// Convert a dose in mg/kg/hr to this unit.
    pub fn from_mg_per_kg_hr(self, mg_per_kg_hr: f64) -> f64 {
        mg_per_kg_hr / self.to_mg_per_kg_hr_factor()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DoseRateUnit::MgPerKgPerHr => "mg/kg/hr",
            DoseRateUnit::MgPerKgPerMin => "mg/kg/min",
            DoseRateUnit::MgPerKgPerDay => "mg/kg/day",
            DoseRateUnit::McgPerKgPerHr => "mcg/kg/hr",
            DoseRateUnit::McgPerKgPerMin => "mcg/kg/min",
        }
    }
}

impl fmt::Display for DoseRateUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DoseRateUnit {
    type Err = UnknownUnit;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        DoseRateUnit::ALL
            .iter()
            .copied()
            .find(|u| u.as_str() == lower)
            .ok_or_else(|| UnknownUnit(s.to_string()))
    }
}

/// A unit tag that is not part of the supported vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown unit: {0}")]
pub struct UnknownUnit(pub String);

/// Labeled strength of a stock vial.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Concentration {
    pub value: f64,
    pub units: ConcentrationUnit,
}

impl Concentration {
    pub fn mg_per_ml(value: f64) -> Self {
        Self {
            value,
            units: ConcentrationUnit::MgPerMl,
        }
    }

    pub fn mcg_per_ml(value: f64) -> Self {
        Self {
            value,
            units: ConcentrationUnit::McgPerMl,
        }
    }
}

/// Typical continuous-infusion dose range, in mg/kg/hr.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CriDoseRange {
    pub min_mg_per_kg_hr: f64,
    pub max_mg_per_kg_hr: f64,
}

/// A stock medication in the reference catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    /// Stable slug, e.g. "lidocaine-20"
    pub id: String,
    /// Display name
    pub name: String,
    /// Labeled stock strength
    pub concentration: Concentration,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Typical CRI dose range for plausibility checking
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cri_dose_range: Option<CriDoseRange>,
}

impl Medication {
    /// Create a medication with required fields.
    pub fn new(id: impl Into<String>, name: impl Into<String>, concentration: Concentration) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            concentration,
            notes: None,
            cri_dose_range: None,
        }
    }

    /// Attach a CRI dose range (mg/kg/hr).
    pub fn with_cri_dose_range(mut self, min_mg_per_kg_hr: f64, max_mg_per_kg_hr: f64) -> Self {
        self.cri_dose_range = Some(CriDoseRange {
            min_mg_per_kg_hr,
            max_mg_per_kg_hr,
        });
        self
    }

    /// Check a canonical dose against the CRI range.
    ///
    /// Returns `None` when the medication has no range on file.
    pub fn is_dose_in_range(&self, dose_mg_per_kg_hr: f64) -> Option<bool> {
        let range = self.cri_dose_range.as_ref()?;
        Some(dose_mg_per_kg_hr >= range.min_mg_per_kg_hr && dose_mg_per_kg_hr <= range.max_mg_per_kg_hr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dose_unit_round_trips_through_canonical() {
        for unit in DoseRateUnit::ALL {
            let canonical = unit.to_mg_per_kg_hr(2.5);
            assert!((unit.from_mg_per_kg_hr(canonical) - 2.5).abs() < 1e-12);
        }
    }

    #[test]
    fn test_dose_unit_factors() {
        assert_eq!(DoseRateUnit::MgPerKgPerHr.to_mg_per_kg_hr(3.0), 3.0);
        assert_eq!(DoseRateUnit::MgPerKgPerMin.to_mg_per_kg_hr(1.0), 60.0);
        assert!((DoseRateUnit::MgPerKgPerDay.to_mg_per_kg_hr(24.0) - 1.0).abs() < 1e-12);
        assert!((DoseRateUnit::McgPerKgPerHr.to_mg_per_kg_hr(1000.0) - 1.0).abs() < 1e-12);
        assert!((DoseRateUnit::McgPerKgPerMin.to_mg_per_kg_hr(1.0) - 0.06).abs() < 1e-12);
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!("mcg/kg/min".parse::<DoseRateUnit>(), Ok(DoseRateUnit::McgPerKgPerMin));
        assert_eq!("MG/KG/HR".parse::<DoseRateUnit>(), Ok(DoseRateUnit::MgPerKgPerHr));
        assert!("mg/lb/hr".parse::<DoseRateUnit>().is_err());

        assert_eq!("mcg/mL".parse::<ConcentrationUnit>(), Ok(ConcentrationUnit::McgPerMl));
        assert!("g/L".parse::<ConcentrationUnit>().is_err());
    }

    #[test]
    fn test_units_serialize_as_tags() {
        let json = serde_json::to_string(&DoseRateUnit::McgPerKgPerMin).unwrap();
        assert_eq!(json, "\"mcg/kg/min\"");

        let conc: Concentration = serde_json::from_str(r#"{"value": 50, "units": "mcg/mL"}"#).unwrap();
        assert_eq!(conc, Concentration::mcg_per_ml(50.0));
    }

    #[test]
    fn test_lowercase_concentration_tags_deserialize() {
        let conc: Concentration = serde_json::from_str(r#"{"value": 1, "units": "mg/ml"}"#).unwrap();
        assert_eq!(conc, Concentration::mg_per_ml(1.0));
        let conc: Concentration = serde_json::from_str(r#"{"value": 50, "units": "mcg/ml"}"#).unwrap();
        assert_eq!(conc, Concentration::mcg_per_ml(50.0));

        // Both entry points accept the same tags and still write the canonical one.
        for tag in ["mg/mL", "mg/ml", "mcg/mL", "mcg/ml"] {
            let parsed = tag.parse::<ConcentrationUnit>().unwrap();
            let decoded: ConcentrationUnit = serde_json::from_str(&format!("\"{tag}\"")).unwrap();
            assert_eq!(parsed, decoded);
            assert_eq!(serde_json::to_string(&decoded).unwrap(), format!("\"{}\"", decoded.as_str()));
        }
    }

    #[test]
    fn test_dose_range_check() {
        let med = Medication::new("lido", "Lidocaine", Concentration::mg_per_ml(20.0))
            .with_cri_dose_range(1.5, 3.0);

        assert_eq!(med.is_dose_in_range(2.0), Some(true));
        assert_eq!(med.is_dose_in_range(4.0), Some(false));

        let bare = Medication::new("x", "X", Concentration::mg_per_ml(1.0));
        assert_eq!(bare.is_dose_in_range(100.0), None);
    }
}
