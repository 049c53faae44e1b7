//! Informational tolerance and fill-count checks.
//!
//! Nothing here fails a plan; findings become warning strings.

use crate::models::{Instrument, ToleranceConfig};

/// Denominator floor for relative errors against a zero target (zero dose).
pub const RELATIVE_ERROR_FLOOR: f64 = 1e-9;

/// `|actual − target| / target`, finite even for a zero target.
pub fn relative_error(actual: f64, target: f64) -> f64 {
    (actual - target).abs() / target.abs().max(RELATIVE_ERROR_FLOOR)
}

/// Warnings for errors above tolerance. Errors are fractions, not percent.
///
/// `concentration_error` is `None` when the target concentration is zero;
/// only the volume is checked then.
pub fn tolerance_warnings(
    concentration_error: Option<f64>,
    volume_error: f64,
    tolerance: &ToleranceConfig,
) -> Vec<String> {
    let mut warnings = Vec::new();

    if let Some(concentration_error) = concentration_error.filter(|e| e * 100.0 > tolerance.concentration_pct) {
        warnings.push(format!(
            "Concentration error {:.2}% exceeds tolerance {:.2}%.",
            concentration_error * 100.0,
            tolerance.concentration_pct
        ));
    }
    if volume_error * 100.0 > tolerance.total_volume_pct {
        warnings.push(format!(
            "Total volume error {:.2}% exceeds tolerance {:.2}%.",
            volume_error * 100.0,
            tolerance.total_volume_pct
        ));
    }

    warnings
}

/// Warning when `volume_ml` needs more draws of `instrument` than allowed.
pub fn fill_warning(liquid: &str, volume_ml: f64, instrument: &Instrument, max_fills: u32) -> Option<String> {
    let fills = instrument.fills_for(volume_ml);
    if fills > max_fills {
        Some(format!(
            "{} volume {:.2} mL requires {} fills of {} mL syringe.",
            liquid, volume_ml, fills, instrument.capacity_ml
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_within_tolerance_is_silent() {
        let warnings = tolerance_warnings(Some(0.005), 0.04, &ToleranceConfig::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_exceedance_names_both_percentages() {
        let warnings = tolerance_warnings(Some(0.025), 0.10, &ToleranceConfig::default());
        assert_eq!(
            warnings,
            vec![
                "Concentration error 2.50% exceeds tolerance 1.00%.".to_string(),
                "Total volume error 10.00% exceeds tolerance 5.00%.".to_string(),
            ]
        );
    }

    #[test]
    fn test_missing_concentration_target_skips_check() {
        let warnings = tolerance_warnings(None, 0.10, &ToleranceConfig::default());
        assert_eq!(warnings, vec!["Total volume error 10.00% exceeds tolerance 5.00%.".to_string()]);
    }

    #[test]
    fn test_zero_target_error_is_finite() {
        assert!(relative_error(0.1, 0.0).is_finite());
        assert_eq!(relative_error(0.0, 0.0), 0.0);
        assert!((relative_error(11.0, 10.0) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_fill_warning() {
        let syringe = Instrument::new("1cc", 1.0, 0.01);
        assert_eq!(fill_warning("Stock", 0.5, &syringe, 20), None);
        assert_eq!(
            fill_warning("Stock", 50.0, &syringe, 20).unwrap(),
            "Stock volume 50.00 mL requires 50 fills of 1 mL syringe."
        );
    }
}
