//! Syringe selection for a raw volume.
//!
//! Policy:
//! - Among instruments that hold the volume in one draw: smallest increment,
//!   then smallest capacity.
//! - Otherwise the largest capacity (fewest refills), then smallest increment.
//! - Remaining ties go to the earliest instrument in the catalog.

use crate::models::Instrument;

/// Pick an instrument for `volume_ml`. `None` only for an empty catalog.
pub fn select_instrument(volume_ml: f64, catalog: &[Instrument]) -> Option<&Instrument> {
    let single_draw = catalog
        .iter()
        .filter(|s| s.capacity_ml >= volume_ml)
        .min_by(|a, b| {
            a.increment_ml
                .total_cmp(&b.increment_ml)
                .then(a.capacity_ml.total_cmp(&b.capacity_ml))
        });

    single_draw.or_else(|| {
        catalog.iter().reduce(|best, s| {
            let larger = s.capacity_ml > best.capacity_ml;
            let finer = s.capacity_ml == best.capacity_ml && s.increment_ml < best.increment_ml;
            if larger || finer {
                s
            } else {
                best
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_instruments;

    #[test]
    fn test_prefers_finest_single_draw() {
        let syringes = builtin_instruments();
        assert_eq!(select_instrument(0.5, &syringes).unwrap().id, "1cc-0-01");
        assert_eq!(select_instrument(2.0, &syringes).unwrap().id, "3cc-0-1");
        assert_eq!(select_instrument(8.0, &syringes).unwrap().id, "12cc-0-2");
        assert_eq!(select_instrument(5.0, &syringes).unwrap().id, "6cc-0-2");
        assert_eq!(select_instrument(40.0, &syringes).unwrap().id, "60cc-1");
    }

    #[test]
    fn test_oversized_volume_takes_largest() {
        let syringes = builtin_instruments();
        assert_eq!(select_instrument(250.0, &syringes).unwrap().id, "60cc-1");
    }

    #[test]
    fn test_zero_volume_takes_finest() {
        let syringes = builtin_instruments();
        assert_eq!(select_instrument(0.0, &syringes).unwrap().id, "1cc-0-01");
    }

    #[test]
    fn test_capacity_tie_prefers_finer_ticks() {
        let syringes = vec![
            Instrument::new("coarse", 10.0, 1.0),
            Instrument::new("fine", 10.0, 0.5),
        ];
        assert_eq!(select_instrument(30.0, &syringes).unwrap().id, "fine");
    }

    #[test]
    fn test_full_tie_keeps_catalog_order() {
        let syringes = vec![
            Instrument::new("first", 5.0, 0.2),
            Instrument::new("second", 5.0, 0.2),
        ];
        assert_eq!(select_instrument(1.0, &syringes).unwrap().id, "first");
        assert_eq!(select_instrument(9.0, &syringes).unwrap().id, "first");
    }

    #[test]
    fn test_empty_catalog() {
        assert!(select_instrument(1.0, &[]).is_none());
    }
}
