//! Built-in reference tables.

use crate::models::{Concentration, Instrument, Medication};

/// Standard clinic syringes, finest first.
pub fn builtin_instruments() -> Vec<Instrument> {
    vec![
        Instrument::new("1cc-0-01", 1.0, 0.01).with_label("1 cc (0.01 mL ticks)"),
        Instrument::new("3cc-0-1", 3.0, 0.1).with_label("3 cc (0.1 mL ticks)"),
        Instrument::new("6cc-0-2", 6.0, 0.2).with_label("6 cc (0.2 mL ticks)"),
        Instrument::new("12cc-0-2", 12.0, 0.2).with_label("12 cc (0.2 mL ticks)"),
        Instrument::new("35cc-1", 35.0, 1.0).with_label("35 cc (1 mL ticks)"),
        Instrument::new("60cc-1", 60.0, 1.0).with_label("60 cc (1 mL ticks)"),
    ]
}

/// Stock medications commonly run as CRIs.
pub fn builtin_medications() -> Vec<Medication> {
    vec![
        Medication::new("metoclopramide-5", "Metoclopramide", Concentration::mg_per_ml(5.0)),
        Medication::new("fentanyl-50", "Fentanyl", Concentration::mcg_per_ml(50.0)),
        Medication::new("lidocaine-20", "Lidocaine", Concentration::mg_per_ml(20.0)),
        Medication::new("dextrose-500", "Dextrose", Concentration::mg_per_ml(500.0)),
        Medication::new("norepinephrine-1", "Norepinephrine", Concentration::mg_per_ml(1.0)),
        Medication::new("furosemide-50", "Furosemide", Concentration::mg_per_ml(50.0)),
        Medication::new("midazolam-5", "Midazolam", Concentration::mg_per_ml(5.0)),
        Medication::new("diazepam-5", "Diazepam", Concentration::mg_per_ml(5.0)),
    ]
}
