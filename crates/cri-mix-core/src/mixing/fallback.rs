//! Plain rounding when the tick-snap search finds nothing admissible.

use crate::models::Instrument;

use super::{SnapTarget, VolumeCandidate};

pub const FALLBACK_WARNING: &str =
    "Used simple rounding because a snapped combo within search bounds was not found.";

/// Round raw stock to its nearest tick, then size diluent from the fixed ratio.
///
/// Fill counts are not enforced here.
pub fn round_to_increments(
    raw_stock_ml: f64,
    stock_syringe: &Instrument,
    diluent_syringe: &Instrument,
    target: &SnapTarget,
) -> VolumeCandidate {
    let stock = stock_syringe.snap(raw_stock_ml);
    let diluent = diluent_syringe.snap(target.ideal_diluent_ml(stock));

    tracing::warn!(stock, diluent, "tick-snap search exhausted, falling back to rounding");

    VolumeCandidate::from_volumes(stock, diluent, target)
}
