//! Domain models for the mixing planner.

mod instrument;
mod medication;
mod plan;
mod request;

pub use instrument::*;
pub use medication::*;
pub use plan::*;
pub use request::*;
