//! ffsc-core: shared foundation for the FFSC engine model.
//!
//! Contains:
//! - units (uom SI types + constructors)
//! - numeric (Real + tolerances + float helpers)
//! - ids (`CompId` and `LinkId` topology indices)
//! - error (the `MissingPropertyData` taxonomy)

pub mod error;
pub mod ids;
pub mod numeric;
pub mod units;

pub use error::{GapKind, GapReport, GapResult, MissingPropertyData};
pub use ids::*;
pub use numeric::*;
pub use units::*;
