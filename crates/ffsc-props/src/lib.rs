//! ffsc-props: thermophysical property engine for the FFSC engine model.
//!
//! Provides:
//! - Species and mixture composition
//! - Table schemas and a gap-collecting JSON loader
//! - mBWR-32 residual evaluator
//! - SRK / Peng–Robinson cubic EOS with closed-form roots
//! - NASA-7 ideal-gas polynomials
//! - Wilke / Mason–Saxena transport mixing
//! - Saturation curves, vapor quality and flash
//! - `GasMixtureThermo` and `TwoPhaseThermo` query surfaces
//! - Parallel property sweeps
//!
//! Every query is a pure function of its inputs and the immutable tables it
//! was built from, so a [`PropertyBundle`] can be shared across threads.

pub mod bundle;
pub mod composition;
pub mod cubic;
pub mod gas;
pub mod mbwr;
pub mod nasa7;
pub mod saturation;
pub mod species;
pub mod sweep;
pub mod tables;
pub mod transport;
pub mod two_phase;

pub use bundle::{PropertyBundle, PropertyFiles};
pub use composition::Composition;
pub use cubic::{Branch, CubicEos, CubicKind};
pub use gas::{CaloricProps, GasMixtureThermo, ThermoState};
pub use mbwr::{MbwrCoefficients, MbwrResidual};
pub use nasa7::Nasa7;
pub use saturation::{Quality, SaturationCurve, SaturationPoint, SaturationTable};
pub use species::Species;
pub use sweep::{SweepPoint, linspace, temperature_sweep};
pub use tables::{Field, GapCollector, LoadResult, Metadata, load_json};
pub use transport::{Transport, TransportProps};
pub use two_phase::{SaturatedLiquid, TwoPhaseState, TwoPhaseThermo};
