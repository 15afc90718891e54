//! ffsc-components: lumped component models of the engine flow network.
//!
//! Provides:
//! - the turbopumps with their tank boundaries
//! - two-phase lines, manifolds and injectors
//! - the preburner, hot-gas duct, main chamber and nozzle
//! - the pressurant heat exchanger
//!
//! Every kind implements [`ComponentModel`]: `advance` is a pure function of the
//! committed state, the [`InletConditions`] and the [`PropertyBundle`], and the
//! caller commits the returned state only once the whole network step succeeded.
//! [`Component`] is the closed set of kinds used by the network integrator.
//!
//! [`PropertyBundle`]: ffsc_props::PropertyBundle

pub mod common;
pub mod component;
pub mod flow;
pub mod gas_pipe;
pub mod gas_plenum;
pub mod gas_volume;
pub mod nozzle;
pub mod preburner;
pub mod pressurizer;
pub mod pump;
pub mod traits;
pub mod two_phase_pipe;
pub mod two_phase_plenum;
pub mod two_phase_valve;

#[cfg(test)]
pub(crate) mod testing;

pub use component::{Component, ComponentDef, ComponentKind, PendingState};
pub use flow::{FlowState, InletConditions, Phase};
pub use gas_pipe::GasPipe;
pub use gas_plenum::GasPlenum;
pub use gas_volume::GasVolumeState;
pub use nozzle::Nozzle;
pub use preburner::{EquilibriumTable, Preburner};
pub use pressurizer::Pressurizer;
pub use pump::{Pump, PumpMap};
pub use traits::{Advanced, ComponentModel};
pub use two_phase_pipe::TwoPhasePipe;
pub use two_phase_plenum::TwoPhasePlenum;
pub use two_phase_valve::{TwoPhaseValve, ValveLaw};
