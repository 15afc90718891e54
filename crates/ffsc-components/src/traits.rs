//! The capability every component kind implements.

use std::fmt::Debug;

use ffsc_core::GapResult;
use ffsc_props::PropertyBundle;

use crate::flow::{FlowState, InletConditions};

/// Result of advancing one component by one step. Nothing is committed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Advanced<S> {
    pub outlet: FlowState,
    pub state: S,
}

/// A lumped component advanced by discrete time steps.
///
/// `advance` is a pure function of the committed state, the inlet conditions
/// and the property tables. The caller decides whether to `commit`.
pub trait ComponentModel {
    type State: Clone + Debug + PartialEq;

    fn name(&self) -> &str;

    /// Committed state.
    fn state(&self) -> &Self::State;

    fn advance(
        &self,
        dt: f64,
        inlet: &InletConditions,
        props: &PropertyBundle,
    ) -> GapResult<Advanced<Self::State>>;

    fn commit(&mut self, state: Self::State);

    /// Pressure presented to the upstream component [Pa].
    ///
    /// `None` means the component has no pressure of its own and upstream
    /// should look further downstream.
    fn upstream_pressure(&self, _props: &PropertyBundle) -> GapResult<Option<f64>> {
        Ok(None)
    }

    /// Committed mass flow drawn from upstream [kg/s], for flow elements.
    fn demand(&self) -> Option<f64> {
        None
    }

    /// Derived estimates reported alongside the outlet stream.
    fn derived(&self) -> Vec<(&'static str, f64)> {
        Vec::new()
    }
}
