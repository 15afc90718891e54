//! Streams exchanged between components.

use ffsc_core::units::{MassRate, Pressure, Temperature, k, kgps, pa};
use ffsc_core::{GapResult, MissingPropertyData};
use ffsc_props::{Composition, Species};

/// Phase of a stream as seen by the downstream component.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    Liquid,
    TwoPhase { quality: f64 },
    Gas,
}

impl Phase {
    pub fn from_quality(x: f64) -> Self {
        if x <= 0.0 {
            Phase::Liquid
        } else if x >= 1.0 {
            Phase::Gas
        } else {
            Phase::TwoPhase { quality: x }
        }
    }

    /// Vapor mass fraction: 0 for liquid, 1 for gas.
    pub fn quality(self) -> f64 {
        match self {
            Phase::Liquid => 0.0,
            Phase::TwoPhase { quality } => quality,
            Phase::Gas => 1.0,
        }
    }
}

/// Outlet stream of one component.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowState {
    pub mdot: MassRate,
    pub p: Pressure,
    pub t: Temperature,
    /// J/kg
    pub h: f64,
    /// kg/m³
    pub rho: f64,
    pub composition: Composition,
    pub phase: Phase,
}

impl FlowState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mdot_kg_s: f64,
        p_pa: f64,
        t_k: f64,
        h: f64,
        rho: f64,
        composition: Composition,
        phase: Phase,
    ) -> Self {
        Self {
            mdot: kgps(mdot_kg_s),
            p: pa(p_pa),
            t: k(t_k),
            h,
            rho,
            composition,
            phase,
        }
    }

    pub fn mdot_kg_s(&self) -> f64 {
        self.mdot.value
    }

    pub fn p_pa(&self) -> f64 {
        self.p.value
    }

    pub fn t_k(&self) -> f64 {
        self.t.value
    }

    /// The single propellant carried by a liquid or two-phase stream.
    pub fn propellant(&self, owner: &str) -> GapResult<Species> {
        self.composition.is_pure().ok_or_else(|| {
            MissingPropertyData::malformed(
                owner,
                "composition",
                "species",
                "two-phase stream must carry a single species",
            )
        })
    }
}

/// Everything a component needs from its neighbours for one step.
///
/// `streams` are the outlets of the upstream components in connection order.
/// `back_pressure` and `demand` are the committed values of the primary
/// downstream component from before the step.
#[derive(Debug, Clone, Default)]
pub struct InletConditions {
    pub streams: Vec<FlowState>,
    pub back_pressure: Option<f64>,
    pub demand: Option<f64>,
}

const TOPOLOGY: &str = "topology";

impl InletConditions {
    pub fn new(streams: Vec<FlowState>) -> Self {
        Self {
            streams,
            ..Self::default()
        }
    }

    pub fn with_back_pressure(mut self, p: f64) -> Self {
        self.back_pressure = Some(p);
        self
    }

    pub fn with_demand(mut self, mdot: f64) -> Self {
        self.demand = Some(mdot);
        self
    }

    pub fn back_pressure(&self, owner: &str) -> GapResult<f64> {
        self.back_pressure
            .ok_or_else(|| MissingPropertyData::absent(owner, TOPOLOGY, "back_pressure"))
    }

    pub fn demand(&self, owner: &str) -> GapResult<f64> {
        self.demand
            .ok_or_else(|| MissingPropertyData::absent(owner, TOPOLOGY, "demand"))
    }

    /// The only inlet stream of a single-inlet component.
    pub fn single(&self, owner: &str) -> GapResult<&FlowState> {
        match self.streams.as_slice() {
            [one] => Ok(one),
            [] => Err(MissingPropertyData::absent(owner, TOPOLOGY, "inlet")),
            many => Err(MissingPropertyData::malformed(
                owner,
                TOPOLOGY,
                "inlet",
                format!("expected one inlet, found {}", many.len()),
            )),
        }
    }

    pub fn total_mdot(&self) -> f64 {
        self.streams.iter().map(FlowState::mdot_kg_s).sum()
    }

    /// Σ ṁ·h over all inlets [W].
    pub fn enthalpy_inflow(&self) -> f64 {
        self.streams.iter().map(|s| s.mdot_kg_s() * s.h).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn liquid(mdot: f64) -> FlowState {
        FlowState::new(mdot, 3.0e5, 112.0, -5.0e6, 420.0, Composition::pure(Species::CH4), Phase::Liquid)
    }

    #[test]
    fn missing_neighbours_are_absent_topology_gaps() {
        let inlet = InletConditions::new(vec![liquid(0.4)]);
        let gap = inlet.back_pressure("fuel_line").unwrap_err();
        assert_eq!(gap.owner, "fuel_line");
        assert_eq!(gap.table, "topology");
        assert_eq!(gap.field, "back_pressure");
        assert!(inlet.demand("fuel_manifold").is_err());
        assert_eq!(inlet.with_demand(0.3).demand("x").unwrap(), 0.3);
    }

    #[test]
    fn single_inlet_enforced() {
        let none = InletConditions::default();
        assert!(none.single("valve").is_err());
        let two = InletConditions::new(vec![liquid(0.1), liquid(0.2)]);
        assert!(two.single("valve").is_err());
        assert!((two.total_mdot() - 0.3).abs() < 1e-15);
        assert!((two.enthalpy_inflow() - 0.3 * -5.0e6).abs() < 1e-6);
    }

    #[test]
    fn phase_quality() {
        assert_eq!(Phase::Liquid.quality(), 0.0);
        assert_eq!(Phase::Gas.quality(), 1.0);
        assert_eq!(Phase::TwoPhase { quality: 0.25 }.quality(), 0.25);
        assert_eq!(Phase::from_quality(0.0), Phase::Liquid);
        assert_eq!(Phase::from_quality(1.0), Phase::Gas);
        assert_eq!(Phase::from_quality(0.4), Phase::TwoPhase { quality: 0.4 });
    }

    #[test]
    fn mixture_is_not_a_propellant() {
        let mix = Composition::new_mole_fractions(vec![(Species::CH4, 0.5), (Species::O2, 0.5)]).unwrap();
        let mut s = liquid(0.1);
        assert_eq!(s.propellant("x").unwrap(), Species::CH4);
        s.composition = mix;
        assert!(s.propellant("x").is_err());
    }
}
