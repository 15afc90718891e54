//! Two-phase plenum (manifold): lumped mass and energy accumulation.
//!
//! dm/dt = Σṁ_in − ṁ_out, dU/dt = Σṁ_in·h_in − ṁ_out·h + Q̇. The temperature
//! update linearizes u(ρ, T) about the committed state using ∂u/∂T|ρ and
//! ∂u/∂ρ|T from the two-phase surface.

use ffsc_core::{GapResult, k};
use ffsc_props::{Field, GapCollector, LoadResult, PropertyBundle, Species, TwoPhaseState};
use serde::Deserialize;

use crate::common::{Attribute, CollectExt, check_finite, check_positive};
use crate::flow::{FlowState, InletConditions, Phase};
use crate::traits::{Advanced, ComponentModel};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TwoPhasePlenumParams {
    pub species: Field<String>,
    pub volume_m3: Field<f64>,
    #[serde(rename = "initial_temperature_K")]
    pub initial_temperature_k: Field<f64>,
    pub initial_density_kg_m3: Field<f64>,
    #[serde(rename = "heat_input_W")]
    pub heat_input_w: Field<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoPhasePlenumState {
    pub mass: f64,
    pub t: f64,
    /// Last computed pressure, for reporting.
    pub p: Option<f64>,
    pub quality: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct TwoPhasePlenum {
    name: String,
    species: Species,
    volume: f64,
    heat_input: f64,
    state: TwoPhasePlenumState,
}

impl TwoPhasePlenum {
    pub fn from_params(name: &str, params: &TwoPhasePlenumParams) -> LoadResult<Self> {
        let mut c = GapCollector::new(name, "engine");
        let species = c.species(&params.species);
        let volume = c.positive(&params.volume_m3, "volume_m3");
        let t0 = c.positive(&params.initial_temperature_k, "initial_temperature_K");
        let rho0 = c.positive(&params.initial_density_kg_m3, "initial_density_kg_m3");
        let heat_input = match params.heat_input_w {
            Field::Absent => Some(0.0),
            ref f => c.number(f, "heat_input_W"),
        };
        let value = match (species, volume, t0, rho0, heat_input) {
            (Some(species), Some(volume), Some(t), Some(rho), Some(heat_input)) => Some(Self {
                name: name.to_string(),
                species,
                volume,
                heat_input,
                state: TwoPhasePlenumState {
                    mass: rho * volume,
                    t,
                    p: None,
                    quality: None,
                },
            }),
            _ => None,
        };
        c.finish(value)
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn density(&self) -> f64 {
        self.state.mass / self.volume
    }

    /// Two-phase state at the committed (ρ, T).
    pub fn thermo_state(&self, props: &PropertyBundle) -> GapResult<TwoPhaseState> {
        props
            .two_phase(self.species)
            .and_then(|tp| tp.state(self.density(), self.state.t))
            .attribute(&self.name)
    }
}

impl ComponentModel for TwoPhasePlenum {
    type State = TwoPhasePlenumState;

    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &TwoPhasePlenumState {
        &self.state
    }

    fn advance(
        &self,
        dt: f64,
        inlet: &InletConditions,
        props: &PropertyBundle,
    ) -> GapResult<Advanced<TwoPhasePlenumState>> {
        let name = self.name.as_str();
        let thermo = props.two_phase(self.species).attribute(name)?;
        let demand = inlet.demand(name)?;
        let rho = self.density();
        let s0 = self.thermo_state(props)?;

        let m = self.state.mass;
        let m2 = check_positive(m + dt * (inlet.total_mdot() - demand), name, "mass")?;
        let energy = m * s0.u + dt * (inlet.enthalpy_inflow() - demand * s0.h + self.heat_input);
        let u2 = energy / m2;
        let rho2 = m2 / self.volume;
        let du_dt = check_positive(s0.du_dt, name, "du_dT")?;
        let t2 = self.state.t + ((u2 - s0.u) - s0.du_drho * (rho2 - rho)) / du_dt;
        let t2 = check_finite(t2, name, "T")?;

        let s1 = thermo.state(rho2, t2).attribute(name)?;
        check_positive(s1.p, name, "p")?;
        let phase = match s1.x() {
            Some(x) => Phase::TwoPhase { quality: x },
            None if rho2 >= s1.saturation.rho_l => Phase::Liquid,
            None => Phase::Gas,
        };

        Ok(Advanced {
            outlet: FlowState {
                mdot: ffsc_core::kgps(demand),
                p: ffsc_core::pa(s1.p),
                t: k(t2),
                h: s1.h,
                rho: rho2,
                composition: ffsc_props::Composition::pure(self.species),
                phase,
            },
            state: TwoPhasePlenumState {
                mass: m2,
                t: t2,
                p: Some(s1.p),
                quality: s1.x(),
            },
        })
    }

    fn commit(&mut self, state: TwoPhasePlenumState) {
        self.state = state;
    }

    fn upstream_pressure(&self, props: &PropertyBundle) -> GapResult<Option<f64>> {
        Ok(Some(self.thermo_state(props)?.p))
    }

    fn derived(&self) -> Vec<(&'static str, f64)> {
        let mut out = vec![("mass_kg", self.state.mass)];
        if let Some(x) = self.state.quality {
            out.push(("quality", x));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::props;
    use ffsc_props::Composition;

    fn manifold(heat: Option<f64>) -> TwoPhasePlenum {
        let mut json = serde_json::json!({
            "species": "CH4", "volume_m3": 0.02, "initial_temperature_K": 165.0,
            "initial_density_kg_m3": 200.0
        });
        if let Some(q) = heat {
            json["heat_input_W"] = q.into();
        }
        let params: TwoPhasePlenumParams = serde_json::from_value(json).unwrap();
        TwoPhasePlenum::from_params("fuel_manifold", &params).unwrap()
    }

    fn feed(mdot: f64) -> FlowState {
        let tp = props().two_phase(Species::CH4).unwrap();
        let liquid = tp.saturated_liquid(115.0).unwrap();
        FlowState::new(mdot, 3.0e6, 115.0, liquid.h, liquid.rho, Composition::pure(Species::CH4), Phase::Liquid)
    }

    #[test]
    fn initial_state_is_inside_the_dome() {
        let m = manifold(None);
        let s = m.thermo_state(props()).unwrap();
        let x = s.x().unwrap();
        assert!(x > 0.0 && x < 1.0);
        assert_eq!(m.upstream_pressure(props()).unwrap(), Some(s.p));
    }

    #[test]
    fn mass_balance_and_two_phase_outlet() {
        let m = manifold(Some(140e3));
        let inlet = InletConditions::new(vec![feed(0.4)]).with_demand(0.3);
        let Advanced { outlet, state } = m.advance(0.1, &inlet, props()).unwrap();
        assert!((state.mass - (4.0 + 0.1 * 0.1)).abs() < 1e-12);
        assert!(state.p.unwrap() > 0.0);
        assert_eq!(outlet.mdot_kg_s(), 0.3);
        assert!(matches!(outlet.phase, Phase::TwoPhase { .. }));
    }

    #[test]
    fn cold_inflow_cools_the_manifold() {
        let m = manifold(None);
        let inlet = InletConditions::new(vec![feed(0.5)]).with_demand(0.5);
        let state = m.advance(0.1, &inlet, props()).unwrap().state;
        assert!(state.t < 165.0);
    }

    #[test]
    fn draining_the_manifold_is_reported() {
        let m = manifold(None);
        let inlet = InletConditions::new(vec![feed(0.0)]).with_demand(100.0);
        let gap = m.advance(0.1, &inlet, props()).unwrap_err();
        assert_eq!(gap.field, "mass");
        assert!(gap.is_out_of_range());
    }
}
