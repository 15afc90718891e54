//! Two-phase propellant line: quasi-steady momentum balance.
//!
//! Friction follows Churchill on the liquid fraction of the mass flux, scaled
//! by the Lockhart–Martinelli multiplier when vapor is present. Fittings add
//! Δp = k·G²/(2·ρ_m·k_dp). If the outlet pressure falls below p_sat the stream
//! is flashed isenthalpically.

use ffsc_core::GapResult;
use ffsc_props::{Field, GapCollector, LoadResult, PropertyBundle};
use serde::Deserialize;

use crate::common::{Attribute, check_positive, churchill, homogeneous_density, lockhart_martinelli};
use crate::flow::{InletConditions, Phase};
use crate::traits::{Advanced, ComponentModel};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TwoPhasePipeParams {
    pub area_m2: Field<f64>,
    pub diameter_m: Field<f64>,
    pub length_m: Field<f64>,
    pub roughness_m: Field<f64>,
    pub loss_k: Field<f64>,
    pub k_dp: Field<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TwoPhasePipeState {
    pub mdot: f64,
    pub dp: f64,
    /// Inlet pressure needed to push the current flow into the committed
    /// downstream pressure. Unknown until the first step.
    pub required_inlet_p: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct TwoPhasePipe {
    name: String,
    area: f64,
    diameter: f64,
    length: f64,
    roughness: f64,
    loss_k: f64,
    k_dp: f64,
    state: TwoPhasePipeState,
}

impl TwoPhasePipe {
    pub fn from_params(name: &str, params: &TwoPhasePipeParams) -> LoadResult<Self> {
        let mut c = GapCollector::new(name, "engine");
        let area = c.positive(&params.area_m2, "area_m2");
        let diameter = c.positive(&params.diameter_m, "diameter_m");
        let length = c.positive(&params.length_m, "length_m");
        let roughness = c.number(&params.roughness_m, "roughness_m");
        let loss_k = c.number(&params.loss_k, "loss_k");
        let k_dp = c.positive(&params.k_dp, "k_dp");
        let value = match (area, diameter, length, roughness, loss_k, k_dp) {
            (Some(area), Some(diameter), Some(length), Some(roughness), Some(loss_k), Some(k_dp)) => {
                Some(Self {
                    name: name.to_string(),
                    area,
                    diameter,
                    length,
                    roughness,
                    loss_k,
                    k_dp,
                    state: TwoPhasePipeState::default(),
                })
            }
            _ => None,
        };
        c.finish(value)
    }
}

impl ComponentModel for TwoPhasePipe {
    type State = TwoPhasePipeState;

    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &TwoPhasePipeState {
        &self.state
    }

    fn advance(
        &self,
        _dt: f64,
        inlet: &InletConditions,
        props: &PropertyBundle,
    ) -> GapResult<Advanced<TwoPhasePipeState>> {
        let name = self.name.as_str();
        let stream = inlet.single(name)?;
        let back = inlet.back_pressure(name)?;
        let thermo = props.two_phase(stream.propellant(name)?).attribute(name)?;
        let sat = thermo.saturation(stream.t_k()).attribute(name)?;
        let mu_l = sat.mu_l().attribute(name)?;

        let x = stream.phase.quality();
        let g = stream.mdot_kg_s() / self.area;
        let g_l = g * (1.0 - x);
        let re_l = g_l * self.diameter / mu_l;
        let f = churchill(re_l, self.roughness / self.diameter);
        let mut dp_friction = f * self.length / self.diameter * g_l * g_l / (2.0 * sat.rho_l);
        if x > 0.0 {
            let mu_v = sat.mu_v().attribute(name)?;
            dp_friction *= lockhart_martinelli(x, sat.rho_l, sat.rho_v, mu_l, mu_v);
        }
        let rho_m = homogeneous_density(x, sat.rho_l, sat.rho_v);
        let dp = dp_friction + self.loss_k * g * g / (2.0 * rho_m * self.k_dp);
        let p_out = check_positive(stream.p_pa() - dp, name, "p_out")?;

        let mut outlet = stream.clone();
        outlet.p = ffsc_core::pa(p_out);
        if p_out < sat.p_sat {
            let (t_sat, x_out) = thermo.flash(stream.h, p_out).attribute(name)?;
            let flashed = thermo.saturation(t_sat).attribute(name)?;
            outlet.t = ffsc_core::k(t_sat);
            outlet.rho = homogeneous_density(x_out, flashed.rho_l, flashed.rho_v);
            outlet.phase = Phase::from_quality(x_out);
        }

        Ok(Advanced {
            outlet,
            state: TwoPhasePipeState {
                mdot: stream.mdot_kg_s(),
                dp,
                required_inlet_p: Some(back + dp),
            },
        })
    }

    fn commit(&mut self, state: TwoPhasePipeState) {
        self.state = state;
    }

    fn upstream_pressure(&self, _props: &PropertyBundle) -> GapResult<Option<f64>> {
        Ok(self.state.required_inlet_p)
    }

    fn demand(&self) -> Option<f64> {
        Some(self.state.mdot)
    }

    fn derived(&self) -> Vec<(&'static str, f64)> {
        vec![("dp_Pa", self.state.dp)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FlowState;
    use crate::testing::props;
    use ffsc_props::{Composition, Species};

    fn line() -> TwoPhasePipe {
        let params: TwoPhasePipeParams = serde_json::from_str(
            r#"{"area_m2": 3e-4, "diameter_m": 0.0195, "length_m": 2.0, "roughness_m": 1e-5,
                "loss_k": 1.0, "k_dp": 1.0}"#,
        )
        .unwrap();
        TwoPhasePipe::from_params("fuel_line", &params).unwrap()
    }

    fn subcooled(mdot: f64, p: f64) -> FlowState {
        let liquid = props()
            .two_phase(Species::CH4)
            .unwrap()
            .saturated_liquid(112.0)
            .unwrap();
        FlowState::new(mdot, p, 112.0, liquid.h, liquid.rho, Composition::pure(Species::CH4), Phase::Liquid)
    }

    #[test]
    fn pressure_drop_feeds_required_inlet_pressure() {
        let pipe = line();
        assert_eq!(pipe.upstream_pressure(props()).unwrap(), None);
        let inlet = InletConditions::new(vec![subcooled(0.4, 3.0e6)]).with_back_pressure(2.3e6);
        let Advanced { outlet, state } = pipe.advance(0.1, &inlet, props()).unwrap();
        assert!(state.dp > 0.0);
        assert_eq!(state.required_inlet_p, Some(2.3e6 + state.dp));
        assert!((outlet.p_pa() - (3.0e6 - state.dp)).abs() < 1e-6);
        assert_eq!(outlet.phase, Phase::Liquid);
        assert_eq!(outlet.mdot_kg_s(), 0.4);
    }

    #[test]
    fn drop_grows_with_flow() {
        let pipe = line();
        let dp = |mdot: f64| {
            let inlet = InletConditions::new(vec![subcooled(mdot, 3.0e6)]).with_back_pressure(2.0e6);
            pipe.advance(0.1, &inlet, props()).unwrap().state.dp
        };
        assert!(dp(0.8) > 3.0 * dp(0.4));
    }

    #[test]
    fn excessive_drop_is_reported() {
        let pipe = line();
        let inlet = InletConditions::new(vec![subcooled(50.0, 1.0e5)]).with_back_pressure(0.5e5);
        let gap = pipe.advance(0.1, &inlet, props()).unwrap_err();
        assert_eq!(gap.owner, "fuel_line");
        assert_eq!(gap.field, "p_out");
    }

    #[test]
    fn missing_back_pressure_is_a_topology_gap() {
        let inlet = InletConditions::new(vec![subcooled(0.4, 3.0e6)]);
        let gap = line().advance(0.1, &inlet, props()).unwrap_err();
        assert_eq!(gap.table, "topology");
    }
}
