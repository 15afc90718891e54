//! Hot-gas duct between two gas volumes, with wall heat exchange.

use ffsc_core::GapResult;
use ffsc_props::{Field, GapCollector, LoadResult, PropertyBundle};
use serde::Deserialize;

use crate::common::{Attribute, EPSILON_MDOT, check_finite, isentropic_flux};
use crate::flow::{FlowState, InletConditions, Phase};
use crate::traits::{Advanced, ComponentModel};

const RE_LAMINAR: f64 = 2300.0;
const RE_TURBULENT: f64 = 1.0e4;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GasPipeParams {
    pub area_m2: Field<f64>,
    /// Characteristic length for Re and the heat transfer coefficient.
    pub length_m: Field<f64>,
    pub heat_area_m2: Field<f64>,
    #[serde(rename = "wall_temperature_K")]
    pub wall_temperature_k: Field<f64>,
    pub initial_mdot_kg_s: Field<f64>,
}

/// Empirical flow coefficient C_q(η).
pub fn flow_coefficient(eta: f64) -> f64 {
    ((((-1.6827 * eta + 4.6) * eta - 3.9) * eta + 0.8415) * eta - 0.1) * eta + 0.8414
}

/// Laminar, turbulent and blended Nusselt number.
pub fn nusselt(re: f64, pr: f64, length_over_dh: f64, viscosity_ratio: f64) -> f64 {
    let wall = viscosity_ratio.powf(0.14);
    let laminar = |re: f64| 1.86 * (re * pr / length_over_dh).cbrt() * wall;
    let turbulent = |re: f64| 0.027 * re.powf(0.8) * pr.cbrt() * wall;
    if re < RE_LAMINAR {
        laminar(re)
    } else if re > RE_TURBULENT {
        turbulent(re)
    } else {
        let w = (re - RE_LAMINAR) / (RE_TURBULENT - RE_LAMINAR);
        (1.0 - w) * laminar(RE_LAMINAR) + w * turbulent(RE_TURBULENT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasPipeState {
    pub mdot: f64,
    pub reynolds: f64,
    pub nusselt: f64,
    /// Heat flow from the wall into the gas [W].
    pub wall_heat: f64,
}

#[derive(Debug, Clone)]
pub struct GasPipe {
    name: String,
    area: f64,
    length: f64,
    heat_area: f64,
    wall_t: f64,
    state: GasPipeState,
}

impl GasPipe {
    pub fn from_params(name: &str, params: &GasPipeParams) -> LoadResult<Self> {
        let mut c = GapCollector::new(name, "engine");
        let area = c.positive(&params.area_m2, "area_m2");
        let length = c.positive(&params.length_m, "length_m");
        let heat_area = c.number(&params.heat_area_m2, "heat_area_m2");
        let wall_t = c.positive(&params.wall_temperature_k, "wall_temperature_K");
        let mdot0 = c.number(&params.initial_mdot_kg_s, "initial_mdot_kg_s");
        let value = match (area, length, heat_area, wall_t, mdot0) {
            (Some(area), Some(length), Some(heat_area), Some(wall_t), Some(mdot)) => Some(Self {
                name: name.to_string(),
                area,
                length,
                heat_area,
                wall_t,
                state: GasPipeState {
                    mdot,
                    reynolds: 0.0,
                    nusselt: 0.0,
                    wall_heat: 0.0,
                },
            }),
            _ => None,
        };
        c.finish(value)
    }

    fn hydraulic_diameter(&self) -> f64 {
        (4.0 * self.area / std::f64::consts::PI).sqrt()
    }
}

impl ComponentModel for GasPipe {
    type State = GasPipeState;

    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &GasPipeState {
        &self.state
    }

    fn advance(
        &self,
        _dt: f64,
        inlet: &InletConditions,
        props: &PropertyBundle,
    ) -> GapResult<Advanced<GasPipeState>> {
        let name = self.name.as_str();
        let stream = inlet.single(name)?;
        let back = inlet.back_pressure(name)?;
        let (p, t) = (stream.p_pa(), stream.t_k());
        let gas = props
            .gas
            .state(stream.p, stream.t, &stream.composition)
            .attribute(name)?;

        let eta = back / p;
        let mdot = if eta >= 1.0 {
            0.0
        } else {
            // C_m·p/√T with the real-gas ρT/p in place of 1/R
            let ratio = gas.rho.value * t / p;
            let cm = isentropic_flux(eta, gas.gamma) * ratio.sqrt();
            self.area * flow_coefficient(eta) * cm * p / t.sqrt()
        };
        let mdot = check_finite(mdot, name, "mdot")?;

        let mu_wall = props
            .gas
            .viscosity(self.wall_t, &stream.composition)
            .attribute(name)?;
        let reynolds = mdot * self.length / (gas.mu * self.area);
        let nu = nusselt(reynolds, gas.pr, self.length / self.hydraulic_diameter(), gas.mu / mu_wall);
        let h_conv = nu * gas.k / self.length;
        let wall_heat = check_finite(h_conv * self.heat_area * (self.wall_t - t), name, "wall_heat")?;
        let dh = if mdot > EPSILON_MDOT { wall_heat / mdot } else { 0.0 };

        let t_out = t + dh / gas.cp;
        let outlet = FlowState::new(
            mdot,
            p,
            t_out,
            stream.h + dh,
            gas.rho.value * t / t_out,
            stream.composition.clone(),
            Phase::Gas,
        );
        Ok(Advanced {
            outlet,
            state: GasPipeState {
                mdot,
                reynolds,
                nusselt: nu,
                wall_heat,
            },
        })
    }

    fn commit(&mut self, state: GasPipeState) {
        self.state = state;
    }

    fn demand(&self) -> Option<f64> {
        Some(self.state.mdot)
    }

    fn derived(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("reynolds", self.state.reynolds),
            ("nusselt", self.state.nusselt),
            ("wall_heat_W", self.state.wall_heat),
        ]
    }
}
