//! Convergent–divergent nozzle discharging the main chamber.

use ffsc_core::GapResult;
use ffsc_props::{Field, GapCollector, LoadResult, Metadata, PropertyBundle};
use serde::Deserialize;

use crate::common::{Attribute, check_finite, isentropic_flux};
use crate::flow::{FlowState, InletConditions, Phase};
use crate::traits::{Advanced, ComponentModel};

/// `nozzle/nozzle.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NozzleTable {
    pub metadata: Metadata,
    pub discharge_coefficient: Field<f64>,
    pub throat_area_m2: Field<f64>,
    pub exit_area_m2: Field<f64>,
    #[serde(rename = "exit_pressure_Pa")]
    pub exit_pressure_pa: Field<f64>,
    #[serde(rename = "h_conv_W_m2K")]
    pub h_conv: Field<f64>,
    pub heat_area_m2: Field<f64>,
    #[serde(rename = "wall_temperature_K")]
    pub wall_temperature_k: Field<f64>,
    pub cooling_area_m2: Field<f64>,
    pub cooling_coefficient: Field<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NozzleParams {
    #[serde(rename = "ambient_pressure_Pa")]
    pub ambient_pressure_pa: Field<f64>,
    pub initial_mdot_kg_s: Field<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Geometry {
    cd: f64,
    throat_area: f64,
    exit_area: f64,
    exit_p: f64,
    h_conv: f64,
    heat_area: f64,
    wall_t: f64,
    cooling_area: f64,
    cooling_coefficient: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NozzleState {
    pub mdot: f64,
    pub thrust: f64,
    pub exit_velocity: f64,
    pub cooling_mdot: f64,
    /// Heat flow from the wall into the gas [W]; negative when the gas heats the wall.
    pub wall_heat: f64,
}

#[derive(Debug, Clone)]
pub struct Nozzle {
    name: String,
    geometry: Geometry,
    ambient_p: f64,
    state: NozzleState,
}

impl Nozzle {
    pub fn from_tables(
        name: &str,
        params: &NozzleParams,
        table_name: &str,
        table: &NozzleTable,
    ) -> LoadResult<Self> {
        let mut c = GapCollector::new(name, table_name);
        let geometry = (|| {
            let g = (
                c.within(&table.discharge_coefficient, "discharge_coefficient", 0.0, 1.0),
                c.positive(&table.throat_area_m2, "throat_area_m2"),
                c.positive(&table.exit_area_m2, "exit_area_m2"),
                c.positive(&table.exit_pressure_pa, "exit_pressure_Pa"),
                c.number(&table.h_conv, "h_conv_W_m2K"),
                c.number(&table.heat_area_m2, "heat_area_m2"),
                c.positive(&table.wall_temperature_k, "wall_temperature_K"),
                c.number(&table.cooling_area_m2, "cooling_area_m2"),
                c.number(&table.cooling_coefficient, "cooling_coefficient"),
            );
            Some(Geometry {
                cd: g.0?,
                throat_area: g.1?,
                exit_area: g.2?,
                exit_p: g.3?,
                h_conv: g.4?,
                heat_area: g.5?,
                wall_t: g.6?,
                cooling_area: g.7?,
                cooling_coefficient: g.8?,
            })
        })();

        let mut p = GapCollector::new(name, "engine");
        let ambient_p = p.number(&params.ambient_pressure_pa, "ambient_pressure_Pa");
        let mdot0 = p.number(&params.initial_mdot_kg_s, "initial_mdot_kg_s");
        c.merge(p.into_report());

        let value = (|| {
            Some(Self {
                name: name.to_string(),
                geometry: geometry?,
                ambient_p: ambient_p?,
                state: NozzleState {
                    mdot: mdot0?,
                    thrust: 0.0,
                    exit_velocity: 0.0,
                    cooling_mdot: 0.0,
                    wall_heat: 0.0,
                },
            })
        })();
        c.finish(value)
    }

    pub fn thrust(&self) -> f64 {
        self.state.thrust
    }
}

/// Ideal exit velocity for expansion from (T0, p0) to p_e.
pub fn exit_velocity(gamma: f64, r: f64, t0: f64, p0: f64, pe: f64) -> f64 {
    let expansion = 1.0 - (pe / p0).powf((gamma - 1.0) / gamma);
    (2.0 * gamma / (gamma - 1.0) * r * t0 * expansion.max(0.0)).sqrt()
}

impl ComponentModel for Nozzle {
    type State = NozzleState;

    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &NozzleState {
        &self.state
    }

    fn advance(
        &self,
        _dt: f64,
        inlet: &InletConditions,
        props: &PropertyBundle,
    ) -> GapResult<Advanced<NozzleState>> {
        let name = self.name.as_str();
        let g = &self.geometry;
        let chamber = inlet.single(name)?;
        let (p0, t0) = (chamber.p_pa(), chamber.t_k());
        let cal = props
            .gas
            .caloric(t0, &chamber.composition)
            .attribute(name)?;
        let (gamma, r) = (cal.gamma, cal.r_specific);

        let flux = isentropic_flux(self.ambient_p / p0, gamma);
        let sqrt_rt = (r * t0).sqrt();
        let mdot = check_finite(g.cd * g.throat_area * p0 * flux / sqrt_rt, name, "mdot")?;
        let ve = exit_velocity(gamma, r, t0, p0, g.exit_p);
        let thrust = check_finite(mdot * ve + (g.exit_p - self.ambient_p) * g.exit_area, name, "thrust")?;
        let cooling_mdot = g.cooling_coefficient * g.cooling_area * p0 * flux / sqrt_rt;
        let wall_heat = g.h_conv * g.heat_area * (g.wall_t - t0);

        let ratio = (g.exit_p / p0).min(1.0);
        let t_exit = t0 * ratio.powf((gamma - 1.0) / gamma);
        let exit = props
            .gas
            .state(ffsc_core::pa(g.exit_p), ffsc_core::k(t_exit), &chamber.composition)
            .attribute(name)?;
        let outlet = FlowState::new(
            mdot,
            g.exit_p,
            t_exit,
            chamber.h - 0.5 * ve * ve,
            exit.rho.value,
            chamber.composition.clone(),
            Phase::Gas,
        );
        Ok(Advanced {
            outlet,
            state: NozzleState {
                mdot,
                thrust,
                exit_velocity: ve,
                cooling_mdot,
                wall_heat,
            },
        })
    }

    fn commit(&mut self, state: NozzleState) {
        self.state = state;
    }

    fn demand(&self) -> Option<f64> {
        Some(self.state.mdot)
    }

    fn derived(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("thrust_N", self.state.thrust),
            ("exit_velocity_m_s", self.state.exit_velocity),
            ("cooling_mdot_kg_s", self.state.cooling_mdot),
            ("wall_heat_W", self.state.wall_heat),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_velocity_limits() {
        assert_eq!(exit_velocity(1.3, 400.0, 900.0, 1e6, 1e6), 0.0);
        assert_eq!(exit_velocity(1.3, 400.0, 900.0, 1e6, 2e6), 0.0);
        // Infinite expansion: v = √(2γRT0/(γ−1))
        let v = exit_velocity(1.4, 287.0, 300.0, 1e6, 0.0);
        assert!((v - (2.0 * 1.4 * 287.0 * 300.0 / 0.4_f64).sqrt()).abs() < 1e-9);
    }

    #[test]
    fn table_and_engine_gaps_are_both_reported() {
        let table: NozzleTable = serde_json::from_str(
            r#"{"discharge_coefficient": 1.2, "throat_area_m2": 6e-4, "exit_area_m2": 2.4e-3,
                "exit_pressure_Pa": 8e4, "h_conv_W_m2K": 500, "heat_area_m2": 0.02,
                "wall_temperature_K": 700, "cooling_area_m2": 1e-5, "cooling_coefficient": null}"#,
        )
        .unwrap();
        let params = NozzleParams::default();
        let report = Nozzle::from_tables("nozzle", &params, "nozzle", &table).unwrap_err();
        let fields: Vec<(&str, &str)> = report
            .iter()
            .map(|g| (g.table.as_str(), g.field.as_str()))
            .collect();
        assert!(fields.contains(&("nozzle", "discharge_coefficient")));
        assert!(fields.contains(&("nozzle", "cooling_coefficient")));
        assert!(fields.contains(&("engine", "ambient_pressure_Pa")));
        assert!(fields.contains(&("engine", "initial_mdot_kg_s")));
    }
}
