//! Tank pressurant heat exchanger.
//!
//! Bleeds a fraction of the hot chamber gas and of the cold pump discharge
//! through opposite sides of a wall with thermal mass C. Each side exchanges
//! heat with the wall at an effectiveness ε = 1 − exp(−UA/(ṁ·c_p)), and the
//! wall temperature is advanced linearly implicitly.

use ffsc_core::constants::R_UNIVERSAL;
use ffsc_core::{GapResult, MissingPropertyData};
use ffsc_props::{Field, GapCollector, LoadResult, Metadata, PropertyBundle};
use serde::Deserialize;

use crate::common::{Attribute, check_finite, check_positive};
use crate::flow::{FlowState, InletConditions, Phase};
use crate::traits::{Advanced, ComponentModel};

/// `pressurizer/pressurizer_hx.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PressurizerTable {
    pub metadata: Metadata,
    pub hot_fraction: Field<f64>,
    pub cold_fraction: Field<f64>,
    #[serde(rename = "ua_W_K")]
    pub ua: Field<f64>,
    #[serde(rename = "wall_heat_capacity_J_K")]
    pub wall_heat_capacity: Field<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PressurizerParams {
    #[serde(rename = "initial_wall_temperature_K")]
    pub initial_wall_temperature_k: Field<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressurizerState {
    pub wall_t: f64,
    pub hot_out_t: f64,
    pub cold_out_t: f64,
    /// Heat from the hot stream into the wall [W].
    pub q_hot: f64,
    /// Heat from the wall into the cold stream [W].
    pub q_cold: f64,
    pub lmtd: Option<f64>,
}

/// Heat-exchanger effectiveness of one side with capacity rate `c_rate` [W/K].
pub fn effectiveness(ua: f64, c_rate: f64) -> f64 {
    if c_rate > 0.0 {
        1.0 - (-ua / c_rate).exp()
    } else {
        1.0
    }
}

/// Log-mean temperature difference; `None` when a terminal difference is not positive.
pub fn lmtd(dt1: f64, dt2: f64) -> Option<f64> {
    if dt1 <= 0.0 || dt2 <= 0.0 {
        return None;
    }
    if (dt1 - dt2).abs() <= 1e-9 * dt1.max(dt2) {
        return Some(0.5 * (dt1 + dt2));
    }
    Some((dt1 - dt2) / (dt1 / dt2).ln())
}

#[derive(Debug, Clone)]
pub struct Pressurizer {
    name: String,
    hot_fraction: f64,
    cold_fraction: f64,
    ua: f64,
    wall_capacity: f64,
    state: PressurizerState,
}

impl Pressurizer {
    pub fn from_tables(
        name: &str,
        params: &PressurizerParams,
        table_name: &str,
        table: &PressurizerTable,
    ) -> LoadResult<Self> {
        let mut c = GapCollector::new(name, table_name);
        let hot_fraction = c.within(&table.hot_fraction, "hot_fraction", 0.0, 1.0);
        let cold_fraction = c.within(&table.cold_fraction, "cold_fraction", 0.0, 1.0);
        let ua = c.positive(&table.ua, "ua_W_K");
        let wall_capacity = c.positive(&table.wall_heat_capacity, "wall_heat_capacity_J_K");

        let mut p = GapCollector::new(name, "engine");
        let wall_t = p.positive(&params.initial_wall_temperature_k, "initial_wall_temperature_K");
        c.merge(p.into_report());

        let value = (|| {
            let wall_t = wall_t?;
            Some(Self {
                name: name.to_string(),
                hot_fraction: hot_fraction?,
                cold_fraction: cold_fraction?,
                ua: ua?,
                wall_capacity: wall_capacity?,
                state: PressurizerState {
                    wall_t,
                    hot_out_t: wall_t,
                    cold_out_t: wall_t,
                    q_hot: 0.0,
                    q_cold: 0.0,
                    lmtd: None,
                },
            })
        })();
        c.finish(value)
    }
}

impl ComponentModel for Pressurizer {
    type State = PressurizerState;

    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &PressurizerState {
        &self.state
    }

    fn advance(
        &self,
        dt: f64,
        inlet: &InletConditions,
        props: &PropertyBundle,
    ) -> GapResult<Advanced<PressurizerState>> {
        let name = self.name.as_str();
        let (hot, cold) = match inlet.streams.as_slice() {
            [hot, cold] => (hot, cold),
            other => {
                return Err(MissingPropertyData::malformed(
                    name,
                    "topology",
                    "inlet",
                    format!("expected hot and cold taps, found {} inlets", other.len()),
                ));
            }
        };
        let (th, tc) = (hot.t_k(), cold.t_k());
        let mh = self.hot_fraction * hot.mdot_kg_s();
        let mc = self.cold_fraction * cold.mdot_kg_s();

        let cph = props
            .gas
            .caloric(th, &hot.composition)
            .attribute(name)?
            .cp;
        let cold_species = cold.propellant(name)?;
        let cpc = props
            .two_phase(cold_species)
            .and_then(|tp| tp.saturated_liquid(tc))
            .attribute(name)?
            .cp;
        let cpc = check_positive(cpc, name, "cp_cold")?;

        let eh = effectiveness(self.ua, mh * cph);
        let ec = effectiveness(self.ua, mc * cpc);
        let gh = eh * mh * cph;
        let gc = ec * mc * cpc;
        let c = self.wall_capacity;
        let wall_t = (c * self.state.wall_t + dt * (gh * th + gc * tc)) / (c + dt * (gh + gc));
        let wall_t = check_finite(wall_t, name, "wall_T")?;

        let cold_out_t = tc + ec * (wall_t - tc);
        let hot_out_t = th - eh * (th - wall_t);
        let q_hot = gh * (th - wall_t);
        let q_cold = gc * (wall_t - tc);

        let r = R_UNIVERSAL / cold_species.molar_mass_si();
        let cold_out_t = check_positive(cold_out_t, name, "T_cold_out")?;
        let outlet = FlowState::new(
            mc,
            cold.p_pa(),
            cold_out_t,
            cold.h + cpc * (cold_out_t - tc),
            cold.p_pa() / (r * cold_out_t),
            cold.composition.clone(),
            Phase::Gas,
        );
        Ok(Advanced {
            outlet,
            state: PressurizerState {
                wall_t,
                hot_out_t,
                cold_out_t,
                q_hot,
                q_cold,
                lmtd: lmtd(th - cold_out_t, hot_out_t - tc),
            },
        })
    }

    fn commit(&mut self, state: PressurizerState) {
        self.state = state;
    }

    fn derived(&self) -> Vec<(&'static str, f64)> {
        let mut out = vec![
            ("wall_temperature_K", self.state.wall_t),
            ("hot_outlet_temperature_K", self.state.hot_out_t),
            ("heat_hot_W", self.state.q_hot),
            ("heat_cold_W", self.state.q_cold),
        ];
        if let Some(v) = self.state.lmtd {
            out.push(("lmtd_K", v));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effectiveness_bounds() {
        assert_eq!(effectiveness(200.0, 0.0), 1.0);
        let e = effectiveness(200.0, 200.0);
        assert!((e - (1.0 - (-1.0_f64).exp())).abs() < 1e-15);
        assert!(effectiveness(200.0, 1e6) < 1e-3);
    }

    #[test]
    fn lmtd_cases() {
        assert_eq!(lmtd(-1.0, 10.0), None);
        assert_eq!(lmtd(10.0, 0.0), None);
        assert!((lmtd(20.0, 20.0).unwrap() - 20.0).abs() < 1e-12);
        let v = lmtd(40.0, 10.0).unwrap();
        assert!((v - 30.0 / 4.0_f64.ln()).abs() < 1e-12);
        assert!(v > 10.0 && v < 40.0);
    }

    #[test]
    fn bleed_fraction_above_one_rejected() {
        let table: PressurizerTable = serde_json::from_str(
            r#"{"hot_fraction": 1.5, "cold_fraction": 0.013, "ua_W_K": 200, "wall_heat_capacity_J_K": 5000}"#,
        )
        .unwrap();
        let params: PressurizerParams =
            serde_json::from_str(r#"{"initial_wall_temperature_K": 300}"#).unwrap();
        let report = Pressurizer::from_tables("pressurizer", &params, "pressurizer_hx", &table).unwrap_err();
        assert_eq!(report.len(), 1);
        assert!(report.iter().all(|g| g.field == "hot_fraction" && g.is_out_of_range()));
    }
}
