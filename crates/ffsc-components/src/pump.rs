//! Centrifugal turbopump fed from a tank at fixed conditions.

use ffsc_core::constants::G0_MPS2;
use ffsc_core::{GapResult, MissingPropertyData};
use ffsc_props::{Composition, Field, GapCollector, LoadResult, Metadata, PropertyBundle, Species};
use nalgebra::{DMatrix, DVector};
use serde::Deserialize;

use crate::common::{Attribute, COMPUTED, CollectExt, check_finite, check_positive};
use crate::flow::{FlowState, InletConditions, Phase};
use crate::traits::{Advanced, ComponentModel};

/// One measured operating point.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PumpRowRaw {
    pub speed_rpm: Field<f64>,
    pub flow_m3_s: Field<f64>,
    pub head_m: Field<f64>,
    pub efficiency: Field<f64>,
}

/// `turbopump/<side>_pump.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PumpTable {
    pub metadata: Metadata,
    pub reference_speed_rpm: Field<f64>,
    /// Line inertance L/A [1/m].
    pub inertance_per_m: Field<f64>,
    pub area_m2: Field<f64>,
    pub loss_k: Field<f64>,
    pub rows: Field<Vec<PumpRowRaw>>,
}

/// Engine-level parameters of a pump.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PumpParams {
    pub species: Field<String>,
    #[serde(rename = "tank_pressure_Pa")]
    pub tank_pressure_pa: Field<f64>,
    #[serde(rename = "tank_temperature_K")]
    pub tank_temperature_k: Field<f64>,
    pub speed_rpm: Field<f64>,
    pub initial_mdot_kg_s: Field<f64>,
}

/// Quadratic head and efficiency maps normalized to the reference speed.
///
/// With s = N/N_ref and q = Q/s: H/s² = c0 + c1·q + c2·q², η = e0 + e1·q + e2·q².
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PumpMap {
    pub head: [f64; 3],
    pub efficiency: [f64; 3],
    /// Largest normalized flow covered by the data [m³/s].
    pub q_max: f64,
}

/// Least-squares quadratic through (x, y), solved on x scaled to [0, 1].
fn fit_quadratic(x: &[f64], y: &[f64], x_scale: f64) -> Option<[f64; 3]> {
    let a = DMatrix::from_fn(x.len(), 3, |i, j| (x[i] / x_scale).powi(j as i32));
    let b = DVector::from_column_slice(y);
    let at = a.transpose();
    let c = (&at * &a).lu().solve(&(&at * b))?;
    let coeffs = [c[0], c[1] / x_scale, c[2] / (x_scale * x_scale)];
    coeffs.iter().all(|v| v.is_finite()).then_some(coeffs)
}

impl PumpMap {
    pub fn head(&self, speed_ratio: f64, flow: f64) -> f64 {
        let [c0, c1, c2] = self.head;
        c0 * speed_ratio * speed_ratio + c1 * speed_ratio * flow + c2 * flow * flow
    }

    /// ∂H/∂Q at fixed speed.
    pub fn dhead_dflow(&self, speed_ratio: f64, flow: f64) -> f64 {
        self.head[1] * speed_ratio + 2.0 * self.head[2] * flow
    }

    pub fn efficiency(&self, speed_ratio: f64, flow: f64) -> f64 {
        let [e0, e1, e2] = self.efficiency;
        let q = flow / speed_ratio;
        e0 + e1 * q + e2 * q * q
    }

    /// Normalize every row to the reference speed by the affinity laws and fit.
    pub fn fit(
        rows: &[(f64, f64, f64, f64)],
        reference_speed: f64,
        owner: &str,
        table: &str,
    ) -> GapResult<Self> {
        if rows.len() < 3 {
            return Err(MissingPropertyData::malformed(
                owner,
                table,
                "rows",
                format!("need at least 3 operating points, found {}", rows.len()),
            ));
        }
        let mut q = Vec::with_capacity(rows.len());
        let mut h = Vec::with_capacity(rows.len());
        let mut e = Vec::with_capacity(rows.len());
        for &(speed, flow, head, eff) in rows {
            let s = speed / reference_speed;
            q.push(flow / s);
            h.push(head / (s * s));
            e.push(eff);
        }
        let q_max = q.iter().copied().fold(0.0, f64::max);
        let singular = || {
            MissingPropertyData::malformed(owner, table, "rows", "operating points do not determine a quadratic")
        };
        if q_max <= 0.0 {
            return Err(singular());
        }
        let head = fit_quadratic(&q, &h, q_max).ok_or_else(singular)?;
        let efficiency = fit_quadratic(&q, &e, q_max).ok_or_else(singular)?;
        Ok(Self {
            head,
            efficiency,
            q_max,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PumpState {
    pub mdot: f64,
    pub head: f64,
    pub efficiency: f64,
    pub p_out: f64,
    pub shaft_power: f64,
}

/// Pump with line inertance: I·dṁ/dt = p_tank + ρgH(Q) − p_back − K·ṁ²/(2ρA²).
#[derive(Debug, Clone)]
pub struct Pump {
    name: String,
    table: String,
    species: Species,
    tank_p: f64,
    tank_t: f64,
    speed_ratio: f64,
    inertance: f64,
    area: f64,
    loss_k: f64,
    map: PumpMap,
    state: PumpState,
}

impl Pump {
    pub fn from_tables(
        name: &str,
        params: &PumpParams,
        table_name: &str,
        table: &PumpTable,
    ) -> LoadResult<Self> {
        let mut c = GapCollector::new(name, table_name);
        let n_ref = c.positive(&table.reference_speed_rpm, "reference_speed_rpm");
        let inertance = c.positive(&table.inertance_per_m, "inertance_per_m");
        let area = c.positive(&table.area_m2, "area_m2");
        let loss_k = c.number(&table.loss_k, "loss_k");
        let mut rows = Vec::new();
        match table.rows.require(name, table_name, "rows") {
            Ok(raw) => {
                for (i, r) in raw.iter().enumerate() {
                    let f = |field: &str| format!("rows[{i}].{field}");
                    let row = (
                        c.positive(&r.speed_rpm, &f("speed_rpm")),
                        c.number(&r.flow_m3_s, &f("flow_m3_s")),
                        c.number(&r.head_m, &f("head_m")),
                        c.within(&r.efficiency, &f("efficiency"), 0.0, 1.0),
                    );
                    if let (Some(n), Some(q), Some(h), Some(e)) = row {
                        rows.push((n, q, h, e));
                    }
                }
            }
            Err(gap) => c.record(gap),
        }

        let mut p = GapCollector::new(name, "engine");
        let species = p.species(&params.species);
        let tank_p = p.positive(&params.tank_pressure_pa, "tank_pressure_Pa");
        let tank_t = p.positive(&params.tank_temperature_k, "tank_temperature_K");
        let speed = p.positive(&params.speed_rpm, "speed_rpm");
        let mdot0 = p.number(&params.initial_mdot_kg_s, "initial_mdot_kg_s");
        c.merge(p.into_report());

        let map = match (n_ref, c.is_clean()) {
            (Some(n_ref), true) => c.take(PumpMap::fit(&rows, n_ref, name, table_name)),
            _ => None,
        };

        let value = (|| {
            Some(Self {
                name: name.to_string(),
                table: table_name.to_string(),
                species: species?,
                tank_p: tank_p?,
                tank_t: tank_t?,
                speed_ratio: speed? / n_ref?,
                inertance: inertance?,
                area: area?,
                loss_k: loss_k?,
                map: map?,
                state: PumpState {
                    mdot: mdot0?,
                    head: 0.0,
                    efficiency: 0.0,
                    p_out: tank_p?,
                    shaft_power: 0.0,
                },
            })
        })();
        c.finish(value)
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn map(&self) -> &PumpMap {
        &self.map
    }

    fn out_of_map(&self, field: &str, value: f64, min: f64, max: f64) -> MissingPropertyData {
        MissingPropertyData::out_of_range(&self.name, &self.table, field, value, Some(min), Some(max))
    }
}

impl ComponentModel for Pump {
    type State = PumpState;

    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &PumpState {
        &self.state
    }

    fn advance(
        &self,
        dt: f64,
        inlet: &InletConditions,
        props: &PropertyBundle,
    ) -> GapResult<Advanced<PumpState>> {
        let name = self.name.as_str();
        let back = inlet.back_pressure(name)?;
        let liquid = props
            .two_phase(self.species)
            .and_then(|tp| tp.saturated_liquid(self.tank_t))
            .attribute(name)?;
        let rho = liquid.rho;
        let s = self.speed_ratio;
        let loss = |md: f64| self.loss_k * md * md / (2.0 * rho * self.area * self.area);

        // Linearly implicit in ṁ: only the stabilizing part of ∂f/∂ṁ is taken implicitly.
        let md = self.state.mdot;
        let flow = md / rho;
        let f = self.tank_p + rho * G0_MPS2 * self.map.head(s, flow) - back - loss(md);
        let df = G0_MPS2 * self.map.dhead_dflow(s, flow) - self.loss_k * md / (rho * self.area * self.area);
        let md2 = (md + dt * f / (self.inertance + dt * (-df).max(0.0))).max(0.0);
        let md2 = check_finite(md2, name, "mdot")?;

        let flow2 = md2 / rho;
        if flow2 / s > self.map.q_max {
            return Err(self.out_of_map("flow_m3_s", flow2 / s, 0.0, self.map.q_max));
        }
        let head = self.map.head(s, flow2);
        let eta = self.map.efficiency(s, flow2);
        if !(eta > 0.0 && eta <= 1.0) {
            return Err(self.out_of_map("efficiency", eta, 0.0, 1.0));
        }

        let p_out = self.tank_p + rho * G0_MPS2 * head - loss(md2);
        let p_out = check_positive(p_out, name, "p_out")?;
        let cp = check_positive(liquid.cp, name, "cp_liquid")?;
        let t_out = self.tank_t + G0_MPS2 * head * (1.0 / eta - 1.0) / cp;
        let h_out = liquid.h + G0_MPS2 * head / eta;
        let shaft_power = md2 * G0_MPS2 * head / eta;
        if !shaft_power.is_finite() {
            return Err(MissingPropertyData::malformed(name, COMPUTED, "shaft_power", "non-finite"));
        }

        Ok(Advanced {
            outlet: FlowState::new(
                md2,
                p_out,
                t_out,
                h_out,
                rho,
                Composition::pure(self.species),
                Phase::Liquid,
            ),
            state: PumpState {
                mdot: md2,
                head,
                efficiency: eta,
                p_out,
                shaft_power,
            },
        })
    }

    fn commit(&mut self, state: PumpState) {
        self.state = state;
    }

    fn demand(&self) -> Option<f64> {
        Some(self.state.mdot)
    }

    fn derived(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("head_m", self.state.head),
            ("efficiency", self.state.efficiency),
            ("shaft_power_W", self.state.shaft_power),
        ]
    }
}
