//! Fuel-rich preburner: a gas volume whose products relax toward tabulated
//! equilibrium at the current mixture ratio.

use ffsc_core::{GapReport, GapResult, MissingPropertyData};
use ffsc_props::{Field, GapCollector, LoadResult, Metadata, PropertyBundle, Species};
use serde::Deserialize;

use crate::common::{CollectExt, EPSILON_MDOT};
use crate::flow::InletConditions;
use crate::gas_volume::{
    CollectFractions, FractionsRaw, GasVolumeParams, GasVolumeState, Relaxation, VolumeSources,
    advance_volume, initial_state, outlet_stream,
};
use crate::traits::{Advanced, ComponentModel};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EquilibriumRowRaw {
    pub of_ratio: Field<f64>,
    pub chemical_time_s: Field<f64>,
    #[serde(rename = "heat_loss_W")]
    pub heat_loss_w: Field<f64>,
    pub mass_fractions: Field<FractionsRaw>,
}

/// `preburner/equilibrium.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EquilibriumTableRaw {
    pub metadata: Metadata,
    pub rows: Field<Vec<EquilibriumRowRaw>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EquilibriumRow {
    pub of_ratio: f64,
    pub chemical_time: f64,
    pub heat_loss: f64,
    pub mass_fractions: Vec<(Species, f64)>,
}

/// Equilibrium products as a function of O/F, linear between rows.
#[derive(Debug, Clone, PartialEq)]
pub struct EquilibriumTable {
    table: String,
    rows: Vec<EquilibriumRow>,
}

impl EquilibriumTable {
    pub fn from_raw(raw: &EquilibriumTableRaw, owner: &str, table: &str) -> LoadResult<Self> {
        let mut c = GapCollector::new(owner, table);
        let mut rows = Vec::new();
        match raw.rows.require(owner, table, "rows") {
            Ok(list) => {
                for (i, r) in list.iter().enumerate() {
                    let f = |field: &str| format!("rows[{i}].{field}");
                    let row = (
                        c.number(&r.of_ratio, &f("of_ratio")),
                        c.positive(&r.chemical_time_s, &f("chemical_time_s")),
                        c.number(&r.heat_loss_w, &f("heat_loss_W")),
                        c.fractions(&r.mass_fractions, &f("mass_fractions")),
                    );
                    if let (Some(of_ratio), Some(chemical_time), Some(heat_loss), Some(y)) = row {
                        rows.push(EquilibriumRow {
                            of_ratio,
                            chemical_time,
                            heat_loss,
                            mass_fractions: y,
                        });
                    }
                }
            }
            Err(gap) => c.record(gap),
        }
        if c.is_clean() {
            if rows.len() < 2 {
                c.record(MissingPropertyData::malformed(
                    owner,
                    table,
                    "rows",
                    format!("need at least 2 rows, found {}", rows.len()),
                ));
            } else if rows.windows(2).any(|w| w[1].of_ratio <= w[0].of_ratio) {
                c.record(MissingPropertyData::malformed(
                    owner,
                    table,
                    "of_ratio",
                    "rows must be strictly increasing in O/F",
                ));
            }
        }
        let value = c.is_clean().then(|| Self {
            table: table.to_string(),
            rows,
        });
        c.finish(value)
    }

    pub fn range(&self) -> (f64, f64) {
        let lo = self.rows.first().map_or(0.0, |r| r.of_ratio);
        let hi = self.rows.last().map_or(0.0, |r| r.of_ratio);
        (lo, hi)
    }

    /// Interpolated row at `of_ratio`. Outside the table is out of range.
    pub fn at(&self, of_ratio: f64, owner: &str) -> GapResult<EquilibriumRow> {
        let (lo, hi) = self.range();
        if !(lo..=hi).contains(&of_ratio) {
            return Err(MissingPropertyData::out_of_range(
                owner,
                &self.table,
                "of_ratio",
                of_ratio,
                Some(lo),
                Some(hi),
            ));
        }
        let i = self
            .rows
            .windows(2)
            .position(|w| of_ratio <= w[1].of_ratio)
            .unwrap_or(0);
        let (a, b) = (&self.rows[i], &self.rows[i + 1]);
        let w = (of_ratio - a.of_ratio) / (b.of_ratio - a.of_ratio);
        let lerp = |x: f64, y: f64| x + w * (y - x);

        let mut y: Vec<(Species, f64)> = Vec::new();
        for sp in Species::ALL {
            let ya = fraction(&a.mass_fractions, sp);
            let yb = fraction(&b.mass_fractions, sp);
            let v = lerp(ya, yb);
            if v > 0.0 {
                y.push((sp, v));
            }
        }
        Ok(EquilibriumRow {
            of_ratio,
            chemical_time: lerp(a.chemical_time, b.chemical_time),
            heat_loss: lerp(a.heat_loss, b.heat_loss),
            mass_fractions: y,
        })
    }
}

fn fraction(y: &[(Species, f64)], species: Species) -> f64 {
    y.iter().find(|(s, _)| *s == species).map_or(0.0, |(_, v)| *v)
}

/// O/F of the combined inflow from its CH4 and O2 content.
pub fn mixture_ratio(inlet: &InletConditions) -> f64 {
    let mut fuel = 0.0;
    let mut ox = 0.0;
    for s in &inlet.streams {
        let y = s.composition.mass_fractions();
        fuel += s.mdot_kg_s() * fraction(&y, Species::CH4);
        ox += s.mdot_kg_s() * fraction(&y, Species::O2);
    }
    if fuel > EPSILON_MDOT {
        ox / fuel
    } else {
        f64::INFINITY
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreburnerState {
    pub volume: GasVolumeState,
    pub of_ratio: f64,
    /// Flow drawn by the downstream element [kg/s].
    pub mdot_out: f64,
}

#[derive(Debug, Clone)]
pub struct Preburner {
    name: String,
    volume: f64,
    equilibrium: EquilibriumTable,
    state: PreburnerState,
}

impl Preburner {
    pub fn from_tables(
        name: &str,
        params: &GasVolumeParams,
        table_name: &str,
        table: &EquilibriumTableRaw,
        props: &PropertyBundle,
    ) -> LoadResult<Self> {
        let mut c = GapCollector::new(name, "engine");
        let equilibrium = c.absorb(EquilibriumTable::from_raw(table, name, table_name));
        let init = params.read_init(&mut c);
        let volume = init.as_ref().map(|i| i.volume);
        let state = init.and_then(|i| c.take(initial_state(&props.gas, name, i)));

        let value = (|| {
            Some(Self {
                name: name.to_string(),
                volume: volume?,
                equilibrium: equilibrium?,
                state: PreburnerState {
                    volume: state?,
                    of_ratio: 0.0,
                    mdot_out: 0.0,
                },
            })
        })();
        c.finish(value)
    }

    /// Gaps of the parameters and equilibrium table alone.
    pub fn check_tables(
        name: &str,
        params: &GasVolumeParams,
        table_name: &str,
        table: &EquilibriumTableRaw,
    ) -> GapReport {
        let mut c = GapCollector::new(name, "engine");
        c.absorb(EquilibriumTable::from_raw(table, name, table_name));
        params.read_init(&mut c);
        c.into_report()
    }

    pub fn equilibrium(&self) -> &EquilibriumTable {
        &self.equilibrium
    }
}

impl ComponentModel for Preburner {
    type State = PreburnerState;

    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &PreburnerState {
        &self.state
    }

    fn advance(
        &self,
        dt: f64,
        inlet: &InletConditions,
        props: &PropertyBundle,
    ) -> GapResult<Advanced<PreburnerState>> {
        let name = self.name.as_str();
        let demand = inlet.demand(name)?;
        let of_ratio = mixture_ratio(inlet);
        let eq = self.equilibrium.at(of_ratio, name)?;
        let relaxation = Relaxation {
            target: eq.mass_fractions,
            tau: eq.chemical_time,
        };
        let sources = VolumeSources {
            inflow: &inlet.streams,
            outflow: demand,
            heat_loss: eq.heat_loss,
        };
        let (volume, _omega) = advance_volume(
            &props.gas,
            name,
            self.volume,
            &self.state.volume,
            dt,
            sources,
            Some(&relaxation),
        )?;
        let outlet = outlet_stream(&props.gas, name, &volume, demand)?;
        Ok(Advanced {
            outlet,
            state: PreburnerState {
                volume,
                of_ratio,
                mdot_out: demand,
            },
        })
    }

    fn commit(&mut self, state: PreburnerState) {
        self.state = state;
    }

    fn upstream_pressure(&self, _props: &PropertyBundle) -> GapResult<Option<f64>> {
        Ok(Some(self.state.volume.p))
    }

    fn derived(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("mass_kg", self.state.volume.mass),
            ("of_ratio", self.state.of_ratio),
        ]
    }
}
