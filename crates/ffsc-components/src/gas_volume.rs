//! Well-mixed gas control volume shared by the preburner and the gas plenum.
//!
//! Mass, species and energy are integrated with explicit inflow terms and an
//! implicit relaxation of the mass fractions toward a target composition:
//!
//! ```text
//! m'     = m + dt·(Σṁᵢ − ṁ_out)
//! Y'ₛ    = [Yₛ·(m − dt·ṁ_out) + dt·Σṁᵢ·Yᵢₛ + dt·m'·Y*ₛ/τ] / [m'·(1 + dt/τ)]
//! m'cᵥ·(T' − T)/dt = Σṁᵢ·(hᵢ − Σₛ Yᵢₛ·uₛ(T)) − ṁ_out·R·T − Q − Σₛ ωₛ·uₛ(T)
//! ```
//!
//! with ωₛ = m'·(Y*ₛ − Y'ₛ)/τ the net production rate of each species.

use std::collections::BTreeMap;

use ffsc_core::GapResult;
use ffsc_props::composition::check_fraction_sum;
use ffsc_props::{Composition, Field, GapCollector, GasMixtureThermo, Species};
use serde::Deserialize;

use crate::common::{Attribute, check_finite, check_positive};
use crate::flow::{FlowState, Phase};

/// Mass fractions keyed by species in a table or engine document.
pub type FractionsRaw = BTreeMap<String, Option<f64>>;

/// Initial conditions of a gas volume in `system/engine.json`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GasVolumeParams {
    pub volume_m3: Field<f64>,
    #[serde(rename = "initial_pressure_Pa")]
    pub initial_pressure_pa: Field<f64>,
    #[serde(rename = "initial_temperature_K")]
    pub initial_temperature_k: Field<f64>,
    pub initial_mass_fractions: Field<FractionsRaw>,
    /// Wall heat loss of a plain plenum [W]; the preburner reads it from its table.
    #[serde(rename = "heat_loss_W")]
    pub heat_loss_w: Field<f64>,
}

/// Initial conditions read from [`GasVolumeParams`].
#[derive(Debug, Clone, PartialEq)]
pub struct VolumeInit {
    pub volume: f64,
    pub p: f64,
    pub t: f64,
    pub mass_fractions: Vec<(Species, f64)>,
}

impl GasVolumeParams {
    /// Validate volume, p, T and Y. Needs no property tables.
    pub fn read_init(&self, c: &mut GapCollector) -> Option<VolumeInit> {
        let volume = c.positive(&self.volume_m3, "volume_m3");
        let p = c.positive(&self.initial_pressure_pa, "initial_pressure_Pa");
        let t = c.positive(&self.initial_temperature_k, "initial_temperature_K");
        let mass_fractions = c.fractions(&self.initial_mass_fractions, "initial_mass_fractions");
        Some(VolumeInit {
            volume: volume?,
            p: p?,
            t: t?,
            mass_fractions: mass_fractions?,
        })
    }
}

/// Committed state of a gas volume.
#[derive(Debug, Clone, PartialEq)]
pub struct GasVolumeState {
    pub mass: f64,
    pub t: f64,
    pub p: f64,
    pub composition: Composition,
}

/// Relaxation target of the species balance.
#[derive(Debug, Clone, PartialEq)]
pub struct Relaxation {
    pub target: Vec<(Species, f64)>,
    /// Chemical time constant [s].
    pub tau: f64,
}

/// Per-step source terms of a gas volume.
#[derive(Debug, Clone, Copy)]
pub struct VolumeSources<'a> {
    pub inflow: &'a [FlowState],
    pub outflow: f64,
    pub heat_loss: f64,
}

/// Reading species-keyed mass fraction maps into a [`GapCollector`].
pub trait CollectFractions {
    fn fractions(&mut self, field: &Field<FractionsRaw>, name: &str) -> Option<Vec<(Species, f64)>>;
}

impl CollectFractions for GapCollector {
    fn fractions(&mut self, field: &Field<FractionsRaw>, name: &str) -> Option<Vec<(Species, f64)>> {
        let raw = match field.require(self.owner(), self.table(), name) {
            Ok(raw) => raw,
            Err(gap) => {
                self.record(gap);
                return None;
            }
        };
        let mut out = Vec::with_capacity(raw.len());
        let mut complete = true;
        for (key, value) in raw {
            let entry = format!("{name}.{key}");
            let species = match key.parse::<Species>() {
                Ok(sp) => Some(sp),
                Err(gap) => {
                    let gap = gap.attributed_to(self.owner().to_string());
                    self.record(gap);
                    None
                }
            };
            let value = match value {
                Some(v) => self.within(&Field::Value(*v), &entry, 0.0, 1.0),
                None => self.number(&Field::Null, &entry),
            };
            match (species, value) {
                (Some(sp), Some(v)) => out.push((sp, v)),
                _ => complete = false,
            }
        }
        if !complete {
            return None;
        }
        let owner = self.owner().to_string();
        let table = self.table().to_string();
        match check_fraction_sum(&out, &owner, &table, name) {
            Ok(()) => Some(out),
            Err(gap) => {
                self.record(gap);
                None
            }
        }
    }
}

/// Initial state from (p, T, Y), with the mass taken from the mixture density.
pub fn initial_state(gas: &GasMixtureThermo, owner: &str, init: VolumeInit) -> GapResult<GasVolumeState> {
    let VolumeInit {
        volume,
        p,
        t,
        mass_fractions,
    } = init;
    let composition = Composition::from_mass_fractions(mass_fractions).attribute(owner)?;
    let state = gas
        .state(ffsc_core::pa(p), ffsc_core::k(t), &composition)
        .attribute(owner)?;
    Ok(GasVolumeState {
        mass: state.rho.value * volume,
        t,
        p,
        composition,
    })
}

fn add_to(acc: &mut BTreeMap<Species, f64>, species: Species, amount: f64) {
    *acc.entry(species).or_insert(0.0) += amount;
}

/// One step of the control-volume balances. Returns the new state and the
/// species production rates ωₛ [kg/s].
pub fn advance_volume(
    gas: &GasMixtureThermo,
    owner: &str,
    volume: f64,
    state: &GasVolumeState,
    dt: f64,
    sources: VolumeSources<'_>,
    relaxation: Option<&Relaxation>,
) -> GapResult<(GasVolumeState, Vec<(Species, f64)>)> {
    let inflow: f64 = sources.inflow.iter().map(FlowState::mdot_kg_s).sum();
    let m = state.mass;
    let m2 = check_positive(m + dt * (inflow - sources.outflow), owner, "mass")?;

    let mut num: BTreeMap<Species, f64> = BTreeMap::new();
    let retained = m - dt * sources.outflow;
    for (sp, y) in state.composition.mass_fractions() {
        add_to(&mut num, sp, y * retained);
    }
    for stream in sources.inflow {
        for (sp, y) in stream.composition.mass_fractions() {
            add_to(&mut num, sp, dt * stream.mdot_kg_s() * y);
        }
    }
    let den = match relaxation {
        Some(r) => {
            for &(sp, y) in &r.target {
                add_to(&mut num, sp, dt * m2 * y / r.tau);
            }
            m2 * (1.0 + dt / r.tau)
        }
        None => m2,
    };
    let y2: Vec<(Species, f64)> = num
        .iter()
        .map(|(&sp, &n)| (sp, n.max(0.0) / den))
        .collect();
    let composition = Composition::from_mass_fractions(y2).attribute(owner)?;
    let y2 = composition.mass_fractions();

    let omega: Vec<(Species, f64)> = match relaxation {
        Some(r) => {
            let mut w: BTreeMap<Species, f64> = BTreeMap::new();
            for &(sp, y) in &r.target {
                add_to(&mut w, sp, m2 * y / r.tau);
            }
            for &(sp, y) in &y2 {
                add_to(&mut w, sp, -m2 * y / r.tau);
            }
            w.into_iter().collect()
        }
        None => Vec::new(),
    };

    let t = state.t;
    let cal = gas.caloric(t, &state.composition).attribute(owner)?;
    let mut rhs = -sources.outflow * cal.r_specific * t - sources.heat_loss;
    for stream in sources.inflow {
        let mut u_in = 0.0;
        for (sp, y) in stream.composition.mass_fractions() {
            u_in += y * gas.species_u(sp, t).attribute(owner)?;
        }
        rhs += stream.mdot_kg_s() * (stream.h - u_in);
    }
    for &(sp, w) in &omega {
        rhs -= w * gas.species_u(sp, t).attribute(owner)?;
    }
    let t2 = check_positive(t + dt * rhs / (m2 * cal.cv), owner, "T")?;
    let p2 = gas
        .pressure(m2 / volume, t2, &composition)
        .attribute(owner)?;
    let p2 = check_finite(p2, owner, "p")?;

    Ok((
        GasVolumeState {
            mass: m2,
            t: t2,
            p: p2,
            composition,
        },
        omega,
    ))
}

/// Outlet stream of a volume drawn at `mdot`.
pub fn outlet_stream(
    gas: &GasMixtureThermo,
    owner: &str,
    state: &GasVolumeState,
    mdot: f64,
) -> GapResult<FlowState> {
    let s = gas
        .state(ffsc_core::pa(state.p), ffsc_core::k(state.t), &state.composition)
        .attribute(owner)?;
    Ok(FlowState::new(
        mdot,
        state.p,
        state.t,
        s.h,
        s.rho.value,
        state.composition.clone(),
        Phase::Gas,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractions_collected_with_every_gap() {
        let raw: Field<FractionsRaw> =
            serde_json::from_str(r#"{"CH4": 0.5, "CO2": null, "Xe": 0.1, "H2O": 1.5}"#).unwrap();
        let mut c = GapCollector::new("preburner", "engine");
        assert!(c.fractions(&raw, "initial_mass_fractions").is_none());
        let report = c.into_report();
        let fields: Vec<&str> = report.iter().map(|g| g.field.as_str()).collect();
        assert!(fields.contains(&"initial_mass_fractions.CO2"));
        assert!(fields.contains(&"initial_mass_fractions.H2O"));
        assert!(fields.contains(&"Xe"));
    }

    #[test]
    fn fraction_sum_must_be_one() {
        let raw: Field<FractionsRaw> = serde_json::from_str(r#"{"CH4": 0.5, "CO2": 0.2}"#).unwrap();
        let mut c = GapCollector::new("main_chamber", "engine");
        assert!(c.fractions(&raw, "initial_mass_fractions").is_none());
        assert!(c.into_report().iter().all(|g| g.is_out_of_range()));

        let ok: Field<FractionsRaw> = serde_json::from_str(r#"{"CH4": 0.5, "CO2": 0.5}"#).unwrap();
        let mut c = GapCollector::new("main_chamber", "engine");
        assert_eq!(c.fractions(&ok, "y").unwrap().len(), 2);
    }
}
