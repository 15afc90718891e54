//! Pure-species transport fits and mixture rules.
//!
//! Each species carries piecewise fits ln(prop) = a·ln T + b/T + c/T² + d with
//! viscosity in µP and conductivity in µW/(cm·K). Mixture viscosity follows
//! Wilke; conductivity follows Mason–Saxena with ε = 1.065 off the diagonal.

use std::collections::BTreeMap;

use ffsc_core::{GapResult, MissingPropertyData};

use crate::composition::Composition;
use crate::species::Species;
use crate::tables::{GapCollector, LoadResult, TransportSegmentRaw, TransportTable};

const TABLE: &str = "transport";
const MICROPOISE_TO_PA_S: f64 = 1e-7;
const MICROW_PER_CM_K_TO_W_PER_M_K: f64 = 1e-4;
const MASON_SAXENA_EPSILON: f64 = 1.065;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitSegment {
    pub t_min: f64,
    pub t_max: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
}

impl FitSegment {
    fn eval(&self, t: f64) -> f64 {
        (self.a * t.ln() + self.b / t + self.c / (t * t) + self.d).exp()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpeciesTransport {
    pub viscosity: Vec<FitSegment>,
    pub conductivity: Vec<FitSegment>,
}

/// Mixture transport properties.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransportProps {
    /// Pa·s
    pub mu: f64,
    /// W/(m·K)
    pub k: f64,
    /// cp·μ/k
    pub pr: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Transport {
    species: BTreeMap<Species, SpeciesTransport>,
}

fn pick(segments: &[FitSegment], t: f64, species: Species, field: &str) -> GapResult<f64> {
    let hit = segments
        .iter()
        .find(|s| t >= s.t_min && t <= s.t_max)
        .map(|s| s.eval(t));
    hit.ok_or_else(|| {
        let min = segments.iter().map(|s| s.t_min).reduce(f64::min);
        let max = segments.iter().map(|s| s.t_max).reduce(f64::max);
        MissingPropertyData::out_of_range(
            "Transport",
            format!("{TABLE}[{species}]"),
            field,
            t,
            min,
            max,
        )
    })
}

fn load_segments(
    c: &mut GapCollector,
    raw: &crate::tables::Field<Vec<TransportSegmentRaw>>,
    name: &str,
) -> Option<Vec<FitSegment>> {
    let owner = c.owner().to_string();
    let table = c.table().to_string();
    let segments = match raw.require(&owner, &table, name) {
        Ok(s) => s,
        Err(gap) => {
            c.record(gap);
            return None;
        }
    };
    if segments.is_empty() {
        c.record(MissingPropertyData::malformed(owner, table, name, "no fit segments"));
        return None;
    }
    let mut out = Vec::with_capacity(segments.len());
    for (i, seg) in segments.iter().enumerate() {
        let f = |part: &str| format!("{name}[{i}].{part}");
        let fit = (|| {
            Some(FitSegment {
                t_min: c.positive(&seg.t_min, &f("T_min"))?,
                t_max: c.positive(&seg.t_max, &f("T_max"))?,
                a: c.number(&seg.a, &f("a"))?,
                b: c.number(&seg.b, &f("b"))?,
                c: c.number(&seg.c, &f("c"))?,
                d: c.number(&seg.d, &f("d"))?,
            })
        })();
        if let Some(fit) = fit {
            out.push(fit);
        }
    }
    (out.len() == segments.len()).then_some(out)
}

impl Transport {
    pub fn new(entries: impl IntoIterator<Item = (Species, SpeciesTransport)>) -> Self {
        Self {
            species: entries.into_iter().collect(),
        }
    }

    pub fn from_table(raw: &TransportTable, owner: &str) -> LoadResult<Self> {
        let mut c = GapCollector::new(owner, TABLE);
        let mut species = BTreeMap::new();
        for (key, entry) in &raw.species {
            let Ok(sp) = key.parse::<Species>() else {
                tracing::debug!(species = %key, "skipping unknown species in transport table");
                continue;
            };
            let viscosity = load_segments(&mut c, &entry.viscosity, &format!("{key}.viscosity"));
            let conductivity =
                load_segments(&mut c, &entry.conductivity, &format!("{key}.conductivity"));
            if let (Some(viscosity), Some(conductivity)) = (viscosity, conductivity) {
                species.insert(
                    sp,
                    SpeciesTransport {
                        viscosity,
                        conductivity,
                    },
                );
            }
        }
        c.finish(Some(Self { species }))
    }

    fn entry(&self, species: Species) -> GapResult<&SpeciesTransport> {
        self.species
            .get(&species)
            .ok_or_else(|| MissingPropertyData::absent("Transport", TABLE, species.key()))
    }

    /// Pure-species viscosity [Pa·s].
    pub fn viscosity(&self, species: Species, t: f64) -> GapResult<f64> {
        Ok(pick(&self.entry(species)?.viscosity, t, species, "viscosity")? * MICROPOISE_TO_PA_S)
    }

    /// Pure-species thermal conductivity [W/(m·K)].
    pub fn conductivity(&self, species: Species, t: f64) -> GapResult<f64> {
        Ok(pick(&self.entry(species)?.conductivity, t, species, "conductivity")?
            * MICROW_PER_CM_K_TO_W_PER_M_K)
    }

    /// Mixture viscosity (Wilke) only.
    pub fn mixture_viscosity(&self, t: f64, comp: &Composition) -> GapResult<f64> {
        let pure = self.pure_values(t, comp)?;
        Ok(mix(&pure, |p| p.mu, 1.0))
    }

    /// Mixture μ, k and Pr. `cp_mass` is the mixture cp [J/(kg·K)].
    pub fn mixture(&self, t: f64, comp: &Composition, cp_mass: f64) -> GapResult<TransportProps> {
        let pure = self.pure_values(t, comp)?;
        let mu = mix(&pure, |p| p.mu, 1.0);
        let k = mix(&pure, |p| p.k, MASON_SAXENA_EPSILON);
        Ok(TransportProps {
            mu,
            k,
            pr: cp_mass * mu / k,
        })
    }

    fn pure_values(&self, t: f64, comp: &Composition) -> GapResult<Vec<Pure>> {
        comp.iter()
            .map(|(sp, x)| {
                Ok(Pure {
                    x,
                    molar_mass: sp.molar_mass(),
                    mu: self.viscosity(sp, t)?,
                    k: self.conductivity(sp, t)?,
                })
            })
            .collect()
    }
}

struct Pure {
    x: f64,
    molar_mass: f64,
    mu: f64,
    k: f64,
}

/// Wilke interaction parameter φ_ij.
pub fn wilke_phi(mu_i: f64, mu_j: f64, m_i: f64, m_j: f64) -> f64 {
    (1.0 + (mu_i / mu_j).sqrt() * (m_j / m_i).powf(0.25)).powi(2)
        / (8.0 * (1.0 + m_i / m_j)).sqrt()
}

/// Σ x_i prop_i / Σ_j x_j Φ_ij with Φ_ii = 1 and Φ_ij = ε φ_ij otherwise.
fn mix(pure: &[Pure], prop: impl Fn(&Pure) -> f64, epsilon: f64) -> f64 {
    pure.iter()
        .enumerate()
        .map(|(i, pi)| {
            let den: f64 = pure
                .iter()
                .enumerate()
                .map(|(j, pj)| {
                    let phi = if i == j {
                        1.0
                    } else {
                        epsilon * wilke_phi(pi.mu, pj.mu, pi.molar_mass, pj.molar_mass)
                    };
                    pj.x * phi
                })
                .sum();
            pi.x * prop(pi) / den
        })
        .sum()
}
