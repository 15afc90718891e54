//! NASA 7-coefficient ideal-gas polynomials.
//!
//! cp/R = a1 + a2 T + a3 T² + a4 T³ + a5 T⁴, with a6 and a7 the enthalpy and
//! entropy integration constants. The high segment applies for T ≥ T_mid.

use std::collections::BTreeMap;

use ffsc_core::constants::R_UNIVERSAL;
use ffsc_core::{GapResult, MissingPropertyData};

use crate::composition::Composition;
use crate::species::Species;
use crate::tables::{GapCollector, LoadResult, Nasa7Table as Nasa7Raw};

const TABLE: &str = "nasa7";

#[derive(Debug, Clone, PartialEq)]
pub struct Nasa7Species {
    pub species: Species,
    pub t_low: f64,
    pub t_mid: f64,
    pub t_high: f64,
    pub low: [f64; 7],
    pub high: [f64; 7],
}

/// Ideal-gas mixture properties on a molar basis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IdealMixture {
    /// J/(mol·K)
    pub cp: f64,
    /// J/mol
    pub h: f64,
    /// J/(mol·K), pure-component entropies at the reference pressure, no mixing term
    pub s: f64,
}

impl Nasa7Species {
    fn segment(&self, t: f64) -> GapResult<&[f64; 7]> {
        if !t.is_finite() || t < self.t_low || t > self.t_high {
            return Err(MissingPropertyData::out_of_range(
                "Nasa7",
                format!("{TABLE}[{}]", self.species),
                "T",
                t,
                Some(self.t_low),
                Some(self.t_high),
            ));
        }
        Ok(if t >= self.t_mid { &self.high } else { &self.low })
    }

    pub fn cp_r(&self, t: f64) -> GapResult<f64> {
        let a = self.segment(t)?;
        Ok(a[0] + t * (a[1] + t * (a[2] + t * (a[3] + t * a[4]))))
    }

    pub fn h_rt(&self, t: f64) -> GapResult<f64> {
        let a = self.segment(t)?;
        Ok(a[0]
            + t * (a[1] / 2.0 + t * (a[2] / 3.0 + t * (a[3] / 4.0 + t * a[4] / 5.0)))
            + a[5] / t)
    }

    pub fn s_r(&self, t: f64) -> GapResult<f64> {
        let a = self.segment(t)?;
        Ok(a[0] * t.ln() + t * (a[1] + t * (a[2] / 2.0 + t * (a[3] / 3.0 + t * a[4] / 4.0))) + a[6])
    }

    /// Specific enthalpy [J/kg].
    pub fn h_mass(&self, t: f64) -> GapResult<f64> {
        Ok(self.h_rt(t)? * R_UNIVERSAL * t / self.species.molar_mass_si())
    }

    /// Specific internal energy [J/kg].
    pub fn u_mass(&self, t: f64) -> GapResult<f64> {
        Ok((self.h_rt(t)? - 1.0) * R_UNIVERSAL * t / self.species.molar_mass_si())
    }

    /// Specific heat at constant pressure [J/(kg·K)].
    pub fn cp_mass(&self, t: f64) -> GapResult<f64> {
        Ok(self.cp_r(t)? * R_UNIVERSAL / self.species.molar_mass_si())
    }
}

/// Per-species NASA-7 data.
#[derive(Debug, Clone, Default)]
pub struct Nasa7 {
    species: BTreeMap<Species, Nasa7Species>,
}

impl Nasa7 {
    pub fn new(entries: impl IntoIterator<Item = Nasa7Species>) -> Self {
        Self {
            species: entries.into_iter().map(|e| (e.species, e)).collect(),
        }
    }

    pub fn from_table(raw: &Nasa7Raw, owner: &str) -> LoadResult<Self> {
        let mut c = GapCollector::new(owner, TABLE);
        let mut out = BTreeMap::new();
        for (key, entry) in &raw.species {
            let Ok(species) = key.parse::<Species>() else {
                tracing::debug!(species = %key, "skipping unknown species in NASA-7 table");
                continue;
            };
            let t_low = c.positive(&entry.t_low, &format!("{key}.T_low"));
            let t_mid = c.positive(&entry.t_mid, &format!("{key}.T_mid"));
            let t_high = c.positive(&entry.t_high, &format!("{key}.T_high"));
            let low = c.array::<7>(&entry.low, &format!("{key}.low"));
            let high = c.array::<7>(&entry.high, &format!("{key}.high"));
            let (Some(t_low), Some(t_mid), Some(t_high), Some(low), Some(high)) =
                (t_low, t_mid, t_high, low, high)
            else {
                continue;
            };
            if !(t_low < t_mid && t_mid < t_high) {
                c.record(MissingPropertyData::malformed(
                    owner,
                    TABLE,
                    format!("{key}.T_mid"),
                    format!("ranges not ordered: {t_low} < {t_mid} < {t_high}"),
                ));
                continue;
            }
            out.insert(
                species,
                Nasa7Species {
                    species,
                    t_low,
                    t_mid,
                    t_high,
                    low,
                    high,
                },
            );
        }
        c.finish(Some(Self { species: out }))
    }

    pub fn species(&self, species: Species) -> GapResult<&Nasa7Species> {
        self.species
            .get(&species)
            .ok_or_else(|| MissingPropertyData::absent("Nasa7", TABLE, species.key()))
    }

    /// Mole-fraction weighted cp, h and s.
    pub fn mixture(&self, t: f64, comp: &Composition) -> GapResult<IdealMixture> {
        let mut out = IdealMixture {
            cp: 0.0,
            h: 0.0,
            s: 0.0,
        };
        for (sp, x) in comp.iter() {
            let data = self.species(sp)?;
            out.cp += x * data.cp_r(t)? * R_UNIVERSAL;
            out.h += x * data.h_rt(t)? * R_UNIVERSAL * t;
            out.s += x * data.s_r(t)? * R_UNIVERSAL;
        }
        Ok(out)
    }

    /// Mass-weighted specific internal energy [J/kg].
    pub fn u_mass(&self, t: f64, mass_fractions: &[(Species, f64)]) -> GapResult<f64> {
        let mut u = 0.0;
        for &(sp, y) in mass_fractions {
            u += y * self.species(sp)?.u_mass(t)?;
        }
        Ok(u)
    }
}



#[cfg(test)]
mod proptests {
    use super::fixtures::gri_subset;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn cp_continuous_at_switch(idx in 0usize..3) {
            let nasa = gri_subset();
            let sp = [crate::Species::CH4, crate::Species::O2, crate::Species::H2O][idx];
            let data = nasa.species(sp).unwrap();
            let t = data.t_mid;
            let eval = |a: &[f64; 7]| a[0] + t * (a[1] + t * (a[2] + t * (a[3] + t * a[4])));
            let lo = eval(&data.low);
            let hi = eval(&data.high);
            prop_assert!((lo - hi).abs() <= 1e-6 * hi.abs());
        }
    }
}
