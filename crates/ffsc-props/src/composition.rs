//! Mixture composition (pure species or mixtures).

use crate::species::Species;
use ffsc_core::numeric::{Tolerances, nearly_equal};
use ffsc_core::{GapResult, MissingPropertyData};

/// Tolerance on the fraction sum accepted from table data.
pub const SUM_TOLERANCE: f64 = 1e-6;

/// Mixture composition stored as normalized mole fractions.
///
/// Fractions are non-negative and sum to one. Species below 1e-15 are dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    items: Vec<(Species, f64)>,
}

fn invalid(detail: &str) -> MissingPropertyData {
    MissingPropertyData::malformed("Composition", "composition", "fractions", detail)
}

impl Composition {
    pub fn pure(species: Species) -> Self {
        Self {
            items: vec![(species, 1.0)],
        }
    }

    /// Build from mole fractions, normalizing to a unit sum.
    pub fn new_mole_fractions(fractions: Vec<(Species, f64)>) -> GapResult<Self> {
        if fractions.is_empty() {
            return Err(invalid("empty composition"));
        }

        let mut sum = 0.0;
        for (_, frac) in &fractions {
            if !frac.is_finite() {
                return Err(invalid("non-finite fraction"));
            }
            if *frac < 0.0 {
                return Err(invalid("negative fraction"));
            }
            sum += frac;
        }
        if sum <= 0.0 || !sum.is_finite() {
            return Err(invalid("fractions sum to zero or non-finite"));
        }

        let mut items: Vec<(Species, f64)> = Vec::with_capacity(fractions.len());
        for (sp, f) in fractions {
            let f = f / sum;
            if f <= 1e-15 {
                continue;
            }
            match items.iter_mut().find(|(s, _)| *s == sp) {
                Some((_, acc)) => *acc += f,
                None => items.push((sp, f)),
            }
        }
        if items.is_empty() {
            return Err(invalid("all fractions negligible"));
        }
        items.sort_by_key(|(s, _)| *s);
        Ok(Self { items })
    }

    /// Build from mass fractions via x_i = (Y_i/M_i) / Σ(Y_j/M_j).
    pub fn from_mass_fractions(fractions: Vec<(Species, f64)>) -> GapResult<Self> {
        let moles = fractions
            .into_iter()
            .map(|(sp, y)| (sp, y / sp.molar_mass()))
            .collect();
        Self::new_mole_fractions(moles)
    }

    /// Mole fraction of a species (0.0 if not present).
    pub fn mole_fraction(&self, species: Species) -> f64 {
        self.items
            .iter()
            .find(|(s, _)| *s == species)
            .map(|(_, f)| *f)
            .unwrap_or(0.0)
    }

    /// Mass fraction of a species (0.0 if not present).
    pub fn mass_fraction(&self, species: Species) -> f64 {
        self.mole_fraction(species) * species.molar_mass() / self.molar_mass()
    }

    /// Mass fractions, in the same order as [`Composition::iter`].
    pub fn mass_fractions(&self) -> Vec<(Species, f64)> {
        let m = self.molar_mass();
        self.items
            .iter()
            .map(|(sp, x)| (*sp, x * sp.molar_mass() / m))
            .collect()
    }

    /// Returns `Some(species)` if exactly one species has fraction ≈1.0.
    pub fn is_pure(&self) -> Option<Species> {
        if self.items.len() == 1 {
            let (species, frac) = self.items[0];
            let tol = Tolerances {
                abs: 1e-10,
                rel: 1e-10,
            };
            if nearly_equal(frac, 1.0, tol) {
                return Some(species);
            }
        }
        None
    }

    pub fn iter(&self) -> impl Iterator<Item = (Species, f64)> + '_ {
        self.items.iter().copied()
    }

    pub fn species(&self) -> impl Iterator<Item = Species> + '_ {
        self.items.iter().map(|(s, _)| *s)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Mixture molar mass [kg/kmol]: M = Σ x_i M_i.
    pub fn molar_mass(&self) -> f64 {
        self.items
            .iter()
            .map(|(species, mole_frac)| species.molar_mass() * mole_frac)
            .sum()
    }
}

/// Check that externally supplied fractions already sum to one.
pub fn check_fraction_sum(
    fractions: &[(Species, f64)],
    owner: &str,
    table: &str,
    field: &str,
) -> GapResult<()> {
    let sum: f64 = fractions.iter().map(|(_, f)| f).sum();
    if (sum - 1.0).abs() <= SUM_TOLERANCE {
        Ok(())
    } else {
        Err(MissingPropertyData::out_of_range(
            owner,
            table,
            field,
            sum,
            Some(1.0 - SUM_TOLERANCE),
            Some(1.0 + SUM_TOLERANCE),
        ))
    }
}
