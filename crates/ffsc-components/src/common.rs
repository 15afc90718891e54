//! Shared correlations and checks for component calculations.

use ffsc_core::{GapResult, MissingPropertyData, ensure_finite};
use ffsc_props::{Field, GapCollector, Species};

/// Below this flow a stream is treated as stagnant (kg/s).
pub const EPSILON_MDOT: f64 = 1e-9;

/// Table name used for gaps raised by a component's own arithmetic.
pub const COMPUTED: &str = "computed";

/// Re-tag property failures with the component that asked.
pub trait Attribute<T> {
    fn attribute(self, owner: &str) -> GapResult<T>;
}

impl<T> Attribute<T> for GapResult<T> {
    fn attribute(self, owner: &str) -> GapResult<T> {
        self.map_err(|gap| gap.attributed_to(owner))
    }
}

/// Parameter validation helpers on top of [`GapCollector`].
pub trait CollectExt {
    fn species(&mut self, field: &Field<String>) -> Option<Species>;
    fn take<T>(&mut self, result: GapResult<T>) -> Option<T>;
}

impl CollectExt for GapCollector {
    fn species(&mut self, field: &Field<String>) -> Option<Species> {
        let parsed = field
            .require(self.owner(), self.table(), "species")
            .and_then(|key| key.parse::<Species>());
        match parsed {
            Ok(species) => Some(species),
            Err(gap) => {
                let gap = gap.attributed_to(self.owner().to_string());
                self.record(gap);
                None
            }
        }
    }

    fn take<T>(&mut self, result: GapResult<T>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(gap) => {
                self.record(gap);
                None
            }
        }
    }
}

/// Finite check on a computed quantity.
pub fn check_finite(value: f64, owner: &str, field: &str) -> GapResult<f64> {
    ensure_finite(value, owner, field)
}

/// A computed quantity that must stay strictly positive.
pub fn check_positive(value: f64, owner: &str, field: &str) -> GapResult<f64> {
    let value = check_finite(value, owner, field)?;
    if value > 0.0 {
        Ok(value)
    } else {
        Err(MissingPropertyData::out_of_range(
            owner,
            COMPUTED,
            field,
            value,
            Some(0.0),
            None,
        ))
    }
}

/// Churchill (1977) Darcy friction factor, valid across all regimes.
pub fn churchill(reynolds: f64, rel_roughness: f64) -> f64 {
    if reynolds <= 0.0 {
        return 0.0;
    }
    let a = (2.457 * (1.0 / ((7.0 / reynolds).powf(0.9) + 0.27 * rel_roughness)).ln()).powi(16);
    let b = (37530.0 / reynolds).powi(16);
    8.0 * ((8.0 / reynolds).powi(12) + (a + b).powf(-1.5)).powf(1.0 / 12.0)
}

/// Lockhart–Martinelli two-phase multiplier φ_l² = 1 + C/X + 1/X² (C = 20, turbulent-turbulent).
pub fn lockhart_martinelli(x: f64, rho_l: f64, rho_v: f64, mu_l: f64, mu_v: f64) -> f64 {
    if x <= 0.0 {
        return 1.0;
    }
    let xtt = ((1.0 - x) / x).powf(0.9) * (rho_v / rho_l).sqrt() * (mu_l / mu_v).powf(0.1);
    1.0 + 20.0 / xtt + 1.0 / (xtt * xtt)
}

/// Homogeneous mixture density from quality.
pub fn homogeneous_density(x: f64, rho_l: f64, rho_v: f64) -> f64 {
    1.0 / ((1.0 - x) / rho_l + x / rho_v)
}

/// Critical pressure ratio p*/p0 of an ideal gas.
pub fn critical_pressure_ratio(gamma: f64) -> f64 {
    (2.0 / (gamma + 1.0)).powf(gamma / (gamma - 1.0))
}

/// Dimensionless isentropic mass flux ṁ·√(RT0)/(A·p0) at pressure ratio η = p/p0.
pub fn isentropic_flux(eta: f64, gamma: f64) -> f64 {
    if eta >= 1.0 {
        return 0.0;
    }
    if eta <= critical_pressure_ratio(gamma) {
        (gamma * (2.0 / (gamma + 1.0)).powf((gamma + 1.0) / (gamma - 1.0))).sqrt()
    } else {
        let g = gamma;
        (2.0 * g / (g - 1.0) * (eta.powf(2.0 / g) - eta.powf((g + 1.0) / g))).sqrt()
    }
}
