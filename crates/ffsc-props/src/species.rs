//! Chemical species known to the property engine.

use std::fmt;
use std::str::FromStr;

use ffsc_core::MissingPropertyData;
use serde::{Deserialize, Serialize};

/// Species appearing in the propellant feed and combustion product streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Species {
    /// Methane (CH₄)
    CH4,
    /// Oxygen (O₂)
    O2,
    /// Water (H₂O)
    H2O,
    /// Carbon monoxide (CO)
    CO,
    /// Carbon dioxide (CO₂)
    CO2,
    /// Hydrogen (H₂)
    H2,
}

impl Species {
    pub const ALL: [Species; 6] = [
        Species::CH4,
        Species::O2,
        Species::H2O,
        Species::CO,
        Species::CO2,
        Species::H2,
    ];

    /// Key used for this species in every table file.
    pub fn key(&self) -> &'static str {
        match self {
            Species::CH4 => "CH4",
            Species::O2 => "O2",
            Species::H2O => "H2O",
            Species::CO => "CO",
            Species::CO2 => "CO2",
            Species::H2 => "H2",
        }
    }

    /// Molar mass [kg/kmol].
    pub fn molar_mass(&self) -> f64 {
        match self {
            Species::CH4 => 16.043,
            Species::O2 => 31.998,
            Species::H2O => 18.015_28,
            Species::CO => 28.010_1,
            Species::CO2 => 44.009_5,
            Species::H2 => 2.015_88,
        }
    }

    /// Molar mass [kg/mol].
    pub fn molar_mass_si(&self) -> f64 {
        self.molar_mass() * 1e-3
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Species {
    type Err = MissingPropertyData;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Species::ALL
            .iter()
            .copied()
            .find(|sp| sp.key().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                MissingPropertyData::malformed("Species", "species", s, "unknown species key")
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_round_trip_through_from_str() {
        for sp in Species::ALL {
            assert_eq!(sp.key().parse::<Species>().unwrap(), sp);
        }
        assert_eq!("ch4".parse::<Species>().unwrap(), Species::CH4);
    }

    #[test]
    fn unknown_key_is_malformed() {
        let err = "N2O4".parse::<Species>().unwrap_err();
        assert_eq!(err.field, "N2O4");
    }

    #[test]
    fn molar_masses_are_positive() {
        for sp in Species::ALL {
            assert!(sp.molar_mass() > 1.0);
            assert!((sp.molar_mass_si() - sp.molar_mass() / 1000.0).abs() < 1e-15);
        }
    }
}
