//! Real-gas mixture surface for combustion products.
//!
//! Density comes from the cubic EOS vapor root. Caloric properties are the
//! NASA-7 ideal-gas mixture values, and transport comes from the Wilke and
//! Mason–Saxena rules.

use ffsc_core::constants::R_UNIVERSAL;
use ffsc_core::units::{Density, Pressure, Temperature, kg_per_m3};
use ffsc_core::{GapResult, MissingPropertyData};

use crate::composition::Composition;
use crate::cubic::{Branch, CubicEos};
use crate::nasa7::Nasa7;
use crate::species::Species;
use crate::transport::{Transport, TransportProps};

/// Complete thermodynamic state of a gas mixture. Specific quantities per kg.
#[derive(Debug, Clone, PartialEq)]
pub struct ThermoState {
    pub p: Pressure,
    pub t: Temperature,
    pub composition: Composition,
    pub rho: Density,
    /// Compressibility factor
    pub z: f64,
    /// kg/mol
    pub molar_mass: f64,
    /// J/(kg·K)
    pub r_specific: f64,
    /// J/kg
    pub h: f64,
    /// J/kg
    pub u: f64,
    /// J/(kg·K)
    pub s: f64,
    /// J/(kg·K)
    pub cp: f64,
    /// J/(kg·K)
    pub cv: f64,
    pub gamma: f64,
    /// Pa·s
    pub mu: f64,
    /// W/(m·K)
    pub k: f64,
    pub pr: f64,
}

/// Ideal-gas caloric properties of a mixture, no EOS involved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaloricProps {
    pub molar_mass: f64,
    pub r_specific: f64,
    pub h: f64,
    pub u: f64,
    pub s: f64,
    pub cp: f64,
    pub cv: f64,
    pub gamma: f64,
}

#[derive(Debug, Clone)]
pub struct GasMixtureThermo {
    cubic: CubicEos,
    nasa: Nasa7,
    transport: Transport,
}

const OWNER: &str = "GasMixtureThermo";

impl GasMixtureThermo {
    pub fn new(cubic: CubicEos, nasa: Nasa7, transport: Transport) -> Self {
        Self {
            cubic,
            nasa,
            transport,
        }
    }

    pub fn cubic(&self) -> &CubicEos {
        &self.cubic
    }

    pub fn nasa(&self) -> &Nasa7 {
        &self.nasa
    }

    pub fn transport(&self) -> &Transport {
        &self.transport
    }

    fn attributed<T>(r: GapResult<T>) -> GapResult<T> {
        r.map_err(|g| g.attributed_to(OWNER))
    }

    /// Ideal-gas caloric properties at T.
    pub fn caloric(&self, t: f64, comp: &Composition) -> GapResult<CaloricProps> {
        let ideal = Self::attributed(self.nasa.mixture(t, comp))?;
        let molar_mass = comp.molar_mass() * 1e-3;
        let cp_molar = ideal.cp;
        let cv_molar = cp_molar - R_UNIVERSAL;
        Ok(CaloricProps {
            molar_mass,
            r_specific: R_UNIVERSAL / molar_mass,
            h: ideal.h / molar_mass,
            u: (ideal.h - R_UNIVERSAL * t) / molar_mass,
            s: ideal.s / molar_mass,
            cp: cp_molar / molar_mass,
            cv: cv_molar / molar_mass,
            gamma: cp_molar / cv_molar,
        })
    }

    /// Internal energy of one species [J/kg].
    pub fn species_u(&self, species: Species, t: f64) -> GapResult<f64> {
        Self::attributed(self.nasa.species(species).and_then(|s| s.u_mass(t)))
    }

    /// Mixture viscosity only [Pa·s].
    pub fn viscosity(&self, t: f64, comp: &Composition) -> GapResult<f64> {
        Self::attributed(self.transport.mixture_viscosity(t, comp))
    }

    /// State at (p, T).
    pub fn state(&self, p: Pressure, t: Temperature, comp: &Composition) -> GapResult<ThermoState> {
        let (p_pa, t_k) = (p.value, t.value);
        let cal = self.caloric(t_k, comp)?;
        let z = Self::attributed(self.cubic.compressibility(p_pa, t_k, comp, Branch::Vapor))?;
        let rho = p_pa / (z * R_UNIVERSAL * t_k) * cal.molar_mass;
        self.assemble(p, t, comp, kg_per_m3(rho), z, cal)
    }

    fn assemble(
        &self,
        p: Pressure,
        t: Temperature,
        comp: &Composition,
        rho: Density,
        z: f64,
        cal: CaloricProps,
    ) -> GapResult<ThermoState> {
        let TransportProps { mu, k, pr } =
            Self::attributed(self.transport.mixture(t.value, comp, cal.cp))?;
        Ok(ThermoState {
            p,
            t,
            composition: comp.clone(),
            rho,
            z,
            molar_mass: cal.molar_mass,
            r_specific: cal.r_specific,
            h: cal.h,
            u: cal.u,
            s: cal.s,
            cp: cal.cp,
            cv: cal.cv,
            gamma: cal.gamma,
            mu,
            k,
            pr,
        })
    }

    /// Pressure [Pa] at density [kg/m³] and T.
    pub fn pressure(&self, rho: f64, t: f64, comp: &Composition) -> GapResult<f64> {
        let molar_mass = comp.molar_mass() * 1e-3;
        let p = Self::attributed(self.cubic.pressure(t, rho / molar_mass, comp))?;
        if p > 0.0 {
            Ok(p)
        } else {
            Err(MissingPropertyData::out_of_range(
                OWNER,
                "cubic_eos",
                "p",
                p,
                Some(0.0),
                None,
            ))
        }
    }

    /// State at (ρ, T); pressure from the cubic P(T, v) form. The given ρ is
    /// kept, so liquid-like densities stay on their own branch.
    pub fn state_rho_t(&self, rho: f64, t: f64, comp: &Composition) -> GapResult<ThermoState> {
        let cal = self.caloric(t, comp)?;
        let p = self.pressure(rho, t, comp)?;
        let z = p / (rho / cal.molar_mass * R_UNIVERSAL * t);
        self.assemble(ffsc_core::pa(p), ffsc_core::k(t), comp, kg_per_m3(rho), z, cal)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::cubic::{CriticalConstants, CubicKind};
    use crate::nasa7::fixtures::gri_subset;
    use crate::transport::{FitSegment, SpeciesTransport};
    use std::collections::BTreeMap;

    pub fn gas() -> GasMixtureThermo {
        let mut constants = BTreeMap::new();
        for (sp, tc, pc, w) in [
            (Species::CH4, 190.564, 4.5992e6, 0.011_42),
            (Species::O2, 154.581, 5.043e6, 0.0222),
            (Species::H2O, 647.096, 22.064e6, 0.3443),
        ] {
            constants.insert(sp, CriticalConstants { tc, pc, omega: w });
        }
        let seg = |a: f64, d: f64| {
            vec![FitSegment {
                t_min: 200.0,
                t_max: 3500.0,
                a,
                b: 0.0,
                c: 0.0,
                d,
            }]
        };
        let transport = Transport::new([
            (
                Species::CH4,
                SpeciesTransport {
                    viscosity: seg(0.768_505, 0.326_144),
                    conductivity: seg(1.281_547, -1.474_857),
                },
            ),
            (
                Species::O2,
                SpeciesTransport {
                    viscosity: seg(0.716_328, 1.242_098),
                    conductivity: seg(0.815_441, 0.932_399),
                },
            ),
            (
                Species::H2O,
                SpeciesTransport {
                    viscosity: seg(1.100_041, -1.669_222),
                    conductivity: seg(1.314_439, -2.219_16),
                },
            ),
        ]);
        GasMixtureThermo::new(
            CubicEos::new(CubicKind::PengRobinson, constants),
            gri_subset(),
            transport,
        )
    }
}
