//! Two-phase property surface for one propellant.
//!
//! Inside the saturation dome the state is a lever-rule mixture of the
//! tabulated saturated phases. Outside it, the mBWR residual is added to the
//! NASA-7 ideal-gas part. Either way the saturation table must cover T.

use ffsc_core::GapResult;
use tracing::{debug, warn};

use crate::mbwr::{LBAR_TO_J, MbwrCoefficients, MbwrResidual};
use crate::nasa7::Nasa7Species;
use crate::saturation::{Quality, SaturationCurve, SaturationPoint, quality_at};
use crate::species::Species;
use ffsc_core::constants::R_UNIVERSAL;

/// Relative deviation between table and mBWR vapor pressure that is logged as a warning.
const CONSISTENCY_WARN: f64 = 0.25;

/// Result of a (ρ, T) query. Specific quantities are per kg.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoPhaseState {
    pub species: Species,
    pub t: f64,
    /// kg/m³
    pub rho: f64,
    /// Pa
    pub p: f64,
    pub quality: Quality,
    pub saturation: SaturationPoint,
    /// J/kg
    pub u: f64,
    /// J/kg
    pub h: f64,
    /// ∂u/∂T at constant ρ [J/(kg·K)]
    pub du_dt: f64,
    /// ∂u/∂ρ at constant T [J·m³/kg²]
    pub du_drho: f64,
    /// mBWR residual at the same (ρ, T), in table units.
    pub residual: MbwrResidual,
}

impl TwoPhaseState {
    /// Vapor quality, defined only inside the dome.
    pub fn x(&self) -> Option<f64> {
        self.quality.two_phase()
    }
}

/// Saturated liquid properties used by liquid-side components.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaturatedLiquid {
    pub p_sat: f64,
    pub rho: f64,
    pub h: f64,
    /// dh_l/dT along the saturation line [J/(kg·K)]
    pub cp: f64,
    pub mu: f64,
}

#[derive(Debug, Clone)]
pub struct TwoPhaseThermo {
    species: Species,
    curve: SaturationCurve,
    mbwr: MbwrCoefficients,
    nasa: Nasa7Species,
}

impl TwoPhaseThermo {
    pub fn new(curve: SaturationCurve, mbwr: MbwrCoefficients, nasa: Nasa7Species) -> Self {
        let thermo = Self {
            species: curve.species(),
            curve,
            mbwr,
            nasa,
        };
        thermo.check_consistency();
        thermo
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn curve(&self) -> &SaturationCurve {
        &self.curve
    }

    fn owner(&self) -> String {
        format!("TwoPhaseThermo[{}]", self.species)
    }

    fn molar_mass(&self) -> f64 {
        self.species.molar_mass_si()
    }

    /// Compare tabulated vapor pressure with the mBWR pressure at ρ_v.
    fn check_consistency(&self) {
        let m = self.molar_mass();
        for row in self.curve.rows() {
            let rho_mol_per_l = row.rho_v / m / 1000.0;
            let Ok(res) = self.mbwr.evaluate(rho_mol_per_l, row.t) else {
                continue;
            };
            let dev = (res.p * 1e5 - row.p) / row.p;
            if dev.abs() > CONSISTENCY_WARN {
                warn!(species = %self.species, t = row.t, deviation = dev, "saturation row inconsistent with mBWR");
            } else {
                debug!(species = %self.species, t = row.t, deviation = dev, "saturation/mBWR deviation");
            }
        }
    }

    pub fn saturation(&self, t: f64) -> GapResult<SaturationPoint> {
        self.curve.at(t)
    }

    pub fn saturated_liquid(&self, t: f64) -> GapResult<SaturatedLiquid> {
        let sat = self.curve.at(t)?;
        Ok(SaturatedLiquid {
            p_sat: sat.p_sat,
            rho: sat.rho_l,
            h: sat.h_l()?,
            cp: sat.dh_l_dt()?,
            mu: sat.mu_l()?,
        })
    }

    /// Isenthalpic flash to pressure p: (T_sat, x).
    pub fn flash(&self, h: f64, p: f64) -> GapResult<(f64, f64)> {
        let t = self.curve.saturation_temperature(p)?;
        Ok((t, self.curve.flash_quality(h, t)?))
    }

    /// Full state at density [kg/m³] and temperature [K].
    pub fn state(&self, rho: f64, t: f64) -> GapResult<TwoPhaseState> {
        let sat = self
            .curve
            .at(t)
            .map_err(|gap| gap.attributed_to(self.owner()))?;
        let m = self.molar_mass();
        let residual = self
            .mbwr
            .evaluate(rho / m / 1000.0, t)
            .map_err(|gap| gap.attributed_to(self.owner()))?;
        let quality = quality_at(&sat, rho);

        match quality {
            Quality::TwoPhase(x) => self.dome_state(sat, rho, x, residual),
            _ => self.single_phase_state(sat, rho, quality, residual),
        }
    }

    fn dome_state(
        &self,
        sat: SaturationPoint,
        rho: f64,
        x: f64,
        residual: MbwrResidual,
    ) -> GapResult<TwoPhaseState> {
        let owner = self.owner();
        let hl = sat.h_l().map_err(|g| g.attributed_to(&owner))?;
        let hv = sat.h_v().map_err(|g| g.attributed_to(&owner))?;
        let dhl = sat.dh_l_dt().map_err(|g| g.attributed_to(&owner))?;
        let dhv = sat.dh_v_dt().map_err(|g| g.attributed_to(&owner))?;
        let (p, rl, rv) = (sat.p_sat, sat.rho_l, sat.rho_v);
        let (dp, drl, drv) = (sat.dp_dt, sat.drho_l_dt, sat.drho_v_dt);

        let ul = hl - p / rl;
        let uv = hv - p / rv;
        let u = ul + x * (uv - ul);
        let h = hl + x * (hv - hl);

        let ul_t = dhl - dp / rl + p * drl / (rl * rl);
        let uv_t = dhv - dp / rv + p * drv / (rv * rv);
        let d = 1.0 / rv - 1.0 / rl;
        let n = 1.0 / rho - 1.0 / rl;
        let n_t = drl / (rl * rl);
        let d_t = -drv / (rv * rv) + drl / (rl * rl);
        let x_t = (n_t * d - n * d_t) / (d * d);
        let du_dt = ul_t + x_t * (uv - ul) + x * (uv_t - ul_t);
        let du_drho = (uv - ul) * (-1.0 / (rho * rho)) / d;

        Ok(TwoPhaseState {
            species: self.species,
            t: sat.t,
            rho,
            p,
            quality: Quality::TwoPhase(x),
            saturation: sat,
            u,
            h,
            du_dt,
            du_drho,
            residual,
        })
    }

    fn single_phase_state(
        &self,
        sat: SaturationPoint,
        rho: f64,
        quality: Quality,
        residual: MbwrResidual,
    ) -> GapResult<TwoPhaseState> {
        let owner = self.owner();
        let t = sat.t;
        let m = self.molar_mass();
        let h_rt = self.nasa.h_rt(t).map_err(|g| g.attributed_to(&owner))?;
        let cp_r = self.nasa.cp_r(t).map_err(|g| g.attributed_to(&owner))?;

        let u_ig = (h_rt - 1.0) * R_UNIVERSAL * t;
        let cv_ig = (cp_r - 1.0) * R_UNIVERSAL;
        let u = (u_ig + residual.u_res * LBAR_TO_J) / m;
        let p = residual.p * 1e5;
        // L²·bar/mol² -> J·m³/mol²
        let du_drho_molar = residual.du_drho * LBAR_TO_J / 1000.0;

        Ok(TwoPhaseState {
            species: self.species,
            t,
            rho,
            p,
            quality,
            saturation: sat,
            u,
            h: u + p / rho,
            du_dt: (cv_ig + residual.cv_res * LBAR_TO_J) / m,
            du_drho: du_drho_molar / (m * m),
            residual,
        })
    }
}
