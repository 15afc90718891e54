//! Two-phase valve / injector orifice.
//!
//! ṁ = A·Ψ/√k · √(2·p_up·ρ_up/k_dp), with the flow function Ψ(η), η = p_dn/p_up,
//! chosen per valve.

use ffsc_core::{GapResult, MissingPropertyData};
use ffsc_props::{Field, GapCollector, LoadResult, PropertyBundle};
use serde::Deserialize;

use crate::common::{Attribute, COMPUTED, check_finite};
use crate::flow::{FlowState, InletConditions};
use crate::traits::{Advanced, ComponentModel};

/// Flow function Ψ(η).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ValveLaw {
    /// Ψ = √(1 − η), any phase.
    NoChoking,
    /// Subcooled liquid or two-phase with choking, compressibility parameter ω.
    Omega { omega: f64 },
    /// Superheated vapor with choking. γ_s = 1/γ, so 0 < γ_s < 1.
    Superheated { gamma_s: f64 },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValveLawRaw {
    #[default]
    NoChoking,
    Omega {
        #[serde(default)]
        omega: Field<f64>,
    },
    Superheated {
        #[serde(default)]
        gamma_s: Field<f64>,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValveParams {
    pub area_m2: Field<f64>,
    pub loss_k: Field<f64>,
    pub k_dp: Field<f64>,
    pub law: ValveLawRaw,
    pub initial_mdot_kg_s: Field<f64>,
}

pub fn psi_no_choking(eta: f64) -> f64 {
    (1.0 - eta).max(0.0).sqrt()
}

/// Ψ for liquid or two-phase inflow with choking; `eta_sat` = p_sat/p_up.
pub fn psi_omega(eta_sat: f64, eta: f64, omega: f64) -> Option<f64> {
    if eta <= 0.0 || eta_sat <= 0.0 {
        return None;
    }
    let num = (1.0 - eta_sat) + omega * eta_sat * (eta_sat / eta).ln() - (omega - 1.0) * (eta_sat - eta);
    let den = omega * (eta_sat / eta - 1.0) + 1.0;
    (den > 0.0).then(|| (num / den).max(0.0).sqrt())
}

/// Critical pressure ratio of the superheated law.
pub fn eta_critical(gamma_s: f64) -> f64 {
    (2.0 * gamma_s / (1.0 + gamma_s)).powf(1.0 / (1.0 - gamma_s))
}

/// Ψ for superheated vapor with choking. Below the critical ratio the flow
/// function holds its maximum, reached at `eta_critical`.
pub fn psi_superheated(eta: f64, gamma_s: f64) -> f64 {
    let g = gamma_s;
    if eta > eta_critical(g) {
        (2.0 / (1.0 - g)).sqrt() * (eta.powf(2.0 * g) - eta.powf(1.0 + g)).max(0.0).sqrt()
    } else {
        let r = 2.0 * g / (1.0 + g);
        r.powf((1.0 + g) / (2.0 * (1.0 - g))) / g.sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValveState {
    pub mdot: f64,
    pub eta: f64,
    pub psi: f64,
}

#[derive(Debug, Clone)]
pub struct TwoPhaseValve {
    name: String,
    area: f64,
    loss_k: f64,
    k_dp: f64,
    law: ValveLaw,
    state: ValveState,
}

impl TwoPhaseValve {
    pub fn from_params(name: &str, params: &ValveParams) -> LoadResult<Self> {
        let mut c = GapCollector::new(name, "engine");
        let area = c.positive(&params.area_m2, "area_m2");
        let loss_k = c.positive(&params.loss_k, "loss_k");
        let k_dp = c.positive(&params.k_dp, "k_dp");
        let mdot0 = c.number(&params.initial_mdot_kg_s, "initial_mdot_kg_s");
        let law = match &params.law {
            ValveLawRaw::NoChoking => Some(ValveLaw::NoChoking),
            ValveLawRaw::Omega { omega } => c
                .positive(omega, "law.omega")
                .map(|omega| ValveLaw::Omega { omega }),
            ValveLawRaw::Superheated { gamma_s } => {
                let g = c.positive(gamma_s, "law.gamma_s");
                match g {
                    Some(g) if g >= 1.0 => {
                        c.record(MissingPropertyData::out_of_range(
                            name,
                            "engine",
                            "law.gamma_s",
                            g,
                            Some(0.0),
                            Some(1.0),
                        ));
                        None
                    }
                    g => g.map(|gamma_s| ValveLaw::Superheated { gamma_s }),
                }
            }
        };
        let value = match (area, loss_k, k_dp, mdot0, law) {
            (Some(area), Some(loss_k), Some(k_dp), Some(mdot), Some(law)) => Some(Self {
                name: name.to_string(),
                area,
                loss_k,
                k_dp,
                law,
                state: ValveState {
                    mdot,
                    eta: 0.0,
                    psi: 0.0,
                },
            }),
            _ => None,
        };
        c.finish(value)
    }

    pub fn law(&self) -> ValveLaw {
        self.law
    }

    /// ṁ for given upstream state and flow function.
    pub fn mass_flow(&self, p_up: f64, rho_up: f64, psi: f64) -> f64 {
        self.area * psi / self.loss_k.sqrt() * (2.0 * p_up * rho_up / self.k_dp).sqrt()
    }
}

impl ComponentModel for TwoPhaseValve {
    type State = ValveState;

    fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> &ValveState {
        &self.state
    }

    fn advance(
        &self,
        _dt: f64,
        inlet: &InletConditions,
        props: &PropertyBundle,
    ) -> GapResult<Advanced<ValveState>> {
        let name = self.name.as_str();
        let stream = inlet.single(name)?;
        let back = inlet.back_pressure(name)?;
        let p_up = stream.p_pa();
        let eta = back / p_up;

        let psi = if eta >= 1.0 {
            0.0
        } else {
            match self.law {
                ValveLaw::NoChoking => psi_no_choking(eta),
                ValveLaw::Omega { omega } => {
                    let sat = props
                        .two_phase(stream.propellant(name)?)
                        .and_then(|tp| tp.saturation(stream.t_k()))
                        .attribute(name)?;
                    let eta_sat = sat.p_sat / p_up;
                    psi_omega(eta_sat, eta, omega).ok_or_else(|| {
                        MissingPropertyData::out_of_range(
                            name,
                            COMPUTED,
                            "omega_denominator",
                            omega * (eta_sat / eta - 1.0) + 1.0,
                            Some(0.0),
                            None,
                        )
                    })?
                }
                ValveLaw::Superheated { gamma_s } => psi_superheated(eta, gamma_s),
            }
        };
        let mdot = check_finite(self.mass_flow(p_up, stream.rho, psi), name, "mdot")?;

        let mut outlet: FlowState = stream.clone();
        outlet.mdot = ffsc_core::kgps(mdot);
        outlet.p = ffsc_core::pa(back);

        Ok(Advanced {
            outlet,
            state: ValveState { mdot, eta, psi },
        })
    }

    fn commit(&mut self, state: ValveState) {
        self.state = state;
    }

    fn demand(&self) -> Option<f64> {
        Some(self.state.mdot)
    }

    fn derived(&self) -> Vec<(&'static str, f64)> {
        vec![("pressure_ratio", self.state.eta), ("psi", self.state.psi)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_choking_limits() {
        assert_eq!(psi_no_choking(1.0), 0.0);
        assert_eq!(psi_no_choking(0.0), 1.0);
        assert!((psi_no_choking(0.75) - 0.5).abs() < 1e-15);
    }

    #[test]
    fn omega_law_hand_value() {
        // num = 0.1 + 5·0.9·ln(1.8) − 4·0.4, den = 5·0.8 + 1
        let psi = psi_omega(0.9, 0.5, 5.0).unwrap();
        assert!((psi - 0.478_548).abs() < 1e-5);
    }

    #[test]
    fn omega_law_rejects_nonpositive_denominator() {
        // Deeply subcooled with ω > 1: den = ω(η_s/η − 1) + 1 < 0
        assert!(psi_omega(0.01, 0.5, 3.0).is_none());
        assert!(psi_omega(0.5, 0.0, 3.0).is_none());
    }

    #[test]
    fn superheated_law_is_continuous_at_critical_ratio() {
        for g in [0.6, 0.77, 0.9] {
            let ecr = eta_critical(g);
            let below = psi_superheated(ecr * (1.0 - 1e-9), g);
            let above = psi_superheated(ecr * (1.0 + 1e-9), g);
            assert!((below - above).abs() < 1e-4, "gamma {g}: {below} vs {above}");
            assert!(psi_superheated(0.99, g) < below);
        }
    }

    #[test]
    fn law_parsed_from_params() {
        let params: ValveParams = serde_json::from_str(
            r#"{"area_m2": 2.9e-5, "loss_k": 1.0, "k_dp": 1.0, "initial_mdot_kg_s": 0.4,
                "law": {"kind": "omega", "omega": 4.0}}"#,
        )
        .unwrap();
        let valve = TwoPhaseValve::from_params("fuel_injector", &params).unwrap();
        assert_eq!(valve.law(), ValveLaw::Omega { omega: 4.0 });

        let params: ValveParams = serde_json::from_str(
            r#"{"area_m2": 2.9e-5, "loss_k": 1.0, "k_dp": 1.0, "initial_mdot_kg_s": 0.4,
                "law": {"kind": "superheated", "gamma_s": null}}"#,
        )
        .unwrap();
        let report = TwoPhaseValve::from_params("ox_injector", &params).unwrap_err();
        let gap = report.iter().next().unwrap();
        assert_eq!(gap.field, "law.gamma_s");
        assert_eq!(gap.kind, ffsc_core::GapKind::Null);
    }

    #[test]
    fn mass_flow_formula() {
        let params: ValveParams = serde_json::from_str(
            r#"{"area_m2": 1e-4, "loss_k": 4.0, "k_dp": 1.0, "initial_mdot_kg_s": 0.0}"#,
        )
        .unwrap();
        let valve = TwoPhaseValve::from_params("v", &params).unwrap();
        assert_eq!(valve.law(), ValveLaw::NoChoking);
        // A·Ψ/√k·√(2pρ) = 1e-4 · 0.5 / 2 · √(2·1e6·400)
        let md = valve.mass_flow(1.0e6, 400.0, 0.5);
        assert!((md - 1e-4 * 0.25 * (8.0e8_f64).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn superheated_exponent_must_be_below_one() {
        let params: ValveParams = serde_json::from_str(
            r#"{"area_m2": 2.9e-5, "loss_k": 1.0, "k_dp": 1.0, "initial_mdot_kg_s": 0.1,
                "law": {"kind": "superheated", "gamma_s": 1.3}}"#,
        )
        .unwrap();
        let report = TwoPhaseValve::from_params("ox_injector", &params).unwrap_err();
        assert!(report.iter().all(|g| g.field == "law.gamma_s" && g.is_out_of_range()));
    }

    proptest::proptest! {
        #[test]
        fn flow_functions_fall_with_back_pressure(
            a in 0.0_f64..1.0,
            b in 0.0_f64..1.0,
            g in 0.55_f64..0.95,
        ) {
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            proptest::prop_assert!(psi_no_choking(lo) >= psi_no_choking(hi));
            let (slo, shi) = (psi_superheated(lo, g), psi_superheated(hi, g));
            proptest::prop_assert!(slo.is_finite() && shi.is_finite());
            proptest::prop_assert!(slo >= shi - 1e-12);
        }
    }
}
