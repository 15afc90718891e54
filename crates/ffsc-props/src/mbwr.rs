//! 32-term modified Benedict–Webb–Rubin residual evaluator.
//!
//! Works in table units: ρ in mol/L, T in K, p in bar, energies in L·bar/mol
//! (1 L·bar/mol = 100 J/mol). Exponential terms use exp(−(ρ/ρc)²) and are
//! integrated in closed form, so every residual follows from one Helmholtz
//! expression and its temperature derivatives.

use ffsc_core::{GapResult, MissingPropertyData};

use crate::species::Species;
use crate::tables::{Field, GapCollector, LoadResult, MbwrTable};

/// J/mol per L·bar/mol.
pub const LBAR_TO_J: f64 = 100.0;

/// (α index n, b index, temperature exponent) for each of the 32 coefficients.
const TERMS: [(usize, usize, f64); 32] = [
    (2, 1, 1.0),
    (2, 2, 0.5),
    (2, 3, 0.0),
    (2, 4, -1.0),
    (2, 5, -2.0),
    (3, 6, 1.0),
    (3, 7, 0.0),
    (3, 8, -1.0),
    (3, 9, -2.0),
    (4, 10, 1.0),
    (4, 11, 0.0),
    (4, 12, -1.0),
    (5, 13, 0.0),
    (6, 14, -1.0),
    (6, 15, -2.0),
    (7, 16, -1.0),
    (8, 17, -1.0),
    (8, 18, -2.0),
    (9, 19, -2.0),
    (10, 20, -2.0),
    (10, 21, -3.0),
    (11, 22, -2.0),
    (11, 23, -4.0),
    (12, 24, -2.0),
    (12, 25, -3.0),
    (13, 26, -2.0),
    (13, 27, -4.0),
    (14, 28, -2.0),
    (14, 29, -3.0),
    (15, 30, -2.0),
    (15, 31, -3.0),
    (15, 32, -4.0),
];

/// Validated coefficient set for one species.
#[derive(Debug, Clone, PartialEq)]
pub struct MbwrCoefficients {
    pub species: Species,
    /// Gas constant [L·bar/(mol·K)].
    pub r: f64,
    /// Critical density [mol/L].
    pub rho_c: f64,
    /// b1..b32, stored zero-based.
    pub b: [f64; 32],
}

/// Residual pressure, Helmholtz-derived properties and their derivatives at (ρ, T).
///
/// `p` is the full pressure ρRT + p_res. Energies are per mole.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MbwrResidual {
    pub p: f64,
    pub p_res: f64,
    /// ∂p/∂T at constant ρ
    pub dp_dt: f64,
    /// ∂p/∂ρ at constant T
    pub dp_drho: f64,
    /// ∂p/∂v at constant T
    pub dp_dv: f64,
    pub a_res: f64,
    pub u_res: f64,
    pub h_res: f64,
    pub s_res: f64,
    pub cv_res: f64,
    pub cp_res: f64,
    /// ∂u/∂ρ at constant T
    pub du_drho: f64,
    /// ∂u/∂v at constant T
    pub du_dv: f64,
}

/// α_n(T) together with its first and second temperature derivatives.
#[derive(Debug, Clone, Copy, Default)]
struct Alpha {
    v: [f64; 16],
    d1: [f64; 16],
    d2: [f64; 16],
}

impl MbwrCoefficients {
    pub fn new(species: Species, r: f64, rho_c: f64, b: [f64; 32]) -> Self {
        Self {
            species,
            r,
            rho_c,
            b,
        }
    }

    /// Validate a table document, reporting every absent or null coefficient.
    pub fn from_table(
        raw: &MbwrTable,
        species: Species,
        owner: &str,
        table: &str,
    ) -> LoadResult<Self> {
        let mut c = GapCollector::new(owner, table);

        if let Field::Value(tag) = &raw.species {
            if !tag.eq_ignore_ascii_case(species.key()) {
                c.record(MissingPropertyData::malformed(
                    owner,
                    table,
                    "species",
                    format!("table is for {tag}, expected {species}"),
                ));
            }
        }
        let r = c.positive(&raw.r, "R_L_bar_per_mol_K");
        let rho_c = c.positive(&raw.rho_c, "rho_c_mol_per_L");

        let mut b = [0.0; 32];
        let mut coeffs_ok = true;
        match raw.b.require(owner, table, "b") {
            Ok(map) => {
                for (i, slot) in b.iter_mut().enumerate() {
                    let name = format!("b{}", i + 1);
                    let field = map.get(&name).cloned().unwrap_or_default();
                    match c.number(&field, &name) {
                        Some(v) => *slot = v,
                        None => coeffs_ok = false,
                    }
                }
            }
            Err(gap) => {
                coeffs_ok = false;
                c.record(gap);
            }
        }

        let value = match (r, rho_c, coeffs_ok) {
            (Some(r), Some(rho_c), true) => Some(Self::new(species, r, rho_c, b)),
            _ => None,
        };
        c.finish(value)
    }

    fn alpha(&self, t: f64) -> Alpha {
        let mut a = Alpha::default();
        for &(n, bi, e) in TERMS.iter() {
            let coeff = self.b[bi - 1];
            let te = t.powf(e);
            a.v[n] += coeff * te;
            a.d1[n] += coeff * e * te / t;
            a.d2[n] += coeff * e * (e - 1.0) * te / (t * t);
        }
        a
    }

    /// J_k(X) = ∫₀^X s^k e^(−γs) ds for k = 0..5.
    ///
    /// The upward recurrence loses precision when γX is small, so a power
    /// series is used below γX = 1.
    fn exp_integrals(gamma: f64, x: f64) -> [f64; 6] {
        let gx = gamma * x;
        let mut j = [0.0; 6];
        if gx < 1.0 {
            for (k, slot) in j.iter_mut().enumerate() {
                let mut term = x.powi(k as i32 + 1);
                let mut sum = term / (k as f64 + 1.0);
                for m in 1..64 {
                    term *= -gx / m as f64;
                    let add = term / (k + m + 1) as f64;
                    sum += add;
                    if add.abs() <= 1e-17 * sum.abs() {
                        break;
                    }
                }
                *slot = sum;
            }
        } else {
            let e = (-gx).exp();
            j[0] = (1.0 - e) / gamma;
            for k in 1..6 {
                j[k] = (k as f64 * j[k - 1] - x.powi(k as i32) * e) / gamma;
            }
        }
        j
    }

    /// Evaluate the residual set at ρ [mol/L], T [K].
    pub fn evaluate(&self, rho: f64, t: f64) -> GapResult<MbwrResidual> {
        let owner = format!("mBWR[{}]", self.species);
        if !t.is_finite() || t <= 0.0 {
            return Err(MissingPropertyData::out_of_range(
                owner,
                "mbwr32",
                "T",
                t,
                Some(0.0),
                None,
            ));
        }
        if !rho.is_finite() || rho < 0.0 {
            return Err(MissingPropertyData::out_of_range(
                owner,
                "mbwr32",
                "rho",
                rho,
                Some(0.0),
                None,
            ));
        }

        let r = self.r;
        let al = self.alpha(t);

        if rho == 0.0 {
            let du_drho = al.v[2] - t * al.d1[2];
            return Ok(MbwrResidual {
                p: 0.0,
                p_res: 0.0,
                dp_dt: 0.0,
                dp_drho: r * t,
                dp_dv: 0.0,
                a_res: 0.0,
                u_res: 0.0,
                h_res: 0.0,
                s_res: 0.0,
                cv_res: 0.0,
                cp_res: 0.0,
                du_drho,
                du_dv: 0.0,
            });
        }

        let gamma = 1.0 / (self.rho_c * self.rho_c);
        let x = rho * rho;
        let f = (-gamma * x).exp();

        let mut p_res = 0.0;
        let mut p_t = 0.0;
        let mut p_rho = 0.0;
        let mut a = 0.0;
        let mut a_t = 0.0;
        let mut a_tt = 0.0;

        for n in 2..=9 {
            let rn = rho.powi(n as i32);
            p_res += al.v[n] * rn;
            p_t += al.d1[n] * rn;
            p_rho += n as f64 * al.v[n] * rho.powi(n as i32 - 1);
            let w = rho.powi(n as i32 - 1) / (n as f64 - 1.0);
            a += al.v[n] * w;
            a_t += al.d1[n] * w;
            a_tt += al.d2[n] * w;
        }

        let j = Self::exp_integrals(gamma, x);
        for n in 10..=15 {
            let m = 2 * n as i32 - 17;
            let rm = rho.powi(m);
            p_res += al.v[n] * rm * f;
            p_t += al.d1[n] * rm * f;
            p_rho += al.v[n] * f * (m as f64 * rho.powi(m - 1) - 2.0 * gamma * rho.powi(m + 1));
            let w = 0.5 * j[n - 10];
            a += al.v[n] * w;
            a_t += al.d1[n] * w;
            a_tt += al.d2[n] * w;
        }

        let p = rho * r * t + p_res;
        let dp_dt = rho * r + p_t;
        let dp_drho = r * t + p_rho;
        let u_res = a - t * a_t;
        let cv_res = -t * a_tt;
        let du_drho = (p - t * dp_dt) / (rho * rho);

        Ok(MbwrResidual {
            p,
            p_res,
            dp_dt,
            dp_drho,
            dp_dv: -rho * rho * dp_drho,
            a_res: a,
            u_res,
            h_res: u_res + p / rho - r * t,
            s_res: -a_t,
            cv_res,
            cp_res: cv_res + t * dp_dt * dp_dt / (rho * rho * dp_drho) - r,
            du_drho,
            du_dv: -rho * rho * du_drho,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * (1.0 + b.abs())
    }

    fn b3_only() -> MbwrCoefficients {
        let mut b = [0.0; 32];
        b[2] = 0.5;
        MbwrCoefficients::new(Species::CH4, 1.0, 5.0, b)
    }

    #[test]
    fn second_virial_term_matches_hand_values() {
        let res = b3_only().evaluate(2.0, 300.0).unwrap();
        assert!(close(res.p, 602.0));
        assert!(close(res.p_res, 2.0));
        assert!(close(res.dp_dt, 2.0));
        assert!(close(res.dp_drho, 302.0));
        assert!(close(res.dp_dv, -1208.0));
        assert!(close(res.u_res, 1.0));
        assert!(close(res.h_res, 2.0));
        assert!(close(res.s_res, 0.0));
        assert!(close(res.cv_res, 0.0));
        assert!(close(res.cp_res, -0.006_622_516_556_291_391));
        assert!(close(res.du_drho, 0.5));
        assert!(close(res.du_dv, -2.0));
    }

    #[test]
    fn zero_density_is_ideal() {
        let mut b = [0.0; 32];
        b[0] = 0.01;
        b[2] = -2.0;
        let c = MbwrCoefficients::new(Species::O2, 0.083_144_72, 13.63, b);
        let res = c.evaluate(0.0, 200.0).unwrap();
        assert_eq!(res.p, 0.0);
        assert_eq!(res.h_res, 0.0);
        // α2 − Tα2' with α2 = b1 T + b3
        assert!(close(res.du_drho, -2.0));
    }

    #[test]
    fn exponential_terms_are_consistent_with_helmholtz() {
        // p_res = ρ² ∂A/∂ρ; check numerically with every coefficient populated.
        let mut b = [0.0; 32];
        for (i, v) in b.iter_mut().enumerate() {
            *v = 1e-3 * (i as f64 + 1.0) * if i % 2 == 0 { 1.0 } else { -0.7 };
        }
        let c = MbwrCoefficients::new(Species::CH4, 0.083_144_72, 10.139, b);
        let (rho, t, h) = (6.0, 150.0, 1e-5);
        let mid = c.evaluate(rho, t).unwrap();
        let up = c.evaluate(rho + h, t).unwrap();
        let dn = c.evaluate(rho - h, t).unwrap();
        let da_drho = (up.a_res - dn.a_res) / (2.0 * h);
        assert!((mid.p_res - rho * rho * da_drho).abs() < 1e-6 * mid.p_res.abs().max(1.0));

        let tp = c.evaluate(rho, t + 1e-4).unwrap();
        let tm = c.evaluate(rho, t - 1e-4).unwrap();
        let dp_dt = (tp.p - tm.p) / 2e-4;
        assert!((mid.dp_dt - dp_dt).abs() < 1e-6 * dp_dt.abs().max(1.0));
        let dp_drho = (up.p - dn.p) / (2.0 * h);
        assert!((mid.dp_drho - dp_drho).abs() < 1e-5 * dp_drho.abs().max(1.0));
    }

    #[test]
    fn series_and_recurrence_meet_at_switch() {
        let gamma = 0.01;
        let below = MbwrCoefficients::exp_integrals(gamma, 99.999_999);
        let above = MbwrCoefficients::exp_integrals(gamma, 100.000_001);
        for k in 0..6 {
            assert!((below[k] - above[k]).abs() < 1e-6 * above[k].abs());
        }
    }

    #[test]
    fn rejects_negative_density() {
        let err = b3_only().evaluate(-1.0, 300.0).unwrap_err();
        assert_eq!(err.field, "rho");
    }

    #[test]
    fn table_nulls_are_listed_individually() {
        let raw: MbwrTable = serde_json::from_str(
            r#"{"species": "CH4", "R_L_bar_per_mol_K": 0.08314472, "rho_c_mol_per_L": 10.139,
                "b": {"b1": 0.1, "b2": null, "b7": null}}"#,
        )
        .unwrap();
        let report = MbwrCoefficients::from_table(&raw, Species::CH4, "mBWR[CH4]", "ch4_mbwr32")
            .unwrap_err();
        let nulls = report
            .iter()
            .filter(|g| g.kind == ffsc_core::GapKind::Null)
            .count();
        let absent = report
            .iter()
            .filter(|g| g.kind == ffsc_core::GapKind::Absent)
            .count();
        assert_eq!(nulls, 2);
        assert_eq!(absent, 29);
    }
}
