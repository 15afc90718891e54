//! Cubic equations of state (Soave–Redlich–Kwong, Peng–Robinson).
//!
//! Both are written in the generic two-parameter form
//! p = RT/(v − b) − a/((v + δ₁b)(v + δ₂b)) with one-fluid van der Waals mixing.
//! Roots of the compressibility cubic are found in closed form.

use std::collections::BTreeMap;

use ffsc_core::constants::R_UNIVERSAL;
use ffsc_core::{GapResult, MissingPropertyData};

use crate::composition::Composition;
use crate::species::Species;
use crate::tables::{CubicEosTable, Field, GapCollector, LoadResult};

const TABLE: &str = "cubic_eos";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubicKind {
    PengRobinson,
    SoaveRedlichKwong,
}

impl CubicKind {
    fn delta(self) -> (f64, f64) {
        match self {
            CubicKind::PengRobinson => (1.0 + std::f64::consts::SQRT_2, 1.0 - std::f64::consts::SQRT_2),
            CubicKind::SoaveRedlichKwong => (1.0, 0.0),
        }
    }

    fn omega_a(self) -> f64 {
        match self {
            CubicKind::PengRobinson => 0.457_24,
            CubicKind::SoaveRedlichKwong => 0.427_48,
        }
    }

    fn omega_b(self) -> f64 {
        match self {
            CubicKind::PengRobinson => 0.077_80,
            CubicKind::SoaveRedlichKwong => 0.086_64,
        }
    }

    /// Slope of the Soave alpha function.
    fn kappa(self, omega: f64) -> f64 {
        match self {
            CubicKind::PengRobinson => 0.374_64 + 1.542_26 * omega - 0.269_92 * omega * omega,
            CubicKind::SoaveRedlichKwong => 0.480 + 1.574 * omega - 0.176 * omega * omega,
        }
    }
}

/// Which root of the compressibility cubic to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Branch {
    /// Largest root above B.
    Vapor,
    /// Smallest root above B.
    Liquid,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CriticalConstants {
    pub tc: f64,
    pub pc: f64,
    pub omega: f64,
}

/// Mixture parameters: a [Pa·m⁶/mol²], b [m³/mol].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixtureParams {
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Clone)]
pub struct CubicEos {
    kind: CubicKind,
    constants: BTreeMap<Species, CriticalConstants>,
    kij: BTreeMap<(Species, Species), f64>,
}

/// Real roots of z³ + c2·z² + c1·z + c0 = 0, ascending.
///
/// Cardano for a single real root, trigonometric form for three.
pub fn solve_cubic(c2: f64, c1: f64, c0: f64) -> Vec<f64> {
    let p = c1 - c2 * c2 / 3.0;
    let q = 2.0 * c2 * c2 * c2 / 27.0 - c2 * c1 / 3.0 + c0;
    let shift = -c2 / 3.0;
    let disc = (q / 2.0).powi(2) + (p / 3.0).powi(3);

    if disc > 0.0 {
        let sd = disc.sqrt();
        let u = (-q / 2.0 + sd).cbrt();
        let v = (-q / 2.0 - sd).cbrt();
        return vec![u + v + shift];
    }
    if p == 0.0 {
        return vec![shift - q.cbrt()];
    }
    let r = (-p / 3.0).sqrt();
    let phi = ((-q / 2.0) / (r * r * r)).clamp(-1.0, 1.0).acos();
    let mut roots: Vec<f64> = (0..3)
        .map(|k| 2.0 * r * ((phi - 2.0 * std::f64::consts::PI * k as f64) / 3.0).cos() + shift)
        .collect();
    roots.sort_by(f64::total_cmp);
    roots
}

impl CubicEos {
    pub fn new(kind: CubicKind, constants: BTreeMap<Species, CriticalConstants>) -> Self {
        Self {
            kind,
            constants,
            kij: BTreeMap::new(),
        }
    }

    pub fn with_kij(mut self, i: Species, j: Species, k: f64) -> Self {
        self.kij.insert(Self::pair(i, j), k);
        self
    }

    fn pair(i: Species, j: Species) -> (Species, Species) {
        if i <= j { (i, j) } else { (j, i) }
    }

    /// Validate the table. Species entries are optional individually; a missing
    /// species surfaces when a query needs it.
    pub fn from_table(raw: &CubicEosTable, owner: &str) -> LoadResult<Self> {
        let mut c = GapCollector::new(owner, TABLE);

        let kind = match &raw.eos {
            Field::Value(tag) => match tag.to_ascii_uppercase().as_str() {
                "PR" => Some(CubicKind::PengRobinson),
                "SRK" => Some(CubicKind::SoaveRedlichKwong),
                other => {
                    c.record(MissingPropertyData::malformed(
                        owner,
                        TABLE,
                        "eos",
                        format!("unknown cubic form {other}"),
                    ));
                    None
                }
            },
            Field::Null => {
                c.record(MissingPropertyData::null(owner, TABLE, "eos"));
                None
            }
            Field::Absent => Some(CubicKind::PengRobinson),
        };

        let mut constants = BTreeMap::new();
        for (key, entry) in &raw.species {
            let Ok(species) = key.parse::<Species>() else {
                tracing::debug!(species = %key, "skipping unknown species in cubic table");
                continue;
            };
            let tc = c.positive(&entry.tc_k, &format!("{key}.Tc_K"));
            let pc = c.positive(&entry.pc_pa, &format!("{key}.Pc_Pa"));
            let omega = c.number(&entry.omega, &format!("{key}.omega"));
            if let (Some(tc), Some(pc), Some(omega)) = (tc, pc, omega) {
                constants.insert(species, CriticalConstants { tc, pc, omega });
            }
        }

        let mut kij = BTreeMap::new();
        for pair in &raw.kij {
            let name = format!("kij[{},{}]", pair.i, pair.j);
            let (Ok(i), Ok(j)) = (pair.i.parse::<Species>(), pair.j.parse::<Species>()) else {
                c.record(MissingPropertyData::malformed(
                    owner,
                    TABLE,
                    name,
                    "unknown species in pair",
                ));
                continue;
            };
            if let Some(k) = c.number(&pair.k, &name) {
                kij.insert(Self::pair(i, j), k);
            }
        }

        c.finish(kind.map(|kind| Self {
            kind,
            constants,
            kij,
        }))
    }

    pub fn kind(&self) -> CubicKind {
        self.kind
    }

    pub fn constants(&self, species: Species) -> GapResult<CriticalConstants> {
        self.constants.get(&species).copied().ok_or_else(|| {
            MissingPropertyData::absent("CubicEos", TABLE, species.key())
        })
    }

    fn kij(&self, i: Species, j: Species) -> f64 {
        self.kij.get(&Self::pair(i, j)).copied().unwrap_or(0.0)
    }

    /// One-fluid mixture a(T) and b.
    pub fn mixture_params(&self, t: f64, comp: &Composition) -> GapResult<MixtureParams> {
        if !t.is_finite() || t <= 0.0 {
            return Err(MissingPropertyData::out_of_range(
                "CubicEos",
                TABLE,
                "T",
                t,
                Some(0.0),
                None,
            ));
        }
        let mut pure = Vec::with_capacity(comp.len());
        for (sp, x) in comp.iter() {
            let cc = self.constants(sp)?;
            let kappa = self.kind.kappa(cc.omega);
            let alpha = (1.0 + kappa * (1.0 - (t / cc.tc).sqrt())).powi(2);
            let a = self.kind.omega_a() * (R_UNIVERSAL * cc.tc).powi(2) / cc.pc * alpha;
            let b = self.kind.omega_b() * R_UNIVERSAL * cc.tc / cc.pc;
            pure.push((sp, x, a, b));
        }

        let mut a = 0.0;
        for &(si, xi, ai, _) in &pure {
            for &(sj, xj, aj, _) in &pure {
                a += xi * xj * (ai * aj).sqrt() * (1.0 - self.kij(si, sj));
            }
        }
        let b = pure.iter().map(|&(_, x, _, b)| x * b).sum();
        Ok(MixtureParams { a, b })
    }

    /// p(T, ρ) with ρ in mol/m³.
    pub fn pressure(&self, t: f64, rho_molar: f64, comp: &Composition) -> GapResult<f64> {
        let MixtureParams { a, b } = self.mixture_params(t, comp)?;
        let v = 1.0 / rho_molar;
        if !rho_molar.is_finite() || rho_molar <= 0.0 || v <= b {
            return Err(MissingPropertyData::out_of_range(
                "CubicEos",
                TABLE,
                "rho",
                rho_molar,
                Some(0.0),
                Some(1.0 / b),
            ));
        }
        let (d1, d2) = self.kind.delta();
        Ok(R_UNIVERSAL * t / (v - b) - a / ((v + d1 * b) * (v + d2 * b)))
    }

    /// Compressibility factor at (p, T) on the requested branch.
    pub fn compressibility(
        &self,
        p: f64,
        t: f64,
        comp: &Composition,
        branch: Branch,
    ) -> GapResult<f64> {
        if !p.is_finite() || p <= 0.0 {
            return Err(MissingPropertyData::out_of_range(
                "CubicEos",
                TABLE,
                "p",
                p,
                Some(0.0),
                None,
            ));
        }
        let MixtureParams { a, b } = self.mixture_params(t, comp)?;
        let rt = R_UNIVERSAL * t;
        let big_a = a * p / (rt * rt);
        let big_b = b * p / rt;
        let (d1, d2) = self.kind.delta();

        let c2 = (d1 + d2 - 1.0) * big_b - 1.0;
        let c1 = big_a + d1 * d2 * big_b * big_b - (d1 + d2) * big_b * (big_b + 1.0);
        let c0 = -(big_a * big_b + d1 * d2 * big_b * big_b * (big_b + 1.0));

        let roots: Vec<f64> = solve_cubic(c2, c1, c0)
            .into_iter()
            .filter(|z| *z > big_b)
            .collect();
        let z = match branch {
            Branch::Vapor => roots.iter().copied().reduce(f64::max),
            Branch::Liquid => roots.iter().copied().reduce(f64::min),
        };
        z.ok_or_else(|| {
            MissingPropertyData::malformed(
                "CubicEos",
                TABLE,
                "Z",
                format!("no physical root at p={p} T={t}"),
            )
        })
    }

    /// Molar density [mol/m³] at (p, T) on the requested branch.
    pub fn molar_density(
        &self,
        p: f64,
        t: f64,
        comp: &Composition,
        branch: Branch,
    ) -> GapResult<f64> {
        let z = self.compressibility(p, t, comp, branch)?;
        Ok(p / (z * R_UNIVERSAL * t))
    }
}
