//! Tabulated saturation curves and vapor quality.
//!
//! Rows are stored in molar table units and converted to SI (Pa, kg/m³, J/kg)
//! on load. Interpolation is piecewise linear in T. At an interior node the
//! segment to the right is used, at the last node the final segment.

use std::collections::BTreeMap;

use ffsc_core::{GapResult, MissingPropertyData};

use crate::species::Species;
use crate::tables::{Field, GapCollector, LoadResult, SaturationRowRaw, SaturationTableRaw};

pub const TABLE: &str = "saturation_table";

/// One tabulated saturation state in SI units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SaturationRow {
    pub t: f64,
    pub p: f64,
    pub rho_l: f64,
    pub rho_v: f64,
    pub h_l: Option<f64>,
    pub h_v: Option<f64>,
    pub mu_l: Option<f64>,
    pub mu_v: Option<f64>,
}

/// Interpolated saturation properties and their temperature slopes.
#[derive(Debug, Clone, PartialEq)]
pub struct SaturationPoint {
    table: String,
    pub t: f64,
    pub p_sat: f64,
    pub rho_l: f64,
    pub rho_v: f64,
    pub dp_dt: f64,
    pub drho_l_dt: f64,
    pub drho_v_dt: f64,
    h_l: Option<(f64, f64)>,
    h_v: Option<(f64, f64)>,
    mu_l: Option<f64>,
    mu_v: Option<f64>,
}

impl SaturationPoint {
    fn optional(&self, v: Option<f64>, field: &str) -> GapResult<f64> {
        v.ok_or_else(|| MissingPropertyData::null("SaturationTable", &self.table, field))
    }

    pub fn h_l(&self) -> GapResult<f64> {
        self.optional(self.h_l.map(|(v, _)| v), "h_l")
    }

    pub fn h_v(&self) -> GapResult<f64> {
        self.optional(self.h_v.map(|(v, _)| v), "h_v")
    }

    pub fn dh_l_dt(&self) -> GapResult<f64> {
        self.optional(self.h_l.map(|(_, d)| d), "h_l")
    }

    pub fn dh_v_dt(&self) -> GapResult<f64> {
        self.optional(self.h_v.map(|(_, d)| d), "h_v")
    }

    pub fn mu_l(&self) -> GapResult<f64> {
        self.optional(self.mu_l, "mu_l")
    }

    pub fn mu_v(&self) -> GapResult<f64> {
        self.optional(self.mu_v, "mu_v")
    }
}

/// Where a (ρ, T) pair sits relative to the saturation dome.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Quality {
    /// Inside the dome: vapor mass fraction in [0, 1].
    TwoPhase(f64),
    /// Denser than saturated liquid.
    CompressedLiquid,
    /// Lighter than saturated vapor.
    SuperheatedVapor,
}

impl Quality {
    pub fn two_phase(self) -> Option<f64> {
        match self {
            Quality::TwoPhase(x) => Some(x),
            _ => None,
        }
    }
}

/// Saturation curve of one species.
#[derive(Debug, Clone)]
pub struct SaturationCurve {
    species: Species,
    table: String,
    rows: Vec<SaturationRow>,
}

fn lerp(a: f64, b: f64, w: f64) -> f64 {
    a + w * (b - a)
}

fn lerp_opt(a: Option<f64>, b: Option<f64>, w: f64, dt: f64) -> Option<(f64, f64)> {
    Some((lerp(a?, b?, w), (b? - a?) / dt))
}

impl SaturationCurve {
    pub fn new(species: Species, rows: Vec<SaturationRow>) -> GapResult<Self> {
        let table = format!("{TABLE}[{species}]");
        if rows.len() < 2 {
            return Err(MissingPropertyData::malformed(
                "SaturationTable",
                table,
                "rows",
                "at least two rows required",
            ));
        }
        if let Some(w) = rows.windows(2).find(|w| w[1].t <= w[0].t) {
            return Err(MissingPropertyData::malformed(
                "SaturationTable",
                table,
                "T_K",
                format!("temperatures not increasing at {} K", w[1].t),
            ));
        }
        Ok(Self {
            species,
            table,
            rows,
        })
    }

    pub fn species(&self) -> Species {
        self.species
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn rows(&self) -> &[SaturationRow] {
        &self.rows
    }

    pub fn t_min(&self) -> f64 {
        self.rows[0].t
    }

    pub fn t_max(&self) -> f64 {
        self.rows[self.rows.len() - 1].t
    }

    fn out_of_range(&self, field: &str, value: f64, min: f64, max: f64) -> MissingPropertyData {
        MissingPropertyData::out_of_range(
            "SaturationTable",
            &self.table,
            field,
            value,
            Some(min),
            Some(max),
        )
    }

    fn segment(&self, t: f64) -> GapResult<(&SaturationRow, &SaturationRow)> {
        if !t.is_finite() || t < self.t_min() || t > self.t_max() {
            return Err(self.out_of_range("T", t, self.t_min(), self.t_max()));
        }
        let last = self.rows.len() - 2;
        let i = self.rows[..=last]
            .iter()
            .rposition(|r| r.t <= t)
            .unwrap_or(0);
        Ok((&self.rows[i], &self.rows[i + 1]))
    }

    /// Saturation properties at T.
    pub fn at(&self, t: f64) -> GapResult<SaturationPoint> {
        let (a, b) = self.segment(t)?;
        let dt = b.t - a.t;
        let w = (t - a.t) / dt;
        Ok(SaturationPoint {
            table: self.table.clone(),
            t,
            p_sat: lerp(a.p, b.p, w),
            rho_l: lerp(a.rho_l, b.rho_l, w),
            rho_v: lerp(a.rho_v, b.rho_v, w),
            dp_dt: (b.p - a.p) / dt,
            drho_l_dt: (b.rho_l - a.rho_l) / dt,
            drho_v_dt: (b.rho_v - a.rho_v) / dt,
            h_l: lerp_opt(a.h_l, b.h_l, w, dt),
            h_v: lerp_opt(a.h_v, b.h_v, w, dt),
            mu_l: lerp_opt(a.mu_l, b.mu_l, w, dt).map(|(v, _)| v),
            mu_v: lerp_opt(a.mu_v, b.mu_v, w, dt).map(|(v, _)| v),
        })
    }

    /// Inverse lookup T_sat(p), linear between rows.
    pub fn saturation_temperature(&self, p: f64) -> GapResult<f64> {
        let (lo, hi) = (self.rows[0].p, self.rows[self.rows.len() - 1].p);
        self.rows
            .windows(2)
            .find(|w| p >= w[0].p && p <= w[1].p && w[1].p > w[0].p)
            .map(|w| lerp(w[0].t, w[1].t, (p - w[0].p) / (w[1].p - w[0].p)))
            .ok_or_else(|| self.out_of_range("p", p, lo, hi))
    }

    /// x = (1/ρ − 1/ρ_l)/(1/ρ_v − 1/ρ_l), or the single-phase side of the dome.
    pub fn quality_from_density(&self, rho: f64, t: f64) -> GapResult<Quality> {
        let sat = self.at(t)?;
        Ok(quality_at(&sat, rho))
    }

    /// Isenthalpic flash quality x = (h − h_l)/(h_v − h_l), clamped to [0, 1].
    pub fn flash_quality(&self, h: f64, t: f64) -> GapResult<f64> {
        let sat = self.at(t)?;
        let (hl, hv) = (sat.h_l()?, sat.h_v()?);
        Ok(((h - hl) / (hv - hl)).clamp(0.0, 1.0))
    }

    pub fn from_rows(
        species: Species,
        raw: &[SaturationRowRaw],
        owner: &str,
    ) -> LoadResult<Self> {
        let table = format!("{TABLE}[{species}]");
        let mut c = GapCollector::new(owner, &table);
        let m = species.molar_mass_si();
        let mut rows = Vec::with_capacity(raw.len());
        for (i, r) in raw.iter().enumerate() {
            let name = |f: &str| format!("rows[{i}].{f}");
            let t = c.positive(&r.t_k, &name("T_K"));
            let p = c.positive(&r.p_bar, &name("p_bar"));
            let rho_l = c.positive(&r.rho_l_mol_per_m3, &name("rho_l_mol_per_m3"));
            let rho_v = c.positive(&r.rho_v_mol_per_m3, &name("rho_v_mol_per_m3"));
            // Optional columns: a null surfaces only when a query needs it.
            let optional = |c: &mut GapCollector, f: &Field<f64>, field: &str| match f {
                Field::Value(_) => c.number(f, &name(field)),
                _ => None,
            };
            let h_l = optional(&mut c, &r.h_l_kj_per_mol, "h_l_kJ_per_mol");
            let h_v = optional(&mut c, &r.h_v_kj_per_mol, "h_v_kJ_per_mol");
            let mu_l = optional(&mut c, &r.mu_l_pa_s, "mu_l_Pa_s");
            let mu_v = optional(&mut c, &r.mu_v_pa_s, "mu_v_Pa_s");
            if let (Some(t), Some(p), Some(rho_l), Some(rho_v)) = (t, p, rho_l, rho_v) {
                rows.push(SaturationRow {
                    t,
                    p: p * 1e5,
                    rho_l: rho_l * m,
                    rho_v: rho_v * m,
                    h_l: h_l.map(|h| h * 1e3 / m),
                    h_v: h_v.map(|h| h * 1e3 / m),
                    mu_l,
                    mu_v,
                });
            }
        }
        if !c.is_clean() {
            return c.finish(None);
        }
        match Self::new(species, rows) {
            Ok(curve) => Ok(curve),
            Err(gap) => {
                c.record(gap.attributed_to(owner));
                c.finish(None)
            }
        }
    }
}

/// Quality at a known saturation point.
pub fn quality_at(sat: &SaturationPoint, rho: f64) -> Quality {
    if rho > sat.rho_l {
        Quality::CompressedLiquid
    } else if rho < sat.rho_v {
        Quality::SuperheatedVapor
    } else {
        let x = (1.0 / rho - 1.0 / sat.rho_l) / (1.0 / sat.rho_v - 1.0 / sat.rho_l);
        Quality::TwoPhase(x.clamp(0.0, 1.0))
    }
}

/// Saturation curves for every tabulated species.
#[derive(Debug, Clone, Default)]
pub struct SaturationTable {
    curves: BTreeMap<Species, SaturationCurve>,
}

impl SaturationTable {
    pub fn from_table(raw: &SaturationTableRaw, owner: &str) -> LoadResult<Self> {
        let mut c = GapCollector::new(owner, TABLE);
        let mut curves = BTreeMap::new();
        for (key, rows) in &raw.species {
            let Ok(species) = key.parse::<Species>() else {
                tracing::debug!(species = %key, "skipping unknown species in saturation table");
                continue;
            };
            if let Some(curve) = c.absorb(SaturationCurve::from_rows(species, rows, owner)) {
                curves.insert(species, curve);
            }
        }
        c.finish(Some(Self { curves }))
    }

    pub fn insert(&mut self, curve: SaturationCurve) {
        self.curves.insert(curve.species(), curve);
    }

    pub fn curve(&self, species: Species) -> GapResult<&SaturationCurve> {
        self.curves
            .get(&species)
            .ok_or_else(|| MissingPropertyData::absent("SaturationTable", TABLE, species.key()))
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// Three-row methane-like curve, SI units.
    pub fn small_curve() -> SaturationCurve {
        let row = |t: f64, p: f64, rho_l: f64, rho_v: f64, h_l: f64, h_v: f64| SaturationRow {
            t,
            p,
            rho_l,
            rho_v,
            h_l: Some(h_l),
            h_v: Some(h_v),
            mu_l: Some(1.0e-4),
            mu_v: Some(4.0e-6),
        };
        SaturationCurve::new(
            Species::CH4,
            vec![
                row(100.0, 0.35e5, 438.0, 0.70, -9.0e5, -3.9e5),
                row(110.0, 0.88e5, 425.0, 1.60, -8.7e5, -3.8e5),
                row(120.0, 1.90e5, 410.0, 3.20, -8.4e5, -3.7e5),
            ],
        )
        .unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::small_curve;
    use super::*;

    #[test]
    fn interpolates_linearly_between_rows() {
        let sat = small_curve().at(105.0).unwrap();
        assert!((sat.p_sat - 0.615e5).abs() < 1e-6);
        assert!((sat.rho_l - 431.5).abs() < 1e-9);
        assert!((sat.dp_dt - 0.053e5).abs() < 1e-6);
        assert!((sat.h_l().unwrap() + 8.85e5).abs() < 1e-6);
    }

    #[test]
    fn node_uses_right_segment_and_end_uses_last() {
        let curve = small_curve();
        let at_node = curve.at(110.0).unwrap();
        assert!((at_node.dp_dt - (1.90e5 - 0.88e5) / 10.0).abs() < 1e-9);
        let at_end = curve.at(120.0).unwrap();
        assert!((at_end.p_sat - 1.90e5).abs() < 1e-9);
        assert!((at_end.dp_dt - (1.90e5 - 0.88e5) / 10.0).abs() < 1e-9);
    }

    #[test]
    fn outside_table_is_out_of_range_with_bounds() {
        let err = small_curve().at(150.0).unwrap_err();
        assert_eq!(err.table, "saturation_table[CH4]");
        assert_eq!(err.field, "T");
        assert_eq!(
            err.kind,
            ffsc_core::GapKind::OutOfRange {
                value: 150.0,
                min: Some(100.0),
                max: Some(120.0)
            }
        );
    }

    #[test]
    fn quality_endpoints_follow_vapor_fraction() {
        let curve = small_curve();
        let sat = curve.at(110.0).unwrap();
        assert_eq!(quality_at(&sat, sat.rho_v), Quality::TwoPhase(1.0));
        assert_eq!(quality_at(&sat, sat.rho_l), Quality::TwoPhase(0.0));
        assert_eq!(quality_at(&sat, sat.rho_l + 1.0), Quality::CompressedLiquid);
        assert_eq!(quality_at(&sat, sat.rho_v * 0.5), Quality::SuperheatedVapor);
    }

    #[test]
    fn inverse_lookup_recovers_temperature() {
        let curve = small_curve();
        let p = curve.at(113.0).unwrap().p_sat;
        assert!((curve.saturation_temperature(p).unwrap() - 113.0).abs() < 1e-9);
        assert!(curve.saturation_temperature(1.0e7).is_err());
    }

    #[test]
    fn flash_quality_is_clamped() {
        let curve = small_curve();
        assert_eq!(curve.flash_quality(-1.0e6, 110.0).unwrap(), 0.0);
        assert_eq!(curve.flash_quality(0.0, 110.0).unwrap(), 1.0);
        let x = curve.flash_quality(-6.25e5, 110.0).unwrap();
        assert!((x - 0.5).abs() < 1e-12);
    }

    #[test]
    fn null_enthalpy_column_fails_only_on_use() {
        let raw: Vec<SaturationRowRaw> = serde_json::from_str(
            r#"[{"T_K": 90, "p_bar": 0.1, "rho_l_mol_per_m3": 28000, "rho_v_mol_per_m3": 14,
                 "h_l_kJ_per_mol": null, "h_v_kJ_per_mol": 1.0},
                {"T_K": 92, "p_bar": 0.15, "rho_l_mol_per_m3": 27900, "rho_v_mol_per_m3": 20,
                 "h_l_kJ_per_mol": null, "h_v_kJ_per_mol": 1.1}]"#,
        )
        .unwrap();
        let curve = SaturationCurve::from_rows(Species::CH4, &raw, "SaturationTable").unwrap();
        let sat = curve.at(91.0).unwrap();
        assert!(sat.p_sat > 0.0);
        let err = sat.h_l().unwrap_err();
        assert_eq!(err.kind, ffsc_core::GapKind::Null);
        assert!(sat.mu_l().is_err());
    }

    #[test]
    fn null_required_column_fails_at_load() {
        let raw: Vec<SaturationRowRaw> = serde_json::from_str(
            r#"[{"T_K": 90, "p_bar": null, "rho_l_mol_per_m3": 28000, "rho_v_mol_per_m3": 14},
                {"T_K": 92, "p_bar": 0.15, "rho_l_mol_per_m3": 27900}]"#,
        )
        .unwrap();
        let report =
            SaturationCurve::from_rows(Species::CH4, &raw, "SaturationTable").unwrap_err();
        assert_eq!(report.len(), 2);
    }
}

#[cfg(test)]
mod proptests {
    use super::fixtures::small_curve;
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn quality_decreases_with_density(t in 100.0_f64..120.0, a in 0.0_f64..1.0, b in 0.0_f64..1.0) {
            let curve = small_curve();
            let sat = curve.at(t).unwrap();
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            let rho = |w: f64| sat.rho_v + w * (sat.rho_l - sat.rho_v);
            let x_lo = quality_at(&sat, rho(lo)).two_phase().unwrap();
            let x_hi = quality_at(&sat, rho(hi)).two_phase().unwrap();
            prop_assert!(x_hi <= x_lo);
            prop_assert!((0.0..=1.0).contains(&x_lo));
        }
    }
}
