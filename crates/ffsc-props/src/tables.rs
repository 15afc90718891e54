//! Table file schemas and the JSON loading layer.
//!
//! Every numeric input is read through [`Field`], which keeps "key absent" and
//! "key present but `null`" apart so both surface as distinct gaps instead of a
//! parse failure of the whole document. Loading produces a [`LoadResult`] that
//! carries every gap found in the document, not only the first.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ffsc_core::{GapReport, GapResult, MissingPropertyData};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

use crate::species::Species;

/// Batch result of loading or validating a table.
pub type LoadResult<T> = Result<T, GapReport>;

/// A table value that may be absent or an explicit `null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Field<T> {
    #[default]
    Absent,
    Null,
    Value(T),
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Field::Value(v),
            None => Field::Null,
        })
    }
}

impl<T> Field<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Field::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Resolve to a value or the matching gap.
    pub fn require(&self, owner: &str, table: &str, field: &str) -> GapResult<&T> {
        match self {
            Field::Value(v) => Ok(v),
            Field::Null => Err(MissingPropertyData::null(owner, table, field)),
            Field::Absent => Err(MissingPropertyData::absent(owner, table, field)),
        }
    }
}

/// Provenance block carried by every table document. Logged, never validated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Metadata {
    pub source: Option<String>,
    pub route: Option<String>,
}

/// Accumulates every gap found while validating one table.
#[derive(Debug)]
pub struct GapCollector {
    owner: String,
    table: String,
    gaps: GapReport,
}

impl GapCollector {
    pub fn new(owner: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            table: table.into(),
            gaps: GapReport::new(),
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn record(&mut self, gap: MissingPropertyData) {
        self.gaps.insert(gap);
    }

    pub fn merge(&mut self, report: GapReport) {
        self.gaps.extend(report);
    }

    /// Keep the value of a nested result, folding its gaps into this collector.
    pub fn absorb<T>(&mut self, result: LoadResult<T>) -> Option<T> {
        match result {
            Ok(v) => Some(v),
            Err(report) => {
                self.merge(report);
                None
            }
        }
    }

    pub fn gap(&mut self, result: GapResult<f64>) -> Option<f64> {
        match result {
            Ok(v) => Some(v),
            Err(gap) => {
                self.record(gap);
                None
            }
        }
    }

    /// A finite number.
    pub fn number(&mut self, field: &Field<f64>, name: &str) -> Option<f64> {
        match field.require(&self.owner, &self.table, name) {
            Ok(v) if v.is_finite() => Some(*v),
            Ok(v) => {
                let gap = MissingPropertyData::malformed(
                    &self.owner,
                    &self.table,
                    name,
                    format!("non-finite value {v}"),
                );
                self.record(gap);
                None
            }
            Err(gap) => {
                self.record(gap);
                None
            }
        }
    }

    /// A finite, strictly positive number.
    pub fn positive(&mut self, field: &Field<f64>, name: &str) -> Option<f64> {
        let v = self.number(field, name)?;
        if v > 0.0 {
            Some(v)
        } else {
            let gap =
                MissingPropertyData::out_of_range(&self.owner, &self.table, name, v, Some(0.0), None);
            self.record(gap);
            None
        }
    }

    /// A finite number within `[min, max]`.
    pub fn within(&mut self, field: &Field<f64>, name: &str, min: f64, max: f64) -> Option<f64> {
        let v = self.number(field, name)?;
        if (min..=max).contains(&v) {
            Some(v)
        } else {
            let gap = MissingPropertyData::out_of_range(
                &self.owner,
                &self.table,
                name,
                v,
                Some(min),
                Some(max),
            );
            self.record(gap);
            None
        }
    }

    /// Fixed-length coefficient array; each element reported individually.
    pub fn array<const N: usize>(
        &mut self,
        field: &Field<Vec<Option<f64>>>,
        name: &str,
    ) -> Option<[f64; N]> {
        let raw = match field.require(&self.owner, &self.table, name) {
            Ok(raw) => raw,
            Err(gap) => {
                self.record(gap);
                return None;
            }
        };
        if raw.len() != N {
            let gap = MissingPropertyData::malformed(
                &self.owner,
                &self.table,
                name,
                format!("expected {N} entries, found {}", raw.len()),
            );
            self.record(gap);
            return None;
        }
        let mut out = [0.0; N];
        let mut complete = true;
        for (i, v) in raw.iter().enumerate() {
            match v {
                Some(v) if v.is_finite() => out[i] = *v,
                Some(v) => {
                    complete = false;
                    let gap = MissingPropertyData::malformed(
                        &self.owner,
                        &self.table,
                        format!("{name}[{i}]"),
                        format!("non-finite value {v}"),
                    );
                    self.record(gap);
                }
                None => {
                    complete = false;
                    let gap =
                        MissingPropertyData::null(&self.owner, &self.table, format!("{name}[{i}]"));
                    self.record(gap);
                }
            }
        }
        complete.then_some(out)
    }

    /// Look up a species entry in a species-keyed map.
    pub fn species_entry<'a, T>(
        &mut self,
        map: &'a BTreeMap<String, T>,
        species: Species,
    ) -> Option<&'a T> {
        let entry = map.get(species.key());
        if entry.is_none() {
            let gap = MissingPropertyData::absent(&self.owner, &self.table, species.key());
            self.record(gap);
        }
        entry
    }

    pub fn is_clean(&self) -> bool {
        self.gaps.is_empty()
    }

    /// Finish validation: the value if every field resolved, otherwise all gaps.
    pub fn finish<T>(mut self, value: Option<T>) -> LoadResult<T> {
        match value {
            Some(v) if self.gaps.is_empty() => Ok(v),
            Some(_) => Err(self.gaps),
            None => {
                if self.gaps.is_empty() {
                    let gap = MissingPropertyData::malformed(
                        &self.owner,
                        &self.table,
                        "document",
                        "incomplete",
                    );
                    self.record(gap);
                }
                Err(self.gaps)
            }
        }
    }

    pub fn into_report(self) -> GapReport {
        self.gaps
    }
}

/// Read a JSON table document, logging its provenance.
pub fn load_json<T: DeserializeOwned>(path: &Path, owner: &str, table: &str) -> GapResult<T> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            warn!(table, path = %path.display(), error = %e, "table file unavailable");
            return Err(MissingPropertyData::absent(
                owner,
                table,
                path.display().to_string(),
            ));
        }
    };
    let doc: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
        MissingPropertyData::malformed(owner, table, path.display().to_string(), e.to_string())
    })?;

    let metadata = doc
        .get("metadata")
        .cloned()
        .map(serde_json::from_value::<Metadata>)
        .and_then(Result::ok)
        .unwrap_or_default();
    info!(
        table,
        path = %path.display(),
        source = metadata.source.as_deref().unwrap_or("unspecified"),
        route = metadata.route.as_deref().unwrap_or("unspecified"),
        "loaded table"
    );

    serde_json::from_value(doc).map_err(|e| {
        MissingPropertyData::malformed(owner, table, path.display().to_string(), e.to_string())
    })
}

// ---------------------------------------------------------------------------
// Property table schemas
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CriticalConstantsRaw {
    #[serde(rename = "Tc_K")]
    pub tc_k: Field<f64>,
    #[serde(rename = "Pc_Pa")]
    pub pc_pa: Field<f64>,
    pub omega: Field<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinaryInteraction {
    pub i: String,
    pub j: String,
    #[serde(default)]
    pub k: Field<f64>,
}

/// `props/cubic_eos.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CubicEosTable {
    pub metadata: Metadata,
    pub eos: Field<String>,
    pub species: BTreeMap<String, CriticalConstantsRaw>,
    pub kij: Vec<BinaryInteraction>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Nasa7SpeciesRaw {
    #[serde(rename = "T_low")]
    pub t_low: Field<f64>,
    #[serde(rename = "T_mid")]
    pub t_mid: Field<f64>,
    #[serde(rename = "T_high")]
    pub t_high: Field<f64>,
    pub low: Field<Vec<Option<f64>>>,
    pub high: Field<Vec<Option<f64>>>,
}

/// `props/nasa7.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Nasa7Table {
    pub metadata: Metadata,
    pub species: BTreeMap<String, Nasa7SpeciesRaw>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransportSegmentRaw {
    #[serde(rename = "T_min")]
    pub t_min: Field<f64>,
    #[serde(rename = "T_max")]
    pub t_max: Field<f64>,
    pub a: Field<f64>,
    pub b: Field<f64>,
    pub c: Field<f64>,
    pub d: Field<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransportSpeciesRaw {
    /// ln(μ [µP]) fits.
    pub viscosity: Field<Vec<TransportSegmentRaw>>,
    /// ln(k [µW/(cm·K)]) fits.
    pub conductivity: Field<Vec<TransportSegmentRaw>>,
}

/// `props/transport.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TransportTable {
    pub metadata: Metadata,
    pub species: BTreeMap<String, TransportSpeciesRaw>,
}

/// `props/mbwr/<species>_mbwr32.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct MbwrTable {
    pub metadata: Metadata,
    pub species: Field<String>,
    /// Gas constant [L·bar/(mol·K)].
    #[serde(rename = "R_L_bar_per_mol_K")]
    pub r: Field<f64>,
    #[serde(rename = "rho_c_mol_per_L")]
    pub rho_c: Field<f64>,
    /// Coefficients keyed `b1` .. `b32`.
    pub b: Field<BTreeMap<String, Field<f64>>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SaturationRowRaw {
    #[serde(rename = "T_K")]
    pub t_k: Field<f64>,
    pub p_bar: Field<f64>,
    pub rho_l_mol_per_m3: Field<f64>,
    pub rho_v_mol_per_m3: Field<f64>,
    #[serde(rename = "h_l_kJ_per_mol")]
    pub h_l_kj_per_mol: Field<f64>,
    #[serde(rename = "h_v_kJ_per_mol")]
    pub h_v_kj_per_mol: Field<f64>,
    #[serde(rename = "mu_l_Pa_s")]
    pub mu_l_pa_s: Field<f64>,
    #[serde(rename = "mu_v_Pa_s")]
    pub mu_v_pa_s: Field<f64>,
}

/// `saturation/saturation_table.json`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SaturationTableRaw {
    pub metadata: Metadata,
    pub species: BTreeMap<String, Vec<SaturationRowRaw>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default)]
    struct Entry {
        a: Field<f64>,
        b: Field<f64>,
        c: Field<f64>,
        coeffs: Field<Vec<Option<f64>>>,
    }

    #[test]
    fn field_distinguishes_absent_null_and_value() {
        let entry: Entry = serde_json::from_str(r#"{"a": 1.5, "b": null}"#).unwrap();
        assert_eq!(entry.a, Field::Value(1.5));
        assert_eq!(entry.b, Field::Null);
        assert_eq!(entry.c, Field::Absent);
    }

    #[test]
    fn collector_reports_every_gap() {
        let entry: Entry =
            serde_json::from_str(r#"{"a": -1.0, "b": null, "coeffs": [1.0, null, 3.0]}"#).unwrap();
        let mut c = GapCollector::new("entry", "entry_table");
        assert!(c.positive(&entry.a, "a").is_none());
        assert!(c.number(&entry.b, "b").is_none());
        assert!(c.number(&entry.c, "c").is_none());
        assert!(c.array::<3>(&entry.coeffs, "coeffs").is_none());
        let report = c.into_report();
        assert_eq!(report.len(), 4);
        let fields: Vec<&str> = report.iter().map(|g| g.field.as_str()).collect();
        assert!(fields.contains(&"coeffs[1]"));
    }

    #[test]
    fn array_length_mismatch_is_malformed() {
        let entry: Entry = serde_json::from_str(r#"{"coeffs": [1.0, 2.0]}"#).unwrap();
        let mut c = GapCollector::new("entry", "entry_table");
        assert!(c.array::<3>(&entry.coeffs, "coeffs").is_none());
        let gap = c.into_report().into_iter().next().unwrap();
        assert!(matches!(gap.kind, ffsc_core::GapKind::Malformed { .. }));
    }

    #[test]
    fn finish_returns_value_only_when_clean() {
        let c = GapCollector::new("o", "t");
        assert_eq!(c.finish(Some(3)).unwrap(), 3);

        let mut c = GapCollector::new("o", "t");
        c.record(MissingPropertyData::absent("o", "t", "x"));
        assert_eq!(c.finish(Some(3)).unwrap_err().len(), 1);

        let c = GapCollector::new("o", "t");
        assert_eq!(c.finish::<i32>(None).unwrap_err().len(), 1);
    }

    #[test]
    fn load_json_reports_missing_file_as_absent() {
        let path = std::env::temp_dir().join("ffsc_props_no_such_table.json");
        let _ = std::fs::remove_file(&path);
        let err = load_json::<Nasa7Table>(&path, "GasMixtureThermo", "nasa7").unwrap_err();
        assert_eq!(err.kind, ffsc_core::GapKind::Absent);
        assert_eq!(err.table, "nasa7");
    }

    #[test]
    fn load_json_reports_parse_failure_as_malformed() {
        let path = std::env::temp_dir().join("ffsc_props_broken_table.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = load_json::<Nasa7Table>(&path, "GasMixtureThermo", "nasa7").unwrap_err();
        assert!(matches!(err.kind, ffsc_core::GapKind::Malformed { .. }));
        let _ = std::fs::remove_file(&path);
    }
}
