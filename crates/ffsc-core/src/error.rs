//! The single error taxonomy of the engine model.
//!
//! Every unavailable table, coefficient or out-of-domain value surfaces as a
//! [`MissingPropertyData`]. The kind distinguishes a missing entry from a
//! `null` placeholder and from a value that exists but falls outside its domain.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use thiserror::Error;

pub type GapResult<T> = Result<T, MissingPropertyData>;

/// Ordered, de-duplicated collection of gaps returned by batch operations.
pub type GapReport = BTreeSet<MissingPropertyData>;

/// What is wrong with the referenced field.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum GapKind {
    /// File, species entry, row or key not present.
    Absent,
    /// Key present with a `null` placeholder.
    Null,
    /// Present but unusable (wrong length, unparsable, non-finite).
    Malformed { detail: String },
    /// Outside the valid domain. Either bound may be open.
    OutOfRange {
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    },
}

impl GapKind {
    fn rank(&self) -> u8 {
        match self {
            GapKind::Absent => 0,
            GapKind::Null => 1,
            GapKind::Malformed { .. } => 2,
            GapKind::OutOfRange { .. } => 3,
        }
    }
}

impl fmt::Display for GapKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapKind::Absent => write!(f, "absent"),
            GapKind::Null => write!(f, "null placeholder"),
            GapKind::Malformed { detail } => write!(f, "malformed ({detail})"),
            GapKind::OutOfRange { value, min, max } => {
                write!(f, "value {value} outside [")?;
                match min {
                    Some(lo) => write!(f, "{lo}")?,
                    None => write!(f, "-inf")?,
                }
                write!(f, ", ")?;
                match max {
                    Some(hi) => write!(f, "{hi}")?,
                    None => write!(f, "+inf")?,
                }
                write!(f, "]")
            }
        }
    }
}

fn cmp_opt(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(x), Some(y)) => x.total_cmp(&y),
    }
}

impl Ord for GapKind {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (GapKind::Malformed { detail: a }, GapKind::Malformed { detail: b }) => a.cmp(b),
            (
                GapKind::OutOfRange {
                    value: v1,
                    min: lo1,
                    max: hi1,
                },
                GapKind::OutOfRange {
                    value: v2,
                    min: lo2,
                    max: hi2,
                },
            ) => v1
                .total_cmp(v2)
                .then_with(|| cmp_opt(*lo1, *lo2))
                .then_with(|| cmp_opt(*hi1, *hi2)),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for GapKind {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for GapKind {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for GapKind {}

impl Hash for GapKind {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            GapKind::Absent | GapKind::Null => {}
            GapKind::Malformed { detail } => detail.hash(state),
            GapKind::OutOfRange { value, min, max } => {
                value.to_bits().hash(state);
                min.map(f64::to_bits).hash(state);
                max.map(f64::to_bits).hash(state);
            }
        }
    }
}

/// A property input that is unavailable or outside its valid domain.
#[derive(Error, Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[error("missing property data in {owner}: {table}.{field} ({kind})")]
pub struct MissingPropertyData {
    /// Component or interface that needed the value.
    pub owner: String,
    /// Table (file or logical table) the value belongs to.
    pub table: String,
    /// Field, key or coefficient name.
    pub field: String,
    pub kind: GapKind,
}

impl MissingPropertyData {
    pub fn new(
        owner: impl Into<String>,
        table: impl Into<String>,
        field: impl Into<String>,
        kind: GapKind,
    ) -> Self {
        Self {
            owner: owner.into(),
            table: table.into(),
            field: field.into(),
            kind,
        }
    }

    pub fn absent(
        owner: impl Into<String>,
        table: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self::new(owner, table, field, GapKind::Absent)
    }

    pub fn null(
        owner: impl Into<String>,
        table: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        Self::new(owner, table, field, GapKind::Null)
    }

    pub fn malformed(
        owner: impl Into<String>,
        table: impl Into<String>,
        field: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self::new(
            owner,
            table,
            field,
            GapKind::Malformed {
                detail: detail.into(),
            },
        )
    }

    pub fn out_of_range(
        owner: impl Into<String>,
        table: impl Into<String>,
        field: impl Into<String>,
        value: f64,
        min: Option<f64>,
        max: Option<f64>,
    ) -> Self {
        Self::new(owner, table, field, GapKind::OutOfRange { value, min, max })
    }

    /// Re-tag the condition with the component that triggered the lookup.
    pub fn attributed_to(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    pub fn is_out_of_range(&self) -> bool {
        matches!(self.kind, GapKind::OutOfRange { .. })
    }
}
