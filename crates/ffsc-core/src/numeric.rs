use crate::error::{GapResult, MissingPropertyData};

/// Floating point type used throughout system
pub type Real = f64;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

/// Reject NaN/inf results so they never flow into downstream state.
pub fn ensure_finite(v: Real, owner: &str, field: &str) -> GapResult<Real> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(MissingPropertyData::malformed(
            owner,
            "computed",
            field,
            format!("non-finite value {v}"),
        ))
    }
}

/// Strictly positive, finite.
pub fn ensure_positive(v: Real, owner: &str, table: &str, field: &str) -> GapResult<Real> {
    if v.is_finite() && v > 0.0 {
        Ok(v)
    } else {
        Err(MissingPropertyData::out_of_range(
            owner,
            table,
            field,
            v,
            Some(0.0),
            None,
        ))
    }
}

/// Inclusive range check.
pub fn ensure_within(v: Real, min: Real, max: Real, owner: &str, table: &str, field: &str) -> GapResult<Real> {
    if v.is_finite() && v >= min && v <= max {
        Ok(v)
    } else {
        Err(MissingPropertyData::out_of_range(
            owner,
            table,
            field,
            v,
            Some(min),
            Some(max),
        ))
    }
}
