//! Error types for engine assembly and stepping.

use ffsc_core::{GapReport, MissingPropertyData};
use ffsc_graph::TopologyError;
use thiserror::Error;

/// Errors returned by [`EngineSystem`](crate::EngineSystem).
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    /// Every gap found while loading tables and building components.
    #[error("assembly failed with {} missing property condition(s)", .0.len())]
    Assembly(GapReport),

    /// First gap hit during a step; nothing was committed.
    #[error("step aborted: {0}")]
    MissingData(MissingPropertyData),

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// A previous step halted the system.
    #[error("system halted after: {cause}")]
    Halted { cause: MissingPropertyData },

    #[error("system already completed")]
    Completed,

    #[error("invalid topology: {0}")]
    Topology(#[from] TopologyError),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// Gaps carried by this error, if any.
    pub fn gaps(&self) -> GapReport {
        match self {
            EngineError::Assembly(report) => report.clone(),
            EngineError::MissingData(gap) | EngineError::Halted { cause: gap } => {
                GapReport::from([gap.clone()])
            }
            _ => GapReport::new(),
        }
    }
}
