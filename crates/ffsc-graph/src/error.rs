//! Topology construction errors.

use ffsc_core::{CompId, LinkId};

pub type TopologyResult<T> = Result<T, TopologyError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TopologyError {
    /// A connection refers to a component that doesn't exist.
    UnknownComponent { link: LinkId, comp: CompId },

    /// Two components share a name.
    DuplicateName { name: String },

    /// A component is connected to itself.
    SelfLoop { comp: CompId },

    /// The same pair is connected twice.
    DuplicateConnection { from: CompId, to: CompId },

    /// A component has more than one primary downstream connection.
    MultiplePrimary { comp: CompId },

    /// The flow graph has a cycle; no upstream-to-downstream order exists.
    Cycle,

    /// Name lookup failed.
    NotFound { name: String },
}

impl std::fmt::Display for TopologyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TopologyError::UnknownComponent { link, comp } => {
                write!(f, "Connection {} refers to non-existent component {}", link, comp)
            }
            TopologyError::DuplicateName { name } => {
                write!(f, "Component name '{}' is used more than once", name)
            }
            TopologyError::SelfLoop { comp } => {
                write!(f, "Component {} is connected to itself", comp)
            }
            TopologyError::DuplicateConnection { from, to } => {
                write!(f, "Components {} and {} are connected twice", from, to)
            }
            TopologyError::MultiplePrimary { comp } => {
                write!(f, "Component {} has more than one primary downstream", comp)
            }
            TopologyError::Cycle => write!(f, "Flow graph contains a cycle"),
            TopologyError::NotFound { name } => write!(f, "No component named '{}'", name),
        }
    }
}

impl std::error::Error for TopologyError {}
