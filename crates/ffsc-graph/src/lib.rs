//! ffsc-graph: fixed engine topology.
//!
//! Components are named vertices; connections carry flow from an upstream
//! outlet to a downstream inlet. A connection is either *primary* (it defines
//! the back pressure and demand seen by the upstream component) or a *tap*
//! (a side bleed that reads the stream without loading it). The validated
//! [`SystemTopology`] is immutable and exposes a deterministic
//! upstream-to-downstream visiting order.

pub mod builder;
pub mod error;
pub mod topology;
mod validate;

pub use builder::TopologyBuilder;
pub use error::{TopologyError, TopologyResult};
pub use topology::{Connection, ConnectionKind, SystemTopology};
