//! ffsc-sim: network integrator for the FFSC engine model.
//!
//! Provides:
//! - `EngineSystem`: assembly from table files, gap checks and atomic steps
//! - `TablePaths`: default table layout with per-table overrides
//! - `StateSnapshot`: per-port flows, pressures, temperatures and thrust
//!
//! ```no_run
//! use ffsc_sim::{EngineSystem, TablePaths};
//!
//! let paths = TablePaths::new("data/demo");
//! let mut engine = EngineSystem::build_from_files(&paths)?;
//! assert!(engine.missing_data().is_empty());
//! let snapshot = engine.step(0.1)?;
//! println!("thrust {:.1} N", snapshot.thrust_n);
//! # Ok::<(), ffsc_sim::EngineError>(())
//! ```

pub mod config;
pub mod error;
pub mod snapshot;
pub mod system;

pub use config::{ConnectionDef, EngineConfig, TablePaths};
pub use error::{EngineError, EngineResult};
pub use snapshot::{PortSnapshot, StateSnapshot};
pub use system::{DEFAULT_CHECK_DT, EngineSystem, RunRecord, SystemStatus};
