//! const-hoist-rs: module-IR optimizer that hoists constant expressions into globals
//!
//! This library provides a small SSA-style module IR, a constant-expression
//! classification analysis, and a greedy transform that materializes
//! eligible constant subgraphs as module-level initializers populating
//! private globals, replacing each escaping use with a load.

pub mod analysis;
pub mod cli;
pub mod error;
pub mod ir;
pub mod passes;

pub use error::{Error as HoistError, Result as HoistResult};

// Re-export commonly used types
pub use analysis::{ConstExprAnalysis, DefaultHoistPolicy, HoistConfig, HoistPolicy};
pub use ir::{Module, NodeId, ValueId};
pub use passes::{HoistIntoGlobalsPass, Pass, PassPipeline};
