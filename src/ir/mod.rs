//! SSA-style module IR
//!
//! Nodes, values, regions, and top-level items (functions, globals,
//! initializers), plus the textual parser/printer. The arenas live in
//! [`Module`]; everything cross-references through integer ids.

pub mod module;
pub mod node;
pub mod parser;
pub mod printer;
pub mod value;

pub use module::{Func, Global, Initializer, Item, Module};
pub use node::{Node, NodeId, NodeKind, Region, RegionId};
pub use value::{ConstValue, OperandRef, Type, Value, ValueDef, ValueId};
