//! Hoisting eligibility policy
//!
//! The analysis says what *is* a constant expression; the policy says what
//! is *worth* (and legal) to hoist. Rejections are not errors — the
//! transform simply leaves rejected sites alone.

use crate::ir::{Module, NodeId, NodeKind, OperandRef, Type};

/// Knobs controlling what the default policy will hoist
#[derive(Debug, Clone)]
pub struct HoistConfig {
    /// Hoist string-typed constant expressions
    pub hoist_strings: bool,
}

impl Default for HoistConfig {
    fn default() -> Self {
        Self {
            hoist_strings: true,
        }
    }
}

/// Eligibility predicates consulted by the hoisting transform
pub trait HoistPolicy {
    /// Whether this root may be materialized as a hoisting unit
    fn is_hoistable_root(&self, module: &Module, node: NodeId) -> bool;

    /// Whether this operand may be redirected to a load of a hoisted global
    fn is_hoistable_operand(&self, module: &Module, operand: OperandRef) -> bool;
}

/// Default policy: type-driven root eligibility, structural operand checks
#[derive(Debug, Clone, Default)]
pub struct DefaultHoistPolicy {
    config: HoistConfig,
}

impl DefaultHoistPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HoistConfig) -> Self {
        Self { config }
    }
}

impl HoistPolicy for DefaultHoistPolicy {
    fn is_hoistable_root(&self, module: &Module, node: NodeId) -> bool {
        module.node(node).results.iter().all(|&result| {
            let ty = module.value(result).ty;
            match ty {
                Type::Str => self.config.hoist_strings,
                _ => ty.is_materializable(),
            }
        })
    }

    fn is_hoistable_operand(&self, module: &Module, operand: OperandRef) -> bool {
        // A store's value operand is structural: redirecting it through a
        // hoisted slot would alias two globals' storage.
        !matches!(
            module.node(operand.node).kind,
            NodeKind::GlobalStore(_)
        )
    }
}
