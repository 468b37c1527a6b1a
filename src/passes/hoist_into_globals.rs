//! Hoist constant expressions into globals
//!
//! Walks the module in program order and, for every escaping use of an
//! eligible constant-expression root, materializes the root's backward slice
//! into a one-shot initializer populating private globals, then rewrites the
//! use into a load. Materialization is memoized per original value, so
//! repeated escapes of the same value share one global and one initializer.
//! Original const-expr nodes left without uses are erased afterwards.
//!
//! The placement is greedy: anything hoistable escapes into module state,
//! which can grow the static footprint beyond what a placement-aware
//! strategy would pick. Sinking globals back into the program where that
//! pays off is a separate, follow-on transform.

use std::collections::HashMap;

use crate::analysis::{ConstExprAnalysis, DefaultHoistPolicy, HoistConfig, HoistPolicy};
use crate::error::{Error, Result};
use crate::ir::{
    printer, Global, Initializer, Item, Module, NodeId, NodeKind, OperandRef, RegionId, Type,
    ValueDef, ValueId,
};

use super::Pass;

/// The global slot holding a hoisted value
#[derive(Debug, Clone)]
struct HoistedSlot {
    name: String,
    ty: Type,
}

/// Pass-local state, discarded when the run completes
#[derive(Default)]
struct HoistState {
    /// Original value -> slot that now holds its materialized result.
    /// At most one slot per value; later escapes reuse the entry.
    hoisted: HashMap<ValueId, HoistedSlot>,
    /// How many slots have been prepended to the item list so far; new
    /// slots land after them but before every pre-existing item.
    globals_inserted: usize,
}

/// Greedy hoisting of eligible constant expressions into globals
pub struct HoistIntoGlobalsPass<P: HoistPolicy = DefaultHoistPolicy> {
    policy: P,
}

impl HoistIntoGlobalsPass<DefaultHoistPolicy> {
    pub fn new() -> Self {
        Self {
            policy: DefaultHoistPolicy::new(),
        }
    }

    pub fn with_config(config: HoistConfig) -> Self {
        Self {
            policy: DefaultHoistPolicy::with_config(config),
        }
    }
}

impl Default for HoistIntoGlobalsPass<DefaultHoistPolicy> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: HoistPolicy> HoistIntoGlobalsPass<P> {
    /// Use a custom eligibility policy
    pub fn with_policy(policy: P) -> Self {
        Self { policy }
    }

    fn run_on_module(&self, module: &mut Module) -> Result<()> {
        let analysis = ConstExprAnalysis::new(module);
        let mut state = HoistState::default();

        // Snapshot the regions and their node lists up front. Initializers
        // appended during hoisting carry no classification and must not be
        // revisited; rewrites must not disturb the walk.
        let regions: Vec<RegionId> = module
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Func(f) => Some(f.region),
                Item::Initializer(init) => Some(init.region),
                Item::Global(_) => None,
            })
            .collect();

        for region in regions {
            let nodes: Vec<NodeId> = module.region_nodes(region).to_vec();
            for node in nodes {
                let Some(info) = analysis.classify(node) else {
                    continue;
                };
                // Non-root const-expr nodes are materialized as part of
                // their owning root's unit, never individually.
                if !info.is_const_expr || !info.is_root {
                    continue;
                }
                if !self.policy.is_hoistable_root(module, node) {
                    log::debug!(
                        "skipping ineligible root: {}",
                        printer::print_node(module, node)
                    );
                    continue;
                }
                log::debug!(
                    "processing const-expr root: {}",
                    printer::print_node(module, node)
                );

                let results = module.node(node).results.clone();
                for result in results {
                    // Snapshot the use list; rewriting mutates it during
                    // iteration, and uses discovered as a side effect of
                    // rewriting must not be revisited in this scan.
                    let uses: Vec<OperandRef> = module.value(result).uses.clone();
                    for operand in uses {
                        let consumer = operand.node;
                        if let Some(target) = analysis.classify(consumer) {
                            // A const-expr consumer is either internal to
                            // some unit or a root that will materialize on
                            // its own; neither is an escape. A root the
                            // policy rejects stays behind and does escape.
                            if target.is_const_expr
                                && (!target.is_root
                                    || self.policy.is_hoistable_root(module, consumer))
                            {
                                log::trace!(
                                    "  skip (const-expr consumer): {}",
                                    printer::print_node(module, consumer)
                                );
                                continue;
                            }
                        }
                        if !self.policy.is_hoistable_operand(module, operand) {
                            log::trace!(
                                "  skip (ineligible operand): {}",
                                printer::print_node(module, consumer)
                            );
                            continue;
                        }
                        log::debug!(
                            "  hoisting escape into {}",
                            printer::print_node(module, consumer)
                        );
                        self.hoist_escape(module, &analysis, &mut state, operand)?;
                    }
                }
            }
        }

        self.cleanup_dead_nodes(module, analysis.const_expr_nodes())
    }

    /// Ensure a slot exists for the operand's value and rewrite the operand
    /// into a load of it
    fn hoist_escape(
        &self,
        module: &mut Module,
        analysis: &ConstExprAnalysis,
        state: &mut HoistState,
        operand: OperandRef,
    ) -> Result<()> {
        let original = module.operand_value(operand);
        if !state.hoisted.contains_key(&original) {
            self.materialize(module, analysis, state, original)?;
        }
        let slot = state.hoisted.get(&original).cloned().ok_or_else(|| {
            Error::internal(format!(
                "materialization produced no slot for the requested value in {}",
                printer::print_node(module, operand.node)
            ))
        })?;

        let load = module.insert_node_before(
            operand.node,
            NodeKind::GlobalLoad(slot.name),
            vec![],
            vec![slot.ty],
        )?;
        let loaded = module.node(load).results[0];
        module.set_operand(operand, loaded);
        Ok(())
    }

    /// Clone the value's backward slice into a fresh initializer and create
    /// one slot per result of its root
    fn materialize(
        &self,
        module: &mut Module,
        analysis: &ConstExprAnalysis,
        state: &mut HoistState,
        value: ValueId,
    ) -> Result<()> {
        let root = match module.value(value).def {
            ValueDef::Node { node, .. } => node,
            ValueDef::Param { index } => {
                return Err(Error::internal(format!(
                    "const-expr value has no defining node (parameter {})",
                    index
                )))
            }
        };

        let region = module.create_region();
        let slice = analysis.backward_slice(root);
        let mut clone_map: HashMap<ValueId, ValueId> = HashMap::new();

        for source in slice {
            // A slice node hoisted by an earlier materialization of an
            // overlapping subtree has all of its results in the memo; splice
            // in loads instead of cloning it again. The program-order walk
            // guarantees all-or-nothing coverage here.
            let results = module.node(source).results.clone();
            let memoized = results
                .iter()
                .filter(|r| state.hoisted.contains_key(*r))
                .count();
            if memoized == results.len() && !results.is_empty() {
                for result in results {
                    let slot = state.hoisted[&result].clone();
                    let load = module.append_node(
                        region,
                        NodeKind::GlobalLoad(slot.name),
                        vec![],
                        vec![slot.ty],
                    );
                    clone_map.insert(result, module.node(load).results[0]);
                }
                continue;
            }
            if memoized != 0 {
                return Err(Error::internal(format!(
                    "partially hoisted slice node: {}",
                    printer::print_node(module, source)
                )));
            }
            log::debug!("  cloning: {}", printer::print_node(module, source));
            module.clone_node_with_remap(source, &mut clone_map, region);
        }

        // The root itself is always cloned; its identity is why we are here.
        let cloned_root = module.clone_node_with_remap(root, &mut clone_map, region);

        // One slot per result, declared at the head of the module so every
        // declaration precedes every initializer and load.
        let original_results = module.node(root).results.clone();
        let cloned_results = module.node(cloned_root).results.clone();
        for (original, cloned) in original_results.into_iter().zip(cloned_results) {
            let ty = module.value(original).ty;
            let name = module.unique_symbol("hoisted");
            module.insert_item(
                state.globals_inserted,
                Item::Global(Global {
                    name: name.clone(),
                    ty,
                    private: true,
                }),
            );
            state.globals_inserted += 1;
            module.append_node(
                region,
                NodeKind::GlobalStore(name.clone()),
                vec![cloned],
                vec![],
            );
            state.hoisted.insert(original, HoistedSlot { name, ty });
        }

        module.append_node(region, NodeKind::Return, vec![], vec![]);
        module.items.push(Item::Initializer(Initializer { region }));
        Ok(())
    }

    /// Erase original const-expr nodes left with no remaining uses
    ///
    /// Erasing a node can make its producers newly dead, so scan to
    /// fixpoint. The node set was captured before any mutation; the
    /// classification itself is no longer valid once erasure begins.
    fn cleanup_dead_nodes(&self, module: &mut Module, all_nodes: Vec<NodeId>) -> Result<()> {
        let mut remaining = all_nodes;
        loop {
            let mut kept = Vec::with_capacity(remaining.len());
            let mut changed = false;
            for node in remaining {
                if module.node_results_unused(node) {
                    log::debug!("erasing dead node: {}", printer::print_node(module, node));
                    module.erase_node(node)?;
                    changed = true;
                } else {
                    kept.push(node);
                }
            }
            remaining = kept;
            if !changed {
                return Ok(());
            }
        }
    }
}

impl<P: HoistPolicy> Pass for HoistIntoGlobalsPass<P> {
    fn name(&self) -> &'static str {
        "hoist-into-globals"
    }

    fn description(&self) -> &'static str {
        "Greedily hoists eligible constant expressions into globals"
    }

    fn required_kinds(&self) -> &'static [&'static str] {
        &["global", "load", "store", "initializer"]
    }

    fn run(&mut self, module: &mut Module) -> Result<()> {
        self.run_on_module(module)
    }
}
