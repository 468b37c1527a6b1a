//! The module graph: arenas, items, and structural mutation primitives
//!
//! A module owns three arenas (nodes, values, regions) plus an ordered list
//! of top-level items. All cross-references are arena indices, so maps keyed
//! on ids survive mutation. The mutators here maintain the use lists; callers
//! never touch them directly.

use std::collections::HashMap;
use std::collections::HashSet;

use crate::error::{Error, Result};

use super::node::{Node, NodeId, NodeKind, Region, RegionId};
use super::value::{OperandRef, Type, Value, ValueDef, ValueId};

/// A module-scoped storage slot
#[derive(Debug, Clone)]
pub struct Global {
    pub name: String,
    pub ty: Type,
    pub private: bool,
}

/// A function with parameters and a body region
#[derive(Debug, Clone)]
pub struct Func {
    pub name: String,
    pub params: Vec<ValueId>,
    pub region: RegionId,
}

/// A module-level routine executed once to populate globals
#[derive(Debug, Clone)]
pub struct Initializer {
    pub region: RegionId,
}

/// A top-level module item, in textual order
#[derive(Debug, Clone)]
pub enum Item {
    Global(Global),
    Func(Func),
    Initializer(Initializer),
}

/// The module graph
#[derive(Debug, Clone, Default)]
pub struct Module {
    nodes: Vec<Node>,
    values: Vec<Value>,
    regions: Vec<Region>,
    pub items: Vec<Item>,
    symbols: HashSet<String>,
}

impl Module {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn value(&self, id: ValueId) -> &Value {
        &self.values[id.index()]
    }

    pub fn region_nodes(&self, id: RegionId) -> &[NodeId] {
        &self.regions[id.index()].nodes
    }

    /// Count of live (non-erased) nodes
    pub fn node_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.dead).count()
    }

    /// Iterate live nodes in arena order
    pub fn iter_nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| !n.dead)
            .map(|(i, n)| (NodeId(i as u32), n))
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }

    /// Look up a global item by symbol name
    pub fn find_global(&self, name: &str) -> Option<&Global> {
        self.items.iter().find_map(|item| match item {
            Item::Global(g) if g.name == name => Some(g),
            _ => None,
        })
    }

    /// Register a symbol name verbatim; false if it is already taken
    pub fn register_symbol(&mut self, name: &str) -> bool {
        self.symbols.insert(name.to_string())
    }

    /// Allocate a fresh symbol name from a hint, suffixing as needed
    pub fn unique_symbol(&mut self, hint: &str) -> String {
        if self.symbols.insert(hint.to_string()) {
            return hint.to_string();
        }
        let mut i = 0usize;
        loop {
            let candidate = format!("{}_{}", hint, i);
            if self.symbols.insert(candidate.clone()) {
                return candidate;
            }
            i += 1;
        }
    }

    pub fn create_region(&mut self) -> RegionId {
        let id = RegionId(self.regions.len() as u32);
        self.regions.push(Region::default());
        id
    }

    /// Allocate a function parameter value
    pub fn alloc_param(&mut self, ty: Type, index: usize) -> ValueId {
        self.alloc_value(ty, ValueDef::Param { index })
    }

    fn alloc_value(&mut self, ty: Type, def: ValueDef) -> ValueId {
        let id = ValueId(self.values.len() as u32);
        self.values.push(Value {
            ty,
            def,
            uses: Vec::new(),
        });
        id
    }

    /// Insert a global item at a fixed position in the item list
    pub fn insert_item(&mut self, index: usize, item: Item) {
        self.items.insert(index, item);
    }

    fn make_node(
        &mut self,
        region: RegionId,
        kind: NodeKind,
        operands: Vec<ValueId>,
        result_tys: Vec<Type>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        for (index, &operand) in operands.iter().enumerate() {
            self.values[operand.index()]
                .uses
                .push(OperandRef { node: id, index });
        }
        let results = result_tys
            .into_iter()
            .enumerate()
            .map(|(index, ty)| self.alloc_value(ty, ValueDef::Node { node: id, index }))
            .collect();
        self.nodes.push(Node {
            kind,
            operands,
            results,
            region,
            dead: false,
        });
        id
    }

    /// Create a node and append it to the end of a region
    pub fn append_node(
        &mut self,
        region: RegionId,
        kind: NodeKind,
        operands: Vec<ValueId>,
        result_tys: Vec<Type>,
    ) -> NodeId {
        let id = self.make_node(region, kind, operands, result_tys);
        self.regions[region.index()].nodes.push(id);
        id
    }

    /// Create a node and insert it immediately before `before` in its region
    pub fn insert_node_before(
        &mut self,
        before: NodeId,
        kind: NodeKind,
        operands: Vec<ValueId>,
        result_tys: Vec<Type>,
    ) -> Result<NodeId> {
        let region = self.nodes[before.index()].region;
        let position = self.regions[region.index()]
            .nodes
            .iter()
            .position(|&n| n == before)
            .ok_or_else(|| {
                Error::internal(format!("node {:?} is not linked into its region", before))
            })?;
        let id = self.make_node(region, kind, operands, result_tys);
        self.regions[region.index()].nodes.insert(position, id);
        Ok(id)
    }

    /// The value currently feeding an operand position
    pub fn operand_value(&self, operand: OperandRef) -> ValueId {
        self.nodes[operand.node.index()].operands[operand.index]
    }

    /// Redirect an operand to a different value, maintaining both use lists
    pub fn set_operand(&mut self, operand: OperandRef, new_value: ValueId) {
        let old_value = self.operand_value(operand);
        self.values[old_value.index()].uses.retain(|u| *u != operand);
        self.nodes[operand.node.index()].operands[operand.index] = new_value;
        self.values[new_value.index()].uses.push(operand);
    }

    /// Clone a node into `region`, remapping operands through `map`
    ///
    /// Operands without a mapping are carried over unchanged. The clone's
    /// fresh results are registered into `map` under the source results, so a
    /// sequence of clones in dependency order stitches itself together.
    pub fn clone_node_with_remap(
        &mut self,
        source: NodeId,
        map: &mut HashMap<ValueId, ValueId>,
        region: RegionId,
    ) -> NodeId {
        let kind = self.nodes[source.index()].kind.clone();
        let operands: Vec<ValueId> = self.nodes[source.index()]
            .operands
            .iter()
            .map(|op| map.get(op).copied().unwrap_or(*op))
            .collect();
        let source_results = self.nodes[source.index()].results.clone();
        let result_tys: Vec<Type> = source_results
            .iter()
            .map(|r| self.values[r.index()].ty)
            .collect();
        let clone = self.append_node(region, kind, operands, result_tys);
        let clone_results = self.nodes[clone.index()].results.clone();
        for (orig, new) in source_results.into_iter().zip(clone_results) {
            map.insert(orig, new);
        }
        clone
    }

    /// Whether every result of a node has an empty use list
    pub fn node_results_unused(&self, id: NodeId) -> bool {
        self.nodes[id.index()]
            .results
            .iter()
            .all(|r| self.values[r.index()].uses.is_empty())
    }

    /// Erase a node: unlink it from its region and from operand use lists
    ///
    /// The node must have no remaining uses of any result.
    pub fn erase_node(&mut self, id: NodeId) -> Result<()> {
        if !self.node_results_unused(id) {
            return Err(Error::internal(format!(
                "erasing node {:?} whose results are still in use",
                id
            )));
        }
        let operands = self.nodes[id.index()].operands.clone();
        for operand in operands {
            self.values[operand.index()].uses.retain(|u| u.node != id);
        }
        let region = self.nodes[id.index()].region;
        self.regions[region.index()].nodes.retain(|&n| n != id);
        self.nodes[id.index()].dead = true;
        Ok(())
    }
}
