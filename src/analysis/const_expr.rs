//! Constant-expression classification over module graphs
//!
//! Walks the module in program order and labels every node with
//! `{is_const_expr, is_root}`. A node is const-expr iff its kind is eligible
//! and every operand is itself produced by a const-expr node; parameters
//! taint everything downstream. A const-expr node is a root iff some use of
//! one of its results crosses out of the const-expr set, or it has no uses
//! at all — roots are the maximal boundaries the hoisting transform treats
//! as units.
//!
//! The analysis is valid only for the graph it was computed on; any mutation
//! invalidates it.

use std::collections::{HashMap, HashSet};

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, Reversed};

use crate::ir::{Module, NodeId, ValueDef, ValueId};

/// Per-node classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub is_const_expr: bool,
    /// Outer boundary of a maximal constant subtree
    pub is_root: bool,
}

/// Constant-expression analysis result
pub struct ConstExprAnalysis {
    info: HashMap<NodeId, Classification>,
    /// Dependency graph over const-expr nodes: producer -> consumer
    graph: DiGraph<NodeId, ()>,
    graph_index: HashMap<NodeId, NodeIndex>,
    /// Program-order position of every visited node
    position: HashMap<NodeId, usize>,
    const_values: HashSet<ValueId>,
}

impl ConstExprAnalysis {
    /// Classify every node of a module
    pub fn new(module: &Module) -> Self {
        let mut analysis = ConstExprAnalysis {
            info: HashMap::new(),
            graph: DiGraph::new(),
            graph_index: HashMap::new(),
            position: HashMap::new(),
            const_values: HashSet::new(),
        };
        analysis.classify_nodes(module);
        analysis.mark_roots(module);
        analysis
    }

    fn classify_nodes(&mut self, module: &Module) {
        let mut counter = 0usize;
        for region in module.items.iter().filter_map(|item| match item {
            crate::ir::Item::Func(f) => Some(f.region),
            crate::ir::Item::Initializer(init) => Some(init.region),
            crate::ir::Item::Global(_) => None,
        }) {
            for &node_id in module.region_nodes(region) {
                self.position.insert(node_id, counter);
                counter += 1;

                let node = module.node(node_id);
                let eligible = node.kind.is_const_expr_eligible()
                    && node
                        .operands
                        .iter()
                        .all(|operand| self.const_values.contains(operand));
                if !eligible {
                    self.info.insert(
                        node_id,
                        Classification {
                            is_const_expr: false,
                            is_root: false,
                        },
                    );
                    continue;
                }

                self.info.insert(
                    node_id,
                    Classification {
                        is_const_expr: true,
                        is_root: false,
                    },
                );
                for &result in &node.results {
                    self.const_values.insert(result);
                }
                let index = self.graph.add_node(node_id);
                self.graph_index.insert(node_id, index);
                for &operand in &node.operands {
                    if let ValueDef::Node { node: producer, .. } = module.value(operand).def {
                        if let Some(&producer_index) = self.graph_index.get(&producer) {
                            self.graph.update_edge(producer_index, index, ());
                        }
                    }
                }
            }
        }
    }

    fn mark_roots(&mut self, module: &Module) {
        let const_expr: Vec<NodeId> = self
            .info
            .iter()
            .filter(|(_, c)| c.is_const_expr)
            .map(|(&id, _)| id)
            .collect();
        for node_id in const_expr {
            let node = module.node(node_id);
            let mut total_uses = 0usize;
            let mut escaped = false;
            for &result in &node.results {
                for use_ref in &module.value(result).uses {
                    total_uses += 1;
                    if !self.is_const_expr(use_ref.node) {
                        escaped = true;
                    }
                }
            }
            if escaped || total_uses == 0 {
                if let Some(entry) = self.info.get_mut(&node_id) {
                    entry.is_root = true;
                }
            }
        }
    }

    /// Classification for a node visited by the analysis
    pub fn classify(&self, node: NodeId) -> Option<Classification> {
        self.info.get(&node).copied()
    }

    pub fn is_const_expr(&self, node: NodeId) -> bool {
        self.info
            .get(&node)
            .map(|c| c.is_const_expr)
            .unwrap_or(false)
    }

    pub fn is_root(&self, node: NodeId) -> bool {
        self.info.get(&node).map(|c| c.is_root).unwrap_or(false)
    }

    /// All const-expr nodes, in program order
    pub fn const_expr_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .info
            .iter()
            .filter(|(_, c)| c.is_const_expr)
            .map(|(&id, _)| id)
            .collect();
        nodes.sort_by_key(|id| self.position[id]);
        nodes
    }

    /// All root nodes, in program order
    pub fn root_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = self
            .info
            .iter()
            .filter(|(_, c)| c.is_root)
            .map(|(&id, _)| id)
            .collect();
        nodes.sort_by_key(|id| self.position[id]);
        nodes
    }

    /// Transitive producers of a node's operands, in program order
    ///
    /// The node itself is excluded. For a const-expr node the slice lies
    /// entirely within the const-expr set.
    pub fn backward_slice(&self, node: NodeId) -> Vec<NodeId> {
        let Some(&start) = self.graph_index.get(&node) else {
            return Vec::new();
        };
        let reversed = Reversed(&self.graph);
        let mut slice = Vec::new();
        let mut dfs = Dfs::new(reversed, start);
        while let Some(index) = dfs.next(reversed) {
            if index != start {
                slice.push(self.graph[index]);
            }
        }
        slice.sort_by_key(|id| self.position[id]);
        slice
    }
}
