//! Textual form of module graphs
//!
//! `print_module` renders the canonical form the parser accepts, with
//! per-region SSA numbering (`%arg0`, `%0`, `%1`, ...). `print_node` renders
//! a single node with raw arena ids for diagnostics.

use std::collections::HashMap;

use super::module::{Item, Module};
use super::node::{NodeId, NodeKind, RegionId};
use super::value::ValueId;

/// Render a whole module in its canonical textual form
pub fn print_module(module: &Module) -> String {
    let mut out = String::new();
    out.push_str("module {\n");
    for item in &module.items {
        match item {
            Item::Global(g) => {
                let visibility = if g.private { "private " } else { "" };
                out.push_str(&format!("  global {}@{} : {}\n", visibility, g.name, g.ty));
            }
            Item::Func(f) => {
                let names = region_value_names(module, f.region, &f.params);
                let params: Vec<String> = f
                    .params
                    .iter()
                    .map(|p| format!("{}: {}", names[p], module.value(*p).ty))
                    .collect();
                out.push_str(&format!("  func @{}({}) {{\n", f.name, params.join(", ")));
                print_region(module, f.region, &names, &mut out);
                out.push_str("  }\n");
            }
            Item::Initializer(init) => {
                let names = region_value_names(module, init.region, &[]);
                out.push_str("  initializer {\n");
                print_region(module, init.region, &names, &mut out);
                out.push_str("  }\n");
            }
        }
    }
    out.push_str("}\n");
    out
}

/// Render one node with raw value ids, for diagnostics
pub fn print_node(module: &Module, id: NodeId) -> String {
    node_text(module, id, &|v: ValueId| v.to_string())
}

fn print_region(
    module: &Module,
    region: RegionId,
    names: &HashMap<ValueId, String>,
    out: &mut String,
) {
    for &node in module.region_nodes(region) {
        let line = node_text(module, node, &|v: ValueId| {
            names.get(&v).cloned().unwrap_or_else(|| v.to_string())
        });
        out.push_str("    ");
        out.push_str(&line);
        out.push('\n');
    }
}

fn region_value_names(
    module: &Module,
    region: RegionId,
    params: &[ValueId],
) -> HashMap<ValueId, String> {
    let mut names = HashMap::new();
    for (i, p) in params.iter().enumerate() {
        names.insert(*p, format!("%arg{}", i));
    }
    let mut next = 0usize;
    for &node in module.region_nodes(region) {
        for &result in &module.node(node).results {
            names.insert(result, format!("%{}", next));
            next += 1;
        }
    }
    names
}

fn node_text(module: &Module, id: NodeId, name_of: &dyn Fn(ValueId) -> String) -> String {
    let node = module.node(id);
    let operands: Vec<String> = node.operands.iter().map(|o| name_of(*o)).collect();
    let result_tys: Vec<String> = node
        .results
        .iter()
        .map(|r| module.value(*r).ty.to_string())
        .collect();

    let mut line = String::new();
    if !node.results.is_empty() {
        let results: Vec<String> = node.results.iter().map(|r| name_of(*r)).collect();
        line.push_str(&results.join(", "));
        line.push_str(" = ");
    }
    match &node.kind {
        NodeKind::Const(value) => {
            line.push_str(&format!("const {} : {}", value, result_tys[0]));
        }
        NodeKind::Call(symbol) => {
            line.push_str(&format!("call @{}({})", symbol, operands.join(", ")));
            if !result_tys.is_empty() {
                line.push_str(&format!(" : {}", result_tys.join(", ")));
            }
        }
        NodeKind::GlobalLoad(name) => {
            line.push_str(&format!("load @{} : {}", name, result_tys[0]));
        }
        NodeKind::GlobalStore(name) => {
            line.push_str(&format!("store {} -> @{}", operands[0], name));
        }
        NodeKind::Return => {
            line.push_str("return");
            if !operands.is_empty() {
                line.push_str(&format!(" {}", operands.join(", ")));
            }
        }
        _ => {
            line.push_str(&format!(
                "{} {} : {}",
                node.kind.mnemonic(),
                operands.join(", "),
                result_tys.join(", ")
            ));
        }
    }
    line
}
