//! `inspect` subcommand: const-expr classification summary

use std::path::Path;

use serde::Serialize;

use crate::analysis::{ConstExprAnalysis, DefaultHoistPolicy, HoistPolicy};
use crate::error::{Error, Result};
use crate::ir::{parser, printer};

/// One hoisting candidate in the summary
#[derive(Debug, Serialize)]
pub struct RootSummary {
    pub text: String,
    /// Eligibility under the default policy
    pub eligible: bool,
}

/// Module-level classification summary
#[derive(Debug, Serialize)]
pub struct AnalysisSummary {
    pub nodes: usize,
    pub values: usize,
    pub const_expr_nodes: usize,
    pub roots: Vec<RootSummary>,
}

pub fn inspect(input: &Path, format: &str) -> Result<()> {
    let source = crate::cli::utils::read_source(input)?;
    let module = parser::parse_module(&source)?;
    let analysis = ConstExprAnalysis::new(&module);
    let policy = DefaultHoistPolicy::new();

    let roots = analysis
        .root_nodes()
        .into_iter()
        .map(|node| RootSummary {
            text: printer::print_node(&module, node),
            eligible: policy.is_hoistable_root(&module, node),
        })
        .collect();
    let summary = AnalysisSummary {
        nodes: module.node_count(),
        values: module.value_count(),
        const_expr_nodes: analysis.const_expr_nodes().len(),
        roots,
    };

    match format {
        "json" => {
            let rendered = serde_json::to_string_pretty(&summary)
                .map_err(|e| Error::internal(format!("JSON serialization failed: {}", e)))?;
            println!("{}", rendered);
        }
        _ => {
            println!("nodes: {}", summary.nodes);
            println!("values: {}", summary.values);
            println!("const-expr nodes: {}", summary.const_expr_nodes);
            println!("roots: {}", summary.roots.len());
            for root in &summary.roots {
                let marker = if root.eligible { "+" } else { "-" };
                println!("  {} {}", marker, root.text);
            }
        }
    }
    Ok(())
}
