//! `optimize` subcommand: run the hoisting pipeline over a module

use std::path::PathBuf;

use crate::analysis::HoistConfig;
use crate::cli::utils;
use crate::error::Result;
use crate::ir::{parser, printer};
use crate::passes::{HoistIntoGlobalsPass, PassPipeline};

/// Arguments for the optimize subcommand
pub struct OptimizeArgs {
    pub input_path: PathBuf,
    pub output_path: Option<PathBuf>,
    pub no_hoist_strings: bool,
}

pub fn optimize(args: &OptimizeArgs) -> Result<()> {
    let source = utils::read_source(&args.input_path)?;
    let mut module = parser::parse_module(&source)?;

    let config = HoistConfig {
        hoist_strings: !args.no_hoist_strings,
    };
    let mut pipeline = PassPipeline::new();
    pipeline.register(Box::new(HoistIntoGlobalsPass::with_config(config)));
    pipeline.run(&mut module)?;

    utils::write_output(&printer::print_module(&module), args.output_path.as_ref())
}
