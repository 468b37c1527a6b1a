//! `print` subcommand: parse a module and print its canonical form

use std::path::{Path, PathBuf};

use crate::cli::utils;
use crate::error::Result;
use crate::ir::{parser, printer};

pub fn print(input: &Path, output: Option<&PathBuf>) -> Result<()> {
    let source = utils::read_source(input)?;
    let module = parser::parse_module(&source)?;
    utils::write_output(&printer::print_module(&module), output)
}
