//! Command-line interface module
//!
//! This module contains the implementations for the CLI subcommands.

pub mod inspect;
pub mod optimize;
pub mod print;

/// Common CLI utilities
pub mod utils {
    use crate::error::{Error, Result};
    use std::path::{Path, PathBuf};

    /// Read a module source file into a string
    pub fn read_source(path: &Path) -> Result<String> {
        std::fs::read_to_string(path).map_err(Error::from)
    }

    /// Write output to file or stdout
    pub fn write_output(content: &str, output_path: Option<&PathBuf>) -> Result<()> {
        match output_path {
            Some(path) => std::fs::write(path, content).map_err(Error::from),
            None => {
                println!("{}", content);
                Ok(())
            }
        }
    }
}
