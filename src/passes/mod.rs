//! Module-level transformation passes
//!
//! Passes advertise a stable name and description so the pipeline layer can
//! discover and sequence them, and declare the auxiliary node kinds they
//! need the object model to provide.

mod hoist_into_globals;

pub use hoist_into_globals::HoistIntoGlobalsPass;

use crate::error::Result;
use crate::ir::Module;

/// Trait for module passes
pub trait Pass {
    /// Stable name of this pass
    fn name(&self) -> &'static str;

    /// One-line description of this pass
    fn description(&self) -> &'static str;

    /// Auxiliary node kinds this pass rewrites the module with
    fn required_kinds(&self) -> &'static [&'static str] {
        &[]
    }

    /// Run the pass on a module, mutating it in place
    fn run(&mut self, module: &mut Module) -> Result<()>;

    /// Check if this pass should run
    fn should_run(&self) -> bool {
        true
    }
}

/// Ordered pipeline of passes run over one module
#[derive(Default)]
pub struct PassPipeline {
    passes: Vec<Box<dyn Pass>>,
}

impl PassPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a pass to the end of the pipeline
    pub fn register(&mut self, pass: Box<dyn Pass>) {
        self.passes.push(pass);
    }

    /// Run every registered pass in order
    ///
    /// The first failing pass aborts the pipeline; the module must be
    /// considered unusable afterwards.
    pub fn run(&mut self, module: &mut Module) -> Result<()> {
        for pass in &mut self.passes {
            if !pass.should_run() {
                log::debug!("skipping pass {}", pass.name());
                continue;
            }
            log::debug!("running pass {}: {}", pass.name(), pass.description());
            pass.run(module)?;
        }
        Ok(())
    }
}
