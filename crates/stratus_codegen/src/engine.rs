//! Code generation engine contract.
//!
//! An engine renders a sorted architecture into files for one IaC backend.
//! Engines own the target-language structure: file layout, how declarations
//! are grouped, and whether the supplied resource order must be kept in the
//! emitted text. What a single resource looks like is delegated to a
//! [`ResourceRenderer`](crate::render::ResourceRenderer).

use stratus_arch::{Architecture, Resource};

use crate::error::CodegenResult;
use crate::output::Output;

/// Trait for code generation engines.
///
/// Engines must be `Send + Sync`; a single instance serves concurrent
/// requests through the [`EngineRegistry`](crate::registry::EngineRegistry).
pub trait Engine: Send + Sync {
    /// Get the unique engine name used for registry lookups.
    fn name(&self) -> &str;

    /// Get a human-readable description of the engine.
    fn description(&self) -> &str {
        ""
    }

    /// Generate files for an architecture.
    ///
    /// `sorted` holds every resource of the architecture in dependency order.
    fn generate(&self, architecture: &Architecture, sorted: &[Resource]) -> CodegenResult<Output>;
}
