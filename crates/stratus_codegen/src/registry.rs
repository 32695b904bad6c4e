//! Engine registry for looking up code generators by name.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::engine::Engine;
use crate::error::{CodegenError, CodegenResult};
use crate::pulumi::PulumiEngine;
use crate::terraform::TerraformEngine;

/// A registry of code generation engines.
///
/// Engines are registered once at startup and looked up per request. Lookups
/// take a shared read lock, so concurrent `get` calls never block each other.
#[derive(Default)]
pub struct EngineRegistry {
    engines: RwLock<HashMap<String, Arc<dyn Engine>>>,
}

impl EngineRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            engines: RwLock::new(HashMap::new()),
        }
    }

    /// Create a registry with the Terraform and Pulumi engines.
    pub fn with_defaults() -> CodegenResult<Self> {
        let registry = Self::new();
        registry.register(Arc::new(TerraformEngine::new()))?;
        registry.register(Arc::new(PulumiEngine::new()))?;
        Ok(registry)
    }

    /// Register an engine under its `name()`.
    ///
    /// Fails if the name is empty or already taken.
    pub fn register(&self, engine: Arc<dyn Engine>) -> CodegenResult<()> {
        let name = engine.name().trim().to_string();
        if name.is_empty() {
            return Err(CodegenError::InvalidEngineName);
        }

        let mut engines = self.engines.write();
        if engines.contains_key(&name) {
            return Err(CodegenError::DuplicateEngine(name));
        }
        debug!("Registering engine: {}", name);
        engines.insert(name, engine);
        Ok(())
    }

    /// Get an engine by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Engine>> {
        self.engines.read().get(name).cloned()
    }

    /// Get an engine by name, returning an error if not found.
    pub fn get_required(&self, name: &str) -> CodegenResult<Arc<dyn Engine>> {
        self.get(name)
            .ok_or_else(|| CodegenError::UnknownEngine(name.to_string()))
    }

    /// Get an engine by name, panicking if it is missing.
    ///
    /// Only meant for wiring at startup; request paths use [`get`](Self::get).
    pub fn must_get(&self, name: &str) -> Arc<dyn Engine> {
        match self.get(name) {
            Some(engine) => engine,
            None => panic!("engine '{}' is not registered", name),
        }
    }

    /// Check if an engine is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.engines.read().contains_key(name)
    }

    /// Get all registered engine names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.engines.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.engines.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.engines.read().is_empty()
    }
}

impl std::fmt::Debug for EngineRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineRegistry")
            .field("engines", &self.names())
            .finish()
    }
}
