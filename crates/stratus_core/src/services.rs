//! Collaborator interfaces used by the pipeline.
//!
//! The pipeline only talks to these traits. The `Standard*` services wrap the
//! graph, architecture and codegen crates; project storage lives in
//! [`store`](crate::store).

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use stratus_arch::{
    Architecture, ArchitectureMapper, CloudProvider, DependencyResolver, MapperRegistry, Resource,
    RuleValidationResult, RuleValidator,
};
use stratus_codegen::{EngineRegistry, Output};
use stratus_graph::{DiagramGraph, DiagramParser, DiagramValidator, ValidationOptions, ValidationResult};

use crate::error::{CoreError, CoreResult};
use crate::pricing::PricingEstimate;
use crate::project::{CreateProjectRequest, Project};

/// Parses and validates diagrams.
#[async_trait]
pub trait DiagramService: Send + Sync {
    async fn parse(&self, bytes: &[u8]) -> CoreResult<DiagramGraph>;

    async fn validate(
        &self,
        graph: &DiagramGraph,
        options: Option<&ValidationOptions>,
    ) -> CoreResult<ValidationResult>;
}

/// Maps diagrams onto providers and checks and orders architectures.
#[async_trait]
pub trait ArchitectureService: Send + Sync {
    async fn map_from_diagram(
        &self,
        graph: &DiagramGraph,
        provider: CloudProvider,
        region: &str,
    ) -> CoreResult<Architecture>;

    async fn validate_rules(
        &self,
        architecture: &Architecture,
        provider: CloudProvider,
    ) -> CoreResult<RuleValidationResult>;

    async fn sorted_resources(&self, architecture: &Architecture) -> CoreResult<Vec<Resource>>;

    /// Node types the service can map for `provider`, if it restricts them.
    fn supported_node_types(&self, provider: CloudProvider) -> Option<BTreeSet<String>> {
        let _ = provider;
        None
    }
}

/// Generates code through named engines.
#[async_trait]
pub trait CodegenService: Send + Sync {
    async fn generate(&self, architecture: &Architecture, engine: &str) -> CoreResult<Output>;

    fn supported_engines(&self) -> Vec<String>;

    fn has_engine(&self, engine: &str) -> bool {
        self.supported_engines().iter().any(|e| e == engine)
    }
}

/// Durable storage for projects, architectures and pricing.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProjectService: Send + Sync {
    async fn create(&self, request: CreateProjectRequest) -> CoreResult<Project>;

    async fn get_by_id(&self, project_id: &str) -> CoreResult<Project>;

    async fn persist_architecture(&self, project_id: &str, architecture: &Architecture) -> CoreResult<()>;

    /// Store the architecture and a pricing estimate for it.
    async fn persist_architecture_with_pricing(
        &self,
        project_id: &str,
        architecture: &Architecture,
        duration: Duration,
    ) -> CoreResult<PricingEstimate>;

    async fn load_architecture(&self, project_id: &str) -> CoreResult<Architecture>;

    async fn get_project_pricing(&self, project_id: &str) -> CoreResult<Vec<PricingEstimate>>;

    async fn list_by_user_id(&self, user_id: &str) -> CoreResult<Vec<Project>>;

    async fn update(&self, project: Project) -> CoreResult<Project>;

    async fn delete(&self, project_id: &str) -> CoreResult<()>;
}

/// Diagram service backed by [`DiagramParser`] and [`DiagramValidator`].
#[derive(Debug, Clone, Default)]
pub struct StandardDiagramService;

impl StandardDiagramService {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DiagramService for StandardDiagramService {
    async fn parse(&self, bytes: &[u8]) -> CoreResult<DiagramGraph> {
        Ok(DiagramParser::parse(bytes)?)
    }

    async fn validate(
        &self,
        graph: &DiagramGraph,
        options: Option<&ValidationOptions>,
    ) -> CoreResult<ValidationResult> {
        Ok(DiagramValidator::validate(graph, options))
    }
}

/// Architecture service backed by the mapper registry and rule validator.
#[derive(Debug)]
pub struct StandardArchitectureService {
    mapper: ArchitectureMapper,
    rules: RuleValidator,
}

impl StandardArchitectureService {
    pub fn new(registry: Arc<MapperRegistry>, rules: RuleValidator) -> Self {
        Self {
            mapper: ArchitectureMapper::new(registry),
            rules,
        }
    }

    /// Built-in mappers and the standard rule sets.
    pub fn with_defaults() -> CoreResult<Self> {
        Ok(Self::new(
            Arc::new(MapperRegistry::with_defaults()),
            RuleValidator::standard()?,
        ))
    }
}

#[async_trait]
impl ArchitectureService for StandardArchitectureService {
    async fn map_from_diagram(
        &self,
        graph: &DiagramGraph,
        provider: CloudProvider,
        region: &str,
    ) -> CoreResult<Architecture> {
        Ok(self.mapper.map_from_diagram(graph, provider, region)?)
    }

    async fn validate_rules(
        &self,
        architecture: &Architecture,
        provider: CloudProvider,
    ) -> CoreResult<RuleValidationResult> {
        Ok(self.rules.validate_rules(architecture, provider))
    }

    async fn sorted_resources(&self, architecture: &Architecture) -> CoreResult<Vec<Resource>> {
        Ok(DependencyResolver::sort(architecture)?)
    }

    fn supported_node_types(&self, provider: CloudProvider) -> Option<BTreeSet<String>> {
        Some(self.mapper.registry().node_types_for(provider))
    }
}

/// Codegen service backed by an [`EngineRegistry`].
///
/// Resources are ordered with [`DependencyResolver`] before they reach the
/// engine.
#[derive(Debug, Clone)]
pub struct StandardCodegenService {
    registry: Arc<EngineRegistry>,
}

impl StandardCodegenService {
    pub fn new(registry: Arc<EngineRegistry>) -> Self {
        Self { registry }
    }

    /// Terraform and Pulumi engines.
    pub fn with_defaults() -> CoreResult<Self> {
        Ok(Self::new(Arc::new(EngineRegistry::with_defaults()?)))
    }

    pub fn registry(&self) -> &EngineRegistry {
        &self.registry
    }
}

#[async_trait]
impl CodegenService for StandardCodegenService {
    async fn generate(&self, architecture: &Architecture, engine: &str) -> CoreResult<Output> {
        let engine = self
            .registry
            .get(engine)
            .ok_or_else(|| CoreError::UnknownEngine(engine.to_string()))?;

        let sorted = DependencyResolver::sort(architecture)?;
        debug!("Generating with {} for {} resources", engine.name(), sorted.len());
        Ok(engine.generate(architecture, &sorted)?)
    }

    fn supported_engines(&self) -> Vec<String> {
        self.registry.names()
    }

    fn has_engine(&self, engine: &str) -> bool {
        self.registry.contains(engine)
    }
}
