//! Pipeline orchestration.
//!
//! Two independent entry points share nothing but their collaborators:
//!
//! - [`Pipeline::process_diagram`]: Parse, ValidateDiagram, MapArchitecture,
//!   ValidateRules, CreateProject, PersistArchitecture. Fail-fast; no project
//!   exists until every check has passed.
//! - [`Pipeline::generate_code`]: LoadProject, LoadArchitecture,
//!   ValidateRules (advisory), SelectEngine, Generate.
//!
//! Every failure is wrapped in [`CoreError::Stage`] naming the step.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use stratus_arch::{Architecture, CloudProvider, RuleValidationResult};
use stratus_codegen::Output;
use stratus_graph::{DiagramDocument, ValidationOptions};

use crate::config::StratusConfig;
use crate::context::RequestContext;
use crate::error::{CoreError, CoreResult, PipelineStage, StageExt};
use crate::pricing::PricingEstimate;
use crate::project::{CreateProjectRequest, ProjectId};
use crate::services::{
    ArchitectureService, CodegenService, DiagramService, ProjectService, StandardArchitectureService,
    StandardCodegenService, StandardDiagramService,
};

/// Input for [`Pipeline::process_diagram`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProcessDiagramRequest {
    /// Raw diagram JSON.
    pub diagram: Vec<u8>,
    pub user_id: String,
    pub project_name: String,
    /// Engine stored on the project; the configured default when empty.
    #[serde(default)]
    pub iac_tool: String,
    /// The configured default when absent.
    #[serde(default)]
    pub cloud_provider: Option<CloudProvider>,
    /// The provider's default region when empty.
    #[serde(default)]
    pub region: String,
    /// Price the architecture over this period when set and non-zero.
    #[serde(default)]
    pub pricing_duration: Option<Duration>,
}

impl ProcessDiagramRequest {
    pub fn new(diagram: impl Into<Vec<u8>>, user_id: impl Into<String>, project_name: impl Into<String>) -> Self {
        Self {
            diagram: diagram.into(),
            user_id: user_id.into(),
            project_name: project_name.into(),
            ..Self::default()
        }
    }

    pub fn with_iac_tool(mut self, tool: impl Into<String>) -> Self {
        self.iac_tool = tool.into();
        self
    }

    pub fn with_provider(mut self, provider: CloudProvider) -> Self {
        self.cloud_provider = Some(provider);
        self
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn with_pricing(mut self, duration: Duration) -> Self {
        self.pricing_duration = Some(duration);
        self
    }
}

/// Outcome of a successful [`Pipeline::process_diagram`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessDiagramResult {
    pub project_id: ProjectId,
    pub success: bool,
    pub message: String,
    pub pricing: Option<PricingEstimate>,
    /// Diagram and rule warnings that did not block the compile.
    #[serde(default)]
    pub warnings: Vec<String>,
}

/// Input for [`Pipeline::generate_code`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateCodeRequest {
    pub project_id: ProjectId,
    /// Falls back to the project's IaC tool, then the configured default.
    #[serde(default)]
    pub engine: Option<String>,
    /// Falls back to the project's provider, then the configured default.
    #[serde(default)]
    pub cloud_provider: Option<CloudProvider>,
}

impl GenerateCodeRequest {
    pub fn new(project_id: impl Into<ProjectId>) -> Self {
        Self {
            project_id: project_id.into(),
            ..Self::default()
        }
    }

    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = Some(engine.into());
        self
    }

    pub fn with_provider(mut self, provider: CloudProvider) -> Self {
        self.cloud_provider = Some(provider);
        self
    }
}

/// Outcome of [`Pipeline::generate_code`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateCodeResult {
    pub project_id: ProjectId,
    pub engine: String,
    pub provider: CloudProvider,
    pub output: Output,
    /// Rule findings for the stored architecture. Advisory only; `None` when
    /// the rules could not be evaluated.
    pub rule_validation: Option<RuleValidationResult>,
}

/// A diagram that passed every check, not yet stored.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledDiagram {
    pub provider: CloudProvider,
    pub region: String,
    pub document: DiagramDocument,
    pub architecture: Architecture,
    /// Resource ids in dependency order.
    pub order: Vec<String>,
    pub warnings: Vec<String>,
}

/// The compile and generate pipeline.
///
/// Stateless between requests; share it behind an `Arc`.
pub struct Pipeline {
    diagrams: Arc<dyn DiagramService>,
    architectures: Arc<dyn ArchitectureService>,
    codegen: Arc<dyn CodegenService>,
    projects: Arc<dyn ProjectService>,
    config: StratusConfig,
}

impl Pipeline {
    pub fn new(
        diagrams: Arc<dyn DiagramService>,
        architectures: Arc<dyn ArchitectureService>,
        codegen: Arc<dyn CodegenService>,
        projects: Arc<dyn ProjectService>,
    ) -> Self {
        Self {
            diagrams,
            architectures,
            codegen,
            projects,
            config: StratusConfig::default(),
        }
    }

    /// Pipeline over the standard services and the given project store.
    pub fn standard(projects: Arc<dyn ProjectService>, config: StratusConfig) -> CoreResult<Self> {
        Ok(Self::new(
            Arc::new(StandardDiagramService::new()),
            Arc::new(StandardArchitectureService::with_defaults()?),
            Arc::new(StandardCodegenService::with_defaults()?),
            projects,
        )
        .with_config(config))
    }

    pub fn with_config(mut self, config: StratusConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &StratusConfig {
        &self.config
    }

    pub fn supported_engines(&self) -> Vec<String> {
        self.codegen.supported_engines()
    }

    fn validation_options(&self, provider: CloudProvider) -> ValidationOptions {
        let mut options = ValidationOptions::new();
        if !self.config.validation.known_types.is_empty() {
            options = options.with_known_types(self.config.validation.known_types.iter().cloned());
        }
        if self.config.validation.strict_types {
            if let Some(types) = self.architectures.supported_node_types(provider) {
                options = options.with_provider_types(types);
            }
        }
        options
    }

    /// Run every check on a diagram without storing anything.
    ///
    /// Covers Parse, ValidateDiagram, MapArchitecture and ValidateRules,
    /// including the ordering check.
    pub async fn compile(
        &self,
        ctx: &RequestContext,
        request: &ProcessDiagramRequest,
    ) -> CoreResult<CompiledDiagram> {
        let provider = request.cloud_provider.unwrap_or(self.config.default_provider);
        let region = match request.region.trim() {
            "" => provider.default_region().to_string(),
            region => region.to_string(),
        };

        info!(
            "[{}] Compiling diagram for {} in {} ({} bytes)",
            ctx.request_id(),
            provider,
            region,
            request.diagram.len()
        );

        let graph = ctx
            .run(self.diagrams.parse(&request.diagram))
            .await
            .stage(PipelineStage::Parse)?;

        let options = self.validation_options(provider);
        let validation = ctx
            .run(self.diagrams.validate(&graph, Some(&options)))
            .await
            .stage(PipelineStage::ValidateDiagram)?;
        if !validation.valid {
            warn!("Diagram rejected with {} errors", validation.errors.len());
            return Err(CoreError::at(
                PipelineStage::ValidateDiagram,
                CoreError::DiagramValidation {
                    errors: validation.error_messages(),
                },
            ));
        }
        let mut warnings: Vec<String> = validation.warnings.iter().map(ToString::to_string).collect();

        let architecture = ctx
            .run(self.architectures.map_from_diagram(&graph, provider, &region))
            .await
            .stage(PipelineStage::MapArchitecture)?;

        let rules = ctx
            .run(self.architectures.validate_rules(&architecture, provider))
            .await
            .stage(PipelineStage::ValidateRules)?;
        if !rules.valid {
            warn!("Architecture rejected with {} rule errors", rules.error_count());
            return Err(CoreError::at(
                PipelineStage::ValidateRules,
                CoreError::RuleValidation {
                    violations: rules.error_messages(),
                },
            ));
        }
        warnings.extend(rules.warning_messages());

        let order: Vec<String> = ctx
            .run(self.architectures.sorted_resources(&architecture))
            .await
            .stage(PipelineStage::ValidateRules)?
            .into_iter()
            .map(|r| r.id)
            .collect();
        debug!("Architecture orders cleanly: {}", order.join(" -> "));

        Ok(CompiledDiagram {
            provider,
            region,
            document: graph.to_document(),
            architecture,
            order,
            warnings,
        })
    }

    /// Compile a diagram into a stored project.
    pub async fn process_diagram(
        &self,
        ctx: &RequestContext,
        request: ProcessDiagramRequest,
    ) -> CoreResult<ProcessDiagramResult> {
        if request.project_name.trim().is_empty() {
            return Err(CoreError::InvalidRequest("project name must not be empty".to_string()));
        }
        if request.user_id.trim().is_empty() {
            return Err(CoreError::InvalidRequest("user id must not be empty".to_string()));
        }
        let iac_tool = match request.iac_tool.trim() {
            "" => self.config.default_engine.clone(),
            tool => tool.to_string(),
        };
        if !self.codegen.has_engine(&iac_tool) {
            return Err(CoreError::UnknownEngine(iac_tool));
        }

        let compiled = self.compile(ctx, &request).await?;
        let CompiledDiagram {
            provider,
            region,
            document,
            architecture,
            warnings,
            ..
        } = compiled;

        let create = CreateProjectRequest::new(
            request.user_id.as_str(),
            request.project_name.as_str(),
            iac_tool,
            provider,
            region,
        )
        .with_diagram(document);
        let project = ctx
            .run(self.projects.create(create))
            .await
            .stage(PipelineStage::CreateProject)?;

        let pricing = match request.pricing_duration.filter(|d| !d.is_zero()) {
            Some(duration) => Some(
                ctx.run(
                    self.projects
                        .persist_architecture_with_pricing(&project.id, &architecture, duration),
                )
                .await
                .stage(PipelineStage::PersistArchitecture)?,
            ),
            None => {
                ctx.run(self.projects.persist_architecture(&project.id, &architecture))
                    .await
                    .stage(PipelineStage::PersistArchitecture)?;
                None
            }
        };

        let message = format!(
            "Compiled {} resources for {} into project {}",
            architecture.len(),
            provider,
            project.id
        );
        info!("[{}] {}", ctx.request_id(), message);

        Ok(ProcessDiagramResult {
            project_id: project.id,
            success: true,
            message,
            pricing,
            warnings,
        })
    }

    /// Generate code for a stored project.
    pub async fn generate_code(
        &self,
        ctx: &RequestContext,
        request: GenerateCodeRequest,
    ) -> CoreResult<GenerateCodeResult> {
        info!("[{}] Generating code for project {}", ctx.request_id(), request.project_id);

        let project = ctx
            .run(self.projects.get_by_id(&request.project_id))
            .await
            .stage(PipelineStage::LoadProject)?;

        let architecture = ctx
            .run(self.projects.load_architecture(&project.id))
            .await
            .stage(PipelineStage::LoadArchitecture)?;

        let provider = request
            .cloud_provider
            .or(project.cloud_provider)
            .unwrap_or(self.config.default_provider);
        if provider != architecture.provider {
            warn!(
                "Requested provider {} differs from stored architecture provider {}",
                provider, architecture.provider
            );
        }

        let rule_validation = match ctx
            .run(self.architectures.validate_rules(&architecture, provider))
            .await
        {
            Ok(result) => {
                if !result.valid {
                    warn!(
                        "Project {} no longer passes {} rule(s); generating anyway",
                        project.id,
                        result.error_count()
                    );
                }
                Some(result)
            }
            Err(e) if e.is_interrupted() => return Err(CoreError::at(PipelineStage::ValidateRules, e)),
            Err(e) => {
                warn!("Rule validation skipped for project {}: {}", project.id, e);
                None
            }
        };

        let engine = request
            .engine
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .or_else(|| Some(project.iac_tool.trim()).filter(|e| !e.is_empty()))
            .unwrap_or(self.config.default_engine.as_str())
            .to_string();
        ctx.check().stage(PipelineStage::SelectEngine)?;
        if !self.codegen.has_engine(&engine) {
            return Err(CoreError::at(
                PipelineStage::SelectEngine,
                CoreError::UnknownEngine(engine),
            ));
        }
        debug!("Selected engine {} for project {}", engine, project.id);

        let output = ctx
            .run(self.codegen.generate(&architecture, &engine))
            .await
            .stage(PipelineStage::Generate)?;

        info!(
            "[{}] Generated {} files with {}",
            ctx.request_id(),
            output.len(),
            engine
        );

        Ok(GenerateCodeResult {
            project_id: project.id,
            engine,
            provider,
            output,
            rule_validation,
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("engines", &self.codegen.supported_engines())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::Project;
    use crate::services::MockProjectService;
    use stratus_arch::Resource;

    const WEB: &str = r#"{
        "nodes": [
            {"id": "vpc", "type": "vpc"},
            {"id": "subnet", "type": "subnet"},
            {"id": "web", "type": "instance", "properties": {"subnet_id": "subnet"}}
        ],
        "edges": [
            {"source": "subnet", "target": "vpc", "kind": "contains"},
            {"source": "web", "target": "subnet", "kind": "depends_on"}
        ]
    }"#;

    fn pipeline(projects: MockProjectService) -> Pipeline {
        Pipeline::standard(Arc::new(projects), StratusConfig::default()).unwrap()
    }

    fn stored_project(iac_tool: &str, provider: Option<CloudProvider>) -> Project {
        let mut project = Project::new(&CreateProjectRequest::new(
            "u1",
            "shop",
            iac_tool,
            CloudProvider::Aws,
            "us-east-1",
        ));
        project.cloud_provider = provider;
        project
    }

    fn stored_architecture() -> Architecture {
        let mut arch = Architecture::new(CloudProvider::Aws, "us-east-1");
        arch.add_resource(Resource::new("vpc", "aws_vpc", CloudProvider::Aws, "us-east-1"))
            .unwrap();
        arch
    }

    #[tokio::test]
    async fn test_parse_failure_creates_nothing() {
        let mut projects = MockProjectService::new();
        projects.expect_create().times(0);
        projects.expect_persist_architecture().times(0);

        let err = pipeline(projects)
            .process_diagram(
                &RequestContext::new(),
                ProcessDiagramRequest::new("{not json", "u1", "shop"),
            )
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(PipelineStage::Parse));
        assert!(matches!(err.root(), CoreError::Parse(_)));
        assert!(err.to_string().starts_with("failed to parse diagram: "));
    }

    #[tokio::test]
    async fn test_compile_is_side_effect_free() {
        let mut projects = MockProjectService::new();
        projects.expect_create().times(0);
        projects.expect_persist_architecture().times(0);

        let compiled = pipeline(projects)
            .compile(&RequestContext::new(), &ProcessDiagramRequest::new(WEB, "u1", "shop"))
            .await
            .unwrap();

        assert_eq!(compiled.order, vec!["vpc", "subnet", "web"]);
        assert_eq!(compiled.region, "us-east-1");
        assert_eq!(compiled.architecture.len(), 3);
    }

    #[tokio::test]
    async fn test_rule_failure_creates_nothing() {
        let mut projects = MockProjectService::new();
        projects.expect_create().times(0);

        let diagram = r#"{
            "nodes": [{"id": "web", "type": "instance", "properties": {"subnet_id": "vpc"}},
                      {"id": "vpc", "type": "vpc"}],
            "edges": []
        }"#;
        let err = pipeline(projects)
            .process_diagram(
                &RequestContext::new(),
                ProcessDiagramRequest::new(diagram, "u1", "shop"),
            )
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(PipelineStage::ValidateRules));
        assert!(matches!(err.root(), CoreError::RuleValidation { .. }));
    }

    #[tokio::test]
    async fn test_plain_persist_without_pricing() {
        let mut projects = MockProjectService::new();
        projects
            .expect_create()
            .times(1)
            .returning(|request| Ok(Project::new(&request)));
        projects.expect_persist_architecture().times(1).returning(|_, _| Ok(()));
        projects.expect_persist_architecture_with_pricing().times(0);

        let result = pipeline(projects)
            .process_diagram(
                &RequestContext::new(),
                ProcessDiagramRequest::new(WEB, "u1", "shop").with_pricing(Duration::ZERO),
            )
            .await
            .unwrap();

        assert!(result.success);
        assert!(result.pricing.is_none());
    }

    #[tokio::test]
    async fn test_persist_failure_is_staged() {
        let mut projects = MockProjectService::new();
        projects
            .expect_create()
            .returning(|request| Ok(Project::new(&request)));
        projects
            .expect_persist_architecture()
            .returning(|_, _| Err(CoreError::Persistence("disk full".to_string())));

        let err = pipeline(projects)
            .process_diagram(&RequestContext::new(), ProcessDiagramRequest::new(WEB, "u1", "shop"))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(PipelineStage::PersistArchitecture));
        assert_eq!(err.to_string(), "failed to persist architecture: Persistence error: disk full");
    }

    #[tokio::test]
    async fn test_generate_falls_back_to_project_tool_and_default_provider() {
        let project = stored_project("pulumi", None);
        let id = project.id.clone();

        let mut projects = MockProjectService::new();
        projects
            .expect_get_by_id()
            .returning(move |_| Ok(project.clone()));
        projects
            .expect_load_architecture()
            .returning(|_| Ok(stored_architecture()));

        let config = StratusConfig::default().with_default_provider(CloudProvider::Aws);
        let result = pipeline(projects)
            .with_config(config)
            .generate_code(&RequestContext::new(), GenerateCodeRequest::new(id))
            .await
            .unwrap();

        assert_eq!(result.engine, "pulumi");
        assert_eq!(result.provider, CloudProvider::Aws);
        assert!(result.output.contains("index.ts"));
    }

    #[tokio::test]
    async fn test_generate_unknown_engine() {
        let project = stored_project("", Some(CloudProvider::Aws));
        let mut projects = MockProjectService::new();
        projects
            .expect_get_by_id()
            .returning(move |_| Ok(project.clone()));
        projects
            .expect_load_architecture()
            .returning(|_| Ok(stored_architecture()));

        let err = pipeline(projects)
            .generate_code(
                &RequestContext::new(),
                GenerateCodeRequest::new("p").with_engine("cdk"),
            )
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(PipelineStage::SelectEngine));
        assert!(matches!(err.root(), CoreError::UnknownEngine(name) if name == "cdk"));
    }

    #[tokio::test]
    async fn test_missing_project() {
        let mut projects = MockProjectService::new();
        projects
            .expect_get_by_id()
            .returning(|id| Err(CoreError::ProjectNotFound(id.to_string())));
        projects.expect_load_architecture().times(0);

        let err = pipeline(projects)
            .generate_code(&RequestContext::new(), GenerateCodeRequest::new("nope"))
            .await
            .unwrap_err();

        assert_eq!(err.stage(), Some(PipelineStage::LoadProject));
        assert!(matches!(err.root(), CoreError::ProjectNotFound(_)));
    }
}
