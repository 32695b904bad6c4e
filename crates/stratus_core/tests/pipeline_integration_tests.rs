//! End-to-end tests for the compile and generate pipeline.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use stratus_arch::{
    ArchError, Architecture, CloudProvider, MapperRegistry, Resource, Rule, RuleSet, RuleValidator,
};
use stratus_core::{
    CodegenService, CoreError, DiagramService, FileProjectService, GenerateCodeRequest,
    InMemoryProjectService, Pipeline, PipelineStage, ProcessDiagramRequest, ProjectService,
    RequestContext, StandardArchitectureService, StandardCodegenService, StandardDiagramService,
    StratusConfig,
};
use tempfile::tempdir;

const NETWORK: &str = r#"{
    "nodes": [
        {"id": "vpc", "type": "vpc", "properties": {"cidr_block": "10.0.0.0/16"}},
        {"id": "subnet", "type": "subnet", "properties": {"cidr_block": "10.0.1.0/24"}},
        {"id": "instance", "type": "instance", "properties": {"subnet_id": "subnet"}}
    ],
    "edges": [
        {"source": "subnet", "target": "vpc", "kind": "contains"},
        {"source": "instance", "target": "subnet", "kind": "depends_on"}
    ]
}"#;

fn pipeline(store: Arc<InMemoryProjectService>) -> Pipeline {
    Pipeline::standard(store, StratusConfig::default()).unwrap()
}

#[tokio::test]
async fn test_compile_then_generate_terraform() {
    let store = Arc::new(InMemoryProjectService::new());
    let pipeline = pipeline(store.clone());
    let ctx = RequestContext::new();

    let compiled = pipeline
        .process_diagram(&ctx, ProcessDiagramRequest::new(NETWORK, "u1", "network"))
        .await
        .unwrap();
    assert!(compiled.success);
    assert!(compiled.pricing.is_none());

    let generated = pipeline
        .generate_code(&ctx, GenerateCodeRequest::new(compiled.project_id.clone()))
        .await
        .unwrap();

    assert_eq!(generated.engine, "terraform");
    assert!(generated.rule_validation.as_ref().unwrap().valid);

    let main = &generated.output.file("main.tf").unwrap().content;
    let vpc = main.find("\"aws_vpc\" \"vpc\"").unwrap();
    let subnet = main.find("\"aws_subnet\" \"subnet\"").unwrap();
    let instance = main.find("\"aws_instance\" \"instance\"").unwrap();
    assert!(vpc < subnet && subnet < instance);

    let stored = store.load_architecture(&compiled.project_id).await.unwrap();
    assert_eq!(stored.len(), 3);
    assert_eq!(store.diagram(&compiled.project_id).unwrap().nodes.len(), 3);
}

#[tokio::test]
async fn test_cycle_is_rejected_before_project_creation() {
    let store = Arc::new(InMemoryProjectService::new());
    let diagram = r#"{
        "nodes": [{"id": "A", "type": "bucket"}, {"id": "B", "type": "bucket"}],
        "edges": [
            {"source": "A", "target": "B", "kind": "depends_on"},
            {"source": "B", "target": "A", "kind": "depends_on"}
        ]
    }"#;

    let err = pipeline(store.clone())
        .process_diagram(&RequestContext::new(), ProcessDiagramRequest::new(diagram, "u1", "loop"))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::ValidateRules));
    match err.root() {
        CoreError::Mapping(ArchError::CyclicDependency { ids }) => {
            let expected: BTreeSet<String> = ["A", "B"].iter().map(|s| s.to_string()).collect();
            assert_eq!(ids, &expected);
        }
        other => panic!("expected cycle, got {:?}", other),
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_all_diagram_defects_reported() {
    let store = Arc::new(InMemoryProjectService::new());
    let diagram = r#"{
        "nodes": [
            {"id": "a", "type": "vpc"},
            {"id": "a", "type": "vpc"},
            {"id": "b", "type": ""}
        ],
        "edges": [{"source": "a", "target": "ghost", "kind": "depends_on"}]
    }"#;

    let err = pipeline(store.clone())
        .process_diagram(&RequestContext::new(), ProcessDiagramRequest::new(diagram, "u1", "broken"))
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(PipelineStage::ValidateDiagram));
    match err.root() {
        CoreError::DiagramValidation { errors } => assert_eq!(errors.len(), 3),
        other => panic!("expected validation errors, got {:?}", other),
    }
    assert!(store.is_empty());
}

#[tokio::test]
async fn test_unsupported_type_names_node() {
    let diagram = r#"{"nodes": [{"id": "legacy", "type": "mainframe"}], "edges": []}"#;
    let ctx = RequestContext::new();

    let strict = pipeline(Arc::new(InMemoryProjectService::new()));
    let err = strict
        .process_diagram(&ctx, ProcessDiagramRequest::new(diagram, "u1", "old"))
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(PipelineStage::ValidateDiagram));

    let lenient = Pipeline::standard(
        Arc::new(InMemoryProjectService::new()),
        StratusConfig::default().with_strict_types(false),
    )
    .unwrap();
    let err = lenient
        .process_diagram(&ctx, ProcessDiagramRequest::new(diagram, "u1", "old"))
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Some(PipelineStage::MapArchitecture));
    assert!(err.to_string().starts_with("failed to map diagram to architecture: "));
    assert!(err.to_string().contains("'legacy'"));
}

#[tokio::test]
async fn test_pricing_only_when_requested() {
    let store = Arc::new(InMemoryProjectService::new());
    let pipeline = pipeline(store.clone());
    let ctx = RequestContext::new();

    let priced = pipeline
        .process_diagram(
            &ctx,
            ProcessDiagramRequest::new(NETWORK, "u1", "priced").with_pricing(Duration::from_secs(720 * 3600)),
        )
        .await
        .unwrap();
    let estimate = priced.pricing.unwrap();
    assert_eq!(estimate.duration_hours, 720.0);
    assert!(estimate.total > 0.0);
    assert_eq!(store.get_project_pricing(&priced.project_id).await.unwrap().len(), 1);

    let unpriced = pipeline
        .process_diagram(
            &ctx,
            ProcessDiagramRequest::new(NETWORK, "u1", "plain").with_pricing(Duration::ZERO),
        )
        .await
        .unwrap();
    assert!(unpriced.pricing.is_none());
    assert!(store.get_project_pricing(&unpriced.project_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_region_defaults_per_provider() {
    let store = Arc::new(InMemoryProjectService::new());
    let result = pipeline(store.clone())
        .process_diagram(
            &RequestContext::new(),
            ProcessDiagramRequest::new(NETWORK, "u1", "gcp")
                .with_provider(CloudProvider::Gcp)
                .with_region("  "),
        )
        .await
        .unwrap();

    let project = store.get_by_id(&result.project_id).await.unwrap();
    assert_eq!(project.region, "us-central1");
    assert_eq!(project.cloud_provider, Some(CloudProvider::Gcp));
    assert_eq!(store.load_architecture(&project.id).await.unwrap().region, "us-central1");
}

#[tokio::test]
async fn test_cancelled_request_has_no_side_effects() {
    let store = Arc::new(InMemoryProjectService::new());
    let ctx = RequestContext::new();
    ctx.cancel();

    let err = pipeline(store.clone())
        .process_diagram(&ctx, ProcessDiagramRequest::new(NETWORK, "u1", "cancelled"))
        .await
        .unwrap_err();

    assert!(err.is_interrupted());
    assert_eq!(err.stage(), Some(PipelineStage::Parse));
    assert!(store.is_empty());
}

/// Fails every bucket, standing in for a rule added after projects exist.
struct NoBucketsRule;

impl Rule for NoBucketsRule {
    fn id(&self) -> &str {
        "no-buckets"
    }

    fn applies_to(&self, resource: &Resource) -> bool {
        resource.resource_type == "aws_s3_bucket"
    }

    fn check(&self, _resource: &Resource, _architecture: &Architecture) -> Vec<String> {
        vec!["buckets are no longer allowed".to_string()]
    }
}

#[tokio::test]
async fn test_regeneration_survives_stricter_rules() {
    let store = Arc::new(InMemoryProjectService::new());
    let ctx = RequestContext::new();
    let diagram = r#"{"nodes": [{"id": "assets", "type": "bucket"}], "edges": []}"#;

    let compiled = pipeline(store.clone())
        .process_diagram(&ctx, ProcessDiagramRequest::new(diagram, "u1", "assets"))
        .await
        .unwrap();

    let stricter = RuleValidator::new().with_rule_set(
        CloudProvider::Aws,
        RuleSet::standard(CloudProvider::Aws)
            .unwrap()
            .with_rule(Arc::new(NoBucketsRule)),
    );
    let updated = Pipeline::new(
        Arc::new(StandardDiagramService::new()),
        Arc::new(StandardArchitectureService::new(
            Arc::new(MapperRegistry::with_defaults()),
            stricter,
        )),
        Arc::new(StandardCodegenService::with_defaults().unwrap()),
        store.clone(),
    );

    let generated = updated
        .generate_code(&ctx, GenerateCodeRequest::new(compiled.project_id).with_engine("pulumi"))
        .await
        .unwrap();

    let rules = generated.rule_validation.unwrap();
    assert!(!rules.valid);
    assert_eq!(rules.error_count(), 1);
    assert!(generated.output.contains("index.ts"));
}

#[tokio::test]
async fn test_file_store_end_to_end() {
    let workspace = tempdir().unwrap();
    let out = tempdir().unwrap();
    let store = Arc::new(FileProjectService::new(workspace.path()));
    let pipeline = Pipeline::standard(store.clone(), StratusConfig::default()).unwrap();
    let ctx = RequestContext::new();

    let compiled = pipeline
        .process_diagram(
            &ctx,
            ProcessDiagramRequest::new(NETWORK, "u1", "files")
                .with_iac_tool("pulumi")
                .with_provider(CloudProvider::Azure),
        )
        .await
        .unwrap();

    let generated = pipeline
        .generate_code(&ctx, GenerateCodeRequest::new(compiled.project_id.clone()))
        .await
        .unwrap();
    assert_eq!(generated.engine, "pulumi");
    assert_eq!(generated.provider, CloudProvider::Azure);

    let written = generated.output.write_to(out.path()).unwrap();
    assert_eq!(written.len(), generated.output.len());
    assert!(out.path().join("index.ts").is_file());

    assert_eq!(store.list_by_user_id("u1").await.unwrap().len(), 1);
    assert!(store.load_diagram(&compiled.project_id).unwrap().is_some());
}

#[tokio::test]
async fn test_pulumi_declares_referenced_subnet_first() {
    let store = Arc::new(InMemoryProjectService::new());
    let pipeline = pipeline(store.clone());
    let ctx = RequestContext::new();
    let diagram = r#"{
        "nodes": [
            {"id": "vpc", "type": "vpc"},
            {"id": "subnet", "type": "subnet"},
            {"id": "instance", "type": "instance", "properties": {"subnet_id": "subnet"}}
        ],
        "edges": [{"source": "subnet", "target": "vpc", "kind": "contains"}]
    }"#;

    let compiled = pipeline
        .process_diagram(&ctx, ProcessDiagramRequest::new(diagram, "u1", "refs").with_iac_tool("pulumi"))
        .await
        .unwrap();
    let generated = pipeline
        .generate_code(&ctx, GenerateCodeRequest::new(compiled.project_id))
        .await
        .unwrap();

    let index = &generated.output.file("index.ts").unwrap().content;
    assert!(index.find("const subnet = ").unwrap() < index.find("subnetId: subnet.id").unwrap());
}

#[tokio::test]
async fn test_concurrent_compiles() {
    let store = Arc::new(InMemoryProjectService::new());
    let pipeline = Arc::new(pipeline(store.clone()));

    let mut handles = Vec::new();
    for i in 0..8 {
        let pipeline = pipeline.clone();
        handles.push(tokio::spawn(async move {
            pipeline
                .process_diagram(
                    &RequestContext::new(),
                    ProcessDiagramRequest::new(NETWORK, "u1", format!("p{}", i)),
                )
                .await
        }));
    }

    let mut ids = BTreeSet::new();
    for handle in handles {
        ids.insert(handle.await.unwrap().unwrap().project_id);
    }
    assert_eq!(ids.len(), 8);
    assert_eq!(store.len(), 8);
}

#[tokio::test]
async fn test_standard_services_are_usable_directly() {
    let diagrams = StandardDiagramService::new();
    let graph = diagrams.parse(NETWORK.as_bytes()).await.unwrap();
    assert!(diagrams.validate(&graph, None).await.unwrap().valid);

    let codegen = StandardCodegenService::with_defaults().unwrap();
    assert_eq!(codegen.supported_engines(), vec!["pulumi", "terraform"]);
}
