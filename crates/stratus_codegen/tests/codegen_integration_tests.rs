//! Integration tests for engines and the registry.

use std::sync::Arc;

use parking_lot::Mutex;
use stratus_arch::{
    Architecture, ArchitectureMapper, CloudProvider, DependencyResolver, MapperRegistry, Resource,
};
use stratus_codegen::{
    CodegenError, CodegenResult, Engine, EngineRegistry, Output, RenderContext, ResourceRenderer,
    TerraformEngine,
};
use stratus_graph::DiagramParser;

const WEB_TIER: &str = r#"{
    "nodes": [
        {"id": "web", "type": "instance", "properties": {"subnet": "app-subnet"}},
        {"id": "app-subnet", "type": "subnet", "properties": {"cidr_block": "10.0.1.0/24"}},
        {"id": "main", "type": "vpc", "properties": {"cidr_block": "10.0.0.0/16"}},
        {"id": "assets", "type": "bucket"}
    ],
    "edges": [
        {"source": "app-subnet", "target": "main", "kind": "contains"},
        {"source": "web", "target": "app-subnet", "kind": "depends_on"},
        {"source": "web", "target": "assets", "kind": "associates"}
    ]
}"#;

fn architecture(provider: CloudProvider) -> Architecture {
    let graph = DiagramParser::parse_str(WEB_TIER).unwrap();
    ArchitectureMapper::new(Arc::new(MapperRegistry::with_defaults()))
        .map_from_diagram(&graph, provider, provider.default_region())
        .unwrap()
}

/// Records the order it was handed.
#[derive(Default)]
struct RecordingEngine {
    seen: Mutex<Vec<Vec<String>>>,
}

impl Engine for RecordingEngine {
    fn name(&self) -> &str {
        "recording"
    }

    fn generate(&self, _architecture: &Architecture, sorted: &[Resource]) -> CodegenResult<Output> {
        let ids: Vec<String> = sorted.iter().map(|r| r.id.clone()).collect();
        let mut output = Output::new();
        output.add_file("order.txt", ids.join("\n"), "text")?;
        self.seen.lock().push(ids);
        Ok(output)
    }
}

#[test]
fn test_terraform_end_to_end() {
    let arch = architecture(CloudProvider::Aws);
    let sorted = DependencyResolver::sort(&arch).unwrap();
    let registry = EngineRegistry::with_defaults().unwrap();

    let output = registry
        .get_required("terraform")
        .unwrap()
        .generate(&arch, &sorted)
        .unwrap();

    let main = &output.file("main.tf").unwrap().content;
    let vpc = main.find("resource \"aws_vpc\" \"main\"").unwrap();
    let subnet = main.find("resource \"aws_subnet\" \"app_subnet\"").unwrap();
    let web = main.find("resource \"aws_instance\" \"web\"").unwrap();
    assert!(vpc < subnet && subnet < web);
    assert!(main.contains("subnet = aws_subnet.app_subnet.id"));
    assert!(output.file("versions.tf").unwrap().content.contains("hashicorp/aws"));
}

#[test]
fn test_pulumi_end_to_end_azure() {
    let arch = architecture(CloudProvider::Azure);
    let sorted = DependencyResolver::sort(&arch).unwrap();
    let registry = EngineRegistry::with_defaults().unwrap();

    let output = registry
        .get_required("pulumi")
        .unwrap()
        .generate(&arch, &sorted)
        .unwrap();

    let index = &output.file("index.ts").unwrap().content;
    assert!(index.contains("import * as azure from \"@pulumi/azure\";"));
    assert!(index.find("const main").unwrap() < index.find("const appSubnet").unwrap());
    assert_eq!(
        output.file("Pulumi.dev.yaml").unwrap().content,
        "config:\n  azure:location: eastus\n"
    );
}

#[test]
fn test_pulumi_rejects_unsorted_input() {
    let arch = architecture(CloudProvider::Aws);
    let mut reversed = DependencyResolver::sort(&arch).unwrap();
    reversed.reverse();

    let engine = EngineRegistry::with_defaults().unwrap().must_get("pulumi");
    assert!(matches!(
        engine.generate(&arch, &reversed),
        Err(CodegenError::OrderViolation { .. })
    ));
}

#[test]
fn test_generation_is_repeatable() {
    let arch = architecture(CloudProvider::Gcp);
    let sorted = DependencyResolver::sort(&arch).unwrap();
    let engine = TerraformEngine::new();

    let first = engine.generate(&arch, &sorted).unwrap();
    let second = engine.generate(&arch, &sorted).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_custom_engine_receives_resolved_order() {
    let registry = EngineRegistry::with_defaults().unwrap();
    let recording = Arc::new(RecordingEngine::default());
    registry.register(recording.clone()).unwrap();

    let arch = architecture(CloudProvider::Aws);
    let sorted = DependencyResolver::sort(&arch).unwrap();
    let output = registry.must_get("recording").generate(&arch, &sorted).unwrap();

    assert_eq!(registry.names(), vec!["pulumi", "recording", "terraform"]);
    assert_eq!(
        recording.seen.lock()[0],
        vec!["assets", "main", "app-subnet", "web"]
    );
    assert_eq!(output.len(), 1);
}

#[test]
fn test_custom_renderer() {
    struct CommentRenderer;

    impl ResourceRenderer for CommentRenderer {
        fn render(&self, resource: &Resource, _ctx: &RenderContext<'_>) -> CodegenResult<String> {
            Ok(format!("# {}", resource.id))
        }
    }

    let arch = architecture(CloudProvider::Aws);
    let sorted = DependencyResolver::sort(&arch).unwrap();
    let output = TerraformEngine::new()
        .with_renderer(Arc::new(CommentRenderer))
        .generate(&arch, &sorted)
        .unwrap();

    let main = &output.file("main.tf").unwrap().content;
    assert!(main.contains("# assets\n"));
    assert!(!main.contains("resource \""));
}
