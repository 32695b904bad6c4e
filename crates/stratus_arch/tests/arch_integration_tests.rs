//! Integration tests for mapping, rule validation and ordering.

use std::collections::BTreeSet;
use std::sync::Arc;

use stratus_arch::{
    ArchError, Architecture, ArchitectureMapper, CloudProvider, DependencyResolver,
    MapperRegistry, Resource, RuleValidator,
};
use stratus_graph::DiagramParser;

fn mapper() -> ArchitectureMapper {
    ArchitectureMapper::new(Arc::new(MapperRegistry::with_defaults()))
}

fn position(order: &[Resource], id: &str) -> usize {
    order.iter().position(|r| r.id == id).unwrap()
}

#[test]
fn test_diagram_to_sorted_resources() {
    let graph = DiagramParser::parse_str(
        r#"{
            "nodes": [
                {"id": "vpc", "type": "vpc"},
                {"id": "subnet", "type": "subnet"},
                {"id": "instance", "type": "instance", "properties": {"subnet_id": "subnet"}}
            ],
            "edges": [
                {"source": "subnet", "target": "vpc", "kind": "contains"},
                {"source": "instance", "target": "subnet", "kind": "depends_on"}
            ]
        }"#,
    )
    .unwrap();

    let arch = mapper()
        .map_from_diagram(&graph, CloudProvider::Aws, "us-east-1")
        .unwrap();

    let rules = RuleValidator::standard().unwrap().validate_rules(&arch, CloudProvider::Aws);
    assert!(rules.valid, "{:?}", rules.error_messages());

    let order = DependencyResolver::sort(&arch).unwrap();
    let ids: Vec<_> = order.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["vpc", "subnet", "instance"]);
}

#[test]
fn test_order_respects_every_edge() {
    let mut arch = Architecture::new(CloudProvider::Gcp, "us-central1");
    for id in ["net", "sub_a", "sub_b", "fw", "vm_1", "vm_2", "db", "lb"] {
        arch.add_resource(Resource::new(id, "google_thing", CloudProvider::Gcp, "us-central1"))
            .unwrap();
    }
    arch.add_containment("net", "sub_a").unwrap();
    arch.add_containment("net", "sub_b").unwrap();
    arch.add_containment("net", "fw").unwrap();
    arch.add_dependency("vm_1", "sub_a").unwrap();
    arch.add_dependency("vm_1", "fw").unwrap();
    arch.add_dependency("vm_2", "sub_b").unwrap();
    arch.add_dependency("vm_2", "db").unwrap();
    arch.add_dependency("lb", "vm_1").unwrap();
    arch.add_dependency("lb", "vm_2").unwrap();

    let order = DependencyResolver::sort(&arch).unwrap();
    assert_eq!(order.len(), arch.len());

    let unique: BTreeSet<_> = order.iter().map(|r| r.id.clone()).collect();
    assert_eq!(unique.len(), arch.len());

    for (parent, children) in &arch.containments {
        for child in children {
            assert!(position(&order, parent) < position(&order, child));
        }
    }
    for (dependent, deps) in &arch.dependencies {
        for dep in deps {
            assert!(position(&order, dep) < position(&order, dependent));
        }
    }
}

#[test]
fn test_sort_is_deterministic() {
    let graph = DiagramParser::parse_str(
        r#"{
            "nodes": [
                {"id": "c", "type": "bucket"}, {"id": "a", "type": "bucket"},
                {"id": "b", "type": "bucket"}, {"id": "d", "type": "instance"}
            ],
            "edges": [{"source": "d", "target": "c", "kind": "depends_on"}]
        }"#,
    )
    .unwrap();

    let first = DependencyResolver::sort_ids(
        &mapper().map_from_diagram(&graph, CloudProvider::Aws, "us-east-1").unwrap(),
    )
    .unwrap();

    for _ in 0..10 {
        let again = DependencyResolver::sort_ids(
            &mapper().map_from_diagram(&graph, CloudProvider::Aws, "us-east-1").unwrap(),
        )
        .unwrap();
        assert_eq!(first, again);
    }
    assert_eq!(first, vec!["a", "b", "c", "d"]);
}

#[test]
fn test_cycle_reports_all_unresolved_ids() {
    let graph = DiagramParser::parse_str(
        r#"{
            "nodes": [
                {"id": "A", "type": "instance"}, {"id": "B", "type": "instance"},
                {"id": "C", "type": "instance"}, {"id": "root", "type": "vpc"}
            ],
            "edges": [
                {"source": "A", "target": "B", "kind": "depends_on"},
                {"source": "B", "target": "C", "kind": "depends_on"},
                {"source": "C", "target": "A", "kind": "depends_on"},
                {"source": "A", "target": "root", "kind": "depends_on"}
            ]
        }"#,
    )
    .unwrap();

    let arch = mapper()
        .map_from_diagram(&graph, CloudProvider::Azure, "eastus")
        .unwrap();

    match DependencyResolver::sort(&arch) {
        Err(ArchError::CyclicDependency { ids }) => {
            let expected: BTreeSet<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
            assert_eq!(ids, expected);
        }
        other => panic!("expected a cycle, got {:?}", other),
    }
}

#[test]
fn test_architecture_survives_persistence_round_trip() {
    let graph = DiagramParser::parse_str(
        r#"{
            "nodes": [{"id": "vpc", "type": "vpc"}, {"id": "subnet", "type": "subnet"}],
            "edges": [{"source": "subnet", "target": "vpc", "kind": "contains"}]
        }"#,
    )
    .unwrap();
    let arch = mapper()
        .map_from_diagram(&graph, CloudProvider::Aws, "us-west-2")
        .unwrap();

    let reloaded = Architecture::from_json(&arch.to_json().unwrap()).unwrap();
    reloaded.check_integrity().unwrap();
    assert_eq!(
        DependencyResolver::sort_ids(&reloaded).unwrap(),
        DependencyResolver::sort_ids(&arch).unwrap()
    );
}
