//! Diagram-to-architecture mapping.
//!
//! Each diagram node is translated by a [`ResourceMapper`] looked up by
//! provider and node type in a [`MapperRegistry`]. The registry is filled at
//! startup and only read afterwards.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use tracing::{debug, info};

use stratus_graph::{DiagramGraph, EdgeKind, Node, Properties};

use crate::architecture::{Architecture, Resource};
use crate::error::{ArchError, ArchResult};
use crate::provider::CloudProvider;

/// Context handed to mappers.
#[derive(Debug, Clone, Copy)]
pub struct MappingContext<'a> {
    pub provider: CloudProvider,
    pub region: &'a str,
}

/// Translates one diagram node into a provider resource.
pub trait ResourceMapper: Send + Sync {
    fn map(&self, node: &Node, ctx: &MappingContext<'_>) -> ArchResult<Resource>;
}

impl<F> ResourceMapper for F
where
    F: Fn(&Node, &MappingContext<'_>) -> ArchResult<Resource> + Send + Sync,
{
    fn map(&self, node: &Node, ctx: &MappingContext<'_>) -> ArchResult<Resource> {
        self(node, ctx)
    }
}

/// Mapper that assigns a fixed resource type and default properties.
///
/// Node properties override the defaults. The resource keeps the node id.
#[derive(Debug, Clone)]
pub struct TypeMapper {
    resource_type: String,
    defaults: Properties,
}

impl TypeMapper {
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            defaults: Properties::new(),
        }
    }

    pub fn with_default(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }
}

impl ResourceMapper for TypeMapper {
    fn map(&self, node: &Node, ctx: &MappingContext<'_>) -> ArchResult<Resource> {
        let mut properties = self.defaults.clone();
        properties.extend(node.properties.clone());

        Ok(Resource {
            id: node.id.clone(),
            resource_type: self.resource_type.clone(),
            provider: ctx.provider,
            region: ctx.region.to_string(),
            properties,
            source_type: node.node_type.clone(),
        })
    }
}

/// Lookup key for mappers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapperKey {
    pub provider: CloudProvider,
    pub node_type: String,
}

impl MapperKey {
    pub fn new(provider: CloudProvider, node_type: impl Into<String>) -> Self {
        Self {
            provider,
            node_type: node_type.into(),
        }
    }
}

/// Generic node types understood out of the box, with the resource type used
/// for AWS, Azure and GCP respectively.
const DEFAULT_TYPES: &[(&str, [&str; 3])] = &[
    ("vpc", ["aws_vpc", "azurerm_virtual_network", "google_compute_network"]),
    ("network", ["aws_vpc", "azurerm_virtual_network", "google_compute_network"]),
    ("subnet", ["aws_subnet", "azurerm_subnet", "google_compute_subnetwork"]),
    (
        "security_group",
        ["aws_security_group", "azurerm_network_security_group", "google_compute_firewall"],
    ),
    ("instance", ["aws_instance", "azurerm_linux_virtual_machine", "google_compute_instance"]),
    ("ec2_instance", ["aws_instance", "azurerm_linux_virtual_machine", "google_compute_instance"]),
    ("vm", ["aws_instance", "azurerm_linux_virtual_machine", "google_compute_instance"]),
    ("load_balancer", ["aws_lb", "azurerm_lb", "google_compute_forwarding_rule"]),
    (
        "target_group",
        ["aws_lb_target_group", "azurerm_lb_backend_address_pool", "google_compute_backend_service"],
    ),
    ("listener", ["aws_lb_listener", "azurerm_lb_rule", "google_compute_target_http_proxy"]),
    ("bucket", ["aws_s3_bucket", "azurerm_storage_account", "google_storage_bucket"]),
    ("s3_bucket", ["aws_s3_bucket", "azurerm_storage_account", "google_storage_bucket"]),
    (
        "database",
        ["aws_db_instance", "azurerm_postgresql_flexible_server", "google_sql_database_instance"],
    ),
    (
        "container_cluster",
        ["aws_eks_cluster", "azurerm_kubernetes_cluster", "google_container_cluster"],
    ),
    ("iam_role", ["aws_iam_role", "azurerm_role_definition", "google_service_account"]),
];

/// A registry of resource mappers keyed by provider and node type.
#[derive(Default)]
pub struct MapperRegistry {
    mappers: HashMap<MapperKey, Arc<dyn ResourceMapper>>,
}

impl MapperRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            mappers: HashMap::new(),
        }
    }

    /// Create a registry with the built-in generic node types.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for (node_type, resource_types) in DEFAULT_TYPES {
            for (provider, resource_type) in CloudProvider::all().into_iter().zip(resource_types) {
                registry.register(provider, *node_type, Arc::new(TypeMapper::new(*resource_type)));
            }
        }
        registry
    }

    /// Register a mapper. A mapper already registered under the key is replaced.
    pub fn register(
        &mut self,
        provider: CloudProvider,
        node_type: impl Into<String>,
        mapper: Arc<dyn ResourceMapper>,
    ) {
        let key = MapperKey::new(provider, node_type);
        debug!("Registering mapper: {}/{}", key.provider, key.node_type);
        self.mappers.insert(key, mapper);
    }

    pub fn get(&self, provider: CloudProvider, node_type: &str) -> Option<Arc<dyn ResourceMapper>> {
        self.mappers
            .get(&MapperKey::new(provider, node_type))
            .cloned()
    }

    pub fn supports(&self, provider: CloudProvider, node_type: &str) -> bool {
        self.mappers.contains_key(&MapperKey::new(provider, node_type))
    }

    /// All node types that can be mapped for a provider.
    pub fn node_types_for(&self, provider: CloudProvider) -> BTreeSet<String> {
        self.mappers
            .keys()
            .filter(|k| k.provider == provider)
            .map(|k| k.node_type.clone())
            .collect()
    }

    /// All node types known for any provider.
    pub fn known_node_types(&self) -> BTreeSet<String> {
        self.mappers.keys().map(|k| k.node_type.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.mappers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappers.is_empty()
    }
}

impl std::fmt::Debug for MapperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<_> = self.mappers.keys().collect();
        keys.sort();
        f.debug_struct("MapperRegistry").field("mappers", &keys).finish()
    }
}

/// Converts diagram graphs into architectures.
#[derive(Debug, Clone)]
pub struct ArchitectureMapper {
    registry: Arc<MapperRegistry>,
}

impl ArchitectureMapper {
    pub fn new(registry: Arc<MapperRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &MapperRegistry {
        &self.registry
    }

    /// Map a validated diagram onto a provider.
    ///
    /// Nodes are mapped in ascending id order so the same diagram always
    /// produces the same architecture. Association edges are dropped.
    pub fn map_from_diagram(
        &self,
        graph: &DiagramGraph,
        provider: CloudProvider,
        region: &str,
    ) -> ArchResult<Architecture> {
        info!(
            "Mapping diagram ({} nodes, {} edges) to {} in {}",
            graph.node_count(),
            graph.edge_count(),
            provider,
            region
        );

        let ctx = MappingContext { provider, region };
        let mut architecture = Architecture::new(provider, region);

        for node in graph.nodes.values() {
            let mapper = self.registry.get(provider, &node.node_type).ok_or_else(|| {
                ArchError::UnsupportedResourceType {
                    node_id: node.id.clone(),
                    node_type: node.node_type.clone(),
                    provider,
                }
            })?;

            let resource = mapper.map(node, &ctx)?;
            if resource.id != node.id {
                return Err(ArchError::InvalidMapping {
                    node_id: node.id.clone(),
                    message: format!("mapper produced resource id '{}'", resource.id),
                });
            }
            architecture.add_resource(resource)?;
        }

        let mut dropped = 0usize;
        for edge in &graph.edges {
            match edge.kind {
                EdgeKind::Containment => architecture.add_containment(&edge.target, &edge.source)?,
                EdgeKind::Dependency => architecture.add_dependency(&edge.source, &edge.target)?,
                EdgeKind::Association => dropped += 1,
            }
        }

        debug!(
            "Mapped {} resources, {} containments, {} dependencies ({} association edges dropped)",
            architecture.len(),
            architecture.containment_count(),
            architecture.dependency_count(),
            dropped
        );

        Ok(architecture)
    }
}
