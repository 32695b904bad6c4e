//! Data models for diagram graphs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifier of a node within a diagram.
pub type NodeId = String;

/// Free-form property bag attached to nodes and resources.
pub type Properties = BTreeMap<String, Value>;

/// One element drawn on a diagram (e.g. a VPC or an instance).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub properties: Properties,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            properties: Properties::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Get a property as a string slice, if it is one.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

/// Relationship carried by an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// Hierarchical ownership: the target contains the source.
    #[serde(alias = "contains", alias = "contained_in")]
    Containment,
    /// Ordering: the source must be created after the target.
    #[serde(alias = "depends_on", alias = "depends")]
    Dependency,
    /// Informational link with no ordering meaning.
    #[default]
    #[serde(alias = "associates", alias = "associated_with")]
    Association,
}

impl EdgeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EdgeKind::Containment => "containment",
            EdgeKind::Dependency => "dependency",
            EdgeKind::Association => "association",
        }
    }

    /// Whether the edge constrains creation order.
    pub fn is_ordered(&self) -> bool {
        !matches!(self, EdgeKind::Association)
    }
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A directed edge between two nodes.
///
/// For both ordered kinds the source comes after the target: a containment
/// edge `subnet -> vpc` means the VPC contains the subnet, and a dependency
/// edge `instance -> subnet` means the instance needs the subnet first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default)]
    pub kind: EdgeKind,
}

impl Edge {
    pub fn new(source: impl Into<NodeId>, target: impl Into<NodeId>, kind: EdgeKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }

    pub fn contains(child: impl Into<NodeId>, parent: impl Into<NodeId>) -> Self {
        Self::new(child, parent, EdgeKind::Containment)
    }

    pub fn depends_on(dependent: impl Into<NodeId>, dependency: impl Into<NodeId>) -> Self {
        Self::new(dependent, dependency, EdgeKind::Dependency)
    }

    pub fn associates(source: impl Into<NodeId>, target: impl Into<NodeId>) -> Self {
        Self::new(source, target, EdgeKind::Association)
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}

/// Wire shape of a diagram document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramDocument {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

/// In-memory diagram graph.
///
/// Nodes are keyed by id. When a node id is added twice the first node is
/// kept and the id is remembered in `duplicate_ids`, so that validation can
/// report it instead of silently losing it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiagramGraph {
    pub nodes: BTreeMap<NodeId, Node>,
    pub edges: Vec<Edge>,
    pub duplicate_ids: Vec<NodeId>,
}

impl DiagramGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from its wire document.
    pub fn from_document(document: DiagramDocument) -> Self {
        let mut graph = Self::new();
        for node in document.nodes {
            graph.add_node(node);
        }
        graph.edges = document.edges;
        graph
    }

    /// Convert back to the wire document (nodes in id order).
    pub fn to_document(&self) -> DiagramDocument {
        DiagramDocument {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.clone(),
        }
    }

    /// Add a node. Returns `false` if a node with the same id already existed.
    pub fn add_node(&mut self, node: Node) -> bool {
        if self.nodes.contains_key(&node.id) {
            self.duplicate_ids.push(node.id);
            return false;
        }
        self.nodes.insert(node.id.clone(), node);
        true
    }

    pub fn add_edge(&mut self, edge: Edge) {
        self.edges.push(edge);
    }

    pub fn node(mut self, node: Node) -> Self {
        self.add_node(node);
        self
    }

    pub fn edge(mut self, edge: Edge) -> Self {
        self.add_edge(edge);
        self
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    /// Edges of the given kind, in document order.
    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }

    /// Whether any edge touches the node.
    pub fn has_incident_edges(&self, id: &str) -> bool {
        self.edges.iter().any(|e| e.source == id || e.target == id)
    }
}
