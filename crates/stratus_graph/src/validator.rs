//! Structural and semantic validation of diagram graphs.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{DiagramGraph, EdgeKind};

/// Kind of problem found in a diagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueCode {
    DuplicateNodeId,
    EmptyNodeId,
    EmptyNodeType,
    DanglingSource,
    DanglingTarget,
    SelfLoop,
    UnknownNodeType,
    TypeNotAllowed,
    IsolatedNode,
    DuplicateEdge,
    EmptyGraph,
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagramIssue {
    pub code: IssueCode,
    pub message: String,
    /// Node id or edge position the finding is about.
    pub subject: Option<String>,
}

impl DiagramIssue {
    pub fn new(code: IssueCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            subject: None,
        }
    }

    pub fn about(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

impl std::fmt::Display for DiagramIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Validation result with details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub errors: Vec<DiagramIssue>,
    pub warnings: Vec<DiagramIssue>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            valid: true,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn add_error(&mut self, issue: DiagramIssue) {
        self.valid = false;
        self.errors.push(issue);
    }

    pub fn add_warning(&mut self, issue: DiagramIssue) {
        self.warnings.push(issue);
    }

    pub fn merge(&mut self, other: ValidationResult) {
        if !other.valid {
            self.valid = false;
        }
        self.errors.extend(other.errors);
        self.warnings.extend(other.warnings);
    }

    /// Error messages, in the order they were found.
    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }

    pub fn has_error(&self, code: IssueCode) -> bool {
        self.errors.iter().any(|e| e.code == code)
    }
}

/// Which node types a diagram may use.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOptions {
    /// Node types the system recognises at all.
    pub known_types: Option<BTreeSet<String>>,
    /// Node types the selected provider can map.
    pub provider_types: Option<BTreeSet<String>>,
}

impl ValidationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_known_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.known_types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_provider_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provider_types = Some(types.into_iter().map(Into::into).collect());
        self
    }
}

/// Validator for diagram graphs.
///
/// Every check runs over the whole graph and findings are accumulated, so a
/// caller gets complete feedback in one pass. The graph is never modified.
pub struct DiagramValidator;

impl DiagramValidator {
    /// Validate a graph. `None` options accept any well-formed node type.
    pub fn validate(graph: &DiagramGraph, options: Option<&ValidationOptions>) -> ValidationResult {
        let mut result = ValidationResult::new();

        if graph.is_empty() {
            result.add_warning(DiagramIssue::new(IssueCode::EmptyGraph, "Diagram has no nodes"));
            return result;
        }

        result.merge(Self::validate_nodes(graph));
        result.merge(Self::validate_edges(graph));
        if let Some(options) = options {
            result.merge(Self::validate_types(graph, options));
        }

        debug!(
            "Diagram validation finished: {} errors, {} warnings",
            result.errors.len(),
            result.warnings.len()
        );
        result
    }

    /// Validate node identity and typing.
    pub fn validate_nodes(graph: &DiagramGraph) -> ValidationResult {
        let mut result = ValidationResult::new();

        for id in &graph.duplicate_ids {
            result.add_error(
                DiagramIssue::new(IssueCode::DuplicateNodeId, format!("Duplicate node id '{}'", id))
                    .about(id.clone()),
            );
        }

        for (id, node) in &graph.nodes {
            if id.trim().is_empty() {
                result.add_error(DiagramIssue::new(
                    IssueCode::EmptyNodeId,
                    "Node has an empty id",
                ));
            }

            if node.node_type.trim().is_empty() {
                result.add_error(
                    DiagramIssue::new(
                        IssueCode::EmptyNodeType,
                        format!("Node '{}' has an empty type", id),
                    )
                    .about(id.clone()),
                );
            }

            if graph.node_count() > 1 && !graph.has_incident_edges(id) {
                result.add_warning(
                    DiagramIssue::new(
                        IssueCode::IsolatedNode,
                        format!("Node '{}' is not connected to any other node", id),
                    )
                    .about(id.clone()),
                );
            }
        }

        result
    }

    /// Validate edge endpoints and shape.
    pub fn validate_edges(graph: &DiagramGraph) -> ValidationResult {
        let mut result = ValidationResult::new();
        let mut seen = HashSet::new();

        for (index, edge) in graph.edges.iter().enumerate() {
            let subject = format!("edges[{}]", index);

            if !graph.contains(&edge.source) {
                result.add_error(
                    DiagramIssue::new(
                        IssueCode::DanglingSource,
                        format!(
                            "Edge {} -> {} ({}) references unknown source node '{}'",
                            edge.source, edge.target, edge.kind, edge.source
                        ),
                    )
                    .about(subject.clone()),
                );
            }

            if !graph.contains(&edge.target) {
                result.add_error(
                    DiagramIssue::new(
                        IssueCode::DanglingTarget,
                        format!(
                            "Edge {} -> {} ({}) references unknown target node '{}'",
                            edge.source, edge.target, edge.kind, edge.target
                        ),
                    )
                    .about(subject.clone()),
                );
            }

            if edge.is_self_loop() {
                let issue = DiagramIssue::new(
                    IssueCode::SelfLoop,
                    format!("Node '{}' has a {} edge to itself", edge.source, edge.kind),
                )
                .about(subject.clone());

                // A self-referencing ordered edge can never be satisfied.
                if edge.kind == EdgeKind::Association {
                    result.add_warning(issue);
                } else {
                    result.add_error(issue);
                }
            }

            if !seen.insert(edge) {
                result.add_warning(
                    DiagramIssue::new(
                        IssueCode::DuplicateEdge,
                        format!(
                            "Edge {} -> {} ({}) is declared more than once",
                            edge.source, edge.target, edge.kind
                        ),
                    )
                    .about(subject),
                );
            }
        }

        result
    }

    /// Validate node types against the configured whitelists.
    pub fn validate_types(graph: &DiagramGraph, options: &ValidationOptions) -> ValidationResult {
        let mut result = ValidationResult::new();

        for (id, node) in &graph.nodes {
            if node.node_type.trim().is_empty() {
                continue;
            }

            if let Some(known) = &options.known_types {
                if !known.contains(&node.node_type) {
                    result.add_error(
                        DiagramIssue::new(
                            IssueCode::UnknownNodeType,
                            format!("Node '{}' has unknown type '{}'", id, node.node_type),
                        )
                        .about(id.clone()),
                    );
                    continue;
                }
            }

            if let Some(allowed) = &options.provider_types {
                if !allowed.contains(&node.node_type) {
                    result.add_error(
                        DiagramIssue::new(
                            IssueCode::TypeNotAllowed,
                            format!(
                                "Node '{}' has type '{}' which the selected provider does not support",
                                id, node.node_type
                            ),
                        )
                        .about(id.clone()),
                    );
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Edge, Node};

    fn network() -> DiagramGraph {
        DiagramGraph::new()
            .node(Node::new("vpc", "vpc"))
            .node(Node::new("subnet", "subnet"))
            .node(Node::new("instance", "instance"))
            .edge(Edge::contains("subnet", "vpc"))
            .edge(Edge::depends_on("instance", "subnet"))
    }

    #[test]
    fn test_valid_graph() {
        let result = DiagramValidator::validate(&network(), None);
        assert!(result.valid);
        assert!(result.errors.is_empty());
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_reports_all_structural_defects() {
        let mut graph = network()
            .node(Node::new("vpc", "vpc"))
            .node(Node::new("bucket", ""))
            .edge(Edge::depends_on("instance", "ghost"));
        graph.add_edge(Edge::associates("bucket", "vpc"));

        let result = DiagramValidator::validate(&graph, None);

        assert!(!result.valid);
        assert_eq!(result.errors.len(), 3);
        assert!(result.has_error(IssueCode::DuplicateNodeId));
        assert!(result.has_error(IssueCode::EmptyNodeType));
        assert!(result.has_error(IssueCode::DanglingTarget));
    }

    #[test]
    fn test_dependency_self_loop_is_error() {
        let graph = DiagramGraph::new()
            .node(Node::new("a", "instance"))
            .edge(Edge::depends_on("a", "a"));

        let result = DiagramValidator::validate(&graph, None);
        assert!(result.has_error(IssueCode::SelfLoop));
    }

    #[test]
    fn test_association_self_loop_is_warning() {
        let graph = DiagramGraph::new()
            .node(Node::new("a", "instance"))
            .edge(Edge::associates("a", "a"));

        let result = DiagramValidator::validate(&graph, None);
        assert!(result.valid);
        assert_eq!(result.warnings[0].code, IssueCode::SelfLoop);
    }

    #[test]
    fn test_isolated_node_warning() {
        let graph = network().node(Node::new("orphan", "bucket"));
        let result = DiagramValidator::validate(&graph, None);

        assert!(result.valid);
        assert_eq!(result.warnings.len(), 1);
        assert_eq!(result.warnings[0].subject.as_deref(), Some("orphan"));
    }

    #[test]
    fn test_type_whitelists() {
        let options = ValidationOptions::new()
            .with_known_types(["vpc", "subnet", "instance", "mainframe"])
            .with_provider_types(["vpc", "subnet"]);

        let graph = network().node(Node::new("legacy", "punch_card")).edge(Edge::associates("legacy", "vpc"));
        let result = DiagramValidator::validate(&graph, Some(&options));

        assert!(result.has_error(IssueCode::UnknownNodeType));
        assert!(result.has_error(IssueCode::TypeNotAllowed));
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_empty_graph_warns() {
        let result = DiagramValidator::validate(&DiagramGraph::new(), None);
        assert!(result.valid);
        assert_eq!(result.warnings[0].code, IssueCode::EmptyGraph);
    }
}
