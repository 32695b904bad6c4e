//! # stratus_graph
//!
//! Diagram graph model for Stratus.
//!
//! A diagram is what the user draws: nodes with an id, a type and free-form
//! properties, connected by containment, dependency or association edges.
//! This crate parses diagram JSON into a [`DiagramGraph`] and validates it
//! before it is mapped onto a cloud provider.
//!
//! ## Example
//!
//! ```rust
//! use stratus_graph::{DiagramParser, DiagramValidator};
//!
//! let graph = DiagramParser::parse_str(r#"{
//!     "nodes": [{"id": "vpc", "type": "vpc"}, {"id": "subnet", "type": "subnet"}],
//!     "edges": [{"source": "subnet", "target": "vpc", "kind": "contains"}]
//! }"#).unwrap();
//!
//! let result = DiagramValidator::validate(&graph, None);
//! assert!(result.valid);
//! ```

pub mod error;
pub mod model;
pub mod parser;
pub mod validator;

pub use error::{GraphError, GraphResult};
pub use model::{DiagramDocument, DiagramGraph, Edge, EdgeKind, Node, NodeId, Properties};
pub use parser::DiagramParser;
pub use validator::{DiagramIssue, DiagramValidator, IssueCode, ValidationOptions, ValidationResult};
