//! # stratus_arch
//!
//! Provider-specific architecture model for Stratus.
//!
//! This crate turns a validated diagram graph into an [`Architecture`] for a
//! chosen [`CloudProvider`], checks cross-resource rules over it, and orders
//! its resources for code generation.
//!
//! ## Features
//!
//! - Mapper registry keyed by provider and node type
//! - Regex-driven semantic rules with accumulated findings
//! - Deterministic topological ordering with cycle detection
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use stratus_arch::{ArchitectureMapper, CloudProvider, DependencyResolver, MapperRegistry};
//! use stratus_graph::{DiagramGraph, Edge, Node};
//!
//! let graph = DiagramGraph::new()
//!     .node(Node::new("vpc", "vpc"))
//!     .node(Node::new("subnet", "subnet"))
//!     .edge(Edge::contains("subnet", "vpc"));
//!
//! let mapper = ArchitectureMapper::new(Arc::new(MapperRegistry::with_defaults()));
//! let arch = mapper.map_from_diagram(&graph, CloudProvider::Aws, "us-east-1").unwrap();
//! let order = DependencyResolver::sort_ids(&arch).unwrap();
//! assert_eq!(order, vec!["vpc", "subnet"]);
//! ```

pub mod architecture;
pub mod error;
pub mod mapper;
pub mod provider;
pub mod resolver;
pub mod rules;

pub use architecture::{Architecture, Resource, ResourceId};
pub use error::{ArchError, ArchResult};
pub use mapper::{ArchitectureMapper, MapperKey, MapperRegistry, MappingContext, ResourceMapper, TypeMapper};
pub use provider::CloudProvider;
pub use resolver::DependencyResolver;
pub use rules::{
    ContainedInRule, PatternRule, ProviderConsistencyRule, ReferenceRule, RegionConsistencyRule,
    ResourceRuleResult, Rule, RuleSet, RuleSeverity, RuleValidationResult, RuleValidator,
    RuleViolation,
};
