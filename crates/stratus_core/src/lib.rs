//! # stratus_core
//!
//! The Stratus compilation pipeline.
//!
//! [`Pipeline`] ties the graph, architecture and codegen crates together
//! behind service traits:
//!
//! - `process_diagram` turns diagram bytes into a stored project
//! - `generate_code` renders a stored project with a named engine
//!
//! Projects are kept by a [`ProjectService`]; [`InMemoryProjectService`] and
//! [`FileProjectService`] are provided.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stratus_core::{
//!     GenerateCodeRequest, InMemoryProjectService, Pipeline, ProcessDiagramRequest,
//!     RequestContext, StratusConfig,
//! };
//!
//! # async fn run() -> stratus_core::CoreResult<()> {
//! let pipeline = Pipeline::standard(Arc::new(InMemoryProjectService::new()), StratusConfig::default())?;
//! let ctx = RequestContext::new();
//!
//! let diagram = br#"{"nodes": [{"id": "vpc", "type": "vpc"}], "edges": []}"#.to_vec();
//! let compiled = pipeline
//!     .process_diagram(&ctx, ProcessDiagramRequest::new(diagram, "user-1", "demo"))
//!     .await?;
//!
//! let generated = pipeline
//!     .generate_code(&ctx, GenerateCodeRequest::new(compiled.project_id))
//!     .await?;
//! println!("{} files", generated.output.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod error;
pub mod pipeline;
pub mod pricing;
pub mod project;
pub mod services;
pub mod store;

pub use config::{PricingConfig, StratusConfig, ValidationConfig};
pub use context::RequestContext;
pub use error::{CoreError, CoreResult, PipelineStage, StageExt};
pub use pipeline::{
    CompiledDiagram, GenerateCodeRequest, GenerateCodeResult, Pipeline, ProcessDiagramRequest,
    ProcessDiagramResult,
};
pub use pricing::{Currency, PricingEstimate, PricingEstimator, PricingItem};
pub use project::{CreateProjectRequest, Project, ProjectId};
pub use services::{
    ArchitectureService, CodegenService, DiagramService, ProjectService, StandardArchitectureService,
    StandardCodegenService, StandardDiagramService,
};
pub use store::{FileProjectService, InMemoryProjectService};
