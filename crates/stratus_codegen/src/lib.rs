//! # stratus_codegen
//!
//! Infrastructure-as-code generation for Stratus.
//!
//! Engines turn an [`Architecture`](stratus_arch::Architecture) whose
//! resources are already in dependency order into a set of output files.
//! Engines are looked up by name through an [`EngineRegistry`].
//!
//! ## Engines
//!
//! - `terraform`: HCL configuration split into the usual `*.tf` files
//! - `pulumi`: a TypeScript Pulumi program with project and stack files
//!
//! ## Example
//!
//! ```rust
//! use stratus_arch::{Architecture, CloudProvider, DependencyResolver, Resource};
//! use stratus_codegen::EngineRegistry;
//!
//! let mut arch = Architecture::new(CloudProvider::Aws, "us-east-1");
//! arch.add_resource(Resource::new("logs", "aws_s3_bucket", CloudProvider::Aws, "us-east-1")).unwrap();
//!
//! let registry = EngineRegistry::with_defaults().unwrap();
//! let sorted = DependencyResolver::sort(&arch).unwrap();
//! let output = registry.get_required("terraform").unwrap().generate(&arch, &sorted).unwrap();
//! assert!(output.file("main.tf").unwrap().content.contains("aws_s3_bucket"));
//! ```

pub mod engine;
pub mod error;
pub mod output;
pub mod pulumi;
pub mod registry;
pub mod render;
pub mod terraform;

pub use engine::Engine;
pub use error::{CodegenError, CodegenResult};
pub use output::{Output, OutputFile};
pub use pulumi::PulumiEngine;
pub use registry::EngineRegistry;
pub use render::{HclRenderer, RenderContext, ResourceRenderer, TypeScriptRenderer};
pub use terraform::TerraformEngine;
