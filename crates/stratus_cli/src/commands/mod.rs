//! CLI command definitions.
//!
//! Each subcommand drives one part of the compile pipeline against a
//! project store in the workspace directory.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};

use stratus_core::{FileProjectService, Pipeline, RequestContext, StratusConfig};

pub mod compile;
pub mod engines;
pub mod generate;
pub mod projects;
pub mod validate;

/// Stratus - compile architecture diagrams into infrastructure code
#[derive(Parser)]
#[command(name = "stratus")]
#[command(version, about = "Stratus - compile architecture diagrams into infrastructure code")]
#[command(long_about = r#"
Stratus turns an architecture diagram (JSON nodes and edges) into a cloud
architecture, checks it against provider rules, stores it as a project and
renders Terraform or Pulumi code from it.

WORKFLOWS:
  validate  → Check a diagram without storing anything
  compile   → Compile a diagram into a stored project
  generate  → Render code for a stored project
  engines   → List available code generation engines
  projects  → List, show or delete stored projects

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Validation failure
  4 - Code generation error
  5 - Project store error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (stratus.toml or stratus.yaml)
    #[arg(short, long, global = true, env = "STRATUS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Workspace directory holding the project store
    #[arg(short, long, global = true, env = "STRATUS_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Abort a request after this many seconds (at most a day)
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..=86_400))]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Options shared by every subcommand.
    pub fn global(&self) -> GlobalArgs {
        GlobalArgs {
            quiet: self.quiet,
            config: self.config.clone(),
            workspace: self.workspace.clone(),
            timeout: self.timeout.map(Duration::from_secs),
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a diagram into a stored project
    Compile(compile::CompileArgs),

    /// Generate infrastructure code for a stored project
    Generate(generate::GenerateArgs),

    /// Validate a diagram without storing it
    Validate(validate::ValidateArgs),

    /// List available code generation engines
    Engines(engines::EnginesArgs),

    /// Manage stored projects
    Projects(projects::ProjectsArgs),
}

#[derive(Debug, Clone, Default)]
pub struct GlobalArgs {
    pub quiet: bool,
    pub config: Option<PathBuf>,
    pub workspace: Option<PathBuf>,
    pub timeout: Option<Duration>,
}

/// Configuration, project store and pipeline for one invocation.
pub struct Session {
    pub store: Arc<FileProjectService>,
    pub pipeline: Pipeline,
    timeout: Option<Duration>,
}

impl Session {
    pub fn open(global: &GlobalArgs) -> Result<Self> {
        let current_dir = std::env::current_dir()?;

        let config = match &global.config {
            Some(path) => StratusConfig::load(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => StratusConfig::discover(global.workspace.as_deref().unwrap_or(&current_dir))?,
        };

        // An explicit --workspace wins over the configured one
        let workspace = match &global.workspace {
            Some(dir) => dir.clone(),
            None if config.workspace.is_absolute() => config.workspace.clone(),
            None => current_dir.join(&config.workspace),
        };
        debug!("Using workspace {}", workspace.display());

        let store = Arc::new(
            FileProjectService::new(&workspace).with_estimator(config.pricing_estimator()),
        );
        let pipeline = Pipeline::standard(store.clone(), config)?;

        Ok(Self {
            store,
            pipeline,
            timeout: global.timeout,
        })
    }

    /// Context for one pipeline request, cancelled on Ctrl-C.
    pub fn request_context(&self) -> RequestContext {
        let mut ctx = RequestContext::new();
        if let Some(timeout) = self.timeout {
            ctx = ctx.with_timeout(timeout);
        }

        let token = ctx.cancellation_token().clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, cancelling request");
                token.cancel();
            }
        });
        ctx
    }
}
