//! Compile command - Turn a diagram into a stored project.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use stratus_arch::CloudProvider;
use stratus_core::ProcessDiagramRequest;

use super::{GlobalArgs, Session};

/// A hundred years.
pub const MAX_PRICING_HOURS: u64 = 876_000;

#[derive(Args)]
pub struct CompileArgs {
    /// Diagram JSON file
    pub diagram: PathBuf,

    /// Project name (defaults to the diagram file name)
    #[arg(short, long)]
    pub name: Option<String>,

    /// Owner of the project
    #[arg(short, long, env = "STRATUS_USER", default_value = "local")]
    pub user: String,

    /// Target cloud provider (aws, azure, gcp)
    #[arg(short, long)]
    pub provider: Option<CloudProvider>,

    /// Target region (defaults to the provider's default region)
    #[arg(short, long, default_value = "")]
    pub region: String,

    /// Engine recorded as the project's default
    #[arg(short, long)]
    pub engine: Option<String>,

    /// Estimate cost over this many hours
    #[arg(long, value_parser = clap::value_parser!(u64).range(0..=MAX_PRICING_HOURS))]
    pub pricing_hours: Option<u64>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: CompileArgs, global: &GlobalArgs) -> Result<()> {
    let diagram = std::fs::read(&args.diagram)
        .with_context(|| format!("Failed to read diagram {}", args.diagram.display()))?;

    let name = match args.name {
        Some(name) => name,
        None => args
            .diagram
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("diagram")
            .to_string(),
    };
    info!("Compiling {} as project '{}'", args.diagram.display(), name);

    let session = Session::open(global)?;

    let mut request = ProcessDiagramRequest::new(diagram, args.user, name).with_region(args.region);
    if let Some(provider) = args.provider {
        request = request.with_provider(provider);
    }
    if let Some(engine) = args.engine {
        request = request.with_iac_tool(engine);
    }
    if let Some(hours) = args.pricing_hours {
        request = request.with_pricing(Duration::from_secs(hours * 3600));
    }

    let ctx = session.request_context();
    let result = session.pipeline.process_diagram(&ctx, request).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    if global.quiet {
        println!("{}", result.project_id);
        return Ok(());
    }

    println!("✅ {}", result.message);
    println!("   Project: {}", result.project_id);

    for warning in &result.warnings {
        println!("   ⚠️  {}", warning);
    }

    if let Some(pricing) = &result.pricing {
        println!();
        println!(
            "💰 Estimated cost over {}h: {}",
            pricing.duration_hours,
            pricing.format_total()
        );
        for item in &pricing.items {
            println!(
                "   {:<24} {:<28} {:>10.2}",
                item.resource_id, item.resource_type, item.cost
            );
        }
    }

    println!();
    println!("Next: stratus generate {}", result.project_id);

    Ok(())
}
