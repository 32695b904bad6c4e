//! Validate command - Check a diagram without storing it.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use stratus_arch::CloudProvider;
use stratus_core::{CoreError, ProcessDiagramRequest};

use super::{GlobalArgs, Session};

#[derive(Args)]
pub struct ValidateArgs {
    /// Diagram JSON file
    pub diagram: PathBuf,

    /// Target cloud provider (aws, azure, gcp)
    #[arg(short, long)]
    pub provider: Option<CloudProvider>,

    /// Target region
    #[arg(short, long, default_value = "")]
    pub region: String,

    /// Print the compiled architecture as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: ValidateArgs, global: &GlobalArgs) -> Result<()> {
    info!("Validating diagram: {}", args.diagram.display());

    let diagram = std::fs::read(&args.diagram)
        .with_context(|| format!("Failed to read diagram {}", args.diagram.display()))?;

    let session = Session::open(global)?;

    let mut request = ProcessDiagramRequest::new(diagram, "", "").with_region(args.region);
    if let Some(provider) = args.provider {
        request = request.with_provider(provider);
    }

    let ctx = session.request_context();
    let compiled = match session.pipeline.compile(&ctx, &request).await {
        Ok(compiled) => compiled,
        Err(e) => {
            if !global.quiet {
                report_failure(&e);
            }
            return Err(e.into());
        }
    };

    if args.json {
        println!("{}", compiled.architecture.to_json()?);
        return Ok(());
    }

    if global.quiet {
        return Ok(());
    }

    println!(
        "✅ Diagram is valid: {} resources for {} in {}",
        compiled.architecture.resources.len(),
        compiled.provider,
        compiled.region
    );
    println!("   Order: {}", compiled.order.join(" → "));
    for warning in &compiled.warnings {
        println!("   ⚠️  {}", warning);
    }

    Ok(())
}

fn report_failure(error: &CoreError) {
    let stage = error.stage().map(|s| s.as_str()).unwrap_or("request");
    match error.root() {
        CoreError::DiagramValidation { errors } => {
            println!("❌ Diagram validation failed ({}):", stage);
            for message in errors {
                println!("   - {}", message);
            }
        }
        CoreError::RuleValidation { violations } => {
            println!("❌ Rule validation failed ({}):", stage);
            for message in violations {
                println!("   - {}", message);
            }
        }
        _ => {}
    }
}
