//! Generate command - Render code for a stored project.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use stratus_arch::CloudProvider;
use stratus_core::{CoreError, GenerateCodeRequest};

use super::{GlobalArgs, Session};

#[derive(Args)]
pub struct GenerateArgs {
    /// Project to generate code for
    pub project_id: String,

    /// Engine to use (defaults to the project's engine)
    #[arg(short, long)]
    pub engine: Option<String>,

    /// Provider to generate for (defaults to the project's provider)
    #[arg(short, long)]
    pub provider: Option<CloudProvider>,

    /// Output directory (defaults to generated/<project id> in the workspace)
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Print the files instead of writing them
    #[arg(long)]
    pub stdout: bool,
}

pub async fn execute(args: GenerateArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::open(global)?;

    let mut request = GenerateCodeRequest::new(args.project_id.clone());
    if let Some(engine) = args.engine {
        request = request.with_engine(engine);
    }
    if let Some(provider) = args.provider {
        request = request.with_provider(provider);
    }

    let ctx = session.request_context();
    let result = session.pipeline.generate_code(&ctx, request).await?;

    if let Some(rules) = &result.rule_validation {
        if !rules.valid && !global.quiet {
            println!("⚠️  Stored architecture no longer passes current rules:");
            for message in rules.error_messages() {
                println!("   - {}", message);
            }
        }
    }

    if args.stdout {
        for file in &result.output.files {
            println!("// ---- {} ----", file.path);
            println!("{}", file.content);
        }
        return Ok(());
    }

    let out_dir = args.out.unwrap_or_else(|| {
        session
            .store
            .workspace_root()
            .join("generated")
            .join(&args.project_id)
    });
    info!("Writing {} files to {}", result.output.len(), out_dir.display());

    let written = result.output.write_to(&out_dir).map_err(CoreError::from)?;

    if global.quiet {
        return Ok(());
    }

    println!(
        "✅ Generated {} code for {} ({})",
        result.engine, result.project_id, result.provider
    );
    for path in &written {
        println!("   📄 {}", path.display());
    }

    Ok(())
}
