//! Engines command - List code generation engines.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use stratus_codegen::EngineRegistry;

#[derive(Args)]
pub struct EnginesArgs {
    /// Print the engines as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct EngineInfo {
    name: String,
    description: String,
}

pub async fn execute(args: EnginesArgs) -> Result<()> {
    let registry = EngineRegistry::with_defaults()?;

    let engines: Vec<EngineInfo> = registry
        .names()
        .into_iter()
        .filter_map(|name| registry.get(&name))
        .map(|engine| EngineInfo {
            name: engine.name().to_string(),
            description: engine.description().to_string(),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&engines)?);
        return Ok(());
    }

    println!("⚙️  Available engines:");
    for engine in &engines {
        println!("   {:<12} {}", engine.name, engine.description);
    }

    Ok(())
}
