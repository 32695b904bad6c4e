//! Stratus CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Validation failure
//! - 4: Code generation error
//! - 5: Project store error

use std::process::ExitCode;

use clap::Parser;
use stratus_core::CoreError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const CODEGEN_ERROR: u8 = 4;
    pub const STORE_ERROR: u8 = 5;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        "stratus=debug,info"
    } else if cli.quiet {
        "error"
    } else {
        "stratus=info,warn"
    };

    // Logs go to stderr so `--json` output stays machine readable
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let global = cli.global();
    let result = match cli.command {
        Commands::Compile(args) => commands::compile::execute(args, &global).await,
        Commands::Generate(args) => commands::generate::execute(args, &global).await,
        Commands::Validate(args) => commands::validate::execute(args, &global).await,
        Commands::Engines(args) => commands::engines::execute(args).await,
        Commands::Projects(args) => commands::projects::execute(args, &global).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(core) = e.downcast_ref::<CoreError>() {
        return match core.root() {
            CoreError::Parse(_)
            | CoreError::DiagramValidation { .. }
            | CoreError::Mapping(_)
            | CoreError::RuleValidation { .. } => ExitCodes::VALIDATION_FAILURE,
            CoreError::Codegen(_) | CoreError::UnknownEngine(_) => ExitCodes::CODEGEN_ERROR,
            CoreError::ProjectNotFound(_)
            | CoreError::Persistence(_)
            | CoreError::Io(_)
            | CoreError::Json(_) => ExitCodes::STORE_ERROR,
            CoreError::InvalidRequest(_) | CoreError::Config(_) => ExitCodes::INVALID_ARGS,
            _ => ExitCodes::GENERAL_ERROR,
        };
    }

    let msg = e.to_string().to_lowercase();

    if msg.contains("validation") || msg.contains("rule") {
        ExitCodes::VALIDATION_FAILURE
    } else if msg.contains("engine") || msg.contains("generat") {
        ExitCodes::CODEGEN_ERROR
    } else if msg.contains("argument") || msg.contains("option") {
        ExitCodes::INVALID_ARGS
    } else if msg.contains("project") {
        ExitCodes::STORE_ERROR
    } else {
        ExitCodes::GENERAL_ERROR
    }
}
