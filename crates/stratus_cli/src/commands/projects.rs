//! Projects command - Inspect the project store.

use anyhow::{bail, Result};
use clap::{Args, Subcommand};

use stratus_core::{Project, ProjectService};

use super::{GlobalArgs, Session};

#[derive(Args)]
pub struct ProjectsArgs {
    #[command(subcommand)]
    pub command: ProjectsCommand,
}

#[derive(Subcommand)]
pub enum ProjectsCommand {
    /// List stored projects
    List {
        /// Only projects owned by this user
        #[arg(short, long)]
        user: Option<String>,

        /// Print the projects as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show a project with its architecture and estimates
    Show {
        /// Project id
        id: String,
    },

    /// Delete a project and everything stored with it
    Delete {
        /// Project id
        id: String,

        /// Skip the confirmation check
        #[arg(short, long)]
        force: bool,
    },
}

pub async fn execute(args: ProjectsArgs, global: &GlobalArgs) -> Result<()> {
    let session = Session::open(global)?;
    let store = session.store.as_ref();

    match args.command {
        ProjectsCommand::List { user, json } => {
            let projects = match user {
                Some(user) => store.list_by_user_id(&user).await?,
                None => store.list_all()?,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&projects)?);
            } else if projects.is_empty() {
                println!("No projects found in {}", store.workspace_root().display());
            } else {
                for project in &projects {
                    print_summary(project);
                }
            }
        }
        ProjectsCommand::Show { id } => {
            let project = store.get_by_id(&id).await?;
            print_summary(&project);
            println!("   Owner:   {}", project.user_id);
            println!("   Created: {}", project.created_at.to_rfc3339());
            println!("   Updated: {}", project.updated_at.to_rfc3339());

            match store.load_architecture(&id).await {
                Ok(architecture) => {
                    println!();
                    println!("🏗️  Resources ({}):", architecture.len());
                    for resource in &architecture.resources {
                        let container = architecture
                            .container_of(&resource.id)
                            .map(|c| format!(" in {}", c))
                            .unwrap_or_default();
                        println!("   {} ({}){}", resource.id, resource.resource_type, container);
                    }
                }
                Err(e) => println!("   ⚠️  No architecture: {}", e),
            }

            let estimates = store.get_project_pricing(&id).await?;
            if let Some(latest) = estimates.last() {
                println!();
                println!(
                    "💰 Latest estimate: {} over {}h",
                    latest.format_total(),
                    latest.duration_hours
                );
            }
        }
        ProjectsCommand::Delete { id, force } => {
            let project = store.get_by_id(&id).await?;
            if !force {
                bail!(
                    "Refusing to delete project '{}' ({}) without the --force option",
                    project.name,
                    id
                );
            }
            store.delete(&id).await?;
            if !global.quiet {
                println!("🗑️  Deleted project {} ({})", project.name, id);
            }
        }
    }

    Ok(())
}

fn print_summary(project: &Project) {
    let provider = project
        .cloud_provider
        .map(|p| p.to_string())
        .unwrap_or_else(|| "-".to_string());
    let tool = if project.iac_tool.is_empty() {
        "-"
    } else {
        project.iac_tool.as_str()
    };
    println!(
        "📦 {}  {}  [{} / {} / {}]",
        project.id, project.name, provider, project.region, tool
    );
}
