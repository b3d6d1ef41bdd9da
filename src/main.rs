//! # Notebook ETL command line
//!
//! Inspect the workflows discovered under an ETL checkout and run single tasks.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use notebook_etl::config::ConfigManager;
use notebook_etl::logging::init_structured_logging;
use notebook_etl::registry::WorkflowRegistry;
use notebook_etl::step_handlers::TaskServices;
use notebook_etl::workflow::{dag_id_for, refresh_registry, run_task};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "notebook-etl")]
#[command(about = "Build and run notebook ETL workflows")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Layout root containing notebooks/, output/ and snowflake/
    #[arg(long, env = "ETL_ROOT", default_value = ".")]
    root: PathBuf,

    /// TOML file with variables (environment variables override it)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List discovered workflows and their schedules
    List,

    /// Print one workflow definition as JSON
    Show {
        /// Notebook basename
        basename: String,
    },

    /// Run a single task against the configured services
    RunTask {
        /// Notebook basename
        basename: String,
        /// Task id, e.g. cleanup or execute_script_<file>
        task_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_structured_logging();
    let cli = Cli::parse();

    let config = ConfigManager::load(cli.root.clone(), cli.config.as_deref())
        .with_context(|| format!("loading configuration under {}", cli.root.display()))?;
    let registry = WorkflowRegistry::global();
    let summary = refresh_registry(registry, config.clone()).context("discovering workflows")?;
    info!(
        workflows = summary.registered.len(),
        skipped = summary.skipped.len(),
        "Workflows discovered"
    );

    match cli.command {
        Commands::List => {
            for dag_id in registry.ids() {
                if let Some(workflow) = registry.get(&dag_id) {
                    println!(
                        "{}\t{}",
                        dag_id,
                        workflow.schedule.as_deref().unwrap_or("-")
                    );
                }
            }
        }
        Commands::Show { basename } => {
            let Some(workflow) = registry.get(&dag_id_for(&basename)) else {
                bail!("no workflow for notebook '{basename}'");
            };
            println!("{}", serde_json::to_string_pretty(workflow.as_ref())?);
        }
        Commands::RunTask { basename, task_id } => {
            let Some(workflow) = registry.get(&dag_id_for(&basename)) else {
                bail!("no workflow for notebook '{basename}'");
            };
            let services = TaskServices::from_config(config).await?;
            let outcome = run_task(&workflow, &task_id, &services).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_task() {
        let cli = Cli::try_parse_from([
            "notebook-etl",
            "--root",
            "/opt/covid-etl",
            "--config",
            "/etc/etl/variables.toml",
            "run-task",
            "JHU_COVID-19",
            "execute_script_JHU_views.sql",
        ])
        .unwrap();

        assert_eq!(cli.root, PathBuf::from("/opt/covid-etl"));
        assert_eq!(cli.config, Some(PathBuf::from("/etc/etl/variables.toml")));
        assert!(matches!(
            cli.command,
            Commands::RunTask { ref basename, ref task_id }
                if basename == "JHU_COVID-19" && task_id == "execute_script_JHU_views.sql"
        ));
    }

    #[test]
    fn test_parse_list_and_show() {
        let cli = Cli::try_parse_from(["notebook-etl", "--root", "/srv/etl", "list"]).unwrap();
        assert!(matches!(cli.command, Commands::List));

        let cli = Cli::try_parse_from(["notebook-etl", "--root", "/srv/etl", "show", "ECDC"]).unwrap();
        assert!(matches!(cli.command, Commands::Show { ref basename } if basename == "ECDC"));
    }

    #[test]
    fn test_subcommand_arguments_are_required() {
        assert!(Cli::try_parse_from(["notebook-etl", "--root", "/srv/etl", "show"]).is_err());
        assert!(Cli::try_parse_from(["notebook-etl", "--root", "/srv/etl", "run-task", "JHU"]).is_err());
        assert!(Cli::try_parse_from(["notebook-etl", "--root", "/srv/etl"]).is_err());
    }
}
