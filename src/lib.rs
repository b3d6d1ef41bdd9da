#![allow(clippy::doc_markdown)] // Allow technical terms like Snowflake, GitHub in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Notebook ETL
//!
//! Builds one ETL workflow per data-preparation notebook and runs its tasks.
//!
//! ## Overview
//!
//! Each notebook under `notebooks/` becomes a workflow `etl_<basename>`:
//!
//! ```text
//! start -> cleanup -> execute_notebook -> upload_to_s3 -> upload_to_snowflake
//!       -> execute_script_<file>... -> [qa_checks] -> end
//! ```
//!
//! The notebook writes its output files, the files are uploaded to object storage
//! and loaded into same-named warehouse tables, templated transformation scripts
//! run in parallel, and optional quality checks file an issue per failing row.
//!
//! Scheduling, retries and dependency ordering belong to the orchestration host.
//! This crate declares the graph and runs single tasks on request.
//!
//! ## Module Organization
//!
//! - [`config`] - Variables, folder layout, schedule table, template parameters
//! - [`workflow`] - Workflow builder, definitions, discovery and the task runner
//! - [`step_handlers`] - One handler per pipeline stage
//! - [`client`] - Notebook, object storage, warehouse and issue tracker clients
//! - [`registry`] - Host interface and the in-process workflow registry
//! - [`sql`] - Statement splitting and warehouse load statements
//! - [`template`] - SQL template rendering
//! - [`error`] - Structured error handling
//! - [`logging`] - Structured logging setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use notebook_etl::config::ConfigManager;
//! use notebook_etl::step_handlers::TaskServices;
//! use notebook_etl::workflow::{run_task, DefaultArgs, WorkflowBuilder};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigManager::load("/opt/covid-etl", None)?;
//! let builder = WorkflowBuilder::new(config.clone());
//! let workflow = builder.build(
//!     "JHU_COVID-19",
//!     &config.schedules,
//!     DefaultArgs::for_basename("JHU_COVID-19"),
//! )?;
//!
//! let services = TaskServices::from_config(config).await?;
//! run_task(&workflow, "cleanup", &services).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod registry;
pub mod sql;
pub mod step_handlers;
pub mod template;
pub mod workflow;

pub use config::{ConfigManager, EtlConfig};
pub use error::{EtlError, Result};
pub use registry::{OrchestrationHost, WorkflowRegistry};
pub use step_handlers::{TaskOutcome, TaskServices};
pub use workflow::{run_task, WorkflowBuilder, WorkflowDefinition};
