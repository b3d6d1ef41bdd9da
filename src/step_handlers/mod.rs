//! # Step Handlers
//!
//! One handler per pipeline stage. A handler carries only what the builder knew
//! when it wired the graph (paths, patterns); everything else (variables,
//! template parameters, service clients) comes from [`TaskServices`] at run time.
//!
//! ## Stages
//!
//! ```text
//! cleanup -> execute_notebook -> upload_to_s3 -> upload_to_snowflake
//!         -> execute_script_* (fan-out) -> [qa_checks] -> end
//! ```

pub mod cleanup;
pub mod notebook;
pub mod quality_check;
pub mod sql_script;
pub mod storage_upload;
pub mod warehouse_load;

pub use cleanup::CleanupHandler;
pub use notebook::NotebookHandler;
pub use quality_check::{QaFailure, QualityCheckHandler};
pub use sql_script::SqlScriptHandler;
pub use storage_upload::StorageUploadHandler;
pub use warehouse_load::WarehouseLoadHandler;

use crate::client::{
    GitHubIssueTracker, IssueTracker, NotebookExecutor, ObjectStorage, PapermillExecutor,
    S3ObjectStorage, SnowflakeSqlApi, Warehouse,
};
use crate::config::EtlConfig;
use crate::error::{EtlError, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// What a finished task reports back to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TaskOutcome {
    /// start / end markers
    Marker,
    FilesRemoved { count: usize },
    NotebookExecuted,
    /// Only the last file's upload result is reported
    Uploaded { files: usize, last_result: bool },
    StatementsExecuted { count: usize },
    QualityChecked { failures: usize, issues_filed: usize },
}

/// Trait implemented by every pipeline stage
#[async_trait]
pub trait StepHandler: Send + Sync {
    async fn handle(&self, services: &TaskServices) -> Result<TaskOutcome>;

    /// Get the step handler name for identification
    fn handler_name(&self) -> &'static str;
}

/// Shared configuration and service clients handed to every step
#[derive(Clone)]
pub struct TaskServices {
    config: Arc<EtlConfig>,
    notebook: Arc<dyn NotebookExecutor>,
    storage: Option<Arc<dyn ObjectStorage>>,
    warehouse: Option<Arc<dyn Warehouse>>,
    issue_tracker: Option<Arc<dyn IssueTracker>>,
}

impl TaskServices {
    pub fn new(config: Arc<EtlConfig>, notebook: Arc<dyn NotebookExecutor>) -> Self {
        Self {
            config,
            notebook,
            storage: None,
            warehouse: None,
            issue_tracker: None,
        }
    }

    pub fn with_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn with_warehouse(mut self, warehouse: Arc<dyn Warehouse>) -> Self {
        self.warehouse = Some(warehouse);
        self
    }

    pub fn with_issue_tracker(mut self, issue_tracker: Arc<dyn IssueTracker>) -> Self {
        self.issue_tracker = Some(issue_tracker);
        self
    }

    /// Production clients for whatever the variables configure.
    ///
    /// A client whose settings are missing is left out; the step that needs it
    /// fails with the missing setting when it runs.
    pub async fn from_config(config: Arc<EtlConfig>) -> Result<Self> {
        let variables = &config.variables;
        let mut services = Self::new(
            config.clone(),
            Arc::new(PapermillExecutor::new(&variables.papermill_bin)),
        );

        if variables.aws_credentials().is_ok() {
            services = services.with_storage(Arc::new(S3ObjectStorage::from_variables(variables).await?));
        }

        match variables.connection(&variables.snowflake_connection) {
            Ok(profile) => {
                services = services.with_warehouse(Arc::new(SnowflakeSqlApi::new(profile.clone())?));
            }
            Err(e) => debug!(error = %e, "Warehouse client not configured"),
        }

        if let Some(tracker) = GitHubIssueTracker::from_variables(variables)? {
            services = services.with_issue_tracker(Arc::new(tracker));
        }

        Ok(services)
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    pub fn notebook_executor(&self) -> &dyn NotebookExecutor {
        self.notebook.as_ref()
    }

    pub fn storage(&self) -> Result<&dyn ObjectStorage> {
        match &self.storage {
            Some(storage) => Ok(storage.as_ref()),
            None => Err(self
                .config
                .variables
                .aws_credentials()
                .err()
                .unwrap_or_else(|| EtlError::configuration("object_storage", "no client configured"))),
        }
    }

    pub fn warehouse(&self) -> Result<&dyn Warehouse> {
        match &self.warehouse {
            Some(warehouse) => Ok(warehouse.as_ref()),
            None => {
                let variables = &self.config.variables;
                variables.connection(&variables.snowflake_connection)?;
                Err(EtlError::configuration("warehouse", "no client configured"))
            }
        }
    }

    pub fn issue_tracker(&self) -> Result<&dyn IssueTracker> {
        self.issue_tracker
            .as_deref()
            .ok_or_else(|| EtlError::configuration("issue_tracker", "GIT_USER and GIT_TOKEN are required"))
    }
}

/// Regular files matching a glob pattern, in path order
pub fn matching_files(pattern: &str) -> Result<Vec<PathBuf>> {
    let entries = glob::glob(pattern)
        .map_err(|e| EtlError::configuration("file_pattern", format!("{pattern}: {e}")))?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(path) => debug!(path = %path.display(), "Skipping non-file match"),
            // an unreadable directory entry is skipped, not fatal
            Err(e) => warn!(error = %e, "Unreadable path while matching {pattern}"),
        }
    }
    files.sort();
    Ok(files)
}
