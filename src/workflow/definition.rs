//! Workflow definitions: the declarative graph handed to the orchestration host.

use crate::constants::{DEFAULT_OWNER, START_DATE_DAYS_AGO};
use crate::error::Result;
use crate::logging::log_task_operation;
use crate::step_handlers::{
    CleanupHandler, NotebookHandler, QualityCheckHandler, SqlScriptHandler, StepHandler,
    StorageUploadHandler, TaskOutcome, TaskServices, WarehouseLoadHandler,
};
use chrono::{DateTime, Duration as ChronoDuration, NaiveTime, TimeZone, Utc};
use serde::{Serialize, Serializer};
use std::time::{Duration, Instant};
use tracing::error;
use uuid::Uuid;

/// Arguments every task of a definition inherits
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DefaultArgs {
    pub owner: String,
    pub start_date: DateTime<Utc>,
    pub basename: String,
}

impl DefaultArgs {
    /// Owner `admin`, start date at midnight UTC two days ago
    pub fn for_basename(basename: impl Into<String>) -> Self {
        let day = (Utc::now() - ChronoDuration::days(START_DATE_DAYS_AGO)).date_naive();
        Self {
            owner: DEFAULT_OWNER.to_string(),
            start_date: Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)),
            basename: basename.into(),
        }
    }
}

/// What a task node does when the host runs it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Operator {
    Marker,
    Cleanup(CleanupHandler),
    ExecuteNotebook(NotebookHandler),
    UploadToStorage(StorageUploadHandler),
    LoadToWarehouse(WarehouseLoadHandler),
    ExecuteSqlScript(SqlScriptHandler),
    QualityCheck(QualityCheckHandler),
}

impl Operator {
    fn handler(&self) -> Option<&dyn StepHandler> {
        match self {
            Self::Marker => None,
            Self::Cleanup(handler) => Some(handler),
            Self::ExecuteNotebook(handler) => Some(handler),
            Self::UploadToStorage(handler) => Some(handler),
            Self::LoadToWarehouse(handler) => Some(handler),
            Self::ExecuteSqlScript(handler) => Some(handler),
            Self::QualityCheck(handler) => Some(handler),
        }
    }

    pub fn name(&self) -> &'static str {
        self.handler()
            .map(|handler| handler.handler_name())
            .unwrap_or("marker")
    }
}

/// One node of a workflow graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskNode {
    pub task_id: String,
    /// Tasks that must succeed before this one starts
    pub upstream: Vec<String>,
    pub operator: Operator,
}

impl TaskNode {
    pub fn new(task_id: impl Into<String>, upstream: Vec<String>, operator: Operator) -> Self {
        Self {
            task_id: task_id.into(),
            upstream,
            operator,
        }
    }

    /// Run this node alone. Upstream tasks are the host's concern.
    pub async fn run(&self, dag_id: &str, services: &TaskServices) -> Result<TaskOutcome> {
        let run_id = Uuid::new_v4().to_string();
        let started = Instant::now();
        log_task_operation("run", dag_id, &self.task_id, &run_id, "started", Some(self.operator.name()));

        let result = match self.operator.handler() {
            Some(handler) => handler.handle(services).await,
            None => Ok(TaskOutcome::Marker),
        };

        let elapsed = format!("{}ms", started.elapsed().as_millis());
        match &result {
            Ok(_) => log_task_operation("run", dag_id, &self.task_id, &run_id, "succeeded", Some(&elapsed)),
            Err(e) => {
                error!(dag_id = %dag_id, task_id = %self.task_id, run_id = %run_id, error = %e, "❌ Task failed");
                log_task_operation("run", dag_id, &self.task_id, &run_id, "failed", Some(&elapsed));
            }
        }
        result
    }
}

/// A fully wired workflow for one notebook
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowDefinition {
    pub dag_id: String,
    pub basename: String,
    /// Cron expression; `None` runs only when triggered
    pub schedule: Option<String>,
    pub max_active_runs: u32,
    #[serde(rename = "timeout_seconds", serialize_with = "serialize_secs")]
    pub timeout: Duration,
    pub default_args: DefaultArgs,
    /// In attachment order
    pub tasks: Vec<TaskNode>,
}

impl WorkflowDefinition {
    pub fn task(&self, task_id: &str) -> Option<&TaskNode> {
        self.tasks.iter().find(|task| task.task_id == task_id)
    }

    pub fn task_ids(&self) -> Vec<&str> {
        self.tasks.iter().map(|task| task.task_id.as_str()).collect()
    }

    /// `(upstream, downstream)` pairs
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.tasks
            .iter()
            .flat_map(|task| {
                task.upstream
                    .iter()
                    .map(move |up| (up.as_str(), task.task_id.as_str()))
            })
            .collect()
    }

    pub fn upstream_of(&self, task_id: &str) -> Vec<&str> {
        self.task(task_id)
            .map(|task| task.upstream.iter().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn downstream_of(&self, task_id: &str) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|task| task.upstream.iter().any(|up| up == task_id))
            .map(|task| task.task_id.as_str())
            .collect()
    }
}

fn serialize_secs<S: Serializer>(timeout: &Duration, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_u64(timeout.as_secs())
}
