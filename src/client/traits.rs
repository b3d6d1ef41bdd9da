//! # Collaborator Traits
//!
//! The narrow interfaces the step handlers drive. Each external service (notebook
//! runner, object store, warehouse, issue tracker) sits behind one of these so
//! the pipeline can run against real services or in-memory fakes.

use crate::error::Result;
use crate::sql::SqlBatch;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

/// Parameters injected into a notebook run
pub type NotebookParameters = serde_json::Map<String, serde_json::Value>;

/// Runs a notebook to completion
#[async_trait]
pub trait NotebookExecutor: Send + Sync {
    /// Execute the notebook at `input_path`, discarding the executed copy.
    ///
    /// Fails when any cell raises.
    async fn execute(&self, input_path: &Path, parameters: &NotebookParameters) -> Result<()>;
}

/// Uploads local files to a bucket
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Upload one file; `Ok(true)` when the store acknowledged it
    async fn upload(&self, local_path: &Path, bucket: &str, remote_key: &str) -> Result<bool>;
}

/// One result row with named columns
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Row {
    columns: HashMap<String, serde_json::Value>,
}

impl Row {
    pub fn new(columns: HashMap<String, serde_json::Value>) -> Self {
        Self { columns }
    }

    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, serde_json::Value)>,
        K: Into<String>,
    {
        Self::new(pairs.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Column lookup, exact name first, then case-insensitive
    pub fn get(&self, column: &str) -> Option<&serde_json::Value> {
        self.columns.get(column).or_else(|| {
            self.columns
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(column))
                .map(|(_, value)| value)
        })
    }

    /// Column rendered as text; strings unquoted, null as empty
    pub fn get_text(&self, column: &str) -> Option<String> {
        self.get(column).map(|value| match value {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Null => String::new(),
            other => other.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// SQL warehouse connection
#[async_trait]
pub trait Warehouse: Send + Sync {
    /// Execute every statement of the batch in order with autocommit disabled.
    ///
    /// The first failing statement aborts the batch; no rollback is issued.
    async fn run_batch(&self, batch: &SqlBatch) -> Result<()>;

    /// Run one query and return its rows
    async fn query(&self, sql: &str) -> Result<Vec<Row>>;
}

/// Outcome of a best-effort issue filing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueOutcome {
    /// Tracker answered 201
    Created,
    /// Tracker answered with any other status
    Rejected { status: u16, body: String },
    /// Request never got an answer
    Unreachable { message: String },
}

impl IssueOutcome {
    pub fn is_created(&self) -> bool {
        matches!(self, Self::Created)
    }
}

/// Files issues; failures are reported through the outcome, never as errors
#[async_trait]
pub trait IssueTracker: Send + Sync {
    async fn file_issue(&self, title: &str, body: &str, labels: &[&str]) -> IssueOutcome;
}
