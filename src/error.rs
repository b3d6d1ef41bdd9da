//! # ETL Error Types
//!
//! Structured error handling for workflow construction and task execution.
//!
//! Errors fall into two groups:
//!
//! - **Configuration errors** abort workflow construction entirely. They are raised
//!   while loading variables, the schedule table or the template parameters.
//! - **Task errors** surface from `TaskNode::run` and are reported to the host as
//!   a task failure. Retrying them is the host's business.
//!
//! Issue-tracker failures never appear here; see `client::IssueOutcome`.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Configuration error: {component}: {message}")]
    Configuration { component: String, message: String },

    #[error("Failed to read configuration file {path}: {source}")]
    ConfigFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Variable {name} is not configured")]
    MissingVariable { name: String },

    #[error("Notebook not found for basename '{basename}' at {path}")]
    NotebookNotFound { basename: String, path: PathBuf },

    #[error("Notebook execution failed: {path}: {message}")]
    NotebookExecution { path: PathBuf, message: String },

    #[error("Object storage error: {operation}: {message}")]
    Storage { operation: String, message: String },

    #[error("Warehouse error: {operation}: {message}")]
    Warehouse { operation: String, message: String },

    #[error("Template rendering failed for {template}: {message}")]
    Template { template: String, message: String },

    #[error("Unknown task '{task_id}' in workflow {dag_id}")]
    UnknownTask { dag_id: String, task_id: String },

    #[error("Task {task_id} timed out after {}s", .timeout.as_secs())]
    Timeout { task_id: String, timeout: Duration },

    #[error("I/O error: {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },
}

impl EtlError {
    /// Create a configuration error
    pub fn configuration(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a missing variable error
    pub fn missing_variable(name: impl Into<String>) -> Self {
        Self::MissingVariable { name: name.into() }
    }

    /// Create an object storage error
    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Storage {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a warehouse error
    pub fn warehouse(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Warehouse {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a template rendering error
    pub fn template(template: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Template {
            template: template.into(),
            message: message.into(),
        }
    }

    /// Wrap an I/O error with the operation that caused it
    pub fn io(operation: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            source,
        }
    }

    /// Whether this error should abort workflow construction
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::Configuration { .. } | Self::ConfigFile { .. }
        )
    }
}

impl From<config::ConfigError> for EtlError {
    fn from(err: config::ConfigError) -> Self {
        Self::configuration("variables", err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_errors_abort_construction() {
        let err = EtlError::configuration("schedules", "missing recurring key");
        assert!(err.is_configuration_error());
        assert_eq!(
            err.to_string(),
            "Configuration error: schedules: missing recurring key"
        );

        let err = EtlError::missing_variable("S3_BUCKET");
        assert!(!err.is_configuration_error());
        assert_eq!(err.to_string(), "Variable S3_BUCKET is not configured");
    }

    #[test]
    fn test_timeout_display() {
        let err = EtlError::Timeout {
            task_id: "execute_notebook".to_string(),
            timeout: Duration::from_secs(3600),
        };
        assert_eq!(err.to_string(), "Task execute_notebook timed out after 3600s");
    }
}
