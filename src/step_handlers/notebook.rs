//! Runs the notebook that produces the workflow's output files.

use super::{StepHandler, TaskOutcome, TaskServices};
use crate::client::NotebookParameters;
use crate::config::EtlConfig;
use crate::constants::variables as keys;
use crate::error::{EtlError, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotebookHandler {
    pub notebook: PathBuf,
}

impl NotebookHandler {
    pub fn new(notebook: impl Into<PathBuf>) -> Self {
        Self {
            notebook: notebook.into(),
        }
    }

    /// `output_folder` keeps its trailing separator; notebooks join file names onto it
    pub fn parameters(config: &EtlConfig) -> NotebookParameters {
        let optional = |value: &Option<String>| {
            value.clone().map(Value::String).unwrap_or(Value::Null)
        };

        let mut parameters = NotebookParameters::new();
        parameters.insert(
            "output_folder".to_string(),
            Value::String(format!(
                "{}{}",
                config.layout.output.display(),
                std::path::MAIN_SEPARATOR
            )),
        );
        parameters.insert(keys::GIT_USER.to_string(), optional(&config.variables.git_user));
        parameters.insert(keys::GIT_TOKEN.to_string(), optional(&config.variables.git_token));
        parameters
    }
}

#[async_trait]
impl StepHandler for NotebookHandler {
    async fn handle(&self, services: &TaskServices) -> Result<TaskOutcome> {
        if !self.notebook.is_file() {
            return Err(EtlError::NotebookExecution {
                path: self.notebook.clone(),
                message: "notebook file does not exist".to_string(),
            });
        }

        let parameters = Self::parameters(services.config());
        services
            .notebook_executor()
            .execute(&self.notebook, &parameters)
            .await?;

        info!(notebook = %self.notebook.display(), "📓 Notebook run complete");
        Ok(TaskOutcome::NotebookExecuted)
    }

    fn handler_name(&self) -> &'static str {
        "execute_notebook"
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::config::Variables;
    use std::fs;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_passes_output_folder_and_credentials() {
        let dir = tempfile::tempdir().unwrap();
        let notebook = Arc::new(RecordingNotebook::default());
        let variables = Variables {
            git_user: Some("qa-bot".to_string()),
            ..Variables::default()
        };
        let services = TaskServices::new(config_for(dir.path(), variables), notebook.clone());
        let path = services.config().layout.notebook_file("JHU");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{}").unwrap();

        let outcome = NotebookHandler::new(&path).handle(&services).await.unwrap();
        assert_eq!(outcome, TaskOutcome::NotebookExecuted);

        let calls = notebook.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        let (called_path, parameters) = &calls[0];
        assert_eq!(called_path, &path);
        let output_folder = parameters["output_folder"].as_str().unwrap();
        assert!(output_folder.ends_with(std::path::MAIN_SEPARATOR));
        assert!(output_folder.starts_with(&dir.path().join("output").display().to_string()));
        assert_eq!(parameters["GIT_USER"], "qa-bot");
        assert!(parameters["GIT_TOKEN"].is_null());
    }

    #[tokio::test]
    async fn test_executor_failure_propagates() {
        let dir = tempfile::tempdir().unwrap();
        let notebook = Arc::new(RecordingNotebook {
            fail: true,
            ..RecordingNotebook::default()
        });
        let services = TaskServices::new(config_for(dir.path(), Variables::default()), notebook);
        let path = dir.path().join("JHU.ipynb");
        fs::write(&path, "{}").unwrap();

        let err = NotebookHandler::new(&path).handle(&services).await.unwrap_err();
        assert!(matches!(err, EtlError::NotebookExecution { .. }));
    }

    #[tokio::test]
    async fn test_missing_notebook_fails_without_calling_executor() {
        let dir = tempfile::tempdir().unwrap();
        let notebook = Arc::new(RecordingNotebook::default());
        let services = TaskServices::new(config_for(dir.path(), Variables::default()), notebook.clone());

        let err = NotebookHandler::new(dir.path().join("gone.ipynb"))
            .handle(&services)
            .await
            .unwrap_err();
        assert!(matches!(err, EtlError::NotebookExecution { .. }));
        assert!(notebook.calls.lock().unwrap().is_empty());
    }
}
