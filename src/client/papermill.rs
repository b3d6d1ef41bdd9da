//! Notebook execution through the `papermill` command line.

use super::traits::{NotebookExecutor, NotebookParameters};
use crate::error::{EtlError, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Executed notebooks are not kept
const DISCARD_OUTPUT: &str = "/dev/null";

/// Keep this much of stderr in the error message
const STDERR_TAIL: usize = 4096;

#[derive(Debug, Clone)]
pub struct PapermillExecutor {
    program: PathBuf,
}

impl PapermillExecutor {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Command line for one run: output discarded, cell output logged, report mode
    pub fn command_args(input_path: &Path, parameters: &NotebookParameters) -> Result<Vec<String>> {
        // papermill reads -y as YAML, and JSON is valid YAML
        let parameters = serde_json::to_string(parameters).map_err(|e| {
            EtlError::NotebookExecution {
                path: input_path.to_path_buf(),
                message: format!("failed to encode parameters: {e}"),
            }
        })?;

        Ok(vec![
            input_path.display().to_string(),
            DISCARD_OUTPUT.to_string(),
            "-y".to_string(),
            parameters,
            "--log-output".to_string(),
            "--report-mode".to_string(),
        ])
    }
}

#[async_trait]
impl NotebookExecutor for PapermillExecutor {
    async fn execute(&self, input_path: &Path, parameters: &NotebookParameters) -> Result<()> {
        let args = Self::command_args(input_path, parameters)?;
        let failed = |message: String| EtlError::NotebookExecution {
            path: input_path.to_path_buf(),
            message,
        };

        debug!(
            program = %self.program.display(),
            notebook = %input_path.display(),
            "Spawning papermill"
        );

        // a task timeout drops this future; papermill goes with it
        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| failed(format!("failed to spawn {}: {e}", self.program.display())))?;

        // papermill writes cell output to stderr with --log-output
        let mut tail = StderrTail::default();
        if let Some(stderr) = child.stderr.take() {
            let mut lines = BufReader::new(stderr).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        debug!(notebook = %input_path.display(), "{line}");
                        tail.push(line);
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(error = %e, "Error reading papermill stderr");
                        break;
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| failed(format!("failed to wait for papermill: {e}")))?;

        if status.success() {
            info!(notebook = %input_path.display(), "📓 Notebook executed");
            Ok(())
        } else {
            warn!(
                notebook = %input_path.display(),
                status = ?status.code(),
                "❌ Notebook execution failed"
            );
            Err(failed(format!(
                "papermill exited with {status}: {}",
                tail.text().trim()
            )))
        }
    }
}

/// Last lines of stderr, at most [`STDERR_TAIL`] bytes
#[derive(Debug, Default)]
struct StderrTail {
    lines: VecDeque<String>,
    bytes: usize,
}

impl StderrTail {
    fn push(&mut self, line: String) {
        self.bytes += line.len() + 1;
        self.lines.push_back(line);
        while self.bytes > STDERR_TAIL && self.lines.len() > 1 {
            if let Some(dropped) = self.lines.pop_front() {
                self.bytes -= dropped.len() + 1;
            }
        }
    }

    fn text(&self) -> String {
        self.lines.iter().map(String::as_str).collect::<Vec<_>>().join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parameters() -> NotebookParameters {
        let mut parameters = NotebookParameters::new();
        parameters.insert("output_folder".to_string(), json!("/srv/etl/output/"));
        parameters.insert("GIT_USER".to_string(), serde_json::Value::Null);
        parameters
    }

    #[test]
    fn test_command_args() {
        let args =
            PapermillExecutor::command_args(Path::new("/srv/etl/notebooks/JHU.ipynb"), &parameters())
                .unwrap();

        assert_eq!(args[0], "/srv/etl/notebooks/JHU.ipynb");
        assert_eq!(args[1], "/dev/null");
        assert_eq!(args[2], "-y");
        let decoded: serde_json::Value = serde_json::from_str(&args[3]).unwrap();
        assert_eq!(decoded["output_folder"], "/srv/etl/output/");
        assert!(decoded["GIT_USER"].is_null());
        assert_eq!(&args[4..], &["--log-output", "--report-mode"]);
    }

    #[test]
    fn test_stderr_tail_keeps_latest_lines() {
        let mut tail = StderrTail::default();
        for i in 0..2000 {
            tail.push(format!("cell output line {i}"));
        }

        assert!(tail.bytes <= STDERR_TAIL);
        assert!(tail.text().ends_with("cell output line 1999"));
        assert!(!tail.text().contains("cell output line 0\n"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failure_reports_streamed_stderr() {
        // sh reads the "notebook" as a script; the papermill arguments become $1..
        let dir = tempfile::tempdir().unwrap();
        let notebook = dir.path().join("JHU.ipynb");
        std::fs::write(
            &notebook,
            "echo 'Executing cell 1' >&2\necho 'ZeroDivisionError' >&2\nexit 1\n",
        )
        .unwrap();

        let err = PapermillExecutor::new("sh")
            .execute(&notebook, &parameters())
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("Executing cell 1\nZeroDivisionError"), "{message}");
    }

    #[tokio::test]
    async fn test_missing_program_is_execution_error() {
        let executor = PapermillExecutor::new("/nonexistent/papermill-binary");
        let err = executor
            .execute(Path::new("/tmp/nb.ipynb"), &parameters())
            .await
            .unwrap_err();
        assert!(matches!(err, EtlError::NotebookExecution { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_is_execution_error() {
        let executor = PapermillExecutor::new("false");
        let err = executor
            .execute(Path::new("/tmp/nb.ipynb"), &parameters())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("papermill exited"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit_succeeds() {
        let executor = PapermillExecutor::new("true");
        executor
            .execute(Path::new("/tmp/nb.ipynb"), &parameters())
            .await
            .unwrap();
    }
}
