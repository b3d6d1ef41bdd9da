//! Shared fixtures for the integration tests: a temporary ETL checkout and
//! in-memory collaborators.

#![allow(dead_code)]

use async_trait::async_trait;
use notebook_etl::client::{
    IssueOutcome, IssueTracker, NotebookExecutor, NotebookParameters, ObjectStorage, Row, Warehouse,
};
use notebook_etl::config::{ConfigManager, EtlConfig};
use notebook_etl::error::{EtlError, Result};
use notebook_etl::sql::SqlBatch;
use notebook_etl::step_handlers::TaskServices;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Temporary layout root with the two JSON resources in place
pub struct EtlCheckout {
    dir: TempDir,
    env: HashMap<String, String>,
}

impl EtlCheckout {
    pub fn new() -> Self {
        let checkout = Self {
            dir: tempfile::tempdir().expect("tempdir"),
            env: HashMap::new(),
        };
        checkout.write("refresh_schedules.json", r#"{"recurring": {"JHU": "0 */4 * * *"}}"#);
        checkout.write("snowflake/sql/template_params.json", r#"{"database": "COVID19"}"#);
        checkout
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        fs::write(&path, contents).expect("write fixture");
        path
    }

    pub fn notebook(self, basename: &str) -> Self {
        self.write(&format!("notebooks/{basename}.ipynb"), "{}");
        self
    }

    pub fn script(self, file_name: &str, sql: &str) -> Self {
        self.write(&format!("snowflake/sql/{file_name}"), sql);
        self
    }

    pub fn qa_script(self, basename: &str, sql: &str) -> Self {
        self.write(&format!("snowflake/qa/{basename}_QA.sql"), sql);
        self
    }

    pub fn var(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    /// Tracker credentials, enough to open the quality-check gate
    pub fn with_git_credentials(self) -> Self {
        self.var("GIT_USER", "qa-bot").var("GIT_TOKEN", "t0ken")
    }

    pub fn config(&self) -> Arc<EtlConfig> {
        ConfigManager::load_with_environment(self.root(), None, self.env.clone())
            .expect("fixture configuration loads")
    }
}

#[derive(Default)]
pub struct FakeNotebook {
    /// Files the "notebook" writes into its output folder
    pub produces: Vec<String>,
}

#[async_trait]
impl NotebookExecutor for FakeNotebook {
    async fn execute(&self, _input_path: &Path, parameters: &NotebookParameters) -> Result<()> {
        let folder = parameters["output_folder"].as_str().unwrap_or_default().to_string();
        fs::create_dir_all(&folder).map_err(|e| EtlError::io("create output", e))?;
        for name in &self.produces {
            fs::write(format!("{folder}{name}"), "a,b\n1,2\n")
                .map_err(|e| EtlError::io("write output", e))?;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct FakeStorage {
    pub keys: Mutex<Vec<String>>,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn upload(&self, _local_path: &Path, _bucket: &str, remote_key: &str) -> Result<bool> {
        self.keys.lock().unwrap().push(remote_key.to_string());
        Ok(true)
    }
}

#[derive(Default)]
pub struct FakeWarehouse {
    pub batches: Mutex<Vec<SqlBatch>>,
    pub rows: Vec<Row>,
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn run_batch(&self, batch: &SqlBatch) -> Result<()> {
        self.batches.lock().unwrap().push(batch.clone());
        Ok(())
    }

    async fn query(&self, _sql: &str) -> Result<Vec<Row>> {
        Ok(self.rows.clone())
    }
}

#[derive(Default)]
pub struct FakeTracker {
    pub titles: Mutex<Vec<String>>,
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn file_issue(&self, title: &str, _body: &str, _labels: &[&str]) -> IssueOutcome {
        self.titles.lock().unwrap().push(title.to_string());
        IssueOutcome::Created
    }
}

pub struct Fakes {
    pub storage: Arc<FakeStorage>,
    pub warehouse: Arc<FakeWarehouse>,
    pub tracker: Arc<FakeTracker>,
}

/// Services backed entirely by in-memory fakes
pub fn fake_services(config: Arc<EtlConfig>, notebook: FakeNotebook, rows: Vec<Row>) -> (TaskServices, Fakes) {
    let fakes = Fakes {
        storage: Arc::new(FakeStorage::default()),
        warehouse: Arc::new(FakeWarehouse {
            rows,
            ..FakeWarehouse::default()
        }),
        tracker: Arc::new(FakeTracker::default()),
    };
    let services = TaskServices::new(config, Arc::new(notebook))
        .with_storage(fakes.storage.clone())
        .with_warehouse(fakes.warehouse.clone())
        .with_issue_tracker(fakes.tracker.clone());
    (services, fakes)
}
