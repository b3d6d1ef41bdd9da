//! # ETL Configuration System
//!
//! Everything the workflow builder reads from the outside world is gathered into one
//! immutable [`EtlConfig`], built once at process start and shared by reference.
//!
//! ## Sources
//!
//! - **Variables**: process-wide key/value settings (credentials, bucket, stage,
//!   warehouse connection profiles), layered from an optional TOML file and the
//!   process environment. See [`variables`].
//! - **Schedule table**: `refresh_schedules.json` under the layout root.
//! - **Template parameters**: `snowflake/sql/template_params.json`.
//!
//! A missing or malformed schedule table or template parameter file is a
//! configuration error and aborts workflow construction.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use notebook_etl::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigManager::load("/opt/covid-etl", None)?;
//! let notebook = config.layout.notebook_file("JHU_COVID-19");
//! let schedule = config.schedules.schedule_for("JHU_COVID-19");
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schedules;
pub mod variables;

use crate::constants::layout;
use glob::Pattern;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub use loader::ConfigManager;
pub use schedules::ScheduleTable;
pub use variables::{ConnectionProfile, Variables};

pub use crate::template::TemplateParams;

/// Directory layout of an ETL checkout
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderLayout {
    pub root: PathBuf,
    pub notebooks: PathBuf,
    pub output: PathBuf,
    pub qa: PathBuf,
    pub sql: PathBuf,
    pub schedules_file: PathBuf,
    pub template_params_file: PathBuf,
}

impl FolderLayout {
    /// Derive every folder from the layout root
    pub fn from_root(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let sql = root.join(layout::SQL_DIR);
        Self {
            notebooks: root.join(layout::NOTEBOOKS_DIR),
            output: root.join(layout::OUTPUT_DIR),
            qa: root.join(layout::QA_DIR),
            schedules_file: root.join(layout::SCHEDULES_FILE),
            template_params_file: sql.join(layout::TEMPLATE_PARAMS_FILE),
            sql,
            root,
        }
    }

    /// `notebooks/<basename>.ipynb`
    pub fn notebook_file(&self, basename: &str) -> PathBuf {
        self.notebooks
            .join(format!("{basename}.{}", layout::NOTEBOOK_EXTENSION))
    }

    /// `snowflake/qa/<basename>_QA.sql`
    pub fn qa_file(&self, basename: &str) -> PathBuf {
        self.qa.join(format!("{basename}{}", layout::QA_SUFFIX))
    }

    /// Pattern for every generated output file: `output/<basename>*`
    pub fn output_pattern(&self, basename: &str) -> String {
        prefix_pattern(&self.output, basename, "*")
    }

    /// Pattern for generated CSV files: `output/<basename>*.csv`
    pub fn csv_pattern(&self, basename: &str) -> String {
        prefix_pattern(&self.output, basename, "*.csv")
    }

    /// Pattern for transformation scripts: `snowflake/sql/<basename>*.sql`
    pub fn sql_pattern(&self, basename: &str) -> String {
        prefix_pattern(&self.sql, basename, "*.sql")
    }
}

/// Escape the literal part so folder or notebook names containing `[` or `*`
/// still match only themselves.
fn prefix_pattern(dir: &Path, basename: &str, suffix: &str) -> String {
    let dir = Pattern::escape(&dir.to_string_lossy());
    let basename = Pattern::escape(basename);
    format!("{dir}/{basename}{suffix}")
}

/// Immutable process-wide configuration handed to the builder and step handlers
#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub layout: FolderLayout,
    pub variables: Variables,
    pub schedules: ScheduleTable,
    pub template_params: TemplateParams,
}

impl EtlConfig {
    pub fn new(
        layout: FolderLayout,
        variables: Variables,
        schedules: ScheduleTable,
        template_params: TemplateParams,
    ) -> Self {
        Self {
            layout,
            variables,
            schedules,
            template_params,
        }
    }

    /// Quality checks run only when a QA script exists, tracker credentials are
    /// configured, and the environment is not CI.
    pub fn quality_checks_enabled(&self, basename: &str) -> bool {
        self.layout.qa_file(basename).is_file()
            && self.variables.git_credentials().is_some()
            && !self.variables.is_ci()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = FolderLayout::from_root("/srv/etl");

        assert_eq!(
            layout.notebook_file("JHU_COVID-19"),
            PathBuf::from("/srv/etl/notebooks/JHU_COVID-19.ipynb")
        );
        assert_eq!(
            layout.qa_file("JHU_COVID-19"),
            PathBuf::from("/srv/etl/snowflake/qa/JHU_COVID-19_QA.sql")
        );
        assert_eq!(
            layout.template_params_file,
            PathBuf::from("/srv/etl/snowflake/sql/template_params.json")
        );
        assert_eq!(
            layout.schedules_file,
            PathBuf::from("/srv/etl/refresh_schedules.json")
        );
    }

    #[test]
    fn test_patterns_escape_metacharacters() {
        let layout = FolderLayout::from_root("/srv/etl");
        assert_eq!(layout.output_pattern("JHU"), "/srv/etl/output/JHU*");
        assert_eq!(layout.csv_pattern("JHU"), "/srv/etl/output/JHU*.csv");
        assert_eq!(layout.sql_pattern("JHU"), "/srv/etl/snowflake/sql/JHU*.sql");
        assert_eq!(layout.output_pattern("a[1]"), "/srv/etl/output/a[[]1[]]*");
    }
}
