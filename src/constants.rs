//! # Workflow Constants
//!
//! Fixed names, defaults and limits shared by the builder, the step handlers and
//! the configuration loader.

use std::time::Duration;

/// Prefix of every workflow identifier (`etl_<basename>`)
pub const WORKFLOW_ID_PREFIX: &str = "etl_";

/// A workflow run is killed by the host after this much wall-clock time
pub const WORKFLOW_TIMEOUT: Duration = Duration::from_secs(60 * 60);

/// At most one active run per workflow definition
pub const MAX_ACTIVE_RUNS: u32 = 1;

/// Owner tag placed in every definition's default args
pub const DEFAULT_OWNER: &str = "admin";

/// Start date offset, in days before construction
pub const START_DATE_DAYS_AGO: i64 = 2;

/// Task identifiers, in pipeline order
pub mod task_ids {
    pub const START: &str = "start";
    pub const CLEANUP: &str = "cleanup";
    pub const EXECUTE_NOTEBOOK: &str = "execute_notebook";
    pub const UPLOAD_TO_STORAGE: &str = "upload_to_s3";
    pub const LOAD_TO_WAREHOUSE: &str = "upload_to_snowflake";
    pub const EXECUTE_SCRIPT_PREFIX: &str = "execute_script_";
    pub const QUALITY_CHECK: &str = "qa_checks";
    pub const END: &str = "end";
}

/// Names of the process-wide variables
pub mod variables {
    pub const GIT_USER: &str = "GIT_USER";
    pub const GIT_TOKEN: &str = "GIT_TOKEN";
    pub const ENVIRONMENT: &str = "ENVIRONMENT";
    pub const AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
    pub const AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
    pub const AWS_REGION: &str = "AWS_REGION";
    pub const S3_BUCKET: &str = "S3_BUCKET";
    pub const SNOWFLAKE_STAGE: &str = "SNOWFLAKE_STAGE";
    pub const SNOWFLAKE_CONNECTION: &str = "SNOWFLAKE_CONNECTION";
    pub const ISSUE_REPOSITORY: &str = "ISSUE_REPOSITORY";
    pub const PAPERMILL_BIN: &str = "PAPERMILL_BIN";

    pub const DEFAULT_SNOWFLAKE_STAGE: &str = "COVID_PROD";
    pub const DEFAULT_SNOWFLAKE_CONNECTION: &str = "SNOWFLAKE";
    pub const DEFAULT_AWS_REGION: &str = "us-east-1";
    pub const DEFAULT_ISSUE_REPOSITORY: &str = "starschema/COVID-19-data";
    pub const DEFAULT_PAPERMILL_BIN: &str = "papermill";

    /// Value of `ENVIRONMENT` that suppresses quality checks
    pub const CI_ENVIRONMENT: &str = "CI";
}

/// Filesystem layout relative to the configured root
pub mod layout {
    pub const NOTEBOOKS_DIR: &str = "notebooks";
    pub const OUTPUT_DIR: &str = "output";
    pub const QA_DIR: &str = "snowflake/qa";
    pub const SQL_DIR: &str = "snowflake/sql";
    pub const SCHEDULES_FILE: &str = "refresh_schedules.json";
    pub const TEMPLATE_PARAMS_FILE: &str = "template_params.json";
    pub const NOTEBOOK_EXTENSION: &str = "ipynb";
    pub const QA_SUFFIX: &str = "_QA.sql";
}

/// Quality-check conventions
pub mod quality {
    /// Fragments of the QA script this short (after trimming) are skipped
    pub const MIN_FRAGMENT_LEN: usize = 6;
    pub const ISSUE_TITLE_PREFIX: &str = "QA Failed for ";
    pub const ISSUE_LABELS: [&str; 2] = ["bug", "qa"];

    pub const TABLE_NAME_COLUMN: &str = "TABLE_NAME";
    pub const ERROR_DESC_COLUMN: &str = "ERROR_DESC";
    pub const ERROR_COUNT_COLUMN: &str = "ERROR_COUNT";
    pub const ERROR_CONDITION_COLUMN: &str = "ERROR_CONDITION";
}
