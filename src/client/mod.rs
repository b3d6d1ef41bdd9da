//! # External Service Clients
//!
//! Traits for the services a pipeline drives and the production implementations:
//!
//! - [`PapermillExecutor`] runs notebooks through the papermill CLI
//! - [`S3ObjectStorage`] uploads generated files to S3
//! - [`SnowflakeSqlApi`] executes batches and queries over the Snowflake SQL API
//! - [`GitHubIssueTracker`] files QA failures as GitHub issues

pub mod github;
pub mod papermill;
pub mod s3;
pub mod snowflake;
pub mod traits;

pub use github::GitHubIssueTracker;
pub use papermill::PapermillExecutor;
pub use s3::S3ObjectStorage;
pub use snowflake::SnowflakeSqlApi;
pub use traits::{
    IssueOutcome, IssueTracker, NotebookExecutor, NotebookParameters, ObjectStorage, Row,
    Warehouse,
};
