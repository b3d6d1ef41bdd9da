//! # SQL Statement Utilities
//!
//! Statement splitting, warehouse load statements and the [`SqlBatch`] type that
//! every SQL-executing step hands to the warehouse.
//!
//! Splitting is deliberately naive: scripts are cut on every literal `;`, so a `;`
//! inside a string literal or a comment is treated as a statement boundary.

use crate::constants::quality;
use serde::Serialize;
use std::path::Path;

const COMMIT: &str = "COMMIT";

/// Split a script on every `;`, dropping fragments that are only whitespace
pub fn split_statements(script: &str) -> Vec<String> {
    script
        .split(';')
        .filter(|fragment| !fragment.trim().is_empty())
        .map(|fragment| fragment.to_string())
        .collect()
}

/// Split a QA script, keeping only fragments long enough to be a query
pub fn split_quality_queries(script: &str) -> Vec<String> {
    script
        .split(';')
        .map(str::trim)
        .filter(|fragment| fragment.len() >= quality::MIN_FRAGMENT_LEN)
        .map(|fragment| fragment.to_string())
        .collect()
}

/// Table a CSV file loads into: file stem with `-` replaced by `_`
pub fn table_name_for(file: &Path) -> String {
    file.file_stem()
        .map(|stem| stem.to_string_lossy().replace('-', "_"))
        .unwrap_or_default()
}

/// `COPY INTO` for one staged CSV file
pub fn copy_into_statement(table: &str, stage: &str, file_name: &str) -> String {
    format!(
        "copy into {table} from @{stage}/{file_name} file_format = (type = \"csv\" field_delimiter = \",\" NULL_IF = ('NULL', 'null','') EMPTY_FIELD_AS_NULL = true FIELD_OPTIONALLY_ENCLOSED_BY='\"' skip_header = 1)"
    )
}

/// Truncate-and-copy pairs for each CSV file, in the given order, closed by one
/// `COMMIT`
pub fn load_statements<P: AsRef<Path>>(csv_files: &[P], stage: &str) -> SqlBatch {
    let mut statements = Vec::with_capacity(csv_files.len() * 2 + 1);
    for file in csv_files {
        let file = file.as_ref();
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let table = table_name_for(file);
        statements.push(format!("TRUNCATE TABLE {table}"));
        statements.push(copy_into_statement(&table, stage, &file_name));
    }
    SqlBatch::new(statements).with_commit()
}

/// Ordered statements executed together with autocommit disabled
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SqlBatch {
    statements: Vec<String>,
}

impl SqlBatch {
    pub fn new(statements: Vec<String>) -> Self {
        Self { statements }
    }

    /// Ensure the batch ends with an explicit `COMMIT`
    pub fn with_commit(mut self) -> Self {
        let committed = self
            .statements
            .last()
            .is_some_and(|last| last.trim().eq_ignore_ascii_case(COMMIT));
        if !committed {
            self.statements.push(COMMIT.to_string());
        }
        self
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }
}
