//! Refresh schedule table (`refresh_schedules.json`).
//!
//! ```json
//! { "recurring": { "JHU_COVID-19": "0 */4 * * *" } }
//! ```
//!
//! Notebooks absent from `recurring` get no automatic trigger.

use crate::error::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScheduleTable {
    recurring: HashMap<String, Option<String>>,
}

impl ScheduleTable {
    pub fn from_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            recurring: entries
                .into_iter()
                .map(|(k, v)| (k.into(), Some(v.into())))
                .collect(),
        }
    }

    /// Parse the schedule table; a document without `recurring` is rejected
    pub fn from_json(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| EtlError::configuration("refresh_schedules", e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| EtlError::ConfigFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    /// Cron-like expression for a notebook, `None` means manual trigger only
    pub fn schedule_for(&self, basename: &str) -> Option<&str> {
        self.recurring.get(basename).and_then(|s| s.as_deref())
    }

    pub fn len(&self) -> usize {
        self.recurring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recurring.is_empty()
    }
}
