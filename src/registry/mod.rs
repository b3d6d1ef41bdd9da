//! # Workflow Registry
//!
//! The host-facing surface: an [`OrchestrationHost`] accepts workflow
//! definitions, and [`WorkflowRegistry`] is the in-process host keyed by
//! workflow id.
//!
//! The registry is a concurrent map, so lookups stay safe while a refresh is
//! registering definitions.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use notebook_etl::config::ConfigManager;
//! use notebook_etl::registry::WorkflowRegistry;
//! use notebook_etl::workflow::refresh_registry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigManager::load("/opt/covid-etl", None)?;
//! let registry = WorkflowRegistry::global();
//! refresh_registry(registry, config)?;
//! let workflow = registry.get("etl_JHU_COVID-19");
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::logging::log_workflow_operation;
use crate::workflow::WorkflowDefinition;
use dashmap::DashMap;
use std::sync::{Arc, OnceLock};

static GLOBAL_REGISTRY: OnceLock<WorkflowRegistry> = OnceLock::new();

/// Anything that can accept workflow definitions for scheduling
pub trait OrchestrationHost: Send + Sync {
    /// Register (or replace) the definition under its `dag_id`
    fn register_workflow(&self, definition: WorkflowDefinition) -> Result<()>;
}

/// Workflow definitions keyed by workflow id
#[derive(Debug, Default)]
pub struct WorkflowRegistry {
    workflows: DashMap<String, Arc<WorkflowDefinition>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide registry
    pub fn global() -> &'static WorkflowRegistry {
        GLOBAL_REGISTRY.get_or_init(WorkflowRegistry::new)
    }

    pub fn get(&self, dag_id: &str) -> Option<Arc<WorkflowDefinition>> {
        self.workflows.get(dag_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Registered ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.workflows.iter().map(|entry| entry.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn remove(&self, dag_id: &str) -> Option<Arc<WorkflowDefinition>> {
        let removed = self.workflows.remove(dag_id).map(|(_, definition)| definition);
        if removed.is_some() {
            log_workflow_operation("unregister", dag_id, "removed", None);
        }
        removed
    }

    /// Drop every id for which `keep` is false; returns the dropped ids, sorted
    pub fn retain(&self, keep: impl Fn(&str) -> bool) -> Vec<String> {
        let stale: Vec<String> = self
            .ids()
            .into_iter()
            .filter(|dag_id| !keep(dag_id))
            .collect();
        for dag_id in &stale {
            self.remove(dag_id);
        }
        stale
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

impl OrchestrationHost for WorkflowRegistry {
    fn register_workflow(&self, definition: WorkflowDefinition) -> Result<()> {
        let dag_id = definition.dag_id.clone();
        let replaced = self
            .workflows
            .insert(dag_id.clone(), Arc::new(definition))
            .is_some();
        log_workflow_operation(
            "register",
            &dag_id,
            if replaced { "replaced" } else { "registered" },
            None,
        );
        Ok(())
    }
}
