//! Discovery of notebook workflows and registry refresh.

use super::builder::WorkflowBuilder;
use super::definition::{DefaultArgs, WorkflowDefinition};
use crate::config::{EtlConfig, FolderLayout};
use crate::error::{EtlError, Result};
use crate::registry::{OrchestrationHost, WorkflowRegistry};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of one [`refresh_registry`] pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshSummary {
    pub registered: Vec<String>,
    pub removed: Vec<String>,
    /// Basenames whose definition failed to build
    pub skipped: Vec<String>,
}

/// Basenames of the notebook files, sorted. Dotfiles and directories are skipped.
pub fn notebook_basenames(layout: &FolderLayout) -> Result<Vec<String>> {
    let entries = std::fs::read_dir(&layout.notebooks).map_err(|e| {
        EtlError::configuration(
            "notebooks",
            format!("cannot list {}: {e}", layout.notebooks.display()),
        )
    })?;

    let mut basenames = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|e| EtlError::io(format!("list {}", layout.notebooks.display()), e))?
            .path();
        let hidden = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('.'));
        if hidden || !path.is_file() {
            continue;
        }
        if let Some(stem) = path.file_stem() {
            basenames.push(stem.to_string_lossy().into_owned());
        }
    }
    basenames.sort();
    basenames.dedup();
    Ok(basenames)
}

/// Build a definition for every notebook
pub fn discover_workflows(config: Arc<EtlConfig>) -> Result<Vec<WorkflowDefinition>> {
    let basenames = notebook_basenames(&config.layout)?;
    let (definitions, _) = build_each(&WorkflowBuilder::new(config), &basenames)?;
    Ok(definitions)
}

/// Register every discovered workflow and drop ids whose notebook is gone
pub fn refresh_registry(registry: &WorkflowRegistry, config: Arc<EtlConfig>) -> Result<RefreshSummary> {
    let basenames = notebook_basenames(&config.layout)?;
    let (definitions, skipped) = build_each(&WorkflowBuilder::new(config), &basenames)?;

    let present: HashSet<String> = basenames.iter().map(|b| super::dag_id_for(b)).collect();
    let removed = registry.retain(|dag_id| present.contains(dag_id));

    let mut registered = Vec::with_capacity(definitions.len());
    for definition in definitions {
        registered.push(definition.dag_id.clone());
        registry.register_workflow(definition)?;
    }

    info!(
        registered = registered.len(),
        removed = removed.len(),
        skipped = skipped.len(),
        "🔄 Workflow registry refreshed"
    );
    Ok(RefreshSummary {
        registered,
        removed,
        skipped,
    })
}

/// A configuration error aborts the pass; any other failure skips that notebook
fn build_each(
    builder: &WorkflowBuilder,
    basenames: &[String],
) -> Result<(Vec<WorkflowDefinition>, Vec<String>)> {
    let schedules = &builder.config().schedules;
    let mut definitions = Vec::with_capacity(basenames.len());
    let mut skipped = Vec::new();

    for basename in basenames {
        match builder.build(basename, schedules, DefaultArgs::for_basename(basename.as_str())) {
            Ok(definition) => definitions.push(definition),
            Err(e) if e.is_configuration_error() => return Err(e),
            Err(e) => {
                warn!(basename = %basename, error = %e, "⚠️ Skipping notebook");
                skipped.push(basename.clone());
            }
        }
    }
    Ok((definitions, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_basenames_skip_dotfiles_and_directories() {
        let dir = tempfile::tempdir().unwrap();
        let layout = FolderLayout::from_root(dir.path());
        fs::create_dir_all(layout.notebooks.join("archive")).unwrap();
        fs::write(layout.notebooks.join("JHU.ipynb"), "{}").unwrap();
        fs::write(layout.notebooks.join("ECDC.ipynb"), "{}").unwrap();
        fs::write(layout.notebooks.join(".ipynb_checkpoints"), "").unwrap();

        assert_eq!(notebook_basenames(&layout).unwrap(), vec!["ECDC", "JHU"]);
    }

    #[test]
    fn test_missing_notebooks_folder_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = notebook_basenames(&FolderLayout::from_root(dir.path())).unwrap_err();
        assert!(err.is_configuration_error());
    }
}
