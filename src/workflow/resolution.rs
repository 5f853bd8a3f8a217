//! Active-workflow resolution.
//!
//! A project can swap in a named workflow override via a small TOML file:
//! a project-local `.tend.toml` wins over the global
//! `<config dir>/tend/workflow.toml`; with neither, the base commands run
//! as-is. Only one override is ever active.

use crate::workflow::extensions;
use crate::workflow::registry::CommandRegistry;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the project-local override file.
pub const LOCAL_FILE: &str = ".tend.toml";

#[derive(Debug, Deserialize)]
struct WorkflowFile {
    workflow: String,
}

/// What resolution decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActiveWorkflow {
    Named(String),
    Base,
}

/// Path of the global override file, when a config directory exists.
pub fn global_file() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("tend").join("workflow.toml"))
}

/// Resolve the active workflow for a project directory.
pub fn resolve(project_dir: &Path) -> ActiveWorkflow {
    resolve_from(&project_dir.join(LOCAL_FILE), global_file().as_deref())
}

/// Resolution against explicit paths. When the local file exists the
/// global one is not consulted, even if the local file is unreadable.
pub fn resolve_from(local: &Path, global: Option<&Path>) -> ActiveWorkflow {
    if local.exists() {
        return read_workflow_file(local);
    }
    if let Some(global) = global {
        if global.exists() {
            return read_workflow_file(global);
        }
    }
    ActiveWorkflow::Base
}

fn read_workflow_file(path: &Path) -> ActiveWorkflow {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!("could not read workflow file {}: {err}", path.display());
            return ActiveWorkflow::Base;
        }
    };
    match toml::from_str::<WorkflowFile>(&text) {
        Ok(file) => ActiveWorkflow::Named(file.workflow),
        Err(err) => {
            tracing::warn!("could not parse workflow file {}: {err}", path.display());
            ActiveWorkflow::Base
        }
    }
}

/// Load a named workflow into the registry. Unknown names are logged and
/// leave the registry untouched.
pub fn use_named(name: &str, registry: &mut CommandRegistry) -> bool {
    for (known, install) in extensions::known_workflows() {
        if *known == name {
            install(registry);
            tracing::debug!("loaded workflow {name:?}");
            return true;
        }
    }
    tracing::warn!("unknown workflow {name:?}; keeping the base commands");
    false
}

/// Resolve and load in one step; returns the loaded name, if any.
pub fn apply(project_dir: &Path, registry: &mut CommandRegistry) -> Option<String> {
    match resolve(project_dir) {
        ActiveWorkflow::Named(name) => use_named(&name, registry).then_some(name),
        ActiveWorkflow::Base => None,
    }
}
