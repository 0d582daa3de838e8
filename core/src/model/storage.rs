use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::manifest::SnapshotManifest;
use super::policy::{Policy, RepositoryActionsToggle};

pub type PolicyMap = HashMap<PathBuf, Policy>;

/// Everything persisted for a single repository: the default actions toggle, the full set of
/// per-path policy overrides keyed by the source path they were configured against, and the
/// manifest history accumulated across snapshot attempts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VaultState {
    #[serde(default)]
    pub repository_actions: RepositoryActionsToggle,
    #[serde(default)]
    pub policies: PolicyMap,
    #[serde(default)]
    pub manifests: Vec<SnapshotManifest>,
}

/// Loads repository state from `path`, returning a fresh default if the file does not exist yet.
pub fn load_vault_state(path: &Path) -> Result<VaultState> {
    if !path.exists() {
        return Ok(VaultState::default());
    }

    let file = File::open(path).with_context(|| format!("failed to open state file {}", path.display()))?;
    let reader = BufReader::new(file);
    serde_json::from_reader(reader).with_context(|| format!("failed to parse state file {}", path.display()))
}

/// Writes `state` to `path`, creating the parent directory if necessary.
pub fn store_vault_state(path: &Path, state: &VaultState) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let file = File::create(path).with_context(|| format!("failed to create state file {}", path.display()))?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, state).with_context(|| format!("failed to write state file {}", path.display()))
}
