pub mod policy;
pub mod repository;
pub mod retention;
pub mod snapshot;

use std::path::{Path, PathBuf};

use anyhow::Result;
use vaultkeep_core::model::{load_vault_state, store_vault_state, VaultState};

const STATE_FILE_NAME: &str = "vaultkeep-state.json";

pub fn state_path(repository: &Path) -> PathBuf {
    repository.join(STATE_FILE_NAME)
}

pub fn load_state(repository: &Path) -> Result<VaultState> {
    load_vault_state(&state_path(repository))
}

pub fn store_state(repository: &Path, state: &VaultState) -> Result<()> {
    store_vault_state(&state_path(repository), state)
}
