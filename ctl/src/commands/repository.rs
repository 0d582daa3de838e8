use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use comfy_table::Cell;
use vaultkeep_core::model::{RepositoryActionsToggle, VaultState};

use crate::ui::print_comfy_info;

use super::{load_state, state_path, store_state};

#[derive(Parser, Debug)]
pub struct RepositoryCreateOptions {
    /// Directory the repository's state is persisted under
    repository: PathBuf,

    /// Enable hooks by default for every snapshot attempt against this repository
    #[clap(long, conflicts_with = "no_enable_actions")]
    enable_actions: bool,

    /// Keep hooks disabled by default (the repository default anyway, named for clarity)
    #[clap(long)]
    no_enable_actions: bool,
}

#[derive(Parser, Debug)]
pub struct RepositoryConnectOptions {
    /// Directory an existing repository's state is persisted under
    repository: PathBuf,

    #[clap(long, conflicts_with = "no_enable_actions")]
    enable_actions: bool,

    #[clap(long)]
    no_enable_actions: bool,
}

fn toggle_from_flags(enable: bool, disable: bool) -> RepositoryActionsToggle {
    match (enable, disable) {
        (true, _) => RepositoryActionsToggle::Enabled,
        (_, true) => RepositoryActionsToggle::Disabled,
        _ => RepositoryActionsToggle::Default,
    }
}

pub fn create(options: RepositoryCreateOptions) -> Result<()> {
    if state_path(&options.repository).exists() {
        bail!("a repository already exists at {}", options.repository.display());
    }

    let state = VaultState {
        repository_actions: toggle_from_flags(options.enable_actions, options.no_enable_actions),
        ..Default::default()
    };
    store_state(&options.repository, &state)?;

    print_comfy_info(vec![
        (
            Cell::new("repository"),
            Cell::new(options.repository.display().to_string()).into(),
        ),
        (Cell::new("actions"), Cell::new(state.repository_actions.to_string()).into()),
    ]);
    Ok(())
}

pub fn connect(options: RepositoryConnectOptions) -> Result<()> {
    if !state_path(&options.repository).exists() {
        bail!("no repository found at {}", options.repository.display());
    }

    let mut state = load_state(&options.repository)?;
    if options.enable_actions || options.no_enable_actions {
        state.repository_actions = toggle_from_flags(options.enable_actions, options.no_enable_actions);
        store_state(&options.repository, &state)?;
    }

    print_comfy_info(vec![
        (
            Cell::new("repository"),
            Cell::new(options.repository.display().to_string()).into(),
        ),
        (Cell::new("actions"), Cell::new(state.repository_actions.to_string()).into()),
        (Cell::new("policies"), Cell::new(state.policies.len().to_string()).into()),
        (Cell::new("manifests"), Cell::new(state.manifests.len().to_string()).into()),
    ]);
    Ok(())
}
