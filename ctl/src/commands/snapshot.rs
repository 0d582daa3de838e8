use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Parser;
use uuid::Uuid;
use vaultkeep_core::clock::{Clock, SystemClock};
use vaultkeep_core::core::{
    actions_enabled, ContentHashCapture, HookRunner, InvocationActionsOverride, PolicyStore, SnapshotDriver,
    SnapshotRequest,
};
use vaultkeep_core::model::{PolicyMap, SnapshotManifest};
use vaultkeep_core::sys::process::TokioProcessRunner;

use super::{load_state, store_state};

#[derive(Parser, Debug)]
pub struct SnapshotCreateOptions {
    /// Directory the repository's state is persisted under
    repository: PathBuf,

    /// The directory to snapshot
    path: PathBuf,

    /// Override the repository default and force hooks on for this attempt
    #[clap(long, conflicts_with = "force_disable_actions")]
    force_enable_actions: bool,

    /// Override the repository default and force hooks off for this attempt
    #[clap(long)]
    force_disable_actions: bool,
}

pub async fn create(options: SnapshotCreateOptions) -> Result<()> {
    let mut state = load_state(&options.repository)?;

    let invocation = match (options.force_enable_actions, options.force_disable_actions) {
        (true, _) => InvocationActionsOverride::ForceEnabled,
        (_, true) => InvocationActionsOverride::ForceDisabled,
        _ => InvocationActionsOverride::Default,
    };
    let hooks_enabled = actions_enabled(state.repository_actions, invocation);

    let snapshot_id = Uuid::new_v4();
    let scratch_base = std::env::temp_dir().join(format!("vaultkeep-{}", snapshot_id));
    let clock = SystemClock::default();

    let result = {
        // An empty policy map makes every `resolve_hook` call return `None`, so a disabled
        // gate silently skips hooks, redirection, and script persistence without the driver
        // needing to know *why* nothing ran.
        let empty_policies = PolicyMap::new();
        let policies = if hooks_enabled { &state.policies } else { &empty_policies };
        let policy_store = PolicyStore::new(policies);

        let process = TokioProcessRunner::default();
        let hooks = HookRunner::new(&process, scratch_base.clone());
        let capture = ContentHashCapture::default();

        let request = SnapshotRequest {
            root: options.path.clone(),
            snapshot_id,
            version: env!("CARGO_PKG_VERSION").to_owned(),
        };

        let driver = SnapshotDriver::new(&policy_store, &hooks, &capture, &clock);
        driver.run(&request).await
    };

    let _ = std::fs::remove_dir_all(&scratch_base);

    match result {
        Ok(manifest) => {
            slog_scope::info!("snapshot created"; "path" => options.path.display().to_string(), "object_id" => manifest.root_object_id.clone());
            state.manifests.push(manifest);
            store_state(&options.repository, &state).context("failed to persist manifest")?;
            Ok(())
        }
        Err(e) => {
            slog_scope::error!("snapshot failed"; "path" => options.path.display().to_string(), "error" => e.to_string());
            let incomplete = SnapshotManifest {
                id: snapshot_id,
                source_path: options.path.clone(),
                start_time: clock.now(),
                root_object_id: String::new(),
                incomplete_reason: Some(e.to_string()),
                retention_reasons: Vec::new(),
            };
            state.manifests.push(incomplete);
            store_state(&options.repository, &state).context("failed to persist incomplete manifest")?;
            Err(e)
        }
    }
}
