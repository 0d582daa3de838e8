use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Parser;
use comfy_table::Cell;
use vaultkeep_core::clock::SystemClock;
use vaultkeep_core::core::{PolicyStore, RetentionEngine};

use crate::ui::{comfy_id_header, comfy_id_value, comfy_value_or, print_comfy_table};

use super::{load_state, store_state};

#[derive(Parser, Debug)]
pub struct RetentionEvaluateOptions {
    /// Directory the repository's state is persisted under
    repository: PathBuf,

    /// The source path whose manifest history should be evaluated
    path: PathBuf,

    /// Only print the evaluation; don't persist the stamped reasons back to the repository
    #[clap(long)]
    dry_run: bool,
}

pub fn evaluate(options: RetentionEvaluateOptions) -> Result<()> {
    let mut state = load_state(&options.repository)?;

    let caps = PolicyStore::new(&state.policies).resolve_retention(&options.path);
    let clock = SystemClock::default();

    let for_path: Vec<_> = state
        .manifests
        .iter()
        .filter(|m| m.source_path == options.path)
        .cloned()
        .collect();
    let others: Vec<_> = state.manifests.iter().filter(|m| m.source_path != options.path).cloned().collect();

    let stamped = RetentionEngine::new(&clock).evaluate(&for_path, caps);

    print_comfy_table(
        vec![comfy_id_header(), Cell::new("start time"), Cell::new("object id"), Cell::new("reasons")],
        stamped.iter().map(|manifest| {
            vec![
                comfy_id_value(manifest.id),
                Cell::new(manifest.start_time.to_rfc3339()),
                Cell::new(&manifest.root_object_id),
                comfy_value_or(
                    (!manifest.retention_reasons.is_empty()).then(|| {
                        manifest
                            .retention_reasons
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>()
                            .join(", ")
                    }),
                    "expired",
                ),
            ]
        }),
    );

    if !options.dry_run {
        let mut merged = others;
        merged.extend(stamped);
        state.manifests = merged;
        store_state(&options.repository, &state).context("failed to persist retention evaluation")?;
    }

    Ok(())
}
