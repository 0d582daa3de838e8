use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context as _, Result};
use comfy_table::Cell;
use clap::Parser;
use vaultkeep_core::core::PolicyStore;
use vaultkeep_core::error::VaultkeepError;
use vaultkeep_core::model::{HookEvent, HookMode, HookSpec, Policy};

use crate::ui::{print_comfy_info, CapArg, CellOrCells};

use super::{load_state, store_state};

const DEFAULT_ESSENTIAL_TIMEOUT: Duration = Duration::from_secs(15 * 60);

#[derive(Parser, Debug)]
pub struct PolicySetOptions {
    /// Directory the repository's state is persisted under
    repository: PathBuf,

    /// The source path this policy applies to
    path: PathBuf,

    /// Command run before the root of a snapshot is captured
    #[clap(long, value_name("cmd"))]
    before_snapshot_root_action: Option<String>,

    /// Command run after the root of a snapshot is captured
    #[clap(long, value_name("cmd"))]
    after_snapshot_root_action: Option<String>,

    /// Command run before capturing this exact folder (never inherited by descendants)
    #[clap(long, value_name("cmd"))]
    before_folder_action: Option<String>,

    /// Command run after capturing this exact folder (never inherited by descendants)
    #[clap(long, value_name("cmd"))]
    after_folder_action: Option<String>,

    /// Execution mode shared by every action flag set in this invocation
    #[clap(long, value_name("mode"), default_value = "essential")]
    action_command_mode: HookMode,

    /// Timeout shared by every action flag set in this invocation (default 15m for essential,
    /// unlimited for async)
    #[clap(long, value_name("duration"))]
    action_command_timeout: Option<humantime::Duration>,

    /// Embed the referenced file's contents into the policy so the hook survives loss of the
    /// original path; when set, each `*-action` value above names a script file to read instead
    /// of a command line
    #[clap(long)]
    persist_action_script: bool,

    #[clap(long, value_name("n|inherit"))]
    keep_latest: Option<CapArg>,
    #[clap(long, value_name("n|inherit"))]
    keep_hourly: Option<CapArg>,
    #[clap(long, value_name("n|inherit"))]
    keep_daily: Option<CapArg>,
    #[clap(long, value_name("n|inherit"))]
    keep_weekly: Option<CapArg>,
    #[clap(long, value_name("n|inherit"))]
    keep_monthly: Option<CapArg>,
    #[clap(long, value_name("n|inherit"))]
    keep_annual: Option<CapArg>,
}

#[derive(Parser, Debug)]
pub struct PolicyShowOptions {
    /// Directory the repository's state is persisted under
    repository: PathBuf,

    /// The source path to resolve the effective policy for
    path: PathBuf,
}

fn build_hook_spec(options: &PolicySetOptions, command: String) -> Result<HookSpec> {
    let command = if options.persist_action_script {
        fs::read_to_string(&command).map_err(|source| VaultkeepError::ScriptPersistenceFailed {
            path: PathBuf::from(&command),
            source,
        })?
    } else {
        command
    };

    let timeout = options.action_command_timeout.map(Into::into).unwrap_or_else(|| match options.action_command_mode {
        HookMode::Essential => DEFAULT_ESSENTIAL_TIMEOUT,
        HookMode::Optional => DEFAULT_ESSENTIAL_TIMEOUT,
        HookMode::Asynchronous => Duration::from_secs(0),
    });

    Ok(HookSpec {
        command,
        mode: options.action_command_mode,
        timeout,
        persist_script: options.persist_action_script,
    })
}

pub fn set(options: PolicySetOptions) -> Result<()> {
    let mut state = super::load_state(&options.repository)?;
    let policy = state.policies.entry(options.path.clone()).or_insert_with(Policy::default);

    if let Some(cmd) = &options.before_snapshot_root_action {
        policy.before_snapshot_root = Some(build_hook_spec(&options, cmd.clone())?);
    }
    if let Some(cmd) = &options.after_snapshot_root_action {
        policy.after_snapshot_root = Some(build_hook_spec(&options, cmd.clone())?);
    }
    if let Some(cmd) = &options.before_folder_action {
        policy.before_folder = Some(build_hook_spec(&options, cmd.clone())?);
    }
    if let Some(cmd) = &options.after_folder_action {
        policy.after_folder = Some(build_hook_spec(&options, cmd.clone())?);
    }

    if let Some(cap) = options.keep_latest {
        policy.retention.latest = cap.0;
    }
    if let Some(cap) = options.keep_hourly {
        policy.retention.hourly = cap.0;
    }
    if let Some(cap) = options.keep_daily {
        policy.retention.daily = cap.0;
    }
    if let Some(cap) = options.keep_weekly {
        policy.retention.weekly = cap.0;
    }
    if let Some(cap) = options.keep_monthly {
        policy.retention.monthly = cap.0;
    }
    if let Some(cap) = options.keep_annual {
        policy.retention.annual = cap.0;
    }

    store_state(&options.repository, &state).context("failed to persist policy")?;
    Ok(())
}

fn hook_cell(hook: Option<&HookSpec>) -> Cell {
    match hook {
        Some(hook) => Cell::new(format!("{} ({})", hook.command, hook.mode)),
        None => Cell::new("none").fg(comfy_table::Color::DarkGrey),
    }
}

pub fn show(options: PolicyShowOptions) -> Result<()> {
    let state = load_state(&options.repository)?;
    let store = PolicyStore::new(&state.policies);

    let caps = store.resolve_retention(&options.path);

    print_comfy_info(vec![
        (
            Cell::new("before-snapshot-root"),
            CellOrCells::Cell(hook_cell(store.resolve_hook(&options.path, HookEvent::BeforeSnapshotRoot))),
        ),
        (
            Cell::new("after-snapshot-root"),
            CellOrCells::Cell(hook_cell(store.resolve_hook(&options.path, HookEvent::AfterSnapshotRoot))),
        ),
        (
            Cell::new("before-folder"),
            CellOrCells::Cell(hook_cell(store.resolve_hook(&options.path, HookEvent::BeforeFolder))),
        ),
        (
            Cell::new("after-folder"),
            CellOrCells::Cell(hook_cell(store.resolve_hook(&options.path, HookEvent::AfterFolder))),
        ),
        (
            Cell::new("retention"),
            CellOrCells::Cells(vec![
                Cell::new(format!("latest={}", caps.latest)),
                Cell::new(format!("hourly={}", caps.hourly)),
                Cell::new(format!("daily={}", caps.daily)),
                Cell::new(format!("weekly={}", caps.weekly)),
                Cell::new(format!("monthly={}", caps.monthly)),
                Cell::new(format!("annual={}", caps.annual)),
            ]),
        ),
    ]);

    Ok(())
}
