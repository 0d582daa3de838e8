use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Which phase of the snapshot lifecycle a hook runs in. `BeforeSnapshotRoot`/`AfterSnapshotRoot`
/// resolve by inheriting up the path tree; `BeforeFolder`/`AfterFolder` only ever apply at an
/// exact path match, never to descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum HookEvent {
    BeforeSnapshotRoot,
    AfterSnapshotRoot,
    BeforeFolder,
    AfterFolder,
}

impl HookEvent {
    /// `beforeFolder`/`afterFolder` hooks apply only to the exact path they're configured on.
    pub fn inherits(self) -> bool {
        matches!(self, HookEvent::BeforeSnapshotRoot | HookEvent::AfterSnapshotRoot)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum HookMode {
    /// A failure or timeout aborts the whole snapshot.
    Essential,
    /// A failure or timeout is logged and the snapshot continues; stdout is still parsed.
    Optional,
    /// Spawned and detached. The driver never waits on it and never parses its stdout.
    #[strum(serialize = "asynchronous", serialize = "async")]
    Asynchronous,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookSpec {
    pub command: String,
    #[serde(default = "default_hook_mode")]
    pub mode: HookMode,
    #[serde(with = "humantime_serde", default = "default_hook_timeout")]
    pub timeout: Duration,
    /// When true, `command` is treated as an inline script body and persisted to a scoped
    /// temp file before execution instead of being run directly.
    #[serde(default)]
    pub persist_script: bool,
}

fn default_hook_mode() -> HookMode {
    HookMode::Essential
}

fn default_hook_timeout() -> Duration {
    Duration::from_secs(60)
}

/// Per-path retention caps as configured on a single policy node, before inheritance is applied.
/// `None` means "not set here, inherit from the nearest ancestor that sets it"; `Some(0)` means
/// "explicitly disabled at this path" and is a real, inheritable value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionCapsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub annual: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weekly: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub daily: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hourly: Option<u32>,
}

impl RetentionCapsPatch {
    /// Field-wise merge: values already present in `self` (the child) win; `self` adopts any
    /// field `parent` sets that `self` leaves unset.
    pub fn merge_from_parent(self, parent: &RetentionCapsPatch) -> RetentionCapsPatch {
        RetentionCapsPatch {
            latest: self.latest.or(parent.latest),
            annual: self.annual.or(parent.annual),
            monthly: self.monthly.or(parent.monthly),
            weekly: self.weekly.or(parent.weekly),
            daily: self.daily.or(parent.daily),
            hourly: self.hourly.or(parent.hourly),
        }
    }

    /// Resolves any still-unset fields to 0 (disabled), for use once inheritance is exhausted.
    pub fn resolve(self) -> RetentionCaps {
        RetentionCaps {
            latest: self.latest.unwrap_or(0),
            annual: self.annual.unwrap_or(0),
            monthly: self.monthly.unwrap_or(0),
            weekly: self.weekly.unwrap_or(0),
            daily: self.daily.unwrap_or(0),
            hourly: self.hourly.unwrap_or(0),
        }
    }
}

/// Fully resolved retention caps, ready for the retention engine. A cap of 0 disables that
/// bucket type entirely rather than letting it fall through to the below-cap branch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionCaps {
    pub latest: u32,
    pub annual: u32,
    pub monthly: u32,
    pub weekly: u32,
    pub daily: u32,
    pub hourly: u32,
}

/// A single node in the policy tree, keyed externally by its source path. Any field left unset
/// inherits from the nearest ancestor node that sets it (hooks for the two root events, caps for
/// every bucket type); `beforeFolder`/`afterFolder` never inherit.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Policy {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_snapshot_root: Option<HookSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_snapshot_root: Option<HookSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_folder: Option<HookSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_folder: Option<HookSpec>,
    #[serde(default)]
    pub retention: RetentionCapsPatch,
}

impl Policy {
    pub fn hook_for(&self, event: HookEvent) -> Option<&HookSpec> {
        match event {
            HookEvent::BeforeSnapshotRoot => self.before_snapshot_root.as_ref(),
            HookEvent::AfterSnapshotRoot => self.after_snapshot_root.as_ref(),
            HookEvent::BeforeFolder => self.before_folder.as_ref(),
            HookEvent::AfterFolder => self.after_folder.as_ref(),
        }
    }
}


/// Repository-wide default for whether hooks run at all, absent an invocation override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum RepositoryActionsToggle {
    /// Disabled unless an invocation explicitly force-enables.
    Default,
    Enabled,
    Disabled,
}

impl Default for RepositoryActionsToggle {
    fn default() -> Self {
        RepositoryActionsToggle::Default
    }
}
