use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Closed set of failures the core crate raises as typed errors rather than opaque `anyhow::Error`.
/// Callers that need to branch on failure kind (the ctl crate's exit codes, the snapshot driver's
/// essential/optional split) match on this; everything else keeps propagating with `anyhow`.
#[derive(Debug, Error)]
pub enum VaultkeepError {
    #[error("failed to spawn hook command `{command}`: {source}")]
    HookSpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("hook command `{command}` timed out after {timeout:?}")]
    HookTimeout { command: String, timeout: Duration },

    #[error("hook command `{command}` exited with status {exit_code:?}")]
    HookNonZeroExit { command: String, exit_code: Option<i32> },

    #[error("redirection target `{path}` does not exist")]
    RedirectionTargetMissing { path: PathBuf },

    #[error("retention configuration is invalid: {reason}")]
    RetentionConfigInvalid { reason: String },

    #[error("failed to persist hook script to `{path}`: {source}")]
    ScriptPersistenceFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
