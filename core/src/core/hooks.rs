use std::path::PathBuf;

use crate::error::VaultkeepError;
use crate::model::{HookMode, HookSpec};
use crate::parsing::parse_snapshot_path_directive;
use crate::sys::process::{ProcessRunner, ProcessSpec};
use crate::sys::scratch::ScratchSpace;

/// The environment a single hook invocation is run with. Field names match the `VAULTKEEP_*`
/// variables injected into the child process.
#[derive(Debug, Clone)]
pub struct HookContext {
    pub action: String,
    pub snapshot_id: String,
    pub source_path: String,
    pub version: String,
}

/// What a hook run produced, already reinterpreted per its mode. Essential failures surface as
/// `Err`; optional failures are folded into `exit_ok: true` here so callers never need to
/// special-case mode again downstream.
#[derive(Debug, Clone, Default)]
pub struct HookOutcome {
    pub exit_ok: bool,
    pub redirected_snapshot_path: Option<PathBuf>,
}

pub struct HookRunner<'a> {
    process: &'a dyn ProcessRunner,
    scratch_base: PathBuf,
}

impl<'a> HookRunner<'a> {
    pub fn new(process: &'a dyn ProcessRunner, scratch_base: PathBuf) -> Self {
        HookRunner { process, scratch_base }
    }

    pub async fn run(&self, spec: &HookSpec, ctx: &HookContext) -> Result<HookOutcome, VaultkeepError> {
        let mut guard = None;
        let command = if spec.persist_script {
            let scratch = ScratchSpace::persist_script(&self.scratch_base, &spec.command)?;
            let path = scratch.script_path().to_string_lossy().into_owned();
            guard = Some(scratch);
            path
        } else {
            spec.command.clone()
        };

        let process_spec = ProcessSpec::new(command)
            .with_env("VAULTKEEP_ACTION", ctx.action.clone())
            .with_env("VAULTKEEP_SNAPSHOT_ID", ctx.snapshot_id.clone())
            .with_env("VAULTKEEP_SOURCE_PATH", ctx.source_path.clone())
            .with_env("VAULTKEEP_VERSION", ctx.version.clone());

        let outcome = match spec.mode {
            HookMode::Asynchronous => {
                self.process.spawn_detached(process_spec).await?;
                Ok(HookOutcome {
                    exit_ok: true,
                    redirected_snapshot_path: None,
                })
            }
            HookMode::Essential => {
                let raw = self.process.run(process_spec, spec.timeout).await?;
                if !raw.exit_ok {
                    return Err(VaultkeepError::HookNonZeroExit {
                        command: spec.command.clone(),
                        exit_code: raw.exit_code,
                    });
                }
                Ok(HookOutcome {
                    exit_ok: true,
                    redirected_snapshot_path: parse_snapshot_path_directive(&raw.stdout).map(PathBuf::from),
                })
            }
            HookMode::Optional => match self.process.run(process_spec, spec.timeout).await {
                Ok(raw) if raw.exit_ok => Ok(HookOutcome {
                    exit_ok: true,
                    redirected_snapshot_path: parse_snapshot_path_directive(&raw.stdout).map(PathBuf::from),
                }),
                Ok(raw) => {
                    slog_scope::warn!("optional hook exited non-zero"; "command" => &spec.command, "exit_code" => raw.exit_code);
                    Ok(HookOutcome {
                        exit_ok: true,
                        redirected_snapshot_path: None,
                    })
                }
                Err(e) => {
                    slog_scope::warn!("optional hook failed"; "command" => &spec.command, "error" => %e);
                    Ok(HookOutcome {
                        exit_ok: true,
                        redirected_snapshot_path: None,
                    })
                }
            },
        };

        drop(guard);
        outcome
    }
}
