use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use futures::future::{BoxFuture, FutureExt};
use uuid::Uuid;

use crate::clock::Clock;
use crate::core::capture::Capture;
use crate::core::hooks::{HookContext, HookRunner};
use crate::core::policy_store::PolicyStore;
use crate::error::VaultkeepError;
use crate::model::{HookEvent, SnapshotManifest};

pub struct SnapshotRequest {
    pub root: PathBuf,
    pub snapshot_id: Uuid,
    pub version: String,
}

/// Drives a single snapshot from start to finish: resolves and runs the root hooks, walks the
/// tree firing per-folder hooks along the way, then captures content. A before-hook's stdout is
/// fully parsed before the walk starts; an after-hook never starts until the walk has finished.
pub struct SnapshotDriver<'a> {
    policies: &'a PolicyStore<'a>,
    hooks: &'a HookRunner<'a>,
    capture: &'a dyn Capture,
    clock: &'a dyn Clock,
}

impl<'a> SnapshotDriver<'a> {
    pub fn new(
        policies: &'a PolicyStore<'a>,
        hooks: &'a HookRunner<'a>,
        capture: &'a dyn Capture,
        clock: &'a dyn Clock,
    ) -> Self {
        SnapshotDriver {
            policies,
            hooks,
            capture,
            clock,
        }
    }

    pub async fn run(&self, request: &SnapshotRequest) -> Result<SnapshotManifest> {
        let start_time = self.clock.now();

        let mut effective_root = request.root.clone();
        if let Some(hook) = self.policies.resolve_hook(&request.root, HookEvent::BeforeSnapshotRoot) {
            let ctx = self.context(request, "before-snapshot-root");
            let outcome = self.hooks.run(hook, &ctx).await?;
            if let Some(redirect) = outcome.redirected_snapshot_path {
                if !redirect.exists() {
                    return Err(VaultkeepError::RedirectionTargetMissing { path: redirect }.into());
                }
                effective_root = redirect;
            }
        }

        self.visit_directory(&effective_root, request, true).await?;

        let root_object_id = self.capture.capture(&effective_root).await?;

        if let Some(hook) = self.policies.resolve_hook(&request.root, HookEvent::AfterSnapshotRoot) {
            let ctx = self.context(request, "after-snapshot-root");
            self.hooks.run(hook, &ctx).await?;
        }

        Ok(SnapshotManifest {
            id: request.snapshot_id,
            source_path: request.root.clone(),
            start_time,
            root_object_id,
            incomplete_reason: None,
            retention_reasons: Vec::new(),
        })
    }

    /// `is_root` is true only for the snapshot root itself, which runs the root-event hooks
    /// (handled by `run`, above) rather than the folder-event hooks handled here; every other
    /// directory in the walk runs `beforeFolder`/`afterFolder` instead.
    fn visit_directory<'b>(&'b self, dir: &'b Path, request: &'b SnapshotRequest, is_root: bool) -> BoxFuture<'b, Result<()>> {
        async move {
            if !is_root {
                if let Some(hook) = self.policies.resolve_hook(dir, HookEvent::BeforeFolder) {
                    let ctx = self.context(request, "before-folder");
                    self.hooks.run(hook, &ctx).await?;
                }
            }

            let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| anyhow!(e).context(format!("reading {}", dir.display())))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| anyhow!(e).context(format!("reading {}", dir.display())))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| anyhow!(e).context(format!("stat {}", path.display())))?;
                if file_type.is_dir() {
                    self.visit_directory(&path, request, false).await?;
                }
            }

            if !is_root {
                if let Some(hook) = self.policies.resolve_hook(dir, HookEvent::AfterFolder) {
                    let ctx = self.context(request, "after-folder");
                    self.hooks.run(hook, &ctx).await?;
                }
            }

            Ok(())
        }
        .boxed()
    }

    fn context(&self, request: &SnapshotRequest, action: &str) -> HookContext {
        HookContext {
            action: action.to_owned(),
            snapshot_id: request.snapshot_id.to_string(),
            source_path: request.root.to_string_lossy().into_owned(),
            version: request.version.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use crate::core::capture::ContentHashCapture;
    use crate::model::{HookMode, HookSpec, Policy, PolicyMap};
    use crate::sys::process::{MockProcessRunner, RawOutcome};
    use chrono::{TimeZone, Utc};
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;

    /// A directory tree under the system temp dir, removed on drop regardless of test outcome.
    struct TempTree {
        root: PathBuf,
    }

    impl TempTree {
        fn new() -> Self {
            let root = std::env::temp_dir().join(format!("vaultkeep-driver-test-{}", uuid::Uuid::new_v4()));
            fs::create_dir_all(&root).unwrap();
            TempTree { root }
        }

        fn write(&self, relative: &str, contents: &str) {
            let path = self.root.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, contents).unwrap();
        }

        fn path(&self) -> PathBuf {
            self.root.clone()
        }
    }

    impl Drop for TempTree {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.root);
        }
    }

    fn hook(mode: HookMode) -> HookSpec {
        HookSpec {
            command: "echo hi".to_owned(),
            mode,
            timeout: Duration::from_secs(5),
            persist_script: false,
        }
    }

    fn clock() -> MockClock {
        let mut clock = MockClock::new();
        clock.expect_now().returning(|| Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap());
        clock
    }

    fn request(root: PathBuf) -> SnapshotRequest {
        SnapshotRequest {
            root,
            snapshot_id: uuid::Uuid::new_v4(),
            version: "1".to_owned(),
        }
    }

    #[tokio::test]
    async fn essential_before_hook_failure_aborts_without_capturing() {
        let tree = TempTree::new();
        tree.write("a.txt", "hello");

        let mut policies: PolicyMap = HashMap::new();
        policies.insert(
            tree.path(),
            Policy {
                before_snapshot_root: Some(hook(HookMode::Essential)),
                ..Default::default()
            },
        );
        let store = PolicyStore::new(&policies);

        let mut process = MockProcessRunner::new();
        process.expect_run().returning(|_, _| {
            Ok(RawOutcome {
                exit_ok: false,
                exit_code: Some(3),
                stdout: String::new(),
            })
        });
        let hooks = HookRunner::new(&process, std::env::temp_dir());
        let capture = ContentHashCapture::default();
        let clock = clock();

        let driver = SnapshotDriver::new(&store, &hooks, &capture, &clock);
        let result = driver.run(&request(tree.path())).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn optional_before_hook_failure_continues_to_capture() {
        let tree = TempTree::new();
        tree.write("a.txt", "hello");

        let mut policies: PolicyMap = HashMap::new();
        policies.insert(
            tree.path(),
            Policy {
                before_snapshot_root: Some(hook(HookMode::Optional)),
                ..Default::default()
            },
        );
        let store = PolicyStore::new(&policies);

        let mut process = MockProcessRunner::new();
        process.expect_run().returning(|_, _| {
            Ok(RawOutcome {
                exit_ok: false,
                exit_code: Some(1),
                stdout: String::new(),
            })
        });
        let hooks = HookRunner::new(&process, std::env::temp_dir());
        let capture = ContentHashCapture::default();
        let clock = clock();

        let driver = SnapshotDriver::new(&store, &hooks, &capture, &clock);
        let manifest = driver.run(&request(tree.path())).await.unwrap();
        assert!(manifest.is_complete());
        assert!(!manifest.root_object_id.is_empty());
    }

    #[tokio::test]
    async fn redirection_to_another_directory_yields_same_object_id_as_direct_capture() {
        let original = TempTree::new();
        original.write("a.txt", "hello");
        let alternate = TempTree::new();
        alternate.write("a.txt", "a different file");

        let mut policies: PolicyMap = HashMap::new();
        let redirect_target = alternate.path();
        policies.insert(
            original.path(),
            Policy {
                before_snapshot_root: Some(hook(HookMode::Essential)),
                ..Default::default()
            },
        );
        let store = PolicyStore::new(&policies);

        let stdout = format!("VAULTKEEP_SNAPSHOT_PATH={}\n", redirect_target.display());
        let mut process = MockProcessRunner::new();
        process.expect_run().returning(move |_, _| {
            Ok(RawOutcome {
                exit_ok: true,
                exit_code: Some(0),
                stdout: stdout.clone(),
            })
        });
        let hooks = HookRunner::new(&process, std::env::temp_dir());
        let capture = ContentHashCapture::default();
        let clock = clock();

        let driver = SnapshotDriver::new(&store, &hooks, &capture, &clock);
        let manifest = driver.run(&request(original.path())).await.unwrap();

        let direct_id = capture.capture(&alternate.path()).await.unwrap();
        assert_eq!(manifest.root_object_id, direct_id);
    }

    #[tokio::test]
    async fn redirection_to_a_missing_directory_fails_the_snapshot() {
        let tree = TempTree::new();
        tree.write("a.txt", "hello");

        let mut policies: PolicyMap = HashMap::new();
        policies.insert(
            tree.path(),
            Policy {
                before_snapshot_root: Some(hook(HookMode::Essential)),
                ..Default::default()
            },
        );
        let store = PolicyStore::new(&policies);

        let mut process = MockProcessRunner::new();
        process.expect_run().returning(|_, _| {
            Ok(RawOutcome {
                exit_ok: true,
                exit_code: Some(0),
                stdout: "VAULTKEEP_SNAPSHOT_PATH=/no/such/directory\n".to_owned(),
            })
        });
        let hooks = HookRunner::new(&process, std::env::temp_dir());
        let capture = ContentHashCapture::default();
        let clock = clock();

        let driver = SnapshotDriver::new(&store, &hooks, &capture, &clock);
        let result = driver.run(&request(tree.path())).await;
        assert!(matches!(result, Err(e) if e.downcast_ref::<VaultkeepError>().map_or(false, |e| matches!(e, VaultkeepError::RedirectionTargetMissing { .. }))));
    }

    #[tokio::test]
    async fn folder_hook_set_on_a_child_does_not_fire_for_its_grandchild() {
        let tree = TempTree::new();
        tree.write("child/grandchild/leaf.txt", "hello");

        let mut policies: PolicyMap = HashMap::new();
        policies.insert(
            tree.path().join("child"),
            Policy {
                before_folder: Some(hook(HookMode::Essential)),
                ..Default::default()
            },
        );
        let store = PolicyStore::new(&policies);

        // Exactly one directory in this tree (`child`) carries the hook; if non-inheritance
        // were broken the walk would also fire it for `child/grandchild`.
        let mut process = MockProcessRunner::new();
        process.expect_run().times(1).returning(|_, _| {
            Ok(RawOutcome {
                exit_ok: true,
                exit_code: Some(0),
                stdout: String::new(),
            })
        });
        let hooks = HookRunner::new(&process, std::env::temp_dir());
        let capture = ContentHashCapture::default();
        let clock = clock();

        let driver = SnapshotDriver::new(&store, &hooks, &capture, &clock);
        driver.run(&request(tree.path())).await.unwrap();
    }

    #[tokio::test]
    async fn a_folder_hook_bound_to_the_snapshot_root_does_not_fire_there() {
        let tree = TempTree::new();
        tree.write("leaf.txt", "hello");

        let mut policies: PolicyMap = HashMap::new();
        policies.insert(
            tree.path(),
            Policy {
                before_folder: Some(hook(HookMode::Essential)),
                after_folder: Some(hook(HookMode::Essential)),
                ..Default::default()
            },
        );
        let store = PolicyStore::new(&policies);

        // The root directory only ever runs before/after-snapshot-root, never the folder
        // events, even when a policy sets them on the exact root path.
        let mut process = MockProcessRunner::new();
        process.expect_run().times(0).returning(|_, _| {
            Ok(RawOutcome {
                exit_ok: true,
                exit_code: Some(0),
                stdout: String::new(),
            })
        });
        let hooks = HookRunner::new(&process, std::env::temp_dir());
        let capture = ContentHashCapture::default();
        let clock = clock();

        let driver = SnapshotDriver::new(&store, &hooks, &capture, &clock);
        driver.run(&request(tree.path())).await.unwrap();
    }
}
