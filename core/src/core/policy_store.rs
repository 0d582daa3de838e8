use std::path::Path;

use crate::model::{HookEvent, HookSpec, PolicyMap, RetentionCaps, RetentionCapsPatch};

/// Resolves the effective hook and retention configuration for a given path against a loaded
/// policy tree. Root-event hooks and retention caps inherit from the nearest ancestor that
/// configures them; folder-event hooks only ever apply at an exact path match.
pub struct PolicyStore<'a> {
    policies: &'a PolicyMap,
}

impl<'a> PolicyStore<'a> {
    pub fn new(policies: &'a PolicyMap) -> Self {
        PolicyStore { policies }
    }

    pub fn resolve_hook(&self, path: &Path, event: HookEvent) -> Option<&HookSpec> {
        if event.inherits() {
            path.ancestors()
                .find_map(|ancestor| self.policies.get(ancestor).and_then(|p| p.hook_for(event)))
        } else {
            self.policies.get(path).and_then(|p| p.hook_for(event))
        }
    }

    /// Folds retention caps from the repository root down to `path`, nearer settings winning.
    pub fn resolve_retention(&self, path: &Path) -> RetentionCaps {
        let mut ancestors: Vec<&Path> = path.ancestors().collect();
        ancestors.reverse();

        ancestors
            .into_iter()
            .filter_map(|ancestor| self.policies.get(ancestor))
            .fold(RetentionCapsPatch::default(), |acc, policy| policy.retention.merge_from_parent(&acc))
            .resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{HookMode, Policy};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn hook(command: &str) -> HookSpec {
        HookSpec {
            command: command.to_owned(),
            mode: HookMode::Essential,
            timeout: Duration::from_secs(30),
            persist_script: false,
        }
    }

    #[test]
    fn root_event_hooks_inherit_from_nearest_ancestor() {
        let mut map: PolicyMap = HashMap::new();
        map.insert(
            PathBuf::from("/data"),
            Policy {
                before_snapshot_root: Some(hook("echo root")),
                ..Default::default()
            },
        );
        let store = PolicyStore::new(&map);

        let resolved = store.resolve_hook(Path::new("/data/photos/2020"), HookEvent::BeforeSnapshotRoot);
        assert_eq!(resolved.map(|h| h.command.as_str()), Some("echo root"));
    }

    #[test]
    fn folder_event_hooks_never_inherit() {
        let mut map: PolicyMap = HashMap::new();
        map.insert(
            PathBuf::from("/data"),
            Policy {
                before_folder: Some(hook("echo folder")),
                ..Default::default()
            },
        );
        let store = PolicyStore::new(&map);

        assert!(store
            .resolve_hook(Path::new("/data/photos"), HookEvent::BeforeFolder)
            .is_none());
        assert!(store.resolve_hook(Path::new("/data"), HookEvent::BeforeFolder).is_some());
    }

    #[test]
    fn retention_caps_merge_nearest_wins() {
        let mut map: PolicyMap = HashMap::new();
        map.insert(
            PathBuf::from("/data"),
            Policy {
                retention: RetentionCapsPatch {
                    daily: Some(7),
                    weekly: Some(4),
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        map.insert(
            PathBuf::from("/data/photos"),
            Policy {
                retention: RetentionCapsPatch {
                    daily: Some(14),
                    ..Default::default()
                },
                ..Default::default()
            },
        );
        let store = PolicyStore::new(&map);

        let resolved = store.resolve_retention(Path::new("/data/photos"));
        assert_eq!(resolved.daily, 14);
        assert_eq!(resolved.weekly, 4);
        assert_eq!(resolved.annual, 0);
    }
}
