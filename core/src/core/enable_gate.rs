use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::model::RepositoryActionsToggle;

/// A per-invocation override, typically set by a CLI flag. Unlike `RepositoryActionsToggle` this
/// is never persisted; it only ever applies to the single snapshot run it was passed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum InvocationActionsOverride {
    Default,
    ForceEnabled,
    ForceDisabled,
}

impl Default for InvocationActionsOverride {
    fn default() -> Self {
        InvocationActionsOverride::Default
    }
}

/// Decides whether hooks run for this snapshot at all. An explicit invocation override always
/// wins; absent one, the repository default applies, and the repository default itself only
/// enables hooks when explicitly set to `Enabled` (both `Default` and `Disabled` mean off).
pub fn actions_enabled(repository: RepositoryActionsToggle, invocation: InvocationActionsOverride) -> bool {
    match invocation {
        InvocationActionsOverride::ForceEnabled => true,
        InvocationActionsOverride::ForceDisabled => false,
        InvocationActionsOverride::Default => matches!(repository, RepositoryActionsToggle::Enabled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invocation_override_takes_precedence() {
        assert!(actions_enabled(
            RepositoryActionsToggle::Disabled,
            InvocationActionsOverride::ForceEnabled
        ));
        assert!(!actions_enabled(
            RepositoryActionsToggle::Enabled,
            InvocationActionsOverride::ForceDisabled
        ));
    }

    #[test]
    fn repository_default_applies_without_override() {
        assert!(actions_enabled(
            RepositoryActionsToggle::Enabled,
            InvocationActionsOverride::Default
        ));
        assert!(!actions_enabled(
            RepositoryActionsToggle::Default,
            InvocationActionsOverride::Default
        ));
        assert!(!actions_enabled(
            RepositoryActionsToggle::Disabled,
            InvocationActionsOverride::Default
        ));
    }

    /// The remaining two rows of spec.md 4.4's seven-row truth table: a force override wins
    /// regardless of the repository default, even when that default is left unset.
    #[test]
    fn invocation_override_wins_over_an_unset_repository_default() {
        assert!(actions_enabled(
            RepositoryActionsToggle::Default,
            InvocationActionsOverride::ForceEnabled
        ));
        assert!(!actions_enabled(
            RepositoryActionsToggle::Default,
            InvocationActionsOverride::ForceDisabled
        ));
    }
}
