use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

/// A completed (or failed) snapshot of a single source path, as produced by the capture layer.
/// `retention_reasons` starts empty and is the only field the retention engine is ever allowed
/// to touch once a manifest has been created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub id: Uuid,
    pub source_path: std::path::PathBuf,
    pub start_time: DateTime<Utc>,
    pub root_object_id: String,
    /// Set when the capture did not complete cleanly. Incomplete manifests are never assigned
    /// a retention reason and are left for the caller to clean up separately.
    #[serde(default)]
    pub incomplete_reason: Option<String>,
    #[serde(default)]
    pub retention_reasons: Vec<RetentionReason>,
}

impl SnapshotManifest {
    pub fn is_complete(&self) -> bool {
        self.incomplete_reason.is_none()
    }

    pub fn is_kept(&self) -> bool {
        !self.retention_reasons.is_empty()
    }
}

/// A bucket a manifest was kept for. The retention engine evaluates all six in this fixed order
/// for every manifest, so a single manifest may end up carrying several: the newest snapshot in
/// a source typically satisfies latest, hourly, daily, weekly, monthly, and annual all at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum RetentionReason {
    Latest,
    Annual,
    Monthly,
    Weekly,
    Daily,
    Hourly,
}

impl RetentionReason {
    pub const ORDER: [RetentionReason; 6] = [
        RetentionReason::Latest,
        RetentionReason::Annual,
        RetentionReason::Monthly,
        RetentionReason::Weekly,
        RetentionReason::Daily,
        RetentionReason::Hourly,
    ];
}
