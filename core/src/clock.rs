use chrono::{DateTime, Utc};

/// Explicit time dependency for the retention engine and hook runner. Production code uses
/// `SystemClock`; tests inject a fake so bucket cutoffs and hook durations are deterministic.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Wall-clock elapsed since `earlier`. Never negative; clamps to zero if `earlier` is in the future.
    fn since(&self, earlier: DateTime<Utc>) -> std::time::Duration {
        let now = self.now();
        (now - earlier).to_std().unwrap_or_default()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
