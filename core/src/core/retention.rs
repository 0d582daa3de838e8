use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};

use crate::clock::Clock;
use crate::model::{RetentionCaps, RetentionReason, SnapshotManifest};

/// Stamps every manifest in a source's history with the retention reasons it qualifies for.
/// All six bucket types are evaluated for every manifest in a fixed precedence order, so a
/// single manifest routinely ends up kept for several reasons at once (the newest snapshot
/// is usually `latest`, `hourly`, `daily`, `weekly`, `monthly`, and `annual` simultaneously).
/// Each bucket type has its own independent counter and period-key set, capped at its own limit.
pub struct RetentionEngine<'a> {
    clock: &'a dyn Clock,
}

impl<'a> RetentionEngine<'a> {
    pub fn new(clock: &'a dyn Clock) -> Self {
        RetentionEngine { clock }
    }

    /// Returns a copy of `manifests` sorted newest-first with `retention_reasons` populated.
    /// Incomplete manifests are carried through untouched (and unkept); this function never fails.
    pub fn evaluate(&self, manifests: &[SnapshotManifest], caps: RetentionCaps) -> Vec<SnapshotManifest> {
        let now = self.clock.now();
        let cutoffs = Cutoffs::new(now, &caps);

        let mut ordered: Vec<SnapshotManifest> = manifests.to_vec();
        ordered.sort_unstable_by_key(|m| Reverse(m.start_time));

        let mut counts: HashMap<RetentionReason, u32> = HashMap::new();
        let mut claimed: HashMap<RetentionReason, HashSet<String>> = HashMap::new();

        for (index, manifest) in ordered.iter_mut().enumerate() {
            manifest.retention_reasons.clear();
            if !manifest.is_complete() {
                continue;
            }

            for &reason in RetentionReason::ORDER.iter() {
                let cap = caps.for_reason(reason);
                if cap == 0 || *counts.get(&reason).unwrap_or(&0) >= cap {
                    continue;
                }

                let key = if reason == RetentionReason::Latest {
                    index.to_string()
                } else {
                    if manifest.start_time < cutoffs.for_reason(reason) {
                        continue;
                    }
                    period_key(reason, manifest.start_time)
                };

                let keys = claimed.entry(reason).or_default();
                if keys.contains(&key) {
                    continue;
                }

                keys.insert(key);
                *counts.entry(reason).or_default() += 1;
                manifest.retention_reasons.push(reason);
            }
        }

        ordered
    }
}

impl RetentionCaps {
    fn for_reason(self, reason: RetentionReason) -> u32 {
        match reason {
            RetentionReason::Latest => self.latest,
            RetentionReason::Annual => self.annual,
            RetentionReason::Monthly => self.monthly,
            RetentionReason::Weekly => self.weekly,
            RetentionReason::Daily => self.daily,
            RetentionReason::Hourly => self.hourly,
        }
    }
}

struct Cutoffs {
    annual: DateTime<Utc>,
    monthly: DateTime<Utc>,
    weekly: DateTime<Utc>,
    daily: DateTime<Utc>,
    hourly: DateTime<Utc>,
}

impl Cutoffs {
    fn new(now: DateTime<Utc>, caps: &RetentionCaps) -> Self {
        Cutoffs {
            annual: subtract_calendar_months(now, i64::from(caps.annual) * 12),
            monthly: subtract_calendar_months(now, i64::from(caps.monthly)),
            weekly: now - ChronoDuration::weeks(i64::from(caps.weekly)),
            daily: now - ChronoDuration::days(i64::from(caps.daily)),
            hourly: now - ChronoDuration::hours(i64::from(caps.hourly)),
        }
    }

    fn for_reason(&self, reason: RetentionReason) -> DateTime<Utc> {
        match reason {
            RetentionReason::Latest => DateTime::<Utc>::MIN_UTC,
            RetentionReason::Annual => self.annual,
            RetentionReason::Monthly => self.monthly,
            RetentionReason::Weekly => self.weekly,
            RetentionReason::Daily => self.daily,
            RetentionReason::Hourly => self.hourly,
        }
    }
}

fn period_key(reason: RetentionReason, at: DateTime<Utc>) -> String {
    match reason {
        RetentionReason::Annual => at.format("%Y").to_string(),
        RetentionReason::Monthly => at.format("%Y-%m").to_string(),
        RetentionReason::Weekly => {
            let week = at.iso_week();
            format!("{}-W{:02}", week.year(), week.week())
        }
        RetentionReason::Daily => at.format("%Y-%m-%d").to_string(),
        RetentionReason::Hourly => at.format("%Y-%m-%d %H").to_string(),
        RetentionReason::Latest => unreachable!("latest uses the manifest index, not a calendar key"),
    }
}

/// Subtracts `months` calendar months from `at`, clamping the day of month down when the target
/// month is shorter (e.g. subtracting a month from Mar 31 lands on Feb 28/29, not Mar 3).
fn subtract_calendar_months(at: DateTime<Utc>, months: i64) -> DateTime<Utc> {
    let total = i64::from(at.year()) * 12 + i64::from(at.month() - 1) - months;
    let new_year = total.div_euclid(12) as i32;
    let new_month = (total.rem_euclid(12) + 1) as u32;
    let last_day = last_day_of_month(new_year, new_month);
    let new_day = at.day().min(last_day);

    let date = NaiveDate::from_ymd_opt(new_year, new_month, new_day).expect("clamped date is always valid");
    Utc.from_utc_datetime(&date.and_time(at.time()))
}

fn last_day_of_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .expect("valid first-of-month")
        .pred_opt()
        .expect("month before january of year zero never occurs in practice")
        .day()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::MockClock;
    use uuid::Uuid;

    fn manifest(start_time: DateTime<Utc>) -> SnapshotManifest {
        SnapshotManifest {
            id: Uuid::new_v4(),
            source_path: "/data".into(),
            start_time,
            root_object_id: "deadbeef".to_owned(),
            incomplete_reason: None,
            retention_reasons: Vec::new(),
        }
    }

    fn clock_at(now: DateTime<Utc>) -> MockClock {
        let mut clock = MockClock::new();
        clock.expect_now().returning(move || now);
        clock
    }

    #[test]
    fn zero_cap_disables_bucket_entirely() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let clock = clock_at(now);
        let manifests = vec![manifest(now - ChronoDuration::hours(1))];
        let caps = RetentionCaps {
            latest: 0,
            hourly: 5,
            ..Default::default()
        };

        let decisions = RetentionEngine::new(&clock).evaluate(&manifests, caps);
        assert_eq!(decisions[0].retention_reasons, vec![RetentionReason::Hourly]);
    }

    #[test]
    fn incomplete_manifests_are_never_assigned_a_reason() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let clock = clock_at(now);
        let mut incomplete = manifest(now);
        incomplete.incomplete_reason = Some("capture aborted".to_owned());

        let caps = RetentionCaps {
            latest: 10,
            ..Default::default()
        };
        let decisions = RetentionEngine::new(&clock).evaluate(&[incomplete], caps);
        assert!(decisions[0].retention_reasons.is_empty());
        assert!(!decisions[0].is_kept());
    }

    #[test]
    fn latest_bucket_keeps_the_newest_n_regardless_of_calendar_spacing() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let clock = clock_at(now);
        let manifests = vec![
            manifest(now),
            manifest(now - ChronoDuration::minutes(5)),
            manifest(now - ChronoDuration::minutes(10)),
        ];
        let caps = RetentionCaps {
            latest: 2,
            ..Default::default()
        };

        let decisions = RetentionEngine::new(&clock).evaluate(&manifests, caps);
        assert_eq!(decisions[0].retention_reasons, vec![RetentionReason::Latest]);
        assert_eq!(decisions[1].retention_reasons, vec![RetentionReason::Latest]);
        assert!(decisions[2].retention_reasons.is_empty());
    }

    #[test]
    fn one_manifest_per_calendar_month_is_kept_for_monthly_bucket() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let clock = clock_at(now);
        let manifests = vec![
            manifest(Utc.with_ymd_and_hms(2026, 6, 1, 0, 0, 0).unwrap()),
            manifest(Utc.with_ymd_and_hms(2026, 6, 15, 0, 0, 0).unwrap()),
        ];
        let caps = RetentionCaps {
            monthly: 3,
            ..Default::default()
        };

        let decisions = RetentionEngine::new(&clock).evaluate(&manifests, caps);
        assert_eq!(
            decisions
                .iter()
                .filter(|d| d.retention_reasons.contains(&RetentionReason::Monthly))
                .count(),
            1
        );
    }

    #[test]
    fn manifests_older_than_every_cutoff_are_dropped() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let clock = clock_at(now);
        let manifests = vec![manifest(now - ChronoDuration::days(3650))];
        let caps = RetentionCaps {
            latest: 0,
            annual: 1,
            ..Default::default()
        };

        let decisions = RetentionEngine::new(&clock).evaluate(&manifests, caps);
        assert!(decisions[0].retention_reasons.is_empty());
    }

    /// The seed scenario from the spec: eight manifests at fixed offsets from `now`, with every
    /// bucket capped, checked against the exact reasons each manifest should carry.
    #[test]
    fn seed_scenario_assigns_multiple_reasons_per_manifest() {
        let now = Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap();
        let clock = clock_at(now);
        let offsets = [
            ChronoDuration::hours(0),
            ChronoDuration::hours(1),
            ChronoDuration::hours(2),
            ChronoDuration::days(1),
            ChronoDuration::days(2),
            ChronoDuration::days(10),
            ChronoDuration::days(40),
            ChronoDuration::days(400),
        ];
        let manifests: Vec<SnapshotManifest> = offsets.iter().map(|&offset| manifest(now - offset)).collect();
        let caps = RetentionCaps {
            latest: 1,
            hourly: 2,
            daily: 2,
            weekly: 1,
            monthly: 1,
            annual: 1,
        };

        let decisions = RetentionEngine::new(&clock).evaluate(&manifests, caps);

        // newest: now -> qualifies for every bucket type at once.
        assert_eq!(
            decisions[0].retention_reasons,
            vec![
                RetentionReason::Latest,
                RetentionReason::Annual,
                RetentionReason::Monthly,
                RetentionReason::Weekly,
                RetentionReason::Daily,
                RetentionReason::Hourly,
            ]
        );
        // now-1h: still within the hourly cutoff, hourly cap has one slot left.
        assert_eq!(decisions[1].retention_reasons, vec![RetentionReason::Hourly]);
        // now-2h: hourly cap (2) already exhausted by the two manifests above.
        assert!(decisions[2].retention_reasons.is_empty());
        // now-1d: first manifest to claim the daily bucket's second (and last) slot.
        assert_eq!(decisions[3].retention_reasons, vec![RetentionReason::Daily]);
        // every later manifest is past every exhausted or expired cutoff.
        assert!(decisions[4..].iter().all(|d| d.retention_reasons.is_empty()));
    }
}
