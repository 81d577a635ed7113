use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::feed_source::FeedCategory;

pub const DEFAULT_FETCH_INTERVAL: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_STALE_AFTER: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_PRIORITY_INTERVAL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(20);

pub const PRIMARY_JOB: &str = "feeds-needing-update";
pub const PRIORITY_JOB: &str = "priority-categories";

/// Which feed sources a fetch cycle covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleTarget {
    /// Active sources not fetched within `threshold`.
    Stale { threshold: Duration },
    /// Every active source in these categories, regardless of freshness.
    Categories(Vec<FeedCategory>),
}

/// A named fixed-interval timer and the cycle it fires.
#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub name: String,
    pub interval: Duration,
    /// extra delay before the first fire, to keep timers out of phase
    pub offset: Duration,
    pub target: CycleTarget,
}

impl ScheduledJob {
    pub fn new(name: impl Into<String>, interval: Duration, target: CycleTarget) -> Self {
        Self {
            name: name.into(),
            interval,
            offset: Duration::ZERO,
            target,
        }
    }

    pub fn with_offset(mut self, offset: Duration) -> Self {
        self.offset = offset;
        self
    }
}

/// Counters reported at the end of one fetch cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub sources: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub created: usize,
    pub updated: usize,
    pub store_errors: usize,
}

impl CycleSummary {
    pub fn merge(&mut self, other: &CycleSummary) {
        self.sources += other.sources;
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.created += other.created;
        self.updated += other.updated;
        self.store_errors += other.store_errors;
    }
}

/// Point-in-time view of the scheduler, rebuilt on every query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatus {
    pub is_running: bool,
    pub active_tasks: usize,
    pub total_jobs: usize,
    pub last_execution: Option<DateTime<Utc>>,
    /// last execution (or start) plus the primary interval; an estimate only
    pub next_execution: Option<DateTime<Utc>>,
}
