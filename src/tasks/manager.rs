use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::{
    errors::SchedulerStateError,
    feed_monitor::{FeedFetcher, IngestCycle},
    scheduler::CronScheduler,
    types::{CycleTarget, JobStatus, ScheduledJob, PRIMARY_JOB, PRIORITY_JOB},
};
use crate::{config::JobsConfig, DbPool};

/// Process-wide entry point for background jobs. Owned by `main` and shared
/// with the HTTP handlers; tests build their own instance.
pub struct JobManager {
    pool: DbPool,
    config: JobsConfig,
    scheduler: Mutex<Option<Arc<CronScheduler<IngestCycle>>>>,
}

impl JobManager {
    pub fn new(pool: DbPool, config: JobsConfig) -> Self {
        Self {
            pool,
            config,
            scheduler: Mutex::new(None),
        }
    }

    /// The timers derived from config: the stale-feed sweep, plus the
    /// priority-category sweep when enabled.
    pub fn scheduled_jobs(config: &JobsConfig) -> Vec<ScheduledJob> {
        let mut jobs = vec![ScheduledJob::new(
            PRIMARY_JOB,
            config.fetch_interval,
            CycleTarget::Stale {
                threshold: config.stale_after,
            },
        )];
        match config.priority_interval {
            Some(interval) if !config.priority_categories.is_empty() => {
                // half a period out of phase with the primary timer
                jobs.push(
                    ScheduledJob::new(
                        PRIORITY_JOB,
                        interval,
                        CycleTarget::Categories(config.priority_categories.clone()),
                    )
                    .with_offset(interval / 2),
                );
            }
            _ => {}
        }
        jobs
    }

    /// Builds the scheduler on first use and starts it. Calling this while
    /// jobs are running is logged and ignored.
    pub fn start_all_jobs(&self) -> Result<(), reqwest::Error> {
        let scheduler = {
            let mut slot = self.scheduler.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(existing) => Arc::clone(existing),
                None => {
                    let fetcher = FeedFetcher::new(self.config.fetch_timeout)?;
                    let cycle = IngestCycle::new(self.pool.clone(), fetcher);
                    let created = Arc::new(CronScheduler::new(
                        Arc::new(cycle),
                        Self::scheduled_jobs(&self.config),
                    ));
                    *slot = Some(Arc::clone(&created));
                    created
                }
            }
        };

        match scheduler.start() {
            Ok(()) => {
                for job in scheduler.jobs() {
                    tracing::info!(
                        job = %job.name,
                        interval_secs = job.interval.as_secs(),
                        "Scheduled job registered"
                    );
                }
            }
            Err(e) => tracing::warn!(error = %e, "Jobs already started"),
        }
        Ok(())
    }

    pub fn stop_all_jobs(&self) {
        if let Some(scheduler) = self.current() {
            scheduler.stop();
        }
    }

    pub fn get_jobs_status(&self) -> JobStatus {
        match self.current() {
            Some(scheduler) => scheduler.status(),
            None => JobStatus {
                is_running: false,
                active_tasks: 0,
                total_jobs: 0,
                last_execution: None,
                next_execution: None,
            },
        }
    }

    /// Runs the named job now. Defaults to the primary job.
    pub fn run_now(&self, job_name: Option<&str>) -> Result<(), SchedulerStateError> {
        let scheduler = self.current().ok_or(SchedulerStateError::NotRunning)?;
        scheduler.trigger(job_name.unwrap_or(PRIMARY_JOB))
    }

    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        match self.current() {
            Some(scheduler) => scheduler.wait_idle(timeout).await,
            None => true,
        }
    }

    fn current(&self) -> Option<Arc<CronScheduler<IngestCycle>>> {
        self.scheduler
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
