//! Fixed-interval scheduler for fetch cycles.
//!
//! Every [`ScheduledJob`] gets its own tokio interval task. A timer never
//! overlaps itself: a tick that lands while the previous cycle from the same
//! timer is still running is skipped. Stopping broadcasts a cancellation to
//! every timer task; cycles already running are left to drain.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::errors::SchedulerStateError;
use super::types::{CycleSummary, CycleTarget, JobStatus, ScheduledJob};

/// Unit of work fired by a timer. Implementations must not panic on
/// per-source failures; they log and report through [`CycleSummary`].
pub trait CycleRunner: Send + Sync + 'static {
    fn run_cycle(&self, target: CycleTarget) -> BoxFuture<'_, CycleSummary>;
}

#[derive(Default)]
struct Counters {
    active_tasks: AtomicUsize,
    last_execution: Mutex<Option<DateTime<Utc>>>,
}

impl Counters {
    fn last_execution(&self) -> Option<DateTime<Utc>> {
        *self
            .last_execution
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// Marks one cycle as in flight; releases the timer and stamps the end time
/// when dropped, including on panic.
struct ActiveCycle {
    counters: Arc<Counters>,
    in_flight: Arc<AtomicBool>,
}

impl ActiveCycle {
    fn begin(counters: Arc<Counters>, in_flight: Arc<AtomicBool>) -> Self {
        counters.active_tasks.fetch_add(1, Ordering::AcqRel);
        Self {
            counters,
            in_flight,
        }
    }
}

impl Drop for ActiveCycle {
    fn drop(&mut self) {
        *self
            .counters
            .last_execution
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
        self.counters.active_tasks.fetch_sub(1, Ordering::AcqRel);
        self.in_flight.store(false, Ordering::Release);
    }
}

struct Running {
    cancel_tx: broadcast::Sender<()>,
    trigger_tx: broadcast::Sender<String>,
    timers: Vec<JoinHandle<()>>,
    started_at: DateTime<Utc>,
}

pub struct CronScheduler<R: CycleRunner> {
    runner: Arc<R>,
    jobs: Vec<ScheduledJob>,
    counters: Arc<Counters>,
    running: Mutex<Option<Running>>,
}

impl<R: CycleRunner> CronScheduler<R> {
    /// The first job is the primary timer used for `next_execution`.
    pub fn new(runner: Arc<R>, jobs: Vec<ScheduledJob>) -> Self {
        Self {
            runner,
            jobs,
            counters: Arc::new(Counters::default()),
            running: Mutex::new(None),
        }
    }

    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    /// Spawns one timer per job. Must be called inside a tokio runtime.
    pub fn start(&self) -> Result<(), SchedulerStateError> {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        if running.is_some() {
            tracing::warn!("start() called while the scheduler is already running, ignoring");
            return Err(SchedulerStateError::AlreadyRunning);
        }

        let (cancel_tx, _) = broadcast::channel(1);
        let (trigger_tx, _) = broadcast::channel(16);
        let timers = self
            .jobs
            .iter()
            .map(|job| self.spawn_timer(job.clone(), cancel_tx.subscribe(), trigger_tx.subscribe()))
            .collect::<Vec<_>>();

        tracing::info!(total_jobs = timers.len(), "Scheduler started");
        *running = Some(Running {
            cancel_tx,
            trigger_tx,
            timers,
            started_at: Utc::now(),
        });
        Ok(())
    }

    /// Cancels every timer. Cycles already running finish on their own.
    pub fn stop(&self) {
        let mut running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(state) = running.take() else {
            tracing::debug!("stop() called while the scheduler is not running");
            return;
        };
        // Err only means every timer already exited.
        let _ = state.cancel_tx.send(());
        tracing::info!(
            stopped_timers = state.timers.len(),
            active_tasks = self.counters.active_tasks.load(Ordering::Acquire),
            "Scheduler stopped"
        );
    }

    /// Fires the named timer once, outside its regular interval.
    pub fn trigger(&self, job_name: &str) -> Result<(), SchedulerStateError> {
        if !self.jobs.iter().any(|j| j.name == job_name) {
            return Err(SchedulerStateError::UnknownJob(job_name.to_string()));
        }
        let running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        let state = running.as_ref().ok_or(SchedulerStateError::NotRunning)?;
        state
            .trigger_tx
            .send(job_name.to_string())
            .map(|_| ())
            .map_err(|_| SchedulerStateError::NotRunning)
    }

    pub fn status(&self) -> JobStatus {
        let running = self.running.lock().unwrap_or_else(PoisonError::into_inner);
        let last_execution = self.counters.last_execution();
        let active_tasks = self.counters.active_tasks.load(Ordering::Acquire);

        match running.as_ref() {
            Some(state) => {
                let next_execution = self.jobs.first().and_then(|primary| {
                    let base = last_execution.unwrap_or(state.started_at);
                    chrono::Duration::from_std(primary.interval)
                        .ok()
                        .map(|interval| base + interval)
                });
                JobStatus {
                    is_running: true,
                    active_tasks,
                    total_jobs: state.timers.len(),
                    last_execution,
                    next_execution,
                }
            }
            None => JobStatus {
                is_running: false,
                active_tasks,
                total_jobs: 0,
                last_execution,
                next_execution: None,
            },
        }
    }

    /// Waits until no cycle is in flight. Returns false on timeout.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        while self.counters.active_tasks.load(Ordering::Acquire) > 0 {
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        true
    }

    fn spawn_timer(
        &self,
        job: ScheduledJob,
        mut cancel_rx: broadcast::Receiver<()>,
        mut trigger_rx: broadcast::Receiver<String>,
    ) -> JoinHandle<()> {
        let runner = Arc::clone(&self.runner);
        let counters = Arc::clone(&self.counters);
        let in_flight = Arc::new(AtomicBool::new(false));

        tokio::spawn(async move {
            // first regular fire is one full interval (plus offset) after start
            let first = Instant::now() + job.interval + job.offset;
            let mut ticker = tokio::time::interval_at(first, job.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel_rx.recv() => {
                        tracing::debug!(job = %job.name, "Timer cancelled");
                        break;
                    }
                    _ = ticker.tick() => {}
                    Ok(name) = trigger_rx.recv() => {
                        if name != job.name {
                            continue;
                        }
                        tracing::info!(job = %job.name, "Manual run triggered");
                    }
                }

                if in_flight.swap(true, Ordering::AcqRel) {
                    tracing::warn!(
                        job = %job.name,
                        "Previous cycle still running, skipping this tick"
                    );
                    continue;
                }

                let guard = ActiveCycle::begin(Arc::clone(&counters), Arc::clone(&in_flight));
                let runner = Arc::clone(&runner);
                let target = job.target.clone();
                let name = job.name.clone();
                tokio::spawn(async move {
                    let _guard = guard;
                    let started = Instant::now();
                    let summary = runner.run_cycle(target).await;
                    tracing::info!(
                        job = %name,
                        sources = summary.sources,
                        succeeded = summary.succeeded,
                        failed = summary.failed,
                        created = summary.created,
                        updated = summary.updated,
                        store_errors = summary.store_errors,
                        duration_ms = started.elapsed().as_millis() as u64,
                        "Fetch cycle finished"
                    );
                });
            }
        })
    }
}

impl<R: CycleRunner> Drop for CronScheduler<R> {
    fn drop(&mut self) {
        self.stop();
    }
}
