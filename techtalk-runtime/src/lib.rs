//! Cron-driven background jobs with an explicit start/stop lifecycle.
//!
//! A [`Scheduler`] owns a set of named jobs. [`Scheduler::start`] spawns one
//! tokio task per job that sleeps until the next cron occurrence (local time),
//! runs the job and repeats. [`Scheduler::stop`] cancels the shared
//! [`CancellationToken`] and waits for every task to finish.

pub mod expression;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use cron::Schedule;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use expression::{next_run_after, normalize_expression, parse_schedule};

/// A unit of scheduled work. Errors are logged by the scheduler and never
/// stop future runs.
#[async_trait]
pub trait Job: Send + Sync {
    async fn run(&self) -> anyhow::Result<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("invalid cron expression `{expression}`: {reason}")]
    InvalidCron { expression: String, reason: String },

    #[error("job `{0}` is already registered")]
    DuplicateJob(String),

    #[error("no job with id `{0}`")]
    UnknownJob(String),
}

/// Snapshot of one registered job.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub id: String,
    pub name: String,
    pub next_run: Option<DateTime<Local>>,
    pub trigger: String,
}

struct JobEntry {
    id: String,
    name: String,
    expression: String,
    schedule: Schedule,
    job: Arc<dyn Job>,
}

impl JobEntry {
    fn status(&self) -> JobStatus {
        JobStatus {
            id: self.id.clone(),
            name: self.name.clone(),
            next_run: self.schedule.upcoming(Local).next(),
            trigger: format!("cron[{}]", self.expression),
        }
    }
}

#[derive(Default)]
struct State {
    jobs: Vec<Arc<JobEntry>>,
    cancel: Option<CancellationToken>,
    tasks: Vec<JoinHandle<()>>,
}

#[derive(Default)]
pub struct Scheduler {
    state: Mutex<State>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // a panicking job never holds this lock, so poisoning is recoverable
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a job. Accepts 5-field crontab syntax or the 6/7-field form
    /// with seconds. Jobs added while running are started immediately.
    pub fn add_job(
        &self,
        id: &str,
        name: &str,
        cron_expr: &str,
        job: Arc<dyn Job>,
    ) -> Result<(), SchedulerError> {
        let expression = normalize_expression(cron_expr)?;
        let schedule = parse_schedule(&expression)?;
        let entry = Arc::new(JobEntry {
            id: id.to_string(),
            name: name.to_string(),
            expression,
            schedule,
            job,
        });

        let mut state = self.lock();
        if state.jobs.iter().any(|j| j.id == id) {
            return Err(SchedulerError::DuplicateJob(id.to_string()));
        }
        if let Some(cancel) = state.cancel.clone() {
            state.tasks.push(spawn_job_loop(entry.clone(), cancel));
        }
        tracing::info!(job_id = %entry.id, trigger = %entry.expression, "scheduler.job.added");
        state.jobs.push(entry);
        Ok(())
    }

    /// Spawn the job loops. Must be called inside a tokio runtime. Calling it
    /// twice is a no-op.
    pub fn start(&self) {
        let mut state = self.lock();
        if state.cancel.is_some() {
            tracing::debug!("scheduler.start.already_running");
            return;
        }
        let cancel = CancellationToken::new();
        let tasks: Vec<_> = state
            .jobs
            .iter()
            .map(|entry| spawn_job_loop(entry.clone(), cancel.clone()))
            .collect();
        state.tasks = tasks;
        state.cancel = Some(cancel);
        tracing::info!(jobs = state.jobs.len(), "scheduler.started");
    }

    /// Cancel all job loops and wait for them to exit. A job that is mid-run
    /// is allowed to finish first.
    pub async fn stop(&self) {
        let (cancel, tasks) = {
            let mut state = self.lock();
            (state.cancel.take(), std::mem::take(&mut state.tasks))
        };
        let Some(cancel) = cancel else {
            return;
        };
        cancel.cancel();
        for task in tasks {
            if let Err(err) = task.await {
                tracing::warn!(error = %err, "scheduler.task.join_failed");
            }
        }
        tracing::info!("scheduler.stopped");
    }

    pub fn is_running(&self) -> bool {
        self.lock().cancel.is_some()
    }

    pub fn jobs(&self) -> Vec<JobStatus> {
        self.lock().jobs.iter().map(|entry| entry.status()).collect()
    }

    /// Run a job right now, outside its schedule, and wait for it.
    pub async fn run_now(&self, id: &str) -> Result<(), SchedulerError> {
        let entry = self
            .lock()
            .jobs
            .iter()
            .find(|entry| entry.id == id)
            .cloned()
            .ok_or_else(|| SchedulerError::UnknownJob(id.to_string()))?;
        execute(&entry).await;
        Ok(())
    }

    /// A job that logs the next run of every registered job.
    pub fn status_reporter(self: &Arc<Self>) -> Arc<dyn Job> {
        Arc::new(StatusReportJob {
            scheduler: Arc::downgrade(self),
        })
    }
}

struct StatusReportJob {
    scheduler: Weak<Scheduler>,
}

#[async_trait]
impl Job for StatusReportJob {
    async fn run(&self) -> anyhow::Result<()> {
        let Some(scheduler) = self.scheduler.upgrade() else {
            return Ok(());
        };
        for status in scheduler.jobs() {
            let next_run = status
                .next_run
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "-".to_string());
            tracing::info!(job_id = %status.id, name = %status.name, %next_run, "scheduler.status");
        }
        Ok(())
    }
}

fn spawn_job_loop(entry: Arc<JobEntry>, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut last_fire = Local::now();
        loop {
            let from = last_fire.max(Local::now());
            let Some(next) = entry.schedule.after(&from).next() else {
                tracing::warn!(job_id = %entry.id, "scheduler.job.no_future_runs");
                break;
            };
            let wait = (next - Local::now()).to_std().unwrap_or(Duration::ZERO);
            tracing::debug!(
                job_id = %entry.id,
                next_run = %next.to_rfc3339(),
                wait_ms = wait.as_millis() as u64,
                "scheduler.job.waiting"
            );

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            last_fire = next;
            execute(&entry).await;
        }
    })
}

async fn execute(entry: &Arc<JobEntry>) {
    tracing::info!(job_id = %entry.id, name = %entry.name, "scheduler.job.start");
    let started = std::time::Instant::now();
    let job = entry.job.clone();
    // run on its own task so a panic is contained and reported
    match tokio::spawn(async move { job.run().await }).await {
        Ok(Ok(())) => tracing::info!(
            job_id = %entry.id,
            duration_ms = started.elapsed().as_millis() as u64,
            "scheduler.job.done"
        ),
        Ok(Err(err)) => tracing::error!(job_id = %entry.id, error = %err, "scheduler.job.failed"),
        Err(err) => tracing::error!(job_id = %entry.id, error = %err, "scheduler.job.panicked"),
    }
}
