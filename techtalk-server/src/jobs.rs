use async_trait::async_trait;
use std::sync::Arc;
use techtalk_config::SchedulerConfig;
use techtalk_mail::{DigestOutcome, DigestService};
use techtalk_runtime::{Job, Scheduler, SchedulerError};

pub const WEEKLY_EMAIL_JOB: &str = "weekly_email";
pub const STATUS_LOG_JOB: &str = "scheduler_status";

/// Sends last week's digest to every configured recipient.
pub struct WeeklyDigestJob {
    digest: Arc<DigestService>,
}

impl WeeklyDigestJob {
    pub fn new(digest: Arc<DigestService>) -> Self {
        Self { digest }
    }
}

#[async_trait]
impl Job for WeeklyDigestJob {
    async fn run(&self) -> anyhow::Result<()> {
        match self.digest.send_weekly_digest().await? {
            DigestOutcome::Sent { delivered, failed } => {
                tracing::info!(delivered, failed, "jobs.weekly_digest.sent");
            }
            DigestOutcome::NoPosts => tracing::info!("jobs.weekly_digest.no_posts"),
            DigestOutcome::NotConfigured => tracing::warn!("jobs.weekly_digest.not_configured"),
        }
        Ok(())
    }
}

/// Register the weekly digest and the status log. Registration does not
/// start the scheduler.
pub fn register_jobs(
    scheduler: &Arc<Scheduler>,
    digest: Arc<DigestService>,
    config: &SchedulerConfig,
) -> Result<(), SchedulerError> {
    scheduler.add_job(
        WEEKLY_EMAIL_JOB,
        "주간 게시글 요약 이메일 발송",
        &config.weekly_digest,
        Arc::new(WeeklyDigestJob::new(digest)),
    )?;
    scheduler.add_job(
        STATUS_LOG_JOB,
        "스케줄러 상태 로그",
        &config.status_log,
        scheduler.status_reporter(),
    )?;
    Ok(())
}
