use crate::mailer::{Mailer, SmtpMailer};
use crate::render::{render_digest, render_test_email};
use crate::MailError;
use chrono::{DateTime, Datelike, Days, Local, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::Serialize;
use std::sync::Arc;
use techtalk_config::EmailConfig;
use techtalk_store::{PostStore, PostSummary};

const CONTENT_PREVIEW_CHARS: usize = 200;
const DISPLAY_DATE: &str = "%Y년 %m월 %d일";

/// The previous calendar week relative to `today`: Monday 00:00 inclusive
/// up to this week's Monday 00:00 exclusive.
pub fn week_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let this_monday = today - Days::new(u64::from(today.weekday().num_days_from_monday()));
    let last_monday = this_monday - Days::new(7);
    (last_monday, this_monday)
}

/// A post as it appears in the digest.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DigestPost {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub views: i64,
    pub tags: Vec<String>,
    pub url: Option<String>,
    pub comment_count: i64,
}

impl From<PostSummary> for DigestPost {
    fn from(summary: PostSummary) -> Self {
        let post = summary.post;
        DigestPost {
            id: post.id,
            title: post.title,
            content: preview(&post.content),
            created_at: post
                .created_at
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M")
                .to_string(),
            views: post.views,
            tags: post.tags,
            url: post.url,
            comment_count: summary.comment_count,
        }
    }
}

fn preview(content: &str) -> String {
    match content.char_indices().nth(CONTENT_PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestOutcome {
    /// Credentials, sender or recipients are missing; nothing was sent.
    NotConfigured,
    /// Last week had no posts; nothing was sent.
    NoPosts,
    Sent { delivered: usize, failed: usize },
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailStatus {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub sender_email: Option<String>,
    pub recipient_count: usize,
    pub is_configured: bool,
}

#[derive(Clone)]
pub struct DigestService {
    store: PostStore,
    config: EmailConfig,
    recipients: Vec<String>,
    mailer: Option<Arc<dyn Mailer>>,
}

impl DigestService {
    /// Build the service with an SMTP mailer when the configuration is
    /// complete. An incomplete configuration is not an error: the service
    /// then reports itself unconfigured and never sends.
    pub fn from_config(store: PostStore, config: EmailConfig) -> Result<Self, MailError> {
        let mailer: Option<Arc<dyn Mailer>> = match credentials(&config) {
            Some((username, password, sender)) => Some(Arc::new(SmtpMailer::new(
                &config.smtp_server,
                config.smtp_port,
                username,
                password,
                sender,
            )?)),
            None => None,
        };
        Ok(Self::assemble(store, config, mailer))
    }

    /// Build the service around an explicit mailer.
    pub fn with_mailer(store: PostStore, config: EmailConfig, mailer: Arc<dyn Mailer>) -> Self {
        Self::assemble(store, config, Some(mailer))
    }

    fn assemble(store: PostStore, config: EmailConfig, mailer: Option<Arc<dyn Mailer>>) -> Self {
        let recipients = config.recipient_list();
        Self {
            store,
            config,
            recipients,
            mailer,
        }
    }

    pub fn is_configured(&self) -> bool {
        credentials(&self.config).is_some() && !self.recipients.is_empty()
    }

    pub fn recipients(&self) -> &[String] {
        &self.recipients
    }

    pub fn status(&self) -> EmailStatus {
        EmailStatus {
            smtp_server: self.config.smtp_server.clone(),
            smtp_port: self.config.smtp_port,
            sender_email: self.config.sender.clone(),
            recipient_count: self.recipients.len(),
            is_configured: self.is_configured(),
        }
    }

    /// Posts from last week, newest first.
    pub async fn weekly_posts(&self) -> Result<Vec<DigestPost>, MailError> {
        self.weekly_posts_on(Local::now().date_naive()).await
    }

    pub async fn weekly_posts_on(&self, today: NaiveDate) -> Result<Vec<DigestPost>, MailError> {
        let (start, end) = week_range(today);
        let posts = self
            .store
            .posts_between(local_midnight(start), local_midnight(end))
            .await?;
        Ok(posts.into_iter().map(DigestPost::from).collect())
    }

    pub async fn send_weekly_digest(&self) -> Result<DigestOutcome, MailError> {
        self.send_weekly_digest_on(Local::now().date_naive()).await
    }

    pub async fn send_weekly_digest_on(&self, today: NaiveDate) -> Result<DigestOutcome, MailError> {
        let Some(mailer) = self.configured_mailer() else {
            tracing::warn!("mail.digest.not_configured");
            return Ok(DigestOutcome::NotConfigured);
        };

        let posts = self.weekly_posts_on(today).await?;
        if posts.is_empty() {
            tracing::info!("mail.digest.no_posts");
            return Ok(DigestOutcome::NoPosts);
        }

        let (start, end) = week_range(today);
        let week_start = start.format(DISPLAY_DATE).to_string();
        let week_end = (end - Days::new(1)).format(DISPLAY_DATE).to_string();
        let html = render_digest(&posts, &week_start, &week_end)?;
        let subject = digest_subject(&week_start, &week_end);

        let mut delivered = 0;
        let mut failed = 0;
        for recipient in &self.recipients {
            match mailer.send_html(recipient, &subject, &html).await {
                Ok(()) => delivered += 1,
                Err(err) => {
                    failed += 1;
                    tracing::error!(%recipient, error = %err, "mail.digest.recipient_failed");
                }
            }
        }

        tracing::info!(posts = posts.len(), delivered, failed, "mail.digest.sent");
        Ok(DigestOutcome::Sent { delivered, failed })
    }

    /// Send a fixed test message to every recipient. Returns the recipients.
    pub async fn send_test_email(&self) -> Result<Vec<String>, MailError> {
        let mailer = self.configured_mailer().ok_or(MailError::NotConfigured)?;
        let html = render_test_email(&Local::now().format("%Y-%m-%d %H:%M:%S").to_string())?;
        let subject = digest_subject("테스트", "테스트");

        let mut failures = Vec::new();
        for recipient in &self.recipients {
            if let Err(err) = mailer.send_html(recipient, &subject, &html).await {
                tracing::error!(%recipient, error = %err, "mail.test.recipient_failed");
                failures.push(format!("{recipient}: {err}"));
            }
        }
        if !failures.is_empty() {
            return Err(MailError::Transport(failures.join("; ")));
        }
        Ok(self.recipients.clone())
    }

    fn configured_mailer(&self) -> Option<&Arc<dyn Mailer>> {
        if self.is_configured() {
            self.mailer.as_ref()
        } else {
            None
        }
    }
}

fn digest_subject(week_start: &str, week_end: &str) -> String {
    format!("Tech Talk 주간 게시글 ({week_start} ~ {week_end})")
}

fn credentials(config: &EmailConfig) -> Option<(&str, &str, &str)> {
    fn present(v: &Option<String>) -> Option<&str> {
        v.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
    Some((
        present(&config.username)?,
        present(&config.password)?,
        present(&config.sender)?,
    ))
}

/// Local midnight at the start of `date`, as UTC. Falls back to treating the
/// date as UTC when the local midnight does not exist (DST gaps).
fn local_midnight(date: NaiveDate) -> DateTime<Utc> {
    let naive = date.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn week_range_is_previous_calendar_week() {
        // Wednesday
        assert_eq!(
            week_range(date(2025, 1, 15)),
            (date(2025, 1, 6), date(2025, 1, 13))
        );
        // Monday itself starts a new week
        assert_eq!(
            week_range(date(2025, 1, 13)),
            (date(2025, 1, 6), date(2025, 1, 13))
        );
        // Sunday, across a year boundary
        assert_eq!(
            week_range(date(2025, 1, 5)),
            (date(2024, 12, 23), date(2024, 12, 30))
        );
    }

    #[test]
    fn preview_truncates_at_200_chars() {
        let short = "짧은 글";
        assert_eq!(preview(short), short);

        let exact = "가".repeat(200);
        assert_eq!(preview(&exact), exact);

        let long = "나".repeat(201);
        let got = preview(&long);
        assert!(got.ends_with("..."));
        assert_eq!(got.chars().count(), 203);
    }

    #[test]
    fn subject_format() {
        assert_eq!(
            digest_subject("2025년 01월 06일", "2025년 01월 12일"),
            "Tech Talk 주간 게시글 (2025년 01월 06일 ~ 2025년 01월 12일)"
        );
    }
}
