use async_trait::async_trait;
use chrono::{Days, Local};
use std::sync::{Arc, Mutex};
use techtalk_config::EmailConfig;
use techtalk_mail::{DigestOutcome, DigestService, MailError, Mailer};
use techtalk_store::{BcryptHasher, NewComment, NewPost, PostStore};

#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<(String, String, String)>>,
    reject: Option<String>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_html(&self, to: &str, subject: &str, html: &str) -> Result<(), MailError> {
        if self.reject.as_deref() == Some(to) {
            return Err(MailError::Transport("mailbox unavailable".into()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((to.to_string(), subject.to_string(), html.to_string()));
        Ok(())
    }
}

fn email_config(complete: bool) -> EmailConfig {
    EmailConfig {
        smtp_server: "smtp.example.com".into(),
        smtp_port: 587,
        username: Some("mailer".into()),
        password: complete.then(|| "secret".to_string()),
        sender: Some("noreply@example.com".into()),
        recipients: vec!["a@example.com".into(), " b@example.com ".into(), "".into()],
    }
}

async fn store_with_post(title: &str) -> PostStore {
    let store = PostStore::connect_with_hasher("sqlite::memory:", Arc::new(BcryptHasher::new(4)))
        .await
        .unwrap();
    let post = store
        .create_post(NewPost {
            title: title.to_string(),
            content: "x".repeat(250),
            tags: vec!["rust".into()],
            url: None,
            thumbnail_url: None,
            password: "pw".into(),
        })
        .await
        .unwrap();
    store
        .create_comment(NewComment {
            post_id: post.id,
            content: "nice".into(),
            password: "pw".into(),
        })
        .await
        .unwrap();
    store
}

/// A "today" one week ahead, so posts created now fall into "last week".
fn next_week() -> chrono::NaiveDate {
    Local::now().date_naive() + Days::new(7)
}

#[tokio::test]
async fn sends_digest_to_every_recipient() {
    let store = store_with_post("Rust <b>2024</b>").await;
    let mailer = Arc::new(RecordingMailer::default());
    let service = DigestService::with_mailer(store, email_config(true), mailer.clone());

    let posts = service.weekly_posts_on(next_week()).await.unwrap();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].comment_count, 1);
    assert_eq!(posts[0].content.chars().count(), 203);

    let outcome = service.send_weekly_digest_on(next_week()).await.unwrap();
    assert_eq!(outcome, DigestOutcome::Sent { delivered: 2, failed: 0 });

    let sent = mailer.sent.lock().unwrap();
    let to: Vec<&str> = sent.iter().map(|(to, _, _)| to.as_str()).collect();
    assert_eq!(to, vec!["a@example.com", "b@example.com"]);
    let (_, subject, html) = &sent[0];
    assert!(subject.starts_with("Tech Talk 주간 게시글 ("));
    assert!(subject.contains("년"));
    assert!(html.contains("Rust &lt;b&gt;2024&lt;&#x2F;b&gt;"));
}

#[tokio::test]
async fn empty_week_sends_nothing() {
    let store = store_with_post("this week").await;
    let mailer = Arc::new(RecordingMailer::default());
    let service = DigestService::with_mailer(store, email_config(true), mailer.clone());

    // the post was created today, so relative to today it is not "last week"
    let today = Local::now().date_naive();
    assert!(service.weekly_posts_on(today).await.unwrap().is_empty());
    let outcome = service.send_weekly_digest_on(today).await.unwrap();
    assert_eq!(outcome, DigestOutcome::NoPosts);
    assert!(mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unconfigured_service_sends_nothing() {
    let store = store_with_post("post").await;
    let mailer = Arc::new(RecordingMailer::default());
    let service = DigestService::with_mailer(store, email_config(false), mailer.clone());

    assert!(!service.is_configured());
    assert!(!service.status().is_configured);
    let outcome = service.send_weekly_digest_on(next_week()).await.unwrap();
    assert_eq!(outcome, DigestOutcome::NotConfigured);
    assert!(matches!(
        service.send_test_email().await,
        Err(MailError::NotConfigured)
    ));
    assert!(mailer.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn per_recipient_failures_are_counted() {
    let store = store_with_post("post").await;
    let mailer = Arc::new(RecordingMailer {
        reject: Some("a@example.com".into()),
        ..Default::default()
    });
    let service = DigestService::with_mailer(store, email_config(true), mailer.clone());

    let outcome = service.send_weekly_digest_on(next_week()).await.unwrap();
    assert_eq!(outcome, DigestOutcome::Sent { delivered: 1, failed: 1 });
}

#[tokio::test]
async fn test_email_goes_to_all_recipients() {
    let store = store_with_post("post").await;
    let mailer = Arc::new(RecordingMailer::default());
    let service = DigestService::with_mailer(store, email_config(true), mailer.clone());

    let recipients = service.send_test_email().await.unwrap();
    assert_eq!(recipients, vec!["a@example.com", "b@example.com"]);
    let sent = mailer.sent.lock().unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].1, "Tech Talk 주간 게시글 (테스트 ~ 테스트)");
    assert!(sent[0].2.contains("Tech Talk 이메일 설정 테스트"));

    let status = service.status();
    assert_eq!(status.recipient_count, 2);
    assert_eq!(status.smtp_port, 587);
    assert!(status.is_configured);
}

#[tokio::test]
async fn from_config_without_credentials_is_unconfigured() {
    let store = store_with_post("post").await;
    let service = DigestService::from_config(store, email_config(false)).unwrap();
    assert!(!service.is_configured());
    assert_eq!(
        service.send_weekly_digest_on(next_week()).await.unwrap(),
        DigestOutcome::NotConfigured
    );
}
