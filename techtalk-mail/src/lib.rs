//! Weekly digest email: collect last week's posts, render them and deliver
//! the result over SMTP.

pub mod digest;
pub mod mailer;
pub mod render;

pub use digest::{week_range, DigestOutcome, DigestPost, DigestService, EmailStatus};
pub use mailer::{Mailer, SmtpMailer};

use techtalk_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("이메일 설정이 완료되지 않았습니다. 환경 변수를 확인해주세요.")]
    NotConfigured,

    #[error("invalid email address `{address}`: {reason}")]
    Address { address: String, reason: String },

    #[error("template error: {0}")]
    Template(#[from] tera::Error),

    #[error("smtp delivery failed: {0}")]
    Transport(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}
