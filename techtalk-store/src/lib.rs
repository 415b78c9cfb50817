//! SQLite persistence for posts and comments.
//!
//! [`PostStore`] owns a `sqlx` pool and a [`PasswordHasher`]. Every mutation
//! of an existing post or comment is gated on its password.

pub mod models;
pub mod password;
pub mod store;

pub use models::{
    CommentRecord, NewComment, NewPost, PostDetail, PostRecord, PostSummary, PostUpdate,
};
pub use password::{BcryptHasher, PasswordHasher};
pub use store::PostStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Post not found")]
    PostNotFound,

    #[error("Comment not found")]
    CommentNotFound,

    #[error("비밀번호가 일치하지 않습니다.")]
    PasswordMismatch,

    /// Same check for comments; its message stays in English.
    #[error("Incorrect password")]
    CommentPasswordMismatch,

    /// A required request field was absent or empty.
    #[error("{0}")]
    MissingField(&'static str),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored row could not be decoded.
    #[error("corrupt row: {0}")]
    Corrupt(String),
}
