//! Common types and utilities shared across Tech Talk crates.
//!
//! This crate defines the shared error type and the observability helpers used
//! throughout the workspace. It is intentionally lightweight so that every
//! crate can depend on it without pulling in heavy transitive costs.
//!
//! # Overview
//!
//! - [`observability`]: Centralised tracing/logging initialisation
//! - [`TechTalkError`] and [`Result`]: Shared error handling for client crates
//!
//! # Examples
//!
//! ```rust
//! use techtalk_common::TechTalkError;
//!
//! let err = TechTalkError::Provider("quota exhausted".into());
//! assert_eq!(err.to_string(), "Provider error: quota exhausted");
//! ```

pub mod observability;

/// Error types shared by the outbound client crates (LLM, HTTP wiring).
#[derive(thiserror::Error, Debug)]
pub enum TechTalkError {
    /// An upstream provider (model API, remote site) rejected or failed a call.
    #[error("Provider error: {0}")]
    Provider(String),

    /// Configuration was incomplete or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Operation exceeded the configured timeout.
    #[error("Timeout occurred")]
    Timeout,
}

/// Convenient alias for results that use [`TechTalkError`].
pub type Result<T> = std::result::Result<T, TechTalkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_render_their_kind() {
        assert_eq!(
            TechTalkError::Config("llm.auth_token is not set".into()).to_string(),
            "Configuration error: llm.auth_token is not set"
        );
        assert_eq!(TechTalkError::Timeout.to_string(), "Timeout occurred");
    }
}
