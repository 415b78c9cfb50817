//! Provider-agnostic LLM integration for Tech Talk.
//!
//! This crate exposes a common [`traits::LlmClient`] interface and the
//! OpenAI chat-completions implementation. [`build_llm_client`] turns the
//! `llm` section of the configuration into a ready client.
//!
//! # Examples
//! ```no_run
//! use techtalk_config::TechTalkConfigLoader;
//! use techtalk_llm::build_llm_client;
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = TechTalkConfigLoader::new().load()?;
//! let client = build_llm_client(&config.llm)?;
//! assert!(!client.model_name().is_empty());
//! # Ok(())
//! # }
//! ```
pub mod openai;
pub mod traits;

use openai::OpenAiClient;
use std::sync::Arc;
use techtalk_common::TechTalkError;
use techtalk_config::LlmConfig;
use traits::LlmClient;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

/// Build the configured LLM client.
pub fn build_llm_client(
    config: &LlmConfig,
) -> techtalk_common::Result<Arc<dyn LlmClient + Send + Sync + 'static>> {
    match config {
        LlmConfig::Openai {
            model, endpoint, ..
        } => {
            let api_key = config.api_key().ok_or_else(|| {
                TechTalkError::Config("llm.auth_token is not set (OPENAI_API_KEY)".to_string())
            })?;
            let model = if model.trim().is_empty() {
                DEFAULT_OPENAI_MODEL.to_string()
            } else {
                model.clone()
            };
            let client = OpenAiClient::with_endpoint(endpoint, api_key.to_string(), model)?;
            Ok(Arc::new(client))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_a_config_error() {
        let cfg = LlmConfig::Openai {
            model: "gpt-3.5-turbo".into(),
            auth_token: "${OPENAI_API_KEY}".into(),
            endpoint: openai::OPENAI_API_BASE.into(),
        };
        let err = build_llm_client(&cfg).err().expect("should fail");
        assert!(matches!(err, TechTalkError::Config(_)));
    }

    #[test]
    fn blank_model_falls_back_to_default() {
        let cfg = LlmConfig::Openai {
            model: " ".into(),
            auth_token: "sk-test".into(),
            endpoint: "http://localhost:1/v1/".into(),
        };
        let client = build_llm_client(&cfg).expect("client");
        assert_eq!(client.model_name(), DEFAULT_OPENAI_MODEL);
    }
}
