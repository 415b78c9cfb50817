//! Tech-or-not classification of free text.

use crate::error::AnalysisError;
use crate::prompt::{CLASSIFY_SYSTEM_PROMPT, build_classify_prompt};
use std::sync::Arc;
use techtalk_llm::traits::LlmClient;

#[derive(Clone)]
pub struct ContentClassifier {
    llm: Arc<dyn LlmClient + Send + Sync>,
}

impl ContentClassifier {
    pub fn new(llm: Arc<dyn LlmClient + Send + Sync>) -> Self {
        Self { llm }
    }

    /// `Ok(true)` only when the model answers exactly `true` after
    /// normalization. A rejection is `Ok(false)`, not an error.
    pub async fn classify(&self, content: &str) -> Result<bool, AnalysisError> {
        let prompt = build_classify_prompt(content);
        let response = self
            .llm
            .generate(&prompt, Some(CLASSIFY_SYSTEM_PROMPT), Some(5), Some(0.0))
            .await?;

        if response.text.is_empty() {
            return Err(AnalysisError::EmptyResponse);
        }

        let verdict = normalize_verdict(&response.text);
        tracing::info!(%verdict, "analysis.classify.verdict");
        Ok(verdict == "true")
    }
}

fn normalize_verdict(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '\n' | '"' | '\''))
        .collect()
}
