//! URL analysis: fetch, extract, prompt, complete, recover.

use crate::error::AnalysisError;
use crate::extract;
use crate::prompt::{ANALYSIS_SYSTEM_PROMPT, build_prompt};
use crate::recover::{AnalysisResult, recover};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::sync::Arc;
use std::time::Duration;
use techtalk_config::FetchConfig;
use techtalk_http::{HttpClient, RequestOpts};
use techtalk_llm::traits::LlmClient;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (compatible; TechTalkBot/1.0)";
const ANALYSIS_TEMPERATURE: f32 = 0.3;
const ANALYSIS_MAX_TOKENS: u32 = 500;

/// Page fetch knobs.
#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_chars: usize,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(10),
            max_chars: extract::MAX_CHARS,
        }
    }
}

impl From<&FetchConfig> for FetchSettings {
    fn from(cfg: &FetchConfig) -> Self {
        Self {
            user_agent: cfg.user_agent.clone(),
            timeout: Duration::from_secs(cfg.timeout_secs),
            max_chars: cfg.max_chars,
        }
    }
}

/// Summarizes a web page into an [`AnalysisResult`] with the help of an LLM.
#[derive(Clone)]
pub struct UrlAnalyzer {
    http: HttpClient,
    llm: Arc<dyn LlmClient + Send + Sync>,
    headers: HeaderMap,
    settings: FetchSettings,
}

impl UrlAnalyzer {
    pub fn new(
        llm: Arc<dyn LlmClient + Send + Sync>,
        settings: FetchSettings,
    ) -> Result<Self, AnalysisError> {
        let http = HttpClient::unanchored()
            .map_err(|e| AnalysisError::Other(e.to_string()))?
            .with_timeout(settings.timeout);

        let mut headers = HeaderMap::new();
        let ua = HeaderValue::from_str(&settings.user_agent)
            .map_err(|e| AnalysisError::Other(format!("invalid user agent: {e}")))?;
        headers.insert(USER_AGENT, ua);

        Ok(Self {
            http,
            llm,
            headers,
            settings,
        })
    }

    /// Run the full pipeline for `url`. All-or-nothing: any stage failure
    /// aborts the run, but unparsable model prose still yields a result.
    pub async fn analyze(&self, url: &str) -> Result<AnalysisResult, AnalysisError> {
        tracing::info!(%url, "analysis.fetch.start");
        let html = self
            .http
            .get_text(
                url,
                RequestOpts {
                    headers: Some(self.headers.clone()),
                    timeout: Some(self.settings.timeout),
                    ..Default::default()
                },
            )
            .await
            .inspect_err(|e| tracing::warn!(%url, error = %e, "analysis.fetch.failed"))?;

        let text = extract::extract_with_limit(&html, self.settings.max_chars);
        tracing::debug!(
            %url,
            html_bytes = html.len(),
            text_chars = text.chars().count(),
            "analysis.extract.done"
        );

        let prompt = build_prompt(url, &text);
        let response = self
            .llm
            .generate(
                &prompt,
                Some(ANALYSIS_SYSTEM_PROMPT),
                Some(ANALYSIS_MAX_TOKENS),
                Some(ANALYSIS_TEMPERATURE),
            )
            .await
            .inspect_err(|e| tracing::warn!(%url, error = %e, "analysis.complete.failed"))?;

        if response.text.is_empty() {
            tracing::warn!(%url, "analysis.complete.empty");
            return Err(AnalysisError::EmptyResponse);
        }
        tracing::debug!(%url, raw = %response.text, "analysis.complete.raw");

        let result = recover(url, &response.text);
        tracing::info!(
            %url,
            title = %result.title,
            tags = result.tags.len(),
            "analysis.done"
        );
        Ok(result)
    }
}
