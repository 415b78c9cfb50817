use techtalk_common::TechTalkError;
use techtalk_http::HttpError;
use thiserror::Error;

/// Failure of a page analysis or classification call.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The page could not be fetched (transport error or non-2xx status).
    #[error("analysis failed: fetch failed: {0}")]
    Fetch(String),
    /// The model answered with no text at all.
    #[error("analysis failed: empty model response")]
    EmptyResponse,
    /// The model call itself failed.
    #[error("analysis failed: model call failed: {0}")]
    Model(String),
    #[error("analysis failed: {0}")]
    Other(String),
}

impl From<HttpError> for AnalysisError {
    fn from(e: HttpError) -> Self {
        AnalysisError::Fetch(e.to_string())
    }
}

impl From<TechTalkError> for AnalysisError {
    fn from(e: TechTalkError) -> Self {
        AnalysisError::Model(e.to_string())
    }
}
