//! URL analysis and content classification.
//!
//! [`UrlAnalyzer::analyze`] fetches a page, extracts its readable text, asks
//! the model for a `title`/`summary`/`tags` object and tolerantly recovers it.
//! [`ContentClassifier::classify`] asks the model whether a text is about
//! technology.

pub mod classify;
pub mod error;
pub mod extract;
pub mod pipeline;
pub mod prompt;
pub mod recover;

pub use classify::ContentClassifier;
pub use error::AnalysisError;
pub use pipeline::{FetchSettings, UrlAnalyzer};
pub use recover::{AnalysisResult, Summary};
