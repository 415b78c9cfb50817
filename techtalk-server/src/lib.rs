//! HTTP surface of the Tech Talk board: posts, comments, LLM-assisted
//! analysis and the weekly digest endpoints.

pub mod app;
pub mod error;
pub mod jobs;
pub mod routes;

pub use app::{AppState, build_app};
pub use error::ApiError;
