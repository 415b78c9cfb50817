use crate::routes::{self, analysis, comments, email, posts};
use axum::Router;
use axum::http::{HeaderValue, StatusCode};
use axum::routing::{get, post};
use std::sync::Arc;
use std::time::Duration;
use techtalk_analysis::{ContentClassifier, UrlAnalyzer};
use techtalk_mail::DigestService;
use techtalk_runtime::Scheduler;
use techtalk_store::PostStore;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;

/// Maximum request body size (64KB).
pub const MAX_BODY_SIZE: usize = 65_536;
/// Request timeout (30s) for non-analysis routes.
pub const REQUEST_TIMEOUT_SECS: u64 = 30;
/// URL analysis fetches a page and waits on the model, so it gets more room.
pub const ANALYSIS_TIMEOUT_SECS: u64 = 90;

/// Shared handler state. The analysis services are absent when no LLM
/// credentials are configured; those routes then answer 500.
#[derive(Clone)]
pub struct AppState {
    pub store: PostStore,
    pub analyzer: Option<UrlAnalyzer>,
    pub classifier: Option<ContentClassifier>,
    pub digest: Arc<DigestService>,
    pub scheduler: Arc<Scheduler>,
}

pub fn build_app(state: AppState, cors_origins: &[String]) -> Router {
    let analysis_routes = Router::new()
        .route("/analyze-url", post(analysis::analyze_url))
        .route("/analyze-post", post(analysis::analyze_post))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(ANALYSIS_TIMEOUT_SECS),
        ));

    let api_routes = Router::new()
        .route("/health", get(routes::health))
        .route("/posts", get(posts::list_posts).post(posts::create_post))
        .route(
            "/posts/{id}",
            get(posts::get_post)
                .put(posts::update_post)
                .delete(posts::delete_post),
        )
        .route("/posts/{id}/verify-password", post(posts::verify_password))
        .route("/comments", post(comments::create_comment))
        .route(
            "/comments/{id}",
            get(comments::list_comments)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
        .route("/email/send-weekly", post(email::send_weekly))
        .route("/email/weekly-posts", get(email::weekly_posts))
        .route("/email/status", get(email::status))
        .route("/email/test", post(email::send_test))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        ));

    let mut app = Router::new()
        .merge(api_routes)
        .merge(analysis_routes)
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE));

    let origins: Vec<HeaderValue> = cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    if !origins.is_empty() {
        // credentials rule out wildcards, so methods and headers are mirrored
        app = app.layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_credentials(true)
                .allow_methods(AllowMethods::mirror_request())
                .allow_headers(AllowHeaders::mirror_request()),
        );
    }

    app
}
