use crate::app::AppState;
use crate::error::ApiError;
use axum::Json;
use axum::extract::{Path, State};
use serde::Deserialize;
use serde_json::{Value, json};
use techtalk_store::{NewPost, PostDetail, PostRecord, PostSummary, PostUpdate};

#[derive(Debug, Deserialize)]
pub struct PasswordBody {
    pub password: String,
}

pub async fn list_posts(State(state): State<AppState>) -> Result<Json<Vec<PostSummary>>, ApiError> {
    Ok(Json(state.store.list_posts().await?))
}

pub async fn get_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<PostDetail>, ApiError> {
    Ok(Json(state.store.get_post(id).await?))
}

pub async fn create_post(
    State(state): State<AppState>,
    Json(body): Json<NewPost>,
) -> Result<Json<PostRecord>, ApiError> {
    Ok(Json(state.store.create_post(body).await?))
}

pub async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<PostUpdate>,
) -> Result<Json<PostRecord>, ApiError> {
    Ok(Json(state.store.update_post(id, body).await?))
}

pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<PasswordBody>,
) -> Result<Json<Value>, ApiError> {
    state.store.delete_post(id, &body.password).await?;
    Ok(Json(json!({ "ok": true })))
}

pub async fn verify_password(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<PasswordBody>,
) -> Result<Json<Value>, ApiError> {
    state.store.verify_post_password(id, &body.password).await?;
    Ok(Json(json!({ "ok": true })))
}
