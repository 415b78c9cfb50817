use crate::app::AppState;
use crate::error::ApiError;
use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::{Value, json};
use techtalk_store::{CommentRecord, NewComment};

/// PATCH/DELETE body. Fields are optional so a missing one is a 400 with a
/// message rather than a body rejection.
#[derive(Debug, Default, Deserialize)]
pub struct CommentAuth {
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub offset: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_limit() -> u32 {
    20
}

pub async fn create_comment(
    State(state): State<AppState>,
    Json(body): Json<NewComment>,
) -> Result<Json<CommentRecord>, ApiError> {
    Ok(Json(state.store.create_comment(body).await?))
}

pub async fn update_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CommentAuth>,
) -> Result<Json<CommentRecord>, ApiError> {
    let updated = state
        .store
        .update_comment(id, body.password.as_deref(), body.content.as_deref())
        .await?;
    Ok(Json(updated))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<CommentAuth>,
) -> Result<Json<Value>, ApiError> {
    state
        .store
        .delete_comment(id, body.password.as_deref())
        .await?;
    Ok(Json(json!({ "success": true })))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(post_id): Path<i64>,
    Query(paging): Query<Paging>,
) -> Result<Json<Vec<CommentRecord>>, ApiError> {
    let page = state
        .store
        .list_comments(post_id, paging.offset, paging.limit)
        .await?;
    Ok(Json(page))
}
