use crate::app::AppState;
use crate::error::ApiError;
use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};
use techtalk_analysis::AnalysisResult;

pub const NOT_TECH_DETAIL: &str = "기술 관련 글이 아닙니다.";

#[derive(Debug, Deserialize)]
pub struct AnalyzeUrlBody {
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzePostBody {
    pub content: String,
}

pub async fn analyze_url(
    State(state): State<AppState>,
    Json(body): Json<AnalyzeUrlBody>,
) -> Result<Json<AnalysisResult>, ApiError> {
    let analyzer = state
        .analyzer
        .as_ref()
        .ok_or_else(|| ApiError::Internal("URL 분석 실패: LLM is not configured".into()))?;
    let result = analyzer
        .analyze(&body.url)
        .await
        .map_err(|e| ApiError::Internal(format!("URL 분석 실패: {e}")))?;
    Ok(Json(result))
}

pub async fn analyze_post(
    State(state): State<AppState>,
    Json(body): Json<AnalyzePostBody>,
) -> Result<Json<Value>, ApiError> {
    let classifier = state
        .classifier
        .as_ref()
        .ok_or_else(|| ApiError::Internal("OpenAI 판별 실패: LLM is not configured".into()))?;
    let is_tech = classifier
        .classify(&body.content)
        .await
        .map_err(|e| ApiError::Internal(format!("OpenAI 판별 실패: {e}")))?;
    if is_tech {
        Ok(Json(json!({ "is_tech": true })))
    } else {
        Err(ApiError::BadRequest(NOT_TECH_DETAIL.into()))
    }
}
