use crate::app::AppState;
use crate::error::ApiError;
use axum::Json;
use axum::extract::State;
use chrono::{Days, Local};
use serde_json::{Value, json};
use techtalk_mail::{DigestOutcome, MailError, week_range};

pub async fn send_weekly(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let outcome = state
        .digest
        .send_weekly_digest()
        .await
        .map_err(|e| ApiError::Internal(format!("이메일 발송 중 오류가 발생했습니다: {e}")))?;

    match outcome {
        DigestOutcome::Sent { delivered, failed } if delivered > 0 => Ok(Json(json!({
            "message": "주간 이메일 발송이 완료되었습니다.",
            "success": true,
            "delivered": delivered,
            "failed": failed,
        }))),
        DigestOutcome::Sent { .. } => Err(ApiError::Internal(
            "이메일 발송에 실패했습니다. (모든 수신자 발송 실패)".into(),
        )),
        DigestOutcome::NoPosts => Err(ApiError::Internal(
            "이메일 발송에 실패했습니다. (지난 주 게시글 없음)".into(),
        )),
        DigestOutcome::NotConfigured => Err(ApiError::Internal(
            "이메일 발송에 실패했습니다. (이메일 설정 미완료)".into(),
        )),
    }
}

pub async fn weekly_posts(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let today = Local::now().date_naive();
    let posts = state
        .digest
        .weekly_posts_on(today)
        .await
        .map_err(|e| ApiError::Internal(format!("게시글 조회 중 오류가 발생했습니다: {e}")))?;
    let (start, end) = week_range(today);
    let last_day = end - Days::new(1);
    let count = posts.len();

    Ok(Json(json!({
        "posts": posts,
        "count": count,
        "week_range": {
            "start": start.format("%Y-%m-%d").to_string(),
            "end": last_day.format("%Y-%m-%d").to_string(),
        },
    })))
}

pub async fn status(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "scheduler": {
            "is_running": state.scheduler.is_running(),
            "jobs": state.scheduler.jobs(),
        },
        "email_config": state.digest.status(),
    }))
}

pub async fn send_test(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    match state.digest.send_test_email().await {
        Ok(recipients) => Ok(Json(json!({
            "message": "테스트 이메일이 발송되었습니다.",
            "recipients": recipients,
            "success": true,
        }))),
        Err(MailError::NotConfigured) => Err(ApiError::BadRequest(
            MailError::NotConfigured.to_string(),
        )),
        Err(e) => Err(ApiError::Internal(format!("테스트 이메일 발송 실패: {e}"))),
    }
}
