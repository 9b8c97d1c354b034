//! 通知发送 API 处理器

use std::time::Duration;

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use tracing::info;
use validator::Validate;

use crate::{
    dto::{ApiResponse, DispatchResultDto, SendNotificationRequest},
    error::GatewayError,
    state::AppState,
};

/// 发送通知
///
/// POST /api/v1/notifications
///
/// 请求通过校验即返回 202，各渠道的成败在 `outcomes` 中逐一给出。
/// 请求体无法解析（如缺少 `content`）时返回 400。
pub async fn send_notification(
    State(state): State<AppState>,
    payload: Result<Json<SendNotificationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ApiResponse<DispatchResultDto>>), GatewayError> {
    let Json(req) = payload?;
    req.validate()?;

    let content = req.content.into_content()?;
    let deadline = req.deadline_ms.map(Duration::from_millis);

    let report = state
        .dispatcher
        .dispatch(&req.user_id, &req.contact, &content, deadline)
        .await?;

    info!(
        dispatch_id = %report.dispatch_id,
        user_id = %req.user_id,
        sent = report.sent_count(),
        failed = report.failed_count(),
        skipped = report.skipped_count(),
        "Notification dispatched"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success_with_message(
            DispatchResultDto::from(report),
            "通知已分发",
        )),
    ))
}
