//! 健康检查处理器

use axum::{Json, extract::State, http::StatusCode};
use notify_shared::observability::metrics;

use crate::state::AppState;

const SERVICE_NAME: &str = "notification-gateway";

/// 存活探针：服务进程正常即返回 ok
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "service": SERVICE_NAME
    }))
}

/// 就绪探针：至少注册了一个渠道才接收流量
pub async fn readiness_check(
    State(state): State<AppState>,
) -> (StatusCode, Json<serde_json::Value>) {
    let channels = state.dispatcher.list_channel_names();
    metrics::set_registered_channels(channels.len());

    if channels.is_empty() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({
                "status": "not_ready",
                "service": SERVICE_NAME,
                "reason": "没有已注册的通知渠道"
            })),
        );
    }

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "ready",
            "service": SERVICE_NAME,
            "channels": channels
        })),
    )
}
