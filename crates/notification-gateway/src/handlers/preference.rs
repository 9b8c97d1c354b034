//! 用户偏好 API 处理器

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};
use notification_dispatcher::ResolvedPreferences;
use notify_shared::observability::metrics;
use tracing::info;
use validator::Validate;

use crate::{
    dto::{ApiResponse, UpdatePreferencesRequest},
    error::GatewayError,
    state::AppState,
};

/// 获取用户渠道偏好
///
/// GET /api/v1/users/{user_id}/preferences
///
/// 用户无偏好记录时返回全部已注册渠道，`isDefault` 为 true。
pub async fn get_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<ResolvedPreferences>>, GatewayError> {
    let preferences = state.dispatcher.get_preferences(&user_id).await?;
    Ok(Json(ApiResponse::success(preferences)))
}

/// 整体替换用户渠道偏好
///
/// PUT /api/v1/users/{user_id}/preferences
pub async fn update_preferences(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    payload: Result<Json<UpdatePreferencesRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<ResolvedPreferences>>, GatewayError> {
    let Json(req) = payload?;
    req.validate()?;

    let channels = state
        .dispatcher
        .set_preferences(&user_id, req.channels)
        .await?;

    metrics::record_preference_update(channels.len());
    info!(user_id = %user_id, channels = ?channels, "Preferences updated");

    Ok(Json(ApiResponse::success(ResolvedPreferences {
        user_id,
        channels,
        is_default: false,
    })))
}
