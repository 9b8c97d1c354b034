//! 渠道查询 API 处理器

use axum::{Json, extract::State};

use crate::{dto::ApiResponse, state::AppState};

/// 获取已注册渠道列表
///
/// GET /api/v1/channels
pub async fn list_channels(State(state): State<AppState>) -> Json<ApiResponse<Vec<String>>> {
    Json(ApiResponse::success(state.dispatcher.list_channel_names()))
}
