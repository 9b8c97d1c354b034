//! 路由配置模块
//!
//! 定义所有 REST API 端点的路由映射

use axum::{
    Router, middleware,
    routing::{get, post},
};
use notify_shared::observability::middleware as obs_middleware;

use crate::{handlers, state::AppState};

/// 构建业务 API 路由
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/notifications",
            post(handlers::notification::send_notification),
        )
        .route(
            "/users/{user_id}/preferences",
            get(handlers::preference::get_preferences)
                .put(handlers::preference::update_preferences),
        )
        .route("/channels", get(handlers::channel::list_channels))
}

/// 构建完整应用
///
/// 包含业务路由、健康检查以及可观测性中间件
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_routes())
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .layer(middleware::from_fn(obs_middleware::http_tracing))
        .layer(middleware::from_fn(obs_middleware::request_id))
        .with_state(state)
}
