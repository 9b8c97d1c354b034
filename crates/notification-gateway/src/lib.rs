//! 通知网关服务
//!
//! 以 REST API 形式暴露通知分发能力。
//!
//! ## 核心功能
//!
//! - **发送通知**：按用户偏好扇出到各渠道，返回逐渠道结果
//! - **偏好管理**：查询与整体替换用户的渠道偏好
//! - **渠道查询**：列出当前已注册的渠道
//!
//! ## 模块结构
//!
//! - `dto`: 请求和响应的数据传输对象
//! - `error`: 错误类型定义
//! - `handlers`: HTTP 请求处理器
//! - `routes`: 路由配置
//! - `state`: 应用状态
//!
//! ## 技术栈
//!
//! - Web 框架：Axum
//! - 数据验证：validator
//! - 序列化：serde (camelCase)

pub mod dto;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use dto::{
    ApiResponse, ContentRequest, DispatchResultDto, SendNotificationRequest,
    UpdatePreferencesRequest,
};
pub use error::{GatewayError, Result};
pub use state::AppState;
