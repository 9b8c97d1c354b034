//! 网关错误类型定义
//!
//! 把分发器错误映射为 HTTP 响应，校验错误透传具体原因码。

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use notification_dispatcher::NotifyError;
use serde_json::json;

/// 网关错误类型
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    // 验证错误
    #[error("{message}")]
    Validation { code: &'static str, message: String },

    // 系统错误
    #[error("偏好存储错误: {0}")]
    PreferenceStore(String),
    #[error("内部错误: {0}")]
    Internal(String),
}

impl GatewayError {
    /// 返回对应的 HTTP 状态码
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::PreferenceStore(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 返回错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation { code, .. } => *code,
            Self::PreferenceStore(_) => "PREFERENCE_STORE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // 系统级错误只返回通用提示，详细信息仅记录日志
        let message = match &self {
            Self::PreferenceStore(e) => {
                tracing::error!(error = %e, "偏好存储操作失败");
                "服务内部错误，请稍后重试".to_string()
            }
            Self::Internal(e) => {
                tracing::error!(error = %e, "内部错误");
                "服务内部错误，请稍后重试".to_string()
            }
            other => other.to_string(),
        };

        let body = json!({
            "success": false,
            "code": self.error_code(),
            "message": message,
            "data": serde_json::Value::Null
        });

        (status, axum::Json(body)).into_response()
    }
}

/// 从 validator 错误转换
impl From<validator::ValidationErrors> for GatewayError {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Validation {
            code: "VALIDATION_ERROR",
            message: format!("参数验证失败: {errors}"),
        }
    }
}

/// 从请求体解析错误转换
///
/// 缺少必填字段、类型不符或 JSON 语法错误统一按校验失败处理。
impl From<JsonRejection> for GatewayError {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation {
            code: "INVALID_REQUEST_BODY",
            message: format!("请求体格式错误: {}", rejection.body_text()),
        }
    }
}

/// 从分发器错误转换
impl From<NotifyError> for GatewayError {
    fn from(err: NotifyError) -> Self {
        match err {
            NotifyError::Validation { reason, message } => Self::Validation {
                code: reason.as_str(),
                message,
            },
            NotifyError::PreferenceStore(msg) => Self::PreferenceStore(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// 服务层 Result 类型别名
pub type Result<T> = std::result::Result<T, GatewayError>;
