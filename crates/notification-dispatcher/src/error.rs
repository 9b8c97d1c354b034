//! 通知分发错误类型
//!
//! 区分"中止整次分发"的校验错误与"仅影响单个渠道"的发送错误：
//! 前者由 `dispatch` 直接返回，后者在渠道边界被捕获并记录为 Failed 结果。

use serde::Serialize;
use thiserror::Error;

/// 校验失败原因码
///
/// 作为机器可读的错误码透传给 API 调用方。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationReason {
    MissingUserId,
    MissingContact,
    MissingTitle,
    MissingBody,
    InvalidChannelName,
    InvalidRecipient,
}

impl ValidationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MissingUserId => "MISSING_USER_ID",
            Self::MissingContact => "MISSING_CONTACT",
            Self::MissingTitle => "MISSING_TITLE",
            Self::MissingBody => "MISSING_BODY",
            Self::InvalidChannelName => "INVALID_CHANNEL_NAME",
            Self::InvalidRecipient => "INVALID_RECIPIENT",
        }
    }
}

impl std::fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 通知系统错误类型
#[derive(Debug, Error)]
pub enum NotifyError {
    // ==================== 校验错误 ====================
    #[error("参数验证失败: {message}")]
    Validation {
        reason: ValidationReason,
        message: String,
    },

    // ==================== 渠道错误 ====================
    #[error("渠道已禁用: {channel}")]
    ChannelDisabled { channel: String },

    #[error("渠道投递失败: {channel} - {message}")]
    Transport { channel: String, message: String },

    #[error("渠道发送超时: {channel}")]
    Timeout { channel: String },

    // ==================== 外部依赖错误 ====================
    #[error("偏好存储错误: {0}")]
    PreferenceStore(String),

    // ==================== 通用错误 ====================
    #[error("内部错误: {0}")]
    Internal(String),
}

/// 错误结果类型别名
pub type Result<T> = std::result::Result<T, NotifyError>;

impl NotifyError {
    /// 构造校验错误
    pub fn validation(reason: ValidationReason, message: impl Into<String>) -> Self {
        Self::Validation {
            reason,
            message: message.into(),
        }
    }

    /// 构造渠道投递错误
    pub fn transport(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// 获取错误码
    ///
    /// 校验错误返回具体的原因码，便于调用方按原因分支处理。
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { reason, .. } => reason.as_str(),
            Self::ChannelDisabled { .. } => "CHANNEL_DISABLED",
            Self::Transport { .. } => "TRANSPORT_ERROR",
            Self::Timeout { .. } => "CHANNEL_TIMEOUT",
            Self::PreferenceStore(_) => "PREFERENCE_STORE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// 是否为可重试错误
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout { .. })
    }

    /// 是否为校验错误
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }
}
