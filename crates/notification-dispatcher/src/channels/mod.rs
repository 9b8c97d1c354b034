//! 通知渠道实现
//!
//! 定义通知渠道 trait 并提供内置渠道的具体实现。
//!
//! ## 内置渠道
//!
//! - **Email**: 邮件通知，优先发送 HTML 正文
//! - **SMS**: 短信通知，超出长度限制时截断
//! - **Push**: App 推送通知
//!
//! 渠道只负责把内容交给外部投递服务（[`Transport`]），分发器只通过
//! [`NotificationChannel`] 与渠道交互，新增渠道不需要修改分发逻辑。

mod app_push;
mod email;
mod sms;
mod transport;

pub use app_push::AppPushChannel;
pub use email::EmailChannel;
pub use sms::SmsChannel;
pub use transport::{LogTransport, OutboundMessage, Transport};

#[cfg(test)]
pub use transport::MockTransport;

use std::time::Duration;

use async_trait::async_trait;
use tracing::warn;

use crate::error::{NotifyError, Result, ValidationReason};
use crate::types::{Content, DeliveryReceipt};

/// 通知渠道 trait
///
/// 所有投递目标都需要实现此 trait。名称是渠道的唯一标识，注册表按名称索引。
/// 实现应当是无状态的，便于并发调用。
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// 渠道名称（稳定且唯一）
    fn name(&self) -> &str;

    /// 发送通知
    ///
    /// `content` 已经过格式化器按渠道适配。失败返回 Err，由分发器记录为 Failed。
    async fn send(&self, recipient: &str, content: &Content) -> Result<DeliveryReceipt>;

    /// 单次发送的超时时间
    ///
    /// 返回 None 时使用分发器的默认渠道超时。
    fn timeout(&self) -> Option<Duration> {
        None
    }
}

/// 渠道配置
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// 是否启用
    pub enabled: bool,
    /// 请求超时（毫秒）
    pub timeout_ms: u64,
    /// 重试次数（不含首次发送）
    pub max_retries: u32,
    /// 重试退避基数（毫秒），第 n 次重试等待 n 倍
    pub retry_backoff_ms: u64,
    /// API 端点（如有）
    pub endpoint: Option<String>,
    /// API 密钥（如有）
    pub api_key: Option<String>,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::new(true)
    }
}

impl ChannelConfig {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            timeout_ms: 5000,
            max_retries: 3,
            retry_backoff_ms: 100,
            endpoint: None,
            api_key: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_backoff(mut self, retry_backoff_ms: u64) -> Self {
        self.retry_backoff_ms = retry_backoff_ms;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

/// 渠道发送前的公共检查：渠道启用且收件人非空
fn ensure_sendable(channel: &str, config: &ChannelConfig, recipient: &str) -> Result<()> {
    if !config.enabled {
        warn!(channel, "渠道已禁用");
        return Err(NotifyError::ChannelDisabled {
            channel: channel.to_string(),
        });
    }
    if recipient.trim().is_empty() {
        return Err(NotifyError::validation(
            ValidationReason::InvalidRecipient,
            format!("{channel} 收件人不能为空"),
        ));
    }
    Ok(())
}

/// 带重试的投递
///
/// 仅对可重试错误（投递故障、超时）重试，校验类错误直接返回。
async fn deliver_with_retry(
    transport: &dyn Transport,
    config: &ChannelConfig,
    message: &OutboundMessage,
) -> Result<DeliveryReceipt> {
    let mut attempt = 0;
    loop {
        match transport.deliver(message).await {
            Ok(message_id) => return Ok(DeliveryReceipt::new(message_id)),
            Err(e) if e.is_retryable() && attempt < config.max_retries => {
                attempt += 1;
                warn!(
                    channel = %message.channel,
                    attempt,
                    max_retries = config.max_retries,
                    error = %e,
                    "投递失败，准备重试"
                );
                tokio::time::sleep(config.backoff(attempt)).await;
            }
            Err(e) => return Err(e),
        }
    }
}
