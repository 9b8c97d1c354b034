//! SMS 短信通知渠道
//!
//! 短信有长度限制，超长正文在渠道内截断，格式化器不处理短信长度。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{
    ChannelConfig, LogTransport, NotificationChannel, OutboundMessage, Transport,
    deliver_with_retry, ensure_sendable,
};
use crate::error::Result;
use crate::types::{Content, DeliveryReceipt};

/// 短信默认长度上限（字符数）
pub const DEFAULT_SMS_MAX_LENGTH: usize = 160;

const ELLIPSIS: &str = "...";

/// SMS 短信通知渠道
pub struct SmsChannel {
    config: ChannelConfig,
    transport: Arc<dyn Transport>,
    /// 短信内容最大长度（字符数）
    max_content_length: usize,
}

impl SmsChannel {
    pub const NAME: &'static str = "SMS";

    pub fn new(config: ChannelConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            transport,
            max_content_length: DEFAULT_SMS_MAX_LENGTH,
        }
    }

    /// 使用默认配置和模拟投递服务创建
    pub fn with_defaults() -> Self {
        Self::new(
            ChannelConfig::new(true).with_timeout(5000),
            Arc::new(LogTransport::new("sms")),
        )
    }

    /// 设置长度上限，最小为省略号长度
    pub fn with_max_length(mut self, max_content_length: usize) -> Self {
        self.max_content_length = max_content_length.max(ELLIPSIS.len());
        self
    }

    /// 截断过长的内容
    ///
    /// 超出上限时保留前 `max - 3` 个字符并追加 "..."，结果恰好为上限长度。
    pub fn truncate_content(&self, content: &str) -> String {
        if content.chars().count() <= self.max_content_length {
            return content.to_string();
        }
        let keep = self.max_content_length - ELLIPSIS.len();
        let truncated: String = content.chars().take(keep).collect();
        format!("{truncated}{ELLIPSIS}")
    }
}

#[async_trait]
impl NotificationChannel for SmsChannel {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn send(&self, recipient: &str, content: &Content) -> Result<DeliveryReceipt> {
        ensure_sendable(Self::NAME, &self.config, recipient)?;

        let body = self.truncate_content(content.plain_body());
        debug!(
            recipient,
            content_length = body.chars().count(),
            max_length = self.max_content_length,
            "SMS 发送中..."
        );

        let message = OutboundMessage::new(Self::NAME, recipient, body);
        deliver_with_retry(self.transport.as_ref(), &self.config, &message).await
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.config.timeout())
    }
}
