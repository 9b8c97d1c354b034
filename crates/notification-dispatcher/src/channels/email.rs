//! Email 邮件通知渠道
//!
//! 有 HTML 正文时发送 HTML，否则退回纯文本。HTML 的生成由格式化器负责。
//! 收件人只检查是否包含 `@`，不做完整的地址语法校验。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::{
    ChannelConfig, LogTransport, NotificationChannel, OutboundMessage, Transport,
    deliver_with_retry, ensure_sendable,
};
use crate::error::{NotifyError, Result, ValidationReason};
use crate::types::{Content, DeliveryReceipt};

/// Email 邮件通知渠道
pub struct EmailChannel {
    config: ChannelConfig,
    transport: Arc<dyn Transport>,
    /// 发件人地址
    from_address: String,
}

impl EmailChannel {
    pub const NAME: &'static str = "Email";

    pub fn new(config: ChannelConfig, transport: Arc<dyn Transport>, from_address: String) -> Self {
        Self {
            config,
            transport,
            from_address,
        }
    }

    /// 使用默认配置和模拟投递服务创建
    pub fn with_defaults() -> Self {
        Self::new(
            ChannelConfig::new(true).with_timeout(10000),
            Arc::new(LogTransport::new("email")),
            "noreply@notify.local".to_string(),
        )
    }

    fn ensure_address(recipient: &str) -> Result<()> {
        if !recipient.contains('@') {
            return Err(NotifyError::validation(
                ValidationReason::InvalidRecipient,
                format!("邮箱地址无效: {recipient}"),
            ));
        }
        Ok(())
    }

    fn build_message(&self, recipient: &str, content: &Content) -> OutboundMessage {
        let body = content.html_body().unwrap_or(content.plain_body());
        OutboundMessage::new(Self::NAME, recipient, body)
            .with_sender(&self.from_address)
            .with_subject(content.title())
            .with_link(content.action_url())
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn send(&self, recipient: &str, content: &Content) -> Result<DeliveryReceipt> {
        ensure_sendable(Self::NAME, &self.config, recipient)?;
        Self::ensure_address(recipient)?;

        let message = self.build_message(recipient, content);
        debug!(
            recipient,
            from = %self.from_address,
            subject = %content.title(),
            html = content.html_body().is_some(),
            "Email 发送中..."
        );

        deliver_with_retry(self.transport.as_ref(), &self.config, &message).await
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.config.timeout())
    }
}
