//! App Push 推送通知渠道
//!
//! 推送正文的截断由格式化器完成，渠道直接投递。

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

/// App Push 推送通知渠道
pub struct AppPushChannel {
    config: ChannelConfig,
    transport: Arc<dyn Transport>,
}

impl AppPushChannel {
    pub const NAME: &'static str = "Push";

    pub fn new(config: ChannelConfig, transport: Arc<dyn Transport>) -> Self {
        Self { config, transport }
    }

    /// 使用默认配置和模拟投递服务创建
    pub fn with_defaults() -> Self {
        Self::new(
            ChannelConfig::new(true).with_timeout(3000),
            Arc::new(LogTransport::new("push")),
        )
    }
}

#[async_trait]
impl NotificationChannel for AppPushChannel {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn send(&self, recipient: &str, content: &Content) -> Result<DeliveryReceipt> {
        ensure_sendable(Self::NAME, &self.config, recipient)?;

        debug!(recipient, title = %content.title(), "Push 发送中...");

        let message = OutboundMessage::new(Self::NAME, recipient, content.plain_body())
            .with_subject(content.title())
            .with_link(content.action_url());
        deliver_with_retry(self.transport.as_ref(), &self.config, &message).await
    }

    fn timeout(&self) -> Option<Duration> {
        Some(self.config.timeout())
    }
}
