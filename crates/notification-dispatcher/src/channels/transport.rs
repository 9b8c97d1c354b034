//! 外部投递服务抽象
//!
//! 真实的邮件、短信、推送服务商都在此 trait 之后。`LogTransport` 为模拟实现，
//! 只记录日志并生成消息 ID，生产环境替换为服务商 SDK 调用即可。

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;

/// 交给投递服务的出站消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundMessage {
    /// 渠道名称
    pub channel: String,
    /// 收件人（邮箱、手机号、设备 token 等）
    pub recipient: String,
    /// 发件人（如有）
    pub sender: Option<String>,
    /// 主题 / 推送标题
    pub subject: Option<String>,
    /// 正文
    pub body: String,
    /// 操作链接
    pub link: Option<String>,
}

impl OutboundMessage {
    pub fn new(
        channel: impl Into<String>,
        recipient: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            channel: channel.into(),
            recipient: recipient.into(),
            sender: None,
            subject: None,
            body: body.into(),
            link: None,
        }
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_link(mut self, link: Option<&str>) -> Self {
        self.link = link.map(str::to_string);
        self
    }
}

/// 投递服务 trait
///
/// 返回外部系统的消息 ID。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn deliver(&self, message: &OutboundMessage) -> Result<String>;
}

/// 模拟投递服务
///
/// 不发起任何网络请求，记录日志后返回 `{prefix}_{uuid}` 形式的消息 ID。
#[derive(Debug, Clone)]
pub struct LogTransport {
    prefix: String,
}

impl LogTransport {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl Transport for LogTransport {
    async fn deliver(&self, message: &OutboundMessage) -> Result<String> {
        let message_id = format!("{}_{}", self.prefix, Uuid::now_v7());

        info!(
            channel = %message.channel,
            recipient = %message.recipient,
            subject = ?message.subject,
            content_length = message.body.chars().count(),
            message_id = %message_id,
            "模拟投递通知"
        );

        Ok(message_id)
    }
}
