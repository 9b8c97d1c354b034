//! 通知类型定义
//!
//! 定义通知内容、单渠道发送结果以及整次分发的汇总报告。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{NotifyError, Result, ValidationReason};

/// 规范化渠道名称
///
/// 渠道名可能来自用户可编辑的偏好数据，统一去除首尾空白并转为小写后再比较。
pub fn channel_key(name: &str) -> String {
    name.trim().to_ascii_lowercase()
}

/// 通知内容
///
/// 值语义：字段只读，所有变换都返回新的实例，调用方传入的内容在分发后仍可复用。
/// `title` 与 `plain_body` 始终非空。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Content {
    title: String,
    plain_body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    html_body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    action_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    action_text: Option<String>,
}

impl Content {
    /// 创建通知内容
    ///
    /// 标题或正文为空（或仅含空白）时返回校验错误。
    pub fn new(title: impl Into<String>, plain_body: impl Into<String>) -> Result<Self> {
        let content = Self {
            title: title.into(),
            plain_body: plain_body.into(),
            html_body: None,
            action_url: None,
            action_text: None,
        };
        content.validate()?;
        Ok(content)
    }

    /// 校验内容不变量
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(NotifyError::validation(
                ValidationReason::MissingTitle,
                "通知标题不能为空",
            ));
        }
        if self.plain_body.trim().is_empty() {
            return Err(NotifyError::validation(
                ValidationReason::MissingBody,
                "通知正文不能为空",
            ));
        }
        Ok(())
    }

    /// 设置 HTML 正文
    pub fn with_html_body(mut self, html_body: impl Into<String>) -> Self {
        self.html_body = Some(html_body.into());
        self
    }

    /// 设置操作链接
    pub fn with_action_url(mut self, action_url: impl Into<String>) -> Self {
        self.action_url = Some(action_url.into());
        self
    }

    /// 设置操作链接的文案
    pub fn with_action_text(mut self, action_text: impl Into<String>) -> Self {
        self.action_text = Some(action_text.into());
        self
    }

    /// 复制一份并替换正文，调用方保证新正文非空
    pub(crate) fn copy_with_plain_body(&self, plain_body: String) -> Self {
        Self {
            plain_body,
            ..self.clone()
        }
    }

    /// 复制一份并设置 HTML 正文
    pub(crate) fn copy_with_html_body(&self, html_body: String) -> Self {
        Self {
            html_body: Some(html_body),
            ..self.clone()
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn plain_body(&self) -> &str {
        &self.plain_body
    }

    pub fn html_body(&self) -> Option<&str> {
        self.html_body.as_deref()
    }

    pub fn action_url(&self) -> Option<&str> {
        self.action_url.as_deref()
    }

    pub fn action_text(&self) -> Option<&str> {
        self.action_text.as_deref()
    }
}

/// 渠道投递回执
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryReceipt {
    /// 外部系统返回的消息 ID
    pub message_id: String,
}

impl DeliveryReceipt {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
        }
    }
}

/// 单渠道发送状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    /// 发送成功
    Sent,
    /// 发送失败（含超时）
    Failed,
    /// 渠道未注册，已跳过
    SkippedUnavailable,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "SENT",
            Self::Failed => "FAILED",
            Self::SkippedUnavailable => "SKIPPED_UNAVAILABLE",
        }
    }
}

/// 单渠道分发结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutcome {
    /// 渠道名称
    pub channel: String,
    /// 发送状态
    pub status: DeliveryStatus,
    /// 失败原因或跳过说明
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// 外部系统消息 ID（成功时）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// 发送耗时（毫秒）
    pub duration_ms: u64,
}

impl DispatchOutcome {
    /// 创建成功结果
    pub fn sent(channel: impl Into<String>, receipt: DeliveryReceipt, duration_ms: u64) -> Self {
        Self {
            channel: channel.into(),
            status: DeliveryStatus::Sent,
            detail: None,
            message_id: Some(receipt.message_id),
            duration_ms,
        }
    }

    /// 创建失败结果
    pub fn failed(channel: impl Into<String>, detail: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            channel: channel.into(),
            status: DeliveryStatus::Failed,
            detail: Some(detail.into()),
            message_id: None,
            duration_ms,
        }
    }

    /// 创建跳过结果（渠道未注册）
    pub fn skipped(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            status: DeliveryStatus::SkippedUnavailable,
            detail: Some("渠道未注册".to_string()),
            message_id: None,
            duration_ms: 0,
        }
    }

    pub fn is_sent(&self) -> bool {
        self.status == DeliveryStatus::Sent
    }

    pub fn is_failed(&self) -> bool {
        self.status == DeliveryStatus::Failed
    }

    pub fn is_skipped(&self) -> bool {
        self.status == DeliveryStatus::SkippedUnavailable
    }
}

/// 分发汇总报告
///
/// 每次调用 `dispatch` 生成一份，返回给调用方后即丢弃，不做持久化。
/// 调用成功不代表所有渠道都成功，调用方需检查 `outcomes`。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchReport {
    /// 分发 ID
    pub dispatch_id: String,
    /// 目标用户 ID
    pub user_id: String,
    /// 各渠道结果，顺序与偏好顺序一致
    pub outcomes: Vec<DispatchOutcome>,
    /// 总耗时（毫秒）
    pub duration_ms: u64,
    /// 分发时间
    pub dispatched_at: DateTime<Utc>,
}

impl DispatchReport {
    pub fn new(
        dispatch_id: impl Into<String>,
        user_id: impl Into<String>,
        outcomes: Vec<DispatchOutcome>,
        duration_ms: u64,
    ) -> Self {
        Self {
            dispatch_id: dispatch_id.into(),
            user_id: user_id.into(),
            outcomes,
            duration_ms,
            dispatched_at: Utc::now(),
        }
    }

    /// 按渠道名查找结果（大小写不敏感）
    pub fn outcome(&self, channel: &str) -> Option<&DispatchOutcome> {
        let key = channel_key(channel);
        self.outcomes.iter().find(|o| channel_key(&o.channel) == key)
    }

    pub fn sent_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_sent()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    /// 是否所有尝试的渠道都发送成功
    ///
    /// 没有任何渠道时返回 false。
    pub fn all_sent(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|o| o.is_sent())
    }

    /// 是否部分成功
    pub fn is_partial_success(&self) -> bool {
        let sent = self.sent_count();
        sent > 0 && sent < self.outcomes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_creation() {
        let content = Content::new("Order Confirmed", "Total: $42")
            .unwrap()
            .with_action_url("https://x/o/1")
            .with_action_text("View");

        assert_eq!(content.title(), "Order Confirmed");
        assert_eq!(content.plain_body(), "Total: $42");
        assert_eq!(content.html_body(), None);
        assert_eq!(content.action_url(), Some("https://x/o/1"));
        assert_eq!(content.action_text(), Some("View"));
    }

    #[test]
    fn test_content_rejects_empty_title() {
        let err = Content::new("", "正文").unwrap_err();
        assert_eq!(err.code(), "MISSING_TITLE");

        let err = Content::new("   ", "正文").unwrap_err();
        assert_eq!(err.code(), "MISSING_TITLE");
    }

    #[test]
    fn test_content_rejects_empty_body() {
        let err = Content::new("标题", "").unwrap_err();
        assert_eq!(err.code(), "MISSING_BODY");

        let err = Content::new("标题", "\n").unwrap_err();
        assert_eq!(err.code(), "MISSING_BODY");
    }

    #[test]
    fn test_content_transform_returns_new_value() {
        let original = Content::new("标题", "正文").unwrap();
        let changed = original.clone().with_html_body("<p>正文</p>");

        assert_eq!(original.html_body(), None);
        assert_eq!(changed.html_body(), Some("<p>正文</p>"));
    }

    #[test]
    fn test_content_serialization() {
        let content = Content::new("标题", "正文").unwrap().with_action_url("https://x");
        let json = serde_json::to_value(&content).unwrap();

        assert_eq!(json["title"], "标题");
        assert_eq!(json["plainBody"], "正文");
        assert_eq!(json["actionUrl"], "https://x");
        assert!(json.get("htmlBody").is_none());
    }

    #[test]
    fn test_channel_key() {
        assert_eq!(channel_key("  Email "), "email");
        assert_eq!(channel_key("SMS"), "sms");
    }

    #[test]
    fn test_outcome_constructors() {
        let sent = DispatchOutcome::sent("Email", DeliveryReceipt::new("email_1"), 12);
        assert!(sent.is_sent());
        assert_eq!(sent.message_id.as_deref(), Some("email_1"));
        assert!(sent.detail.is_none());

        let failed = DispatchOutcome::failed("Push", "timeout", 5000);
        assert!(failed.is_failed());
        assert_eq!(failed.detail.as_deref(), Some("timeout"));

        let skipped = DispatchOutcome::skipped("Fax");
        assert!(skipped.is_skipped());
        assert_eq!(skipped.duration_ms, 0);
    }

    #[test]
    fn test_report_counters() {
        let report = DispatchReport::new(
            "d-1",
            "user-1",
            vec![
                DispatchOutcome::sent("Email", DeliveryReceipt::new("m1"), 10),
                DispatchOutcome::failed("SMS", "网关错误", 20),
                DispatchOutcome::skipped("Fax"),
            ],
            30,
        );

        assert_eq!(report.sent_count(), 1);
        assert_eq!(report.failed_count(), 1);
        assert_eq!(report.skipped_count(), 1);
        assert!(!report.all_sent());
        assert!(report.is_partial_success());
        assert!(report.outcome("email").unwrap().is_sent());
    }

    #[test]
    fn test_empty_report_is_not_all_sent() {
        let report = DispatchReport::new("d-2", "user-1", vec![], 0);
        assert!(!report.all_sent());
        assert!(!report.is_partial_success());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_value(DeliveryStatus::SkippedUnavailable).unwrap();
        assert_eq!(json, "SKIPPED_UNAVAILABLE");
        assert_eq!(DeliveryStatus::Sent.as_str(), "SENT");
    }
}
