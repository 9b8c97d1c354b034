//! 请求与响应 DTO 定义
//!
//! 线上格式统一使用 camelCase。

use chrono::{DateTime, Utc};
use notification_dispatcher::{Content, DispatchOutcome, DispatchReport};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// API 统一响应
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// 创建成功响应
    pub fn success(data: T) -> Self {
        Self::success_with_message(data, "操作成功")
    }

    /// 创建成功响应（自定义消息）
    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            code: "SUCCESS".to_string(),
            message: message.into(),
            data: Some(data),
        }
    }
}

/// 通知内容
///
/// 标题与正文的非空校验由分发器完成，以便返回具体的原因码。
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ContentRequest {
    #[serde(default)]
    #[validate(length(max = 200, message = "标题不能超过 200 个字符"))]
    pub title: String,
    #[serde(default)]
    pub plain_body: String,
    pub html_body: Option<String>,
    #[validate(url(message = "操作链接必须是有效的 URL"))]
    pub action_url: Option<String>,
    #[validate(length(max = 50, message = "操作文案不能超过 50 个字符"))]
    pub action_text: Option<String>,
}

impl ContentRequest {
    /// 转换为领域内容，标题或正文为空时返回校验错误
    pub fn into_content(self) -> notification_dispatcher::Result<Content> {
        let mut content = Content::new(self.title, self.plain_body)?;
        if let Some(html) = self.html_body {
            content = content.with_html_body(html);
        }
        if let Some(url) = self.action_url {
            content = content.with_action_url(url);
        }
        if let Some(text) = self.action_text {
            content = content.with_action_text(text);
        }
        Ok(content)
    }
}

/// 发送通知请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationRequest {
    #[serde(default)]
    pub user_id: String,
    /// 联系方式（邮箱、手机号、设备 token），所有渠道共用
    #[serde(default)]
    pub contact: String,
    #[validate(nested)]
    pub content: ContentRequest,
    /// 整体截止时间（毫秒），为空时使用服务默认值
    #[validate(range(min = 1, max = 60000, message = "截止时间必须在 1-60000 毫秒之间"))]
    pub deadline_ms: Option<u64>,
}

/// 更新用户偏好请求
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePreferencesRequest {
    /// 按投递顺序排列的渠道名，空列表表示关闭所有渠道
    #[validate(length(max = 32, message = "渠道数量不能超过 32 个"))]
    pub channels: Vec<String>,
}

/// 分发结果
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchResultDto {
    pub dispatch_id: String,
    pub user_id: String,
    /// 各渠道结果，顺序与偏好顺序一致
    pub outcomes: Vec<DispatchOutcome>,
    pub sent_count: usize,
    pub failed_count: usize,
    pub skipped_count: usize,
    pub duration_ms: u64,
    pub dispatched_at: DateTime<Utc>,
}

impl From<DispatchReport> for DispatchResultDto {
    fn from(report: DispatchReport) -> Self {
        Self {
            sent_count: report.sent_count(),
            failed_count: report.failed_count(),
            skipped_count: report.skipped_count(),
            dispatch_id: report.dispatch_id,
            user_id: report.user_id,
            outcomes: report.outcomes,
            duration_ms: report.duration_ms,
            dispatched_at: report.dispatched_at,
        }
    }
}
