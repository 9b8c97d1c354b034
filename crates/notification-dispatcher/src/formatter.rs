//! 内容格式化器
//!
//! 按渠道名称把通知内容适配为渠道专属的副本，输入内容从不被修改。
//!
//! | 渠道 | 处理 |
//! |---|---|
//! | Email | 缺少 HTML 正文时按标题、正文、操作链接生成 |
//! | SMS | 不处理（长度限制由短信渠道自身负责） |
//! | Push | 正文超过 100 字符时截断为 97 字符 + "..." |
//! | 其他 | 原样复制 |

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::types::{Content, channel_key};

/// 推送正文默认长度上限（字符数）
pub const DEFAULT_PUSH_MAX_LENGTH: usize = 100;

/// 操作链接缺省文案
pub const DEFAULT_ACTION_TEXT: &str = "Click here";

/// 单渠道格式化规则
pub trait FormatRule: Send + Sync {
    /// 规则描述（用于日志）
    fn description(&self) -> &str;

    /// 生成适配后的新内容
    fn apply(&self, content: &Content) -> Content;
}

/// 邮件 HTML 生成规则
///
/// 已有 HTML 正文时不做处理。标题、正文和链接按原样插入，不做转义。
#[derive(Debug, Default)]
pub struct EmailHtmlRule;

impl EmailHtmlRule {
    fn build_html(content: &Content) -> String {
        let mut html = format!(
            "<html><body><h1>{}</h1><p>{}</p>",
            content.title(),
            content.plain_body()
        );
        if let Some(url) = content.action_url() {
            let text = content.action_text().unwrap_or(DEFAULT_ACTION_TEXT);
            html.push_str(&format!("<p><a href=\"{url}\">{text}</a></p>"));
        }
        html.push_str("</body></html>");
        html
    }
}

impl FormatRule for EmailHtmlRule {
    fn description(&self) -> &str {
        "生成邮件 HTML 正文"
    }

    fn apply(&self, content: &Content) -> Content {
        if content.html_body().is_some() {
            return content.clone();
        }
        content.copy_with_html_body(Self::build_html(content))
    }
}

/// 推送正文截断规则
#[derive(Debug)]
pub struct PushTruncateRule {
    max_length: usize,
}

impl Default for PushTruncateRule {
    fn default() -> Self {
        Self::new(DEFAULT_PUSH_MAX_LENGTH)
    }
}

impl PushTruncateRule {
    /// 创建截断规则，上限最小为省略号长度
    pub fn new(max_length: usize) -> Self {
        Self {
            max_length: max_length.max(3),
        }
    }
}

impl FormatRule for PushTruncateRule {
    fn description(&self) -> &str {
        "截断推送正文"
    }

    fn apply(&self, content: &Content) -> Content {
        let body = content.plain_body();
        if body.chars().count() <= self.max_length {
            return content.clone();
        }
        let truncated: String = body.chars().take(self.max_length - 3).collect();
        content.copy_with_plain_body(format!("{truncated}..."))
    }
}

/// 内容格式化器
///
/// 以规范化后的渠道名索引格式化规则，没有规则的渠道原样透传。
pub struct ContentFormatter {
    rules: HashMap<String, Arc<dyn FormatRule>>,
}

impl Default for ContentFormatter {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ContentFormatter {
    /// 创建不含任何规则的格式化器
    pub fn new() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    /// 创建包含内置规则的格式化器（Email、Push）
    pub fn with_defaults() -> Self {
        let mut formatter = Self::new();
        formatter
            .register_rule("Email", Arc::new(EmailHtmlRule))
            .register_rule("Push", Arc::new(PushTruncateRule::default()));
        formatter
    }

    /// 为渠道注册格式化规则，已存在的规则会被替换
    pub fn register_rule(&mut self, channel: &str, rule: Arc<dyn FormatRule>) -> &mut Self {
        info!(channel, rule = rule.description(), "注册格式化规则");
        self.rules.insert(channel_key(channel), rule);
        self
    }

    /// 按渠道格式化内容
    pub fn format(&self, channel: &str, content: &Content) -> Content {
        match self.rules.get(&channel_key(channel)) {
            Some(rule) => {
                debug!(channel, rule = rule.description(), "应用格式化规则");
                rule.apply(content)
            }
            None => content.clone(),
        }
    }
}
