//! 多渠道通知分发
//!
//! 接收"给某个用户发送一条通知"的请求，按用户的渠道偏好把同一条内容
//! 扇出到 Email、SMS、Push 等渠道，并返回每个渠道的投递结果。
//!
//! ## 核心功能
//!
//! - **渠道注册**：运行时注册或替换渠道，名称大小写不敏感
//! - **偏好解析**：用户无偏好记录时回退为全部已注册渠道
//! - **内容格式化**：按渠道生成适配后的内容副本（邮件 HTML、推送截断）
//! - **并发分发**：各渠道互不影响，失败、超时、panic 都只影响自身结果
//!
//! ## 模块结构
//!
//! - `types`: 通知内容与分发结果
//! - `error`: 错误类型定义
//! - `channels`: 渠道抽象与内置渠道
//! - `registry`: 渠道注册表
//! - `preference`: 用户偏好存储与解析
//! - `formatter`: 按渠道的内容格式化
//! - `service`: 分发器

pub mod channels;
pub mod error;
pub mod formatter;
pub mod preference;
pub mod registry;
pub mod service;
pub mod types;

pub use channels::{
    AppPushChannel, ChannelConfig, EmailChannel, LogTransport, NotificationChannel,
    OutboundMessage, SmsChannel, Transport,
};
pub use error::{NotifyError, Result, ValidationReason};
pub use formatter::{ContentFormatter, EmailHtmlRule, FormatRule, PushTruncateRule};
pub use preference::{
    InMemoryPreferenceStore, PreferenceResolver, PreferenceStore, ResolvedPreferences,
};
pub use registry::ChannelRegistry;
pub use service::{DispatchMode, DispatcherConfig, NotificationDispatcher};
pub use types::{
    Content, DeliveryReceipt, DeliveryStatus, DispatchOutcome, DispatchReport, channel_key,
};
