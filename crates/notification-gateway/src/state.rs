//! 应用状态定义
//!
//! 包含 Axum 路由共享的应用状态

use std::sync::Arc;

use notification_dispatcher::{
    AppPushChannel, ChannelConfig, ChannelRegistry, DispatchMode, DispatcherConfig, EmailChannel,
    LogTransport, NotificationDispatcher, SmsChannel,
};
use notify_shared::config::{AppConfig, ChannelSettings, SendMode};
use tracing::info;

/// Axum 应用共享状态
///
/// 分发器内部持有注册表和偏好存储，通过 Arc 在 handler 间共享
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<NotificationDispatcher>,
}

impl AppState {
    /// 创建新的应用状态
    pub fn new(dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self { dispatcher }
    }

    /// 按配置组装内置渠道与分发器
    ///
    /// 内置渠道使用日志投递服务；禁用的渠道仍会注册，发送时记为失败。
    pub fn from_config(config: &AppConfig) -> Self {
        let channels = &config.channels;

        let registry = ChannelRegistry::new()
            .with_channel(Arc::new(EmailChannel::new(
                channel_config(&channels.email),
                Arc::new(LogTransport::new("email")),
                channels.email_from.clone(),
            )))
            .with_channel(Arc::new(
                SmsChannel::new(channel_config(&channels.sms), Arc::new(LogTransport::new("sms")))
                    .with_max_length(channels.sms_max_length),
            ))
            .with_channel(Arc::new(AppPushChannel::new(
                channel_config(&channels.push),
                Arc::new(LogTransport::new("push")),
            )));

        let settings = &config.dispatcher;
        let mode = match settings.mode {
            SendMode::Parallel => DispatchMode::Parallel,
            SendMode::Sequential => DispatchMode::Sequential,
        };
        let dispatcher_config = DispatcherConfig::default()
            .with_mode(mode)
            .with_default_deadline(settings.default_deadline())
            .with_channel_timeout(settings.channel_timeout());

        info!(
            channels = ?registry.list_names(),
            mode = ?mode,
            default_deadline_ms = settings.default_deadline_ms,
            "通知分发器初始化完成"
        );

        Self::new(Arc::new(NotificationDispatcher::with_registry(
            Arc::new(registry),
            dispatcher_config,
        )))
    }
}

fn channel_config(settings: &ChannelSettings) -> ChannelConfig {
    let mut config = ChannelConfig::new(settings.enabled)
        .with_timeout(settings.timeout_ms)
        .with_max_retries(settings.max_retries)
        .with_retry_backoff(settings.retry_backoff_ms);
    if let Some(endpoint) = &settings.endpoint {
        config = config.with_endpoint(endpoint.clone());
    }
    if let Some(api_key) = &settings.api_key {
        config = config.with_api_key(api_key.clone());
    }
    config
}
