//! 通知分发服务
//!
//! 按用户偏好把一条通知扇出到多个渠道。
//!
//! ## 设计说明
//!
//! - **先校验后执行**：用户 ID、联系方式、内容任一无效时直接返回错误，不触碰任何渠道
//! - **尽力扇出**：单渠道失败、超时或 panic 只记录为该渠道的 Failed，不影响其他渠道
//! - **截止时间**：每次分发有整体截止时间，到期未完成的渠道记为 `timeout`
//! - **运行时扩展**：注册表的变更对后续分发立即可见，无需重建分发器
//!
//! 并行模式下不保证渠道间的实际发送顺序；需要严格按偏好顺序发送时使用顺序模式。

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use futures::future::join_all;
use tracing::{Span, debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::channels::NotificationChannel;
use crate::error::{NotifyError, Result, ValidationReason};
use crate::formatter::ContentFormatter;
use crate::preference::{InMemoryPreferenceStore, PreferenceResolver, ResolvedPreferences};
use crate::registry::ChannelRegistry;
use crate::types::{Content, DispatchOutcome, DispatchReport};

/// 超时失败的结果说明
pub const TIMEOUT_DETAIL: &str = "timeout";

/// 未注册渠道在指标中的统一标签
const UNREGISTERED_LABEL: &str = "unregistered";

/// 截止时间溢出时使用的上限
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365);

/// 渠道发送方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// 所有渠道并发发送
    #[default]
    Parallel,
    /// 按偏好顺序逐个发送
    Sequential,
}

/// 分发器配置
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// 未指定截止时间时的默认值
    pub default_deadline: Duration,
    /// 渠道未声明超时时使用的单渠道超时
    pub channel_timeout: Duration,
    pub mode: DispatchMode,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_deadline: Duration::from_secs(10),
            channel_timeout: Duration::from_secs(5),
            mode: DispatchMode::Parallel,
        }
    }
}

impl DispatcherConfig {
    pub fn with_mode(mut self, mode: DispatchMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_default_deadline(mut self, deadline: Duration) -> Self {
        self.default_deadline = deadline;
        self
    }

    pub fn with_channel_timeout(mut self, timeout: Duration) -> Self {
        self.channel_timeout = timeout;
        self
    }
}

/// 单渠道的执行计划
enum Planned {
    Skip {
        name: String,
    },
    Send {
        name: String,
        channel: Arc<dyn NotificationChannel>,
        content: Content,
    },
}

impl Planned {
    /// 指标中的渠道标签
    fn metric_label(&self) -> &str {
        match self {
            Planned::Skip { .. } => UNREGISTERED_LABEL,
            Planned::Send { channel, .. } => channel.name(),
        }
    }
}

/// 通知分发器
///
/// 持有注册表、格式化器和偏好解析器的共享引用，本身无状态，可被并发调用。
pub struct NotificationDispatcher {
    registry: Arc<ChannelRegistry>,
    formatter: Arc<ContentFormatter>,
    preferences: Arc<PreferenceResolver>,
    config: DispatcherConfig,
}

impl NotificationDispatcher {
    /// 创建分发器
    ///
    /// `preferences` 应与分发器共享同一个注册表，回退偏好才能反映运行时注册的渠道。
    pub fn new(
        registry: Arc<ChannelRegistry>,
        formatter: Arc<ContentFormatter>,
        preferences: Arc<PreferenceResolver>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            registry,
            formatter,
            preferences,
            config,
        }
    }

    /// 使用内置渠道、默认格式化规则和内存偏好存储创建
    pub fn with_defaults() -> Self {
        Self::with_registry(
            Arc::new(ChannelRegistry::with_defaults()),
            DispatcherConfig::default(),
        )
    }

    /// 基于给定注册表创建，格式化器使用默认规则，偏好使用内存存储
    pub fn with_registry(registry: Arc<ChannelRegistry>, config: DispatcherConfig) -> Self {
        let preferences = Arc::new(PreferenceResolver::new(
            Arc::new(InMemoryPreferenceStore::new()),
            registry.clone(),
        ));
        Self::new(
            registry,
            Arc::new(ContentFormatter::with_defaults()),
            preferences,
            config,
        )
    }

    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// 注册渠道，后续分发立即可见
    pub fn register_channel(&self, channel: Arc<dyn NotificationChannel>) -> bool {
        self.registry.register(channel)
    }

    /// 获取所有已注册渠道名称
    pub fn list_channel_names(&self) -> Vec<String> {
        self.registry.list_names()
    }

    /// 获取用户偏好（无记录时回退为全部已注册渠道）
    pub async fn get_preferences(&self, user_id: &str) -> Result<ResolvedPreferences> {
        self.preferences.resolve(user_id).await
    }

    /// 整体替换用户偏好
    pub async fn set_preferences(
        &self,
        user_id: &str,
        channels: Vec<String>,
    ) -> Result<Vec<String>> {
        self.preferences.put(user_id, channels).await
    }

    /// 分发通知
    ///
    /// 校验失败时返回错误；否则总是返回报告，各渠道的成败需从报告中读取。
    /// `deadline` 为空时使用配置中的默认截止时间。
    #[instrument(
        skip(self, contact, content),
        fields(dispatch_id = tracing::field::Empty, title = %content.title())
    )]
    pub async fn dispatch(
        &self,
        user_id: &str,
        contact: &str,
        content: &Content,
        deadline: Option<Duration>,
    ) -> Result<DispatchReport> {
        let start = Instant::now();
        Self::validate(user_id, contact, content)?;

        let dispatch_id = Uuid::now_v7().to_string();
        Span::current().record("dispatch_id", dispatch_id.as_str());

        let deadline = deadline.unwrap_or(self.config.default_deadline);
        let cutoff = cutoff_after(tokio::time::Instant::now(), deadline);

        let channel_names = self.preferences.get(user_id).await?;
        info!(channels = ?channel_names, mode = ?self.config.mode, "开始分发通知");

        let plans: Vec<Planned> = channel_names
            .into_iter()
            .map(|name| self.plan(name, content))
            .collect();

        let outcomes = match self.config.mode {
            DispatchMode::Parallel => {
                join_all(plans.into_iter().map(|plan| self.execute(plan, contact, cutoff))).await
            }
            DispatchMode::Sequential => {
                let mut outcomes = Vec::with_capacity(plans.len());
                for plan in plans {
                    outcomes.push(self.execute(plan, contact, cutoff).await);
                }
                outcomes
            }
        };

        let report = DispatchReport::new(
            dispatch_id,
            user_id,
            outcomes,
            start.elapsed().as_millis() as u64,
        );
        self.log_report(&report);

        Ok(report)
    }

    /// 分发前校验，任何一项失败都不会触碰渠道
    fn validate(user_id: &str, contact: &str, content: &Content) -> Result<()> {
        if user_id.trim().is_empty() {
            return Err(NotifyError::validation(
                ValidationReason::MissingUserId,
                "用户 ID 不能为空",
            ));
        }
        if contact.trim().is_empty() {
            return Err(NotifyError::validation(
                ValidationReason::MissingContact,
                "联系方式不能为空",
            ));
        }
        content.validate()
    }

    /// 查找渠道并按渠道格式化内容
    fn plan(&self, name: String, content: &Content) -> Planned {
        match self.registry.resolve(&name) {
            Some(channel) => {
                let content = self.formatter.format(channel.name(), content);
                Planned::Send {
                    name,
                    channel,
                    content,
                }
            }
            None => Planned::Skip { name },
        }
    }

    /// 执行单渠道发送，所有失败都在这里被吸收为结果
    async fn execute(
        &self,
        plan: Planned,
        contact: &str,
        cutoff: tokio::time::Instant,
    ) -> DispatchOutcome {
        let label = plan.metric_label().to_string();
        let (name, channel, content) = match plan {
            Planned::Skip { name } => {
                warn!(channel = %name, "渠道未注册，跳过");
                record_send_metric(&label, "skipped", None);
                return DispatchOutcome::skipped(name);
            }
            Planned::Send {
                name,
                channel,
                content,
            } => (name, channel, content),
        };

        let started_at = tokio::time::Instant::now();
        if started_at >= cutoff {
            warn!(channel = %name, "已超过分发截止时间，未发送");
            record_send_metric(&label, "timeout", None);
            return DispatchOutcome::failed(name, TIMEOUT_DETAIL, 0);
        }

        let channel_timeout = channel.timeout().unwrap_or(self.config.channel_timeout);
        let send_cutoff = cutoff.min(cutoff_after(started_at, channel_timeout));

        let start = Instant::now();
        let send = AssertUnwindSafe(channel.send(contact, &content)).catch_unwind();
        let result = tokio::time::timeout_at(send_cutoff, send).await;
        let elapsed = start.elapsed();
        let duration_ms = elapsed.as_millis() as u64;

        match result {
            Ok(Ok(Ok(receipt))) => {
                debug!(
                    channel = %name,
                    message_id = %receipt.message_id,
                    duration_ms,
                    "渠道发送成功"
                );
                record_send_metric(&label, "sent", Some(elapsed));
                DispatchOutcome::sent(name, receipt, duration_ms)
            }
            Ok(Ok(Err(e))) => {
                warn!(channel = %name, error = %e, code = e.code(), duration_ms, "渠道发送失败");
                record_send_metric(&label, "failed", Some(elapsed));
                DispatchOutcome::failed(name, e.to_string(), duration_ms)
            }
            Ok(Err(panic)) => {
                let message = panic_message(panic);
                error!(channel = %name, panic = %message, "渠道发送异常");
                record_send_metric(&label, "failed", Some(elapsed));
                DispatchOutcome::failed(name, format!("渠道发送异常: {message}"), duration_ms)
            }
            Err(_) => {
                warn!(channel = %name, duration_ms, "渠道发送超时");
                record_send_metric(&label, "timeout", Some(elapsed));
                DispatchOutcome::failed(name, TIMEOUT_DETAIL, duration_ms)
            }
        }
    }

    /// 记录分发结果
    fn log_report(&self, report: &DispatchReport) {
        let total = report.outcomes.len();
        let sent = report.sent_count();
        let failed = report.failed_count();
        let skipped = report.skipped_count();

        let result = if report.all_sent() {
            info!(sent, total, duration_ms = report.duration_ms, "通知分发完成（全部成功）");
            "all_sent"
        } else if sent > 0 {
            warn!(
                sent,
                failed,
                skipped,
                total,
                duration_ms = report.duration_ms,
                "通知分发完成（部分成功）"
            );
            "partial"
        } else {
            error!(
                failed,
                skipped,
                total,
                duration_ms = report.duration_ms,
                "通知分发完成（无渠道成功）"
            );
            "none_sent"
        };

        metrics::counter!("notification_dispatches_total", "result" => result).increment(1);
        metrics::histogram!("notification_dispatch_duration_seconds")
            .record(report.duration_ms as f64 / 1000.0);
    }
}

/// 计算截止时刻，溢出时退化为一年后
fn cutoff_after(from: tokio::time::Instant, after: Duration) -> tokio::time::Instant {
    from.checked_add(after).unwrap_or_else(|| from + FAR_FUTURE)
}

/// 渠道标签只使用注册名或固定值，避免指标基数随用户输入增长
fn record_send_metric(channel: &str, status: &'static str, elapsed: Option<Duration>) {
    metrics::counter!(
        "notification_channel_sends_total",
        "channel" => channel.to_string(),
        "status" => status
    )
    .increment(1);

    if let Some(elapsed) = elapsed {
        metrics::histogram!(
            "notification_channel_send_duration_seconds",
            "channel" => channel.to_string()
        )
        .record(elapsed.as_secs_f64());
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{ChannelConfig, EmailChannel, MockTransport, SmsChannel};
    use crate::preference::MockPreferenceStore;
    use crate::types::{DeliveryReceipt, DeliveryStatus};
    use async_trait::async_trait;

    fn content() -> Content {
        Content::new("Order Confirmed", "Total: $42").unwrap()
    }

    /// 总是 panic 的渠道
    struct PanickingChannel;

    #[async_trait]
    impl NotificationChannel for PanickingChannel {
        fn name(&self) -> &str {
            "Push"
        }

        async fn send(&self, _recipient: &str, _content: &Content) -> Result<DeliveryReceipt> {
            panic!("推送 SDK 崩溃");
        }
    }

    /// 永不返回的渠道
    struct HangingChannel;

    #[async_trait]
    impl NotificationChannel for HangingChannel {
        fn name(&self) -> &str {
            "Slow"
        }

        async fn send(&self, _recipient: &str, _content: &Content) -> Result<DeliveryReceipt> {
            std::future::pending::<()>().await;
            unreachable!()
        }
    }

    #[tokio::test]
    async fn test_validation_rejects_before_touching_channels() {
        // MockTransport 未设置任何期望，一旦被调用就会 panic
        let registry = Arc::new(ChannelRegistry::new().with_channel(Arc::new(EmailChannel::new(
            ChannelConfig::new(true),
            Arc::new(MockTransport::new()),
            "noreply@example.com".to_string(),
        ))));
        let dispatcher =
            NotificationDispatcher::with_registry(registry, DispatcherConfig::default());

        let err = dispatcher.dispatch("", "a@b.c", &content(), None).await.unwrap_err();
        assert_eq!(err.code(), "MISSING_USER_ID");

        let err = dispatcher.dispatch("user-1", " ", &content(), None).await.unwrap_err();
        assert_eq!(err.code(), "MISSING_CONTACT");
    }

    #[tokio::test]
    async fn test_transport_failure_is_recorded() {
        let mut transport = MockTransport::new();
        transport
            .expect_deliver()
            .times(1)
            .returning(|_| Err(NotifyError::transport("SMS", "网关返回 503")));

        let registry = Arc::new(
            ChannelRegistry::new()
                .with_channel(Arc::new(EmailChannel::with_defaults()))
                .with_channel(Arc::new(SmsChannel::new(
                    ChannelConfig::new(true).with_max_retries(0),
                    Arc::new(transport),
                ))),
        );
        let dispatcher =
            NotificationDispatcher::with_registry(registry, DispatcherConfig::default());

        let report = dispatcher
            .dispatch("user-1", "user@example.com", &content(), None)
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].status, DeliveryStatus::Sent);
        assert_eq!(report.outcomes[1].status, DeliveryStatus::Failed);
        assert!(report.outcomes[1].detail.as_deref().unwrap().contains("网关返回 503"));
    }

    #[tokio::test]
    async fn test_panicking_channel_is_isolated() {
        let registry = Arc::new(
            ChannelRegistry::new()
                .with_channel(Arc::new(EmailChannel::with_defaults()))
                .with_channel(Arc::new(PanickingChannel)),
        );
        let dispatcher =
            NotificationDispatcher::with_registry(registry, DispatcherConfig::default());

        let report = dispatcher
            .dispatch("user-1", "user@example.com", &content(), None)
            .await
            .unwrap();

        assert!(report.outcome("Email").unwrap().is_sent());
        let push = report.outcome("Push").unwrap();
        assert!(push.is_failed());
        assert!(push.detail.as_deref().unwrap().contains("推送 SDK 崩溃"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_channel_timeout_marks_failed() {
        let registry = Arc::new(
            ChannelRegistry::new()
                .with_channel(Arc::new(EmailChannel::with_defaults()))
                .with_channel(Arc::new(HangingChannel)),
        );
        let config = DispatcherConfig::default().with_channel_timeout(Duration::from_millis(200));
        let dispatcher = NotificationDispatcher::with_registry(registry, config);

        let report = dispatcher
            .dispatch("user-1", "user@example.com", &content(), None)
            .await
            .unwrap();

        assert!(report.outcome("Email").unwrap().is_sent());
        let slow = report.outcome("Slow").unwrap();
        assert!(slow.is_failed());
        assert_eq!(slow.detail.as_deref(), Some(TIMEOUT_DETAIL));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_deadline_skips_remaining_attempts() {
        let registry = Arc::new(
            ChannelRegistry::new()
                .with_channel(Arc::new(HangingChannel))
                .with_channel(Arc::new(EmailChannel::with_defaults())),
        );
        let config = DispatcherConfig::default()
            .with_mode(DispatchMode::Sequential)
            .with_channel_timeout(Duration::from_secs(60));
        let dispatcher = NotificationDispatcher::with_registry(registry, config);

        let report = dispatcher
            .dispatch(
                "user-1",
                "user@example.com",
                &content(),
                Some(Duration::from_millis(500)),
            )
            .await
            .unwrap();

        assert_eq!(report.outcomes.len(), 2);
        assert_eq!(report.outcomes[0].channel, "Slow");
        assert_eq!(report.outcomes[0].detail.as_deref(), Some(TIMEOUT_DETAIL));
        assert_eq!(report.outcomes[1].channel, "Email");
        assert_eq!(report.outcomes[1].detail.as_deref(), Some(TIMEOUT_DETAIL));
        assert_eq!(report.outcomes[1].duration_ms, 0);
    }

    #[tokio::test]
    async fn test_preference_store_failure_aborts() {
        let mut store = MockPreferenceStore::new();
        store
            .expect_load()
            .returning(|_| Err(NotifyError::PreferenceStore("连接超时".to_string())));

        let registry = Arc::new(ChannelRegistry::with_defaults());
        let preferences = Arc::new(PreferenceResolver::new(Arc::new(store), registry.clone()));
        let dispatcher = NotificationDispatcher::new(
            registry,
            Arc::new(ContentFormatter::with_defaults()),
            preferences,
            DispatcherConfig::default(),
        );

        let err = dispatcher
            .dispatch("user-1", "user@example.com", &content(), None)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "PREFERENCE_STORE_ERROR");
    }

    #[tokio::test]
    async fn test_opted_out_user_gets_empty_report() {
        let dispatcher = NotificationDispatcher::with_defaults();
        dispatcher.set_preferences("user-1", vec![]).await.unwrap();

        let report = dispatcher
            .dispatch("user-1", "user@example.com", &content(), None)
            .await
            .unwrap();
        assert!(report.outcomes.is_empty());
        assert!(!report.all_sent());
    }

    #[test]
    fn test_dispatcher_config_default() {
        let config = DispatcherConfig::default();
        assert_eq!(config.default_deadline, Duration::from_secs(10));
        assert_eq!(config.channel_timeout, Duration::from_secs(5));
        assert_eq!(config.mode, DispatchMode::Parallel);
    }

    #[tokio::test]
    async fn test_unbounded_deadline_does_not_overflow() {
        let dispatcher = NotificationDispatcher::with_defaults();

        let report = dispatcher
            .dispatch("user-1", "user@example.com", &content(), Some(Duration::MAX))
            .await
            .unwrap();
        assert!(report.all_sent());
    }

    #[tokio::test]
    async fn test_unbounded_timeouts_do_not_overflow() {
        let config = DispatcherConfig::default()
            .with_default_deadline(Duration::MAX)
            .with_channel_timeout(Duration::MAX);
        let dispatcher = NotificationDispatcher::with_registry(
            Arc::new(ChannelRegistry::new().with_channel(Arc::new(PanickingChannel))),
            config,
        );

        let report = dispatcher
            .dispatch("user-1", "user@example.com", &content(), None)
            .await
            .unwrap();
        assert!(report.outcome("Push").unwrap().is_failed());
    }

    #[test]
    fn test_metric_label_uses_registered_name() {
        let dispatcher = NotificationDispatcher::with_defaults();

        let plan = dispatcher.plan(" sms ".to_string(), &content());
        assert_eq!(plan.metric_label(), "SMS");

        let plan = dispatcher.plan("WeChat-随意输入".to_string(), &content());
        assert_eq!(plan.metric_label(), UNREGISTERED_LABEL);
    }

    #[test]
    fn test_cutoff_after_saturates() {
        let now = tokio::time::Instant::now();
        assert_eq!(cutoff_after(now, Duration::from_secs(1)), now + Duration::from_secs(1));
        assert_eq!(cutoff_after(now, Duration::MAX), now + FAR_FUTURE);
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(Box::new("boom")), "boom");
        assert_eq!(panic_message(Box::new(String::from("bang"))), "bang");
        assert_eq!(panic_message(Box::new(42)), "unknown panic");
    }
}
