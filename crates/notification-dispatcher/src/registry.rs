//! 渠道注册表
//!
//! 管理所有通知渠道实例，按渠道名称索引，提供统一的查找接口。
//!
//! ## 设计说明
//!
//! - 名称匹配大小写不敏感，并忽略首尾空白
//! - 重复注册同名渠道会替换原绑定（后写覆盖），位置保持不变
//! - 读写锁保护：注册期间的查找要么看到旧绑定，要么看到新绑定；读操作之间互不阻塞
//! - 没有注销操作，渠道随进程存活
//!
//! ## 使用示例
//!
//! ```ignore
//! let registry = ChannelRegistry::new();
//! registry.register(Arc::new(EmailChannel::with_defaults()));
//!
//! let channel = registry.resolve("email").unwrap();
//! ```

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::channels::{AppPushChannel, EmailChannel, NotificationChannel, SmsChannel};
use crate::types::channel_key;

struct Binding {
    key: String,
    channel: Arc<dyn NotificationChannel>,
}

/// 渠道注册表
///
/// 进程级共享状态，启动时创建，通过 Arc 在分发器和 API 层之间共享。
#[derive(Default)]
pub struct ChannelRegistry {
    bindings: RwLock<Vec<Binding>>,
}

impl ChannelRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 创建包含内置渠道（Email、SMS、Push）的注册表
    ///
    /// 内置渠道使用模拟投递服务。
    pub fn with_defaults() -> Self {
        info!("初始化默认通知渠道");

        let registry = Self::new()
            .with_channel(Arc::new(EmailChannel::with_defaults()))
            .with_channel(Arc::new(SmsChannel::with_defaults()))
            .with_channel(Arc::new(AppPushChannel::with_defaults()));

        info!(
            channel_count = registry.len(),
            channels = ?registry.list_names(),
            "默认通知渠道初始化完成"
        );

        registry
    }

    /// 链式注册渠道（用于启动时组装）
    pub fn with_channel(self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.register(channel);
        self
    }

    /// 注册渠道
    ///
    /// 渠道按其 `name()` 索引。已存在同名渠道时替换，返回是否发生了替换。
    pub fn register(&self, channel: Arc<dyn NotificationChannel>) -> bool {
        let key = channel_key(channel.name());
        let mut bindings = self.bindings.write();

        let replaced = match bindings.iter_mut().find(|b| b.key == key) {
            Some(binding) => {
                binding.channel = channel.clone();
                true
            }
            None => {
                bindings.push(Binding {
                    key,
                    channel: channel.clone(),
                });
                false
            }
        };
        drop(bindings);

        info!(channel = channel.name(), replaced, "注册通知渠道");
        replaced
    }

    /// 按名称查找渠道
    ///
    /// 返回 None 表示该渠道未注册
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn NotificationChannel>> {
        let key = channel_key(name);
        let found = self
            .bindings
            .read()
            .iter()
            .find(|b| b.key == key)
            .map(|b| b.channel.clone());

        if found.is_none() {
            debug!(channel = name, "渠道未注册");
        }
        found
    }

    /// 检查是否已注册指定渠道
    pub fn contains(&self, name: &str) -> bool {
        let key = channel_key(name);
        self.bindings.read().iter().any(|b| b.key == key)
    }

    /// 获取所有已注册渠道的名称，按首次注册顺序排列
    pub fn list_names(&self) -> Vec<String> {
        self.bindings
            .read()
            .iter()
            .map(|b| b.channel.name().to_string())
            .collect()
    }

    /// 获取已注册渠道数量
    pub fn len(&self) -> usize {
        self.bindings.read().len()
    }

    /// 检查注册表是否为空
    pub fn is_empty(&self) -> bool {
        self.bindings.read().is_empty()
    }
}
