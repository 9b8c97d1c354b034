//! 用户渠道偏好
//!
//! 偏好存储是外部协作方，这里只定义读写契约并提供内存实现。
//! `PreferenceResolver` 在存储之上实现回退策略：用户没有偏好记录时，
//! 返回注册表当前的全部渠道（"所有可用渠道都通知"）。

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{NotifyError, Result, ValidationReason};
use crate::registry::ChannelRegistry;
use crate::types::channel_key;

/// 偏好存储接口
///
/// `load` 返回 None 表示没有记录；返回空列表表示用户主动关闭了所有渠道。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn load(&self, user_id: &str) -> Result<Option<Vec<String>>>;

    /// 整体替换用户偏好，不做合并
    async fn save(&self, user_id: &str, channels: Vec<String>) -> Result<()>;
}

/// 内存偏好存储
///
/// 基于 DashMap，适用于测试和单实例部署。
#[derive(Debug, Default)]
pub struct InMemoryPreferenceStore {
    data: DashMap<String, Vec<String>>,
}

impl InMemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[async_trait]
impl PreferenceStore for InMemoryPreferenceStore {
    async fn load(&self, user_id: &str) -> Result<Option<Vec<String>>> {
        Ok(self.data.get(user_id).map(|v| v.clone()))
    }

    async fn save(&self, user_id: &str, channels: Vec<String>) -> Result<()> {
        self.data.insert(user_id.to_string(), channels);
        Ok(())
    }
}

/// 解析后的用户偏好
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedPreferences {
    pub user_id: String,
    /// 按投递顺序排列的渠道名
    pub channels: Vec<String>,
    /// 是否为回退得到的默认偏好
    pub is_default: bool,
}

/// 偏好解析器
pub struct PreferenceResolver {
    store: Arc<dyn PreferenceStore>,
    registry: Arc<ChannelRegistry>,
}

impl PreferenceResolver {
    pub fn new(store: Arc<dyn PreferenceStore>, registry: Arc<ChannelRegistry>) -> Self {
        Self { store, registry }
    }

    /// 获取用户偏好的渠道列表
    pub async fn get(&self, user_id: &str) -> Result<Vec<String>> {
        Ok(self.resolve(user_id).await?.channels)
    }

    /// 获取用户偏好，并标明是否来自回退
    ///
    /// 存储中的名称会按大小写不敏感去重，保留首次出现的位置。
    pub async fn resolve(&self, user_id: &str) -> Result<ResolvedPreferences> {
        match self.store.load(user_id).await? {
            Some(channels) => Ok(ResolvedPreferences {
                user_id: user_id.to_string(),
                channels: dedupe_names(channels),
                is_default: false,
            }),
            None => {
                let channels = self.registry.list_names();
                debug!(user_id, channels = ?channels, "用户无偏好记录，使用全部已注册渠道");
                Ok(ResolvedPreferences {
                    user_id: user_id.to_string(),
                    channels,
                    is_default: true,
                })
            }
        }
    }

    /// 整体替换用户偏好
    ///
    /// 名称去除首尾空白后按大小写不敏感去重，返回实际保存的列表。
    pub async fn put(&self, user_id: &str, channels: Vec<String>) -> Result<Vec<String>> {
        if user_id.trim().is_empty() {
            return Err(NotifyError::validation(
                ValidationReason::MissingUserId,
                "用户 ID 不能为空",
            ));
        }
        if let Some(pos) = channels.iter().position(|c| c.trim().is_empty()) {
            return Err(NotifyError::validation(
                ValidationReason::InvalidChannelName,
                format!("第 {} 个渠道名称为空", pos + 1),
            ));
        }

        let channels = dedupe_names(channels);
        self.store.save(user_id, channels.clone()).await?;

        info!(user_id, channels = ?channels, "更新用户渠道偏好");
        Ok(channels)
    }
}

/// 去除空白并按规范化名称去重，保留首次出现的顺序
fn dedupe_names(channels: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    channels
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty() && seen.insert(channel_key(c)))
        .collect()
}
