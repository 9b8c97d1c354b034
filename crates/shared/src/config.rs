//! 配置管理模块
//!
//! 支持多格式配置文件加载，环境变量覆盖，以及类型安全的配置访问。

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::observability::ObservabilityConfig;

/// 服务配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// 渠道发送方式
///
/// 配置中写作小写字符串，未知取值在加载时报错。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SendMode {
    #[default]
    Parallel,
    Sequential,
}

/// 分发器配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatcherSettings {
    /// 请求未指定截止时间时的默认值（毫秒）
    pub default_deadline_ms: u64,
    /// 渠道未声明超时时的单渠道超时（毫秒）
    pub channel_timeout_ms: u64,
    pub mode: SendMode,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            default_deadline_ms: 10_000,
            channel_timeout_ms: 5_000,
            mode: SendMode::Parallel,
        }
    }
}

impl DispatcherSettings {
    pub fn default_deadline(&self) -> Duration {
        Duration::from_millis(self.default_deadline_ms)
    }

    pub fn channel_timeout(&self) -> Duration {
        Duration::from_millis(self.channel_timeout_ms)
    }
}

/// 单渠道配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    pub enabled: bool,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    /// 服务商 API 地址
    pub endpoint: Option<String>,
    /// 服务商 API 密钥
    pub api_key: Option<String>,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            timeout_ms: 5_000,
            max_retries: 3,
            retry_backoff_ms: 100,
            endpoint: None,
            api_key: None,
        }
    }
}

impl ChannelSettings {
    fn with_timeout(timeout_ms: u64) -> Self {
        Self {
            timeout_ms,
            ..Default::default()
        }
    }
}

/// 内置渠道配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChannelsConfig {
    pub email: ChannelSettings,
    pub sms: ChannelSettings,
    pub push: ChannelSettings,
    /// 邮件发件人地址
    pub email_from: String,
    /// 短信正文长度上限（字符数）
    pub sms_max_length: usize,
}

impl Default for ChannelsConfig {
    fn default() -> Self {
        Self {
            email: ChannelSettings::with_timeout(10_000),
            sms: ChannelSettings::with_timeout(5_000),
            push: ChannelSettings::with_timeout(3_000),
            email_from: "noreply@notify.local".to_string(),
            sms_max_length: 160,
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub service_name: String,
    pub environment: String,
    pub server: ServerConfig,
    pub dispatcher: DispatcherSettings,
    pub channels: ChannelsConfig,
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// 从配置文件和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. config/default.toml（默认配置）
    /// 2. config/{environment}.toml（环境特定配置）
    /// 3. config/{service_name}.toml（服务特定配置）
    /// 4. 环境变量（NOTIFY_ 前缀，层级用双下划线，如 NOTIFY_SERVER__PORT -> server.port）
    /// 5. 服务特定端口环境变量（如 NOTIFICATION_GATEWAY_PORT）
    pub fn load(service_name: &str) -> Result<Self, ConfigError> {
        let env = std::env::var("NOTIFY_ENV").unwrap_or_else(|_| "development".to_string());
        let config_dir = std::env::var("CONFIG_DIR").unwrap_or_else(|_| "config".to_string());

        Self::load_from(Path::new(&config_dir), &env, service_name)
    }

    /// 从指定目录加载配置
    pub fn load_from(
        config_dir: &Path,
        env: &str,
        service_name: &str,
    ) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .set_default("service_name", service_name)?
            .set_default("environment", env)?
            .set_default("observability.service_name", service_name)?
            .add_source(File::from(config_dir.join("default.toml")).required(false))
            .add_source(File::from(config_dir.join(format!("{env}.toml"))).required(false))
            .add_source(
                File::from(config_dir.join(format!("{service_name}.toml"))).required(false),
            )
            // NOTIFY_CHANNELS__SMS__ENABLED -> channels.sms.enabled
            .add_source(
                Environment::with_prefix("NOTIFY")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;

        if let Some(port) = Self::get_service_port_from_env(service_name) {
            config.server.port = port;
        }

        Ok(config)
    }

    /// 从环境变量获取服务特定端口
    ///
    /// 将 "notification-gateway" 转换为 "NOTIFICATION_GATEWAY_PORT"
    fn get_service_port_from_env(service_name: &str) -> Option<u16> {
        std::env::var(Self::service_port_env_name(service_name))
            .ok()
            .and_then(|v| v.parse().ok())
    }

    fn service_port_env_name(service_name: &str) -> String {
        format!("{}_PORT", service_name.to_uppercase().replace('-', "_"))
    }

    /// 获取服务地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 是否为生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}
