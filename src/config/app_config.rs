//! # 应用配置结构定义

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 未配置或配置为 0 时的统计落库间隔（秒）
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 60;

/// 应用主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 管理端 HTTP 服务配置
    #[serde(default)]
    pub server: ServerConfig,
    /// 数据库配置
    #[serde(default)]
    pub database: super::DatabaseConfig,
    /// 用量统计配置
    #[serde(default)]
    pub usage: UsageConfig,
}

/// 管理端 HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// 是否启用CORS
    pub enable_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
        }
    }
}

impl ServerConfig {
    /// 监听地址字符串，如 `0.0.0.0:8080`
    #[must_use]
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 用量统计配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageConfig {
    /// 内存计数落库间隔（秒），0 表示使用默认值
    pub sync_interval_secs: u64,
    /// 进程退出前是否执行最后一次落库
    pub flush_on_shutdown: bool,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            sync_interval_secs: DEFAULT_SYNC_INTERVAL_SECS,
            flush_on_shutdown: true,
        }
    }
}

impl UsageConfig {
    /// 实际生效的落库间隔
    #[must_use]
    pub const fn sync_interval(&self) -> Duration {
        if self.sync_interval_secs == 0 {
            Duration::from_secs(DEFAULT_SYNC_INTERVAL_SECS)
        } else {
            Duration::from_secs(self.sync_interval_secs)
        }
    }
}
