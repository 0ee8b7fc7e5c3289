//! # 数据库配置

use crate::error::{GatewayError, Result};
use crate::{linfo, logging::{LogComponent, LogStage}};
use sea_orm::ConnectOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 数据库URL
    pub url: String,
    /// 最大连接数
    pub max_connections: u32,
    /// 连接超时时间（秒）
    pub connect_timeout: u64,
    /// 单次存储操作超时时间（秒）
    pub query_timeout: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/gateway.db?mode=rwc".to_string(),
            max_connections: 10,
            connect_timeout: 30,
            query_timeout: 30,
        }
    }
}

impl DatabaseConfig {
    /// 确保数据库路径存在（仅对SQLite文件数据库）
    pub fn ensure_database_path(&self) -> Result<()> {
        if !self.is_sqlite() || self.is_memory_database() {
            return Ok(());
        }

        let path_str = self
            .url
            .strip_prefix("sqlite://")
            .unwrap_or(&self.url)
            .split('?')
            .next()
            .unwrap_or_default();
        let db_path = Path::new(path_str);

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    GatewayError::config_with_source(
                        format!("无法创建数据库目录: {}", parent.display()),
                        e,
                    )
                })?;

                linfo!(
                    "system",
                    LogStage::Startup,
                    LogComponent::Database,
                    "create_db_dir",
                    &format!("创建数据库目录: {}", parent.display())
                );
            }
        }

        Ok(())
    }

    /// 构建 Sea-ORM 连接参数
    #[must_use]
    pub fn connect_options(&self) -> ConnectOptions {
        let mut options = ConnectOptions::new(self.url.clone());
        options
            .max_connections(self.max_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout))
            .acquire_timeout(Duration::from_secs(self.connect_timeout))
            .sqlx_logging(false);
        if self.is_memory_database() {
            // 内存库每个连接相互独立，只能使用单连接
            options.max_connections(1).min_connections(1);
        }
        options
    }

    /// 单次存储操作的超时时间
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// 检查是否为内存数据库
    #[must_use]
    pub fn is_memory_database(&self) -> bool {
        self.url.contains(":memory:")
    }

    /// 检查是否为SQLite数据库
    #[must_use]
    pub fn is_sqlite(&self) -> bool {
        self.url.starts_with("sqlite:")
    }
}
