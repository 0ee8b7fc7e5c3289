//! # 配置管理模块
//!
//! 处理应用配置加载、环境变量覆盖和验证

mod app_config;
mod database;
mod manager;

pub use app_config::{AppConfig, ServerConfig, UsageConfig};
pub use database::DatabaseConfig;
pub use manager::ConfigManager;

use crate::ensure_config;
use crate::error::Result;

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<()> {
    ensure_config!(config.server.port != 0, "无效的服务器端口: 0");
    ensure_config!(!config.server.host.is_empty(), "服务器监听地址不能为空");

    ensure_config!(!config.database.url.is_empty(), "数据库URL不能为空");
    ensure_config!(config.database.max_connections > 0, "数据库最大连接数必须大于0");
    ensure_config!(config.database.query_timeout > 0, "数据库操作超时必须大于0秒");

    Ok(())
}
