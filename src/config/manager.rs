//! # 配置管理器
//!
//! 统一的配置加载入口，支持环境变量覆盖

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::AppConfig;
use crate::error::{GatewayError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, linfo, lwarn};

/// 环境变量覆盖前缀
const ENV_PREFIX: &str = "GATEWAY_";

/// 配置管理器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 当前配置
    config: AppConfig,
    /// 配置文件路径
    config_path: PathBuf,
    /// 已应用的环境变量覆盖
    env_overrides: HashMap<String, String>,
}

impl ConfigManager {
    /// 创建配置管理器
    pub fn new() -> Result<Self> {
        // 优先使用环境变量指定的配置文件路径
        let config_file = if let Ok(path) = env::var("AI_GATEWAY_CONFIG_PATH") {
            path
        } else {
            let env = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
            format!("config/config.{env}.toml")
        };

        Self::from_file(&config_file)
    }

    /// 从指定文件创建配置管理器
    pub fn from_file(config_path: impl AsRef<Path>) -> Result<Self> {
        Self::from_file_with_env(config_path, env::vars())
    }

    /// 从指定文件创建配置管理器，环境变量来源由调用方给出
    pub fn from_file_with_env<I>(config_path: impl AsRef<Path>, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config_path = config_path.as_ref();
        let mut config = Self::load_config_file(config_path)?;

        let env_overrides = Self::build_env_overrides(vars);
        Self::apply_env_overrides(&mut config, &env_overrides)?;

        // 覆盖之后再做一次校验，防止环境变量写入非法值
        super::validate_config(&config)?;

        linfo!(
            "system",
            LogStage::Configuration,
            LogComponent::Config,
            "config_loaded",
            "配置管理器初始化完成",
            path = %config_path.display(),
            env_overrides = env_overrides.len()
        );

        Ok(Self {
            config,
            config_path: config_path.to_path_buf(),
            env_overrides,
        })
    }

    /// 获取当前配置
    #[must_use]
    pub fn get_config(&self) -> AppConfig {
        self.config.clone()
    }

    /// 配置文件路径
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 已应用的环境变量覆盖数量
    #[must_use]
    pub fn override_count(&self) -> usize {
        self.env_overrides.len()
    }

    /// 加载配置文件
    fn load_config_file(path: &Path) -> Result<AppConfig> {
        if !path.exists() {
            return Err(GatewayError::config(format!(
                "配置文件不存在: {}",
                path.display()
            )));
        }

        let config_content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::config_with_source(format!("读取配置文件失败: {}", path.display()), e)
        })?;

        let config: AppConfig = toml::from_str(&config_content).map_err(|e| {
            GatewayError::config_with_source(
                format!("TOML解析失败 - 配置文件: {}", path.display()),
                e,
            )
        })?;

        super::validate_config(&config)?;

        Ok(config)
    }

    /// 构建环境变量覆盖映射
    ///
    /// `GATEWAY_SERVER_PORT` 对应 `server.port`
    fn build_env_overrides<I>(vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let overrides: HashMap<String, String> = vars
            .into_iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(ENV_PREFIX)
                    .map(|config_key| (config_key.to_lowercase().replace('_', "."), value))
            })
            .collect();

        ldebug!(
            "system",
            LogStage::Configuration,
            LogComponent::Config,
            "env_overrides",
            &format!("发现 {} 个环境变量覆盖", overrides.len())
        );
        overrides
    }

    /// 应用环境变量覆盖
    fn apply_env_overrides(config: &mut AppConfig, overrides: &HashMap<String, String>) -> Result<()> {
        for (path, value) in overrides {
            let shown = if path.contains("url") { "***" } else { value.as_str() };
            ldebug!(
                "system",
                LogStage::Configuration,
                LogComponent::Config,
                "apply_override",
                &format!("应用环境变量覆盖: {path} = {shown}")
            );

            Self::apply_override_to_config(config, path, value)?;
        }
        Ok(())
    }

    /// 将环境变量覆盖应用到配置对象
    fn apply_override_to_config(config: &mut AppConfig, path: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = path.split('.').collect();

        match parts.as_slice() {
            ["server", "host"] => config.server.host = value.to_string(),
            ["server", "port"] => config.server.port = parse_value(value, "端口号")?,
            ["server", "enable", "cors"] => config.server.enable_cors = parse_value(value, "CORS开关")?,
            ["database", "url"] => config.database.url = value.to_string(),
            ["database", "max", "connections"] => {
                config.database.max_connections = parse_value(value, "最大连接数")?;
            }
            ["database", "connect", "timeout"] => {
                config.database.connect_timeout = parse_value(value, "连接超时")?;
            }
            ["database", "query", "timeout"] => {
                config.database.query_timeout = parse_value(value, "操作超时")?;
            }
            ["usage", "sync", "interval", "secs"] => {
                config.usage.sync_interval_secs = parse_value(value, "统计落库间隔")?;
            }
            ["usage", "flush", "on", "shutdown"] => {
                config.usage.flush_on_shutdown = parse_value(value, "退出落库开关")?;
            }
            _ => {
                lwarn!(
                    "system",
                    LogStage::Configuration,
                    LogComponent::Config,
                    "unknown_override",
                    &format!("未知的配置路径，忽略环境变量覆盖: {path}")
                );
            }
        }

        Ok(())
    }
}

fn parse_value<T>(value: &str, label: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .map_err(|e| GatewayError::config_with_source(format!("无效的{label}: {value}"), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("create temp config");
        file.write_all(content.as_bytes()).expect("write temp config");
        file
    }

    const SAMPLE: &str = r#"
[server]
host = "127.0.0.1"
port = 9090

[database]
url = "sqlite::memory:"
max_connections = 1

[usage]
sync_interval_secs = 5
flush_on_shutdown = false
"#;

    #[test]
    fn test_load_from_file() {
        let file = write_config(SAMPLE);
        let manager = ConfigManager::from_file_with_env(file.path(), Vec::new()).unwrap();
        let config = manager.get_config();

        assert_eq!(config.server.bind_address(), "127.0.0.1:9090");
        assert!(config.database.is_memory_database());
        assert_eq!(config.usage.sync_interval(), Duration::from_secs(5));
        assert!(!config.usage.flush_on_shutdown);
        assert_eq!(manager.override_count(), 0);
    }

    #[test]
    fn test_env_overrides_applied() {
        let file = write_config(SAMPLE);
        let vars = vec![
            ("GATEWAY_SERVER_PORT".to_string(), "7000".to_string()),
            ("GATEWAY_USAGE_SYNC_INTERVAL_SECS".to_string(), "0".to_string()),
            ("GATEWAY_DATABASE_QUERY_TIMEOUT".to_string(), "3".to_string()),
            ("UNRELATED".to_string(), "x".to_string()),
        ];
        let manager = ConfigManager::from_file_with_env(file.path(), vars).unwrap();
        let config = manager.get_config();

        assert_eq!(config.server.port, 7000);
        assert_eq!(config.usage.sync_interval(), Duration::from_secs(60));
        assert_eq!(config.database.operation_timeout(), Duration::from_secs(3));
        assert_eq!(manager.override_count(), 3);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let file = write_config(SAMPLE);
        let vars = vec![("GATEWAY_SERVER_PORT".to_string(), "not-a-port".to_string())];
        let err = ConfigManager::from_file_with_env(file.path(), vars).unwrap_err();
        assert!(err.to_string().contains("无效的端口号"));
    }

    #[test]
    fn test_override_cannot_bypass_validation() {
        let file = write_config(SAMPLE);
        let vars = vec![("GATEWAY_DATABASE_URL".to_string(), String::new())];
        assert!(ConfigManager::from_file_with_env(file.path(), vars).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = ConfigManager::from_file_with_env("/nonexistent/gateway.toml", Vec::new()).unwrap_err();
        assert!(err.to_string().contains("配置文件不存在"));
    }
}
