//! # 日志配置模块
//!
//! 初始化 `tracing` 订阅者，并提供带阶段/组件标签的结构化日志宏

use std::env;
use std::fmt;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// 日志所属的处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStage {
    Startup,
    Shutdown,
    Configuration,
    Db,
    Cache,
    Usage,
    BackgroundTask,
    Management,
}

impl LogStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Shutdown => "shutdown",
            Self::Configuration => "configuration",
            Self::Db => "db",
            Self::Cache => "cache",
            Self::Usage => "usage",
            Self::BackgroundTask => "background_task",
            Self::Management => "management",
        }
    }
}

impl fmt::Display for LogStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 产生日志的组件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogComponent {
    Main,
    Config,
    Database,
    Store,
    RoutingCache,
    UsageAggregator,
    UsageSync,
    Management,
    ServerSetup,
}

impl LogComponent {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Config => "config",
            Self::Database => "database",
            Self::Store => "store",
            Self::RoutingCache => "routing_cache",
            Self::UsageAggregator => "usage_aggregator",
            Self::UsageSync => "usage_sync",
            Self::Management => "management",
            Self::ServerSetup => "server_setup",
        }
    }
}

impl fmt::Display for LogComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 结构化 info 日志
///
/// `linfo!(request_id, stage, component, operation, message, key = value, ...)`
#[macro_export]
macro_rules! linfo {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(, $($field:tt)+)?) => {
        ::tracing::info!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($($field)+ ,)?
            "{}",
            $message
        )
    };
}

/// 结构化 debug 日志
#[macro_export]
macro_rules! ldebug {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(, $($field:tt)+)?) => {
        ::tracing::debug!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($($field)+ ,)?
            "{}",
            $message
        )
    };
}

/// 结构化 warn 日志
#[macro_export]
macro_rules! lwarn {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(, $($field:tt)+)?) => {
        ::tracing::warn!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($($field)+ ,)?
            "{}",
            $message
        )
    };
}

/// 结构化 error 日志
#[macro_export]
macro_rules! lerror {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(, $($field:tt)+)?) => {
        ::tracing::error!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            $($($field)+ ,)?
            "{}",
            $message
        )
    };
}

/// 初始化日志系统
pub fn init_optimized_logging(log_level: Option<&str>) {
    let level = log_level.unwrap_or("info");

    // 默认配置：关闭数据库查询的逐条日志
    let default_filter = format!("{level},ai_gateway=debug,sqlx::query=off,sea_orm::query=warn,sqlx=warn");

    let log_filter = env::var("RUST_LOG").unwrap_or(default_filter);

    let initialized = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into()))
        .with(
            tracing_fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();

    if initialized.is_err() {
        // 已有全局订阅者（如测试环境），沿用即可
        return;
    }

    if env::var("RUST_LOG").is_ok_and(|v| v.contains("sqlx::query=info") || v.contains("sqlx::query=debug")) {
        tracing::info!("SQLx database query logging enabled");
    } else {
        tracing::info!("SQLx database query logging disabled");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_render_as_snake_case() {
        assert_eq!(LogStage::BackgroundTask.to_string(), "background_task");
        assert_eq!(LogComponent::RoutingCache.to_string(), "routing_cache");
    }

    #[test]
    fn test_macros_expand_with_and_without_fields() {
        init_optimized_logging(Some("debug"));
        crate::linfo!("system", LogStage::Startup, LogComponent::Main, "probe", "plain message");
        crate::lwarn!(
            "system",
            LogStage::Cache,
            LogComponent::RoutingCache,
            "probe_fields",
            "with fields",
            path = "/api/echo",
            count = 3
        );
    }
}
