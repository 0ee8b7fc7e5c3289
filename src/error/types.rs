//! # 错误类型定义

use axum::http::StatusCode;
use thiserror::Error;

/// 网关主要错误类型
#[derive(Debug, Error)]
pub enum GatewayError {
    /// 配置相关错误
    #[error("配置错误: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 数据库相关错误
    #[error("数据库错误: {message}")]
    Database {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 持久化存储调用超时
    #[error("存储操作超时: {operation} ({timeout_seconds}s)")]
    Timeout {
        operation: String,
        timeout_seconds: u64,
    },

    /// 路由缓存错误
    #[error("路由缓存错误: {message}")]
    RoutingCache {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 用量统计错误
    #[error("用量统计错误: {message}")]
    Usage {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 资源未找到
    #[error("资源未找到: {resource_type} {identifier}")]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    /// 资源冲突（唯一约束、仍被引用等）
    #[error("资源冲突: {resource_type} {identifier}")]
    Conflict {
        resource_type: String,
        identifier: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 请求参数校验错误
    #[error("参数校验错误: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    /// IO相关错误
    #[error("IO错误: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// 序列化/反序列化错误
    #[error("序列化错误: {message}")]
    Serialization {
        message: String,
        #[source]
        source: anyhow::Error,
    },

    /// 服务器初始化错误
    #[error("服务器初始化错误: {message}")]
    ServerInit {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 服务器启动错误
    #[error("服务器启动错误: {message}")]
    ServerStart {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// 附加了上下文信息的错误
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<GatewayError>,
    },
}

impl GatewayError {
    /// 将错误转换为HTTP状态码和错误代码
    #[must_use]
    pub fn to_http_response_parts(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Config { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "CONFIG_ERROR"),
            Self::Database { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            Self::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "STORE_TIMEOUT"),
            Self::RoutingCache { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "ROUTING_CACHE_ERROR"),
            Self::Usage { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "USAGE_ERROR"),
            Self::NotFound { .. } => (StatusCode::NOT_FOUND, "RESOURCE_NOT_FOUND"),
            Self::Conflict { .. } => (StatusCode::CONFLICT, "RESOURCE_CONFLICT"),
            Self::Validation { .. } => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            Self::Io { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
            Self::Serialization { .. } => (StatusCode::BAD_REQUEST, "SERIALIZATION_ERROR"),
            Self::ServerInit { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "SERVER_INIT_ERROR"),
            Self::ServerStart { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "SERVER_START_ERROR"),
            Self::Context { source, .. } => source.to_http_response_parts(),
        }
    }

    /// 剥离上下文包装后的根错误
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// 是否为资源未找到
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self.root(), Self::NotFound { .. })
    }

    /// 是否为资源冲突
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self.root(), Self::Conflict { .. })
    }

    /// 创建配置错误
    pub fn config<T: Into<String>>(message: T) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的配置错误
    pub fn config_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建数据库错误
    pub fn database<T: Into<String>>(message: T) -> Self {
        Self::Database {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的数据库错误
    pub fn database_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Database {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建存储超时错误
    pub fn timeout<T: Into<String>>(operation: T, timeout_seconds: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_seconds,
        }
    }

    /// 创建带来源的路由缓存错误
    pub fn routing_cache_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::RoutingCache {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建用量统计错误
    pub fn usage<T: Into<String>>(message: T) -> Self {
        Self::Usage {
            message: message.into(),
            source: None,
        }
    }

    /// 创建带来源的用量统计错误
    pub fn usage_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::Usage {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建资源未找到错误
    pub fn not_found<T: Into<String>, I: Into<String>>(resource_type: T, identifier: I) -> Self {
        Self::NotFound {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
        }
    }

    /// 创建资源冲突错误
    pub fn conflict<T: Into<String>, I: Into<String>>(resource_type: T, identifier: I) -> Self {
        Self::Conflict {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
            source: None,
        }
    }

    /// 创建带来源的资源冲突错误
    pub fn conflict_with_source<T: Into<String>, I: Into<String>, E: Into<anyhow::Error>>(
        resource_type: T,
        identifier: I,
        source: E,
    ) -> Self {
        Self::Conflict {
            resource_type: resource_type.into(),
            identifier: identifier.into(),
            source: Some(source.into()),
        }
    }

    /// 创建参数校验错误
    pub fn validation<T: Into<String>>(message: T, field: Option<&str>) -> Self {
        Self::Validation {
            message: message.into(),
            field: field.map(str::to_string),
        }
    }

    /// 创建带来源的服务器初始化错误
    pub fn server_init_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::ServerInit {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 创建带来源的服务器启动错误
    pub fn server_start_with_source<T: Into<String>, E: Into<anyhow::Error>>(
        message: T,
        source: E,
    ) -> Self {
        Self::ServerStart {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

// 自动转换常见错误类型
impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: "文件操作失败".to_string(),
            source: err,
        }
    }
}

impl From<sea_orm::DbErr> for GatewayError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::database_with_source("数据库操作失败", err)
    }
}

impl From<toml::de::Error> for GatewayError {
    fn from(err: toml::de::Error) -> Self {
        Self::config_with_source("TOML解析失败", err)
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            message: "JSON处理失败".to_string(),
            source: err.into(),
        }
    }
}
