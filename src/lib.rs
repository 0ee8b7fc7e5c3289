//! # AI Gateway Library
//!
//! AI 网关控制面核心库：路由配置缓存与用量统计聚合

pub mod app;
pub mod config;
pub mod database;
pub mod error;
pub mod logging;
pub mod management;
pub mod routing;
pub mod store;
pub mod testing;
pub mod usage;

// Re-export commonly used types
pub use app::AppContext;
pub use config::AppConfig;
pub use error::{GatewayError, Result};
pub use routing::{RouteEntry, RoutingCache};
pub use usage::{UsageAggregator, UsageSyncTask};
