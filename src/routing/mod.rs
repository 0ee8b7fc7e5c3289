//! # 路由缓存模块
//!
//! 按路由路径索引的 API 路径配置内存镜像

mod cache;
mod types;

pub use cache::RoutingCache;
pub use types::{ProviderSnapshot, RouteEntry};
