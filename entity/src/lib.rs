//! # Entity 模块
//!
//! 包含网关控制面的 Sea-ORM 实体定义

pub mod api_endpoints;
pub mod api_stats;
pub mod providers;

pub use api_endpoints::Entity as ApiEndpoints;
pub use api_stats::Entity as ApiStats;
pub use providers::Entity as Providers;
