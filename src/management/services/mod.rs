//! # 管理端服务层
//!
//! 先写数据库，再同步路由缓存。缓存同步失败不会回滚已提交的写入，
//! 而是在结果中标记为缓存未同步，由调用方如实反馈。

pub mod endpoints;
pub mod providers;
pub mod stats;

pub use endpoints::{CreateEndpointRequest, EndpointItem, EndpointService, UpdateEndpointRequest};
pub use providers::{CreateProviderRequest, ProviderItem, ProviderService, UpdateProviderRequest};
pub use stats::{StatsItem, StatsService};

use serde::Serialize;

use crate::error::GatewayError;

/// 写入提交后路由缓存的同步状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CacheSync {
    /// 缓存已与数据库一致
    Synced,
    /// 数据库已提交，缓存未能同步
    Stale { error: String },
}

impl CacheSync {
    #[must_use]
    pub const fn is_synced(&self) -> bool {
        matches!(self, Self::Synced)
    }

    pub(crate) fn from_result<T>(result: Result<T, GatewayError>) -> Self {
        match result {
            Ok(_) => Self::Synced,
            Err(e) => Self::Stale { error: e.to_string() },
        }
    }
}

/// 管理端写操作的结果
#[derive(Debug, Clone, Serialize)]
pub struct Mutation<T: Serialize> {
    #[serde(flatten)]
    pub item: T,
    pub cache: CacheSync,
}

impl<T: Serialize> Mutation<T> {
    pub const fn new(item: T, cache: CacheSync) -> Self {
        Self { item, cache }
    }
}
