//! # 持久化存储模块
//!
//! 路由缓存与用量统计依赖的存储接口，以及基于 Sea-ORM 的实现

mod sea_orm_store;

pub use sea_orm_store::SeaOrmStore;
pub(crate) use sea_orm_store::is_unique_violation;

use async_trait::async_trait;

use crate::error::Result;
use crate::routing::RouteEntry;
use crate::usage::UsageCounter;

/// 路由配置的读取接口
#[async_trait]
pub trait EndpointStore: Send + Sync {
    /// 读取全部 API 路径（连同提供商）
    async fn load_all_routes(&self) -> Result<Vec<RouteEntry>>;

    /// 读取单个 API 路径，不存在或提供商已失效时返回 `None`
    async fn load_route(&self, endpoint_id: i32) -> Result<Option<RouteEntry>>;

    /// 读取绑定到某个提供商的全部 API 路径
    async fn load_routes_by_provider(&self, provider_id: i32) -> Result<Vec<RouteEntry>>;
}

/// 每日用量计数的读写接口
#[async_trait]
pub trait UsageStore: Send + Sync {
    /// 按 (路径, 日期) 查找计数行
    async fn find_counter(&self, endpoint_id: i32, date: &str) -> Result<Option<UsageCounter>>;

    /// 读取某一天的全部计数行
    async fn find_counters_for_date(&self, date: &str) -> Result<Vec<UsageCounter>>;

    /// 写入计数，返回持久化行 ID
    ///
    /// 没有 ID 时插入；插入撞上 (路径, 日期) 唯一约束时改为整行更新已有行
    async fn save_counter(&self, counter: &UsageCounter) -> Result<i32>;
}
