//! # 测试 Mock 对象
//!
//! 存储接口的 Mock 实现，用于在不接数据库的情况下驱动缓存与统计逻辑

use async_trait::async_trait;
use mockall::mock;

use crate::error::Result;
use crate::routing::RouteEntry;
use crate::store::{EndpointStore, UsageStore};
use crate::usage::UsageCounter;

mock! {
    pub EndpointStore {}

    #[async_trait]
    impl EndpointStore for EndpointStore {
        async fn load_all_routes(&self) -> Result<Vec<RouteEntry>>;
        async fn load_route(&self, endpoint_id: i32) -> Result<Option<RouteEntry>>;
        async fn load_routes_by_provider(&self, provider_id: i32) -> Result<Vec<RouteEntry>>;
    }
}

mock! {
    pub UsageStore {}

    #[async_trait]
    impl UsageStore for UsageStore {
        async fn find_counter(&self, endpoint_id: i32, date: &str) -> Result<Option<UsageCounter>>;
        async fn find_counters_for_date(&self, date: &str) -> Result<Vec<UsageCounter>>;
        async fn save_counter(&self, counter: &UsageCounter) -> Result<i32>;
    }
}
