//! # 路由配置缓存
//!
//! 写穿透缓存：数据库先写入成功，再由调用方通知缓存更新。
//! 查找只持有读锁，不访问存储；所有修改在写锁下整条替换，读者要么看到旧条目，要么看到新条目。
//!
//! 路径改名是两步非原子操作（先删旧键，再按 ID 重新读取并插入）。
//! 两步之间并发查找旧路径得到未命中，查找新路径也可能尚未命中。
//!
//! 整表加载从读取存储起就持有写锁，加载期间的查找和单条更新都会等待，
//! 加载期间完成的单条更新不会被整表替换覆盖。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::RouteEntry;
use crate::error::{GatewayError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::store::EndpointStore;
use crate::{ldebug, linfo, lwarn};

type RouteMap = HashMap<String, Arc<RouteEntry>>;

/// 路由配置缓存
pub struct RoutingCache {
    store: Arc<dyn EndpointStore>,
    routes: RwLock<RouteMap>,
}

impl RoutingCache {
    /// 创建空缓存，需调用 [`Self::hydrate`] 后才能对外服务
    pub fn new(store: Arc<dyn EndpointStore>) -> Self {
        Self {
            store,
            routes: RwLock::new(HashMap::new()),
        }
    }

    /// 从存储加载全部路由并整体替换当前表
    ///
    /// 加载失败时保留原有表并返回错误；启动阶段的失败应视为致命。
    /// 读取存储期间持有写锁
    pub async fn hydrate(&self) -> Result<usize> {
        let mut routes = self.routes.write().await;

        let entries = self.store.load_all_routes().await.map_err(|e| {
            lwarn!(
                "system",
                LogStage::Cache,
                LogComponent::RoutingCache,
                "hydrate_failed",
                &format!("加载路由表失败: {e}")
            );
            GatewayError::routing_cache_with_source("加载路由表失败", e)
        })?;

        let fresh: RouteMap = entries
            .into_iter()
            .map(|entry| (entry.path.clone(), Arc::new(entry)))
            .collect();
        let count = fresh.len();

        *routes = fresh;
        drop(routes);

        linfo!(
            "system",
            LogStage::Cache,
            LogComponent::RoutingCache,
            "hydrate",
            "路由表加载完成",
            routes = count
        );
        Ok(count)
    }

    /// 运行期重新加载全部路由，语义同 [`Self::hydrate`]
    pub async fn refresh(&self) -> Result<usize> {
        self.hydrate().await
    }

    /// 按路径查找路由配置
    pub async fn lookup(&self, path: &str) -> Option<Arc<RouteEntry>> {
        self.routes.read().await.get(path).cloned()
    }

    /// 数据库创建或更新 API 路径成功后调用
    ///
    /// 按 ID 重新读取完整条目（含提供商），再在写锁下替换；
    /// 读取失败或行已不存在时缓存保持不变并返回错误
    pub async fn upsert(&self, endpoint_id: i32) -> Result<Arc<RouteEntry>> {
        // 读取期间不持锁
        let entry = self
            .store
            .load_route(endpoint_id)
            .await?
            .ok_or_else(|| GatewayError::not_found("api_endpoint", endpoint_id.to_string()))?;

        let entry = Arc::new(entry);
        let replaced = self
            .routes
            .write()
            .await
            .insert(entry.path.clone(), Arc::clone(&entry));

        ldebug!(
            "system",
            LogStage::Cache,
            LogComponent::RoutingCache,
            "upsert",
            "路由条目已更新",
            endpoint_id = endpoint_id,
            path = %entry.path,
            replaced = replaced.is_some()
        );
        Ok(entry)
    }

    /// 删除单个路径，返回该路径此前是否存在
    pub async fn remove(&self, path: &str) -> bool {
        let removed = self.routes.write().await.remove(path).is_some();

        ldebug!(
            "system",
            LogStage::Cache,
            LogComponent::RoutingCache,
            "remove",
            "路由条目已删除",
            path = %path,
            existed = removed
        );
        removed
    }

    /// 路径改名：先删除旧路径，再按 ID 重新读取插入
    ///
    /// 两步之间存在可见窗口：旧路径已未命中，新路径可能还未出现。
    /// 第二步失败时旧路径保持删除状态，错误返回给调用方
    pub async fn rename(&self, old_path: &str, endpoint_id: i32) -> Result<Arc<RouteEntry>> {
        self.remove(old_path).await;
        self.upsert(endpoint_id).await.map_err(|e| {
            lwarn!(
                "system",
                LogStage::Cache,
                LogComponent::RoutingCache,
                "rename_failed",
                &format!("路径改名的插入步骤失败: {e}"),
                old_path = %old_path,
                endpoint_id = endpoint_id
            );
            e
        })
    }

    /// 提供商变更后，重新读取其关联的全部路由条目
    ///
    /// 与整表加载一样在读取存储前持有写锁
    pub async fn refresh_provider(&self, provider_id: i32) -> Result<usize> {
        let mut routes = self.routes.write().await;
        let entries = self.store.load_routes_by_provider(provider_id).await?;
        let count = entries.len();

        for entry in entries {
            routes.insert(entry.path.clone(), Arc::new(entry));
        }
        drop(routes);

        ldebug!(
            "system",
            LogStage::Cache,
            LogComponent::RoutingCache,
            "refresh_provider",
            "提供商关联的路由条目已刷新",
            provider_id = provider_id,
            routes = count
        );
        Ok(count)
    }

    /// 整张表的独立拷贝，修改返回值不影响缓存
    pub async fn snapshot(&self) -> HashMap<String, RouteEntry> {
        self.routes
            .read()
            .await
            .iter()
            .map(|(path, entry)| (path.clone(), RouteEntry::clone(entry)))
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.routes.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.routes.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockEndpointStore, RouteFixture};
    use mockall::predicate::eq;
    use pretty_assertions::assert_eq;

    fn cache_with(store: MockEndpointStore) -> RoutingCache {
        RoutingCache::new(Arc::new(store))
    }

    #[tokio::test]
    async fn test_hydrate_replaces_whole_table() {
        let mut store = MockEndpointStore::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_load_all_routes()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| {
                Ok(vec![
                    RouteFixture::new().id(1).path("/api/a").build(),
                    RouteFixture::new().id(2).path("/api/b").build(),
                ])
            });
        store
            .expect_load_all_routes()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![RouteFixture::new().id(3).path("/api/c").build()]));

        let cache = cache_with(store);
        assert_eq!(cache.hydrate().await.unwrap(), 2);
        assert!(cache.lookup("/api/a").await.is_some());

        assert_eq!(cache.refresh().await.unwrap(), 1);
        assert!(cache.lookup("/api/a").await.is_none());
        assert!(cache.lookup("/api/b").await.is_none());
        assert_eq!(cache.lookup("/api/c").await.unwrap().id, 3);
    }

    #[tokio::test]
    async fn test_failed_hydrate_keeps_previous_table() {
        let mut store = MockEndpointStore::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_load_all_routes()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(vec![RouteFixture::new().path("/api/a").build()]));
        store
            .expect_load_all_routes()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Err(GatewayError::database("connection reset")));

        let cache = cache_with(store);
        cache.hydrate().await.unwrap();
        let err = cache.refresh().await.unwrap_err();

        assert!(matches!(err, GatewayError::RoutingCache { .. }));
        assert_eq!(cache.len().await, 1);
        assert!(cache.lookup("/api/a").await.is_some());
    }

    #[tokio::test]
    async fn test_upsert_rereads_committed_row() {
        let mut store = MockEndpointStore::new();
        store
            .expect_load_route()
            .with(eq(5))
            .returning(|_| {
                Ok(Some(
                    RouteFixture::new()
                        .id(5)
                        .path("/api/echo")
                        .provider(9, "deepseek")
                        .streaming()
                        .system_prompt("translate to French")
                        .build(),
                ))
            });

        let cache = cache_with(store);
        let entry = cache.upsert(5).await.unwrap();

        assert_eq!(entry.provider.name, "deepseek");
        assert!(entry.stream_output);
        assert_eq!(entry.system_prompt.as_deref(), Some("translate to French"));
        assert_eq!(*cache.lookup("/api/echo").await.unwrap(), *entry);
    }

    #[tokio::test]
    async fn test_upsert_store_error_leaves_cache_unchanged() {
        let mut store = MockEndpointStore::new();
        store
            .expect_load_all_routes()
            .returning(|| Ok(vec![RouteFixture::new().id(5).path("/api/echo").build()]));
        store
            .expect_load_route()
            .returning(|_| Err(GatewayError::timeout("load_route", 30)));

        let cache = cache_with(store);
        cache.hydrate().await.unwrap();
        let before = cache.snapshot().await;

        let err = cache.upsert(5).await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout { .. }));
        assert_eq!(cache.snapshot().await, before);
    }

    #[tokio::test]
    async fn test_upsert_missing_row_is_not_found() {
        let mut store = MockEndpointStore::new();
        store.expect_load_route().returning(|_| Ok(None));

        let cache = cache_with(store);
        let err = cache.upsert(42).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_remove_reports_presence() {
        let mut store = MockEndpointStore::new();
        store
            .expect_load_all_routes()
            .returning(|| Ok(vec![RouteFixture::new().path("/api/echo").build()]));

        let cache = cache_with(store);
        cache.hydrate().await.unwrap();

        assert!(cache.remove("/api/echo").await);
        assert!(!cache.remove("/api/echo").await);
        assert!(cache.lookup("/api/echo").await.is_none());
    }

    #[tokio::test]
    async fn test_rename_moves_entry() {
        let mut store = MockEndpointStore::new();
        store
            .expect_load_all_routes()
            .returning(|| Ok(vec![RouteFixture::new().id(1).path("/api/old").build()]));
        store
            .expect_load_route()
            .with(eq(1))
            .returning(|_| Ok(Some(RouteFixture::new().id(1).path("/api/new").build())));

        let cache = cache_with(store);
        cache.hydrate().await.unwrap();
        let entry = cache.rename("/api/old", 1).await.unwrap();

        assert_eq!(entry.path, "/api/new");
        assert!(cache.lookup("/api/old").await.is_none());
        assert_eq!(cache.lookup("/api/new").await.unwrap().id, 1);
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn test_rename_failure_keeps_old_path_removed() {
        let mut store = MockEndpointStore::new();
        store
            .expect_load_all_routes()
            .returning(|| Ok(vec![RouteFixture::new().id(1).path("/api/old").build()]));
        store
            .expect_load_route()
            .returning(|_| Err(GatewayError::database("disk I/O error")));

        let cache = cache_with(store);
        cache.hydrate().await.unwrap();

        crate::assert_error_type!(cache.rename("/api/old", 1).await, GatewayError::Database { .. });
        assert!(cache.is_empty().await);
    }

    #[tokio::test]
    async fn test_refresh_provider_replaces_bound_entries() {
        let mut store = MockEndpointStore::new();
        store.expect_load_all_routes().returning(|| {
            Ok(vec![
                RouteFixture::new().id(1).path("/api/a").provider(1, "openai").build(),
                RouteFixture::new().id(2).path("/api/b").provider(2, "deepseek").build(),
            ])
        });
        store
            .expect_load_routes_by_provider()
            .with(eq(1))
            .returning(|_| Ok(vec![RouteFixture::new().id(1).path("/api/a").provider(1, "openai-renamed").build()]));

        let cache = cache_with(store);
        cache.hydrate().await.unwrap();

        assert_eq!(cache.refresh_provider(1).await.unwrap(), 1);
        assert_eq!(cache.lookup("/api/a").await.unwrap().provider.name, "openai-renamed");
        assert_eq!(cache.lookup("/api/b").await.unwrap().provider.name, "deepseek");
    }

    #[tokio::test]
    async fn test_snapshot_is_independent_copy() {
        let mut store = MockEndpointStore::new();
        store
            .expect_load_all_routes()
            .returning(|| Ok(vec![RouteFixture::new().path("/api/echo").build()]));

        let cache = cache_with(store);
        cache.hydrate().await.unwrap();

        let mut copy = cache.snapshot().await;
        if let Some(entry) = copy.get_mut("/api/echo") {
            entry.stream_output = true;
            entry.provider.name = "tampered".to_string();
        }
        copy.insert("/api/ghost".to_string(), RouteFixture::new().path("/api/ghost").build());

        let live = cache.lookup("/api/echo").await.unwrap();
        assert!(!live.stream_output);
        assert_eq!(live.provider.name, "openai");
        assert!(cache.lookup("/api/ghost").await.is_none());
    }
}
