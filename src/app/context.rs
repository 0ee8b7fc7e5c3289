//! 应用上下文
//!
//! 统一持有跨模块共享的服务实例。路由缓存与用量聚合器在启动时各创建一次，
//! 通过 `Arc` 传给管理端与请求分发方，不使用全局变量。

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::database::{init_database, run_migrations};
use crate::error::{Context, Result};
use crate::logging::{LogComponent, LogStage};
use crate::routing::RoutingCache;
use crate::store::SeaOrmStore;
use crate::usage::{SystemClock, UsageAggregator, UsageClock};
use crate::linfo;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub db: Arc<DatabaseConnection>,
    pub store: Arc<SeaOrmStore>,
    pub routing: Arc<RoutingCache>,
    pub usage: Arc<UsageAggregator>,
}

impl AppContext {
    /// 连接数据库、执行迁移、加载路由表与当日统计
    ///
    /// 路由表或当日统计加载失败都会中止启动
    pub async fn bootstrap(config: AppConfig) -> Result<Self> {
        let db = init_database(&config.database).await?;
        run_migrations(&db).await?;
        Self::assemble(config, db, Arc::new(SystemClock)).await
    }

    /// 在已迁移的连接上组装上下文并完成预热
    pub async fn assemble(
        config: AppConfig,
        db: DatabaseConnection,
        clock: Arc<dyn UsageClock>,
    ) -> Result<Self> {
        let db = Arc::new(db);
        let store = Arc::new(SeaOrmStore::new(
            Arc::clone(&db),
            config.database.operation_timeout(),
        ));
        let routing = Arc::new(RoutingCache::new(store.clone()));
        let usage = Arc::new(UsageAggregator::new(store.clone(), clock));

        let routes = routing.hydrate().await.context("启动失败：无法加载路由表")?;
        let counters = usage.load().await.context("启动失败：无法加载当日统计")?;

        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "context_ready",
            "应用上下文初始化完成",
            routes = routes,
            counters = counters
        );

        Ok(Self {
            config: Arc::new(config),
            db,
            store,
            routing,
            usage,
        })
    }
}
