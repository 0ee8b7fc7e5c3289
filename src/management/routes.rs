//! # 路由配置
//!
//! 定义所有API路由和路由组织

use axum::Router;
use axum::routing::{get, post, put};

use crate::management::handlers::{endpoints, health, providers, stats};
use crate::management::server::AppState;

/// 创建所有路由
pub fn create_routes(state: AppState) -> Router {
    Router::new()
        // 健康检查路由
        .route("/health", get(health::health_check))
        .merge(provider_routes())
        .merge(endpoint_routes())
        .merge(stats_routes())
        .with_state(state)
}

/// 提供商管理路由
fn provider_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/providers",
            get(providers::list_providers).post(providers::create_provider),
        )
        .route(
            "/providers/{id}",
            put(providers::update_provider).delete(providers::delete_provider),
        )
}

/// API 路径与路由缓存管理路由
fn endpoint_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/endpoints",
            get(endpoints::list_endpoints).post(endpoints::create_endpoint),
        )
        .route("/endpoints/cache", get(endpoints::cache_snapshot))
        .route("/endpoints/cache/refresh", post(endpoints::refresh_cache))
        .route(
            "/endpoints/{id}",
            put(endpoints::update_endpoint).delete(endpoints::delete_endpoint),
        )
}

/// 统计查询路由
fn stats_routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats::get_stats))
        .route("/stats/live", get(stats::get_live_stats))
        .route("/stats/sync", post(stats::sync_stats))
}
