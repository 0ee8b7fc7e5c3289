//! # 管理端 API 集成测试
//!
//! 通过 `tower::ServiceExt::oneshot` 直接驱动完整路由，不监听端口

use std::sync::Arc;
use std::time::Duration;

use ai_gateway::management::{AppState, build_router};
use ai_gateway::routing::RouteEntry;
use ai_gateway::store::{EndpointStore, SeaOrmStore};
use ai_gateway::usage::ManualClock;
use ai_gateway::{AppConfig, AppContext, GatewayError, RoutingCache, UsageAggregator};
use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode, header};
use chrono::NaiveDate;
use migration::{Migrator, MigratorTrait};
use pretty_assertions::assert_eq;
use sea_orm::{Database, DatabaseConnection};
use serde_json::{Value, json};
use tower::ServiceExt;

async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    Migrator::up(&db, None).await.unwrap();
    db
}

fn test_clock() -> Arc<ManualClock> {
    let start = NaiveDate::from_ymd_opt(2025, 3, 14)
        .unwrap()
        .and_hms_opt(10, 0, 0)
        .unwrap();
    Arc::new(ManualClock::new(start))
}

async fn setup_app() -> (Router, Arc<AppContext>) {
    let db = setup_test_db().await;
    let ctx = AppContext::assemble(AppConfig::default(), db, test_clock())
        .await
        .unwrap();
    let ctx = Arc::new(ctx);
    (build_router(AppState::new(Arc::clone(&ctx)), false), ctx)
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_provider(app: &Router, name: &str) -> i64 {
    let (status, body) = send(
        app,
        Method::POST,
        "/api/providers",
        Some(json!({
            "name": name,
            "base_url": format!("https://{name}.example.com/v1"),
            "api_key": "sk-test-0123456789",
            "model_name": "gpt-4o",
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_i64().unwrap()
}

async fn create_endpoint(app: &Router, path: &str, provider_id: i64) -> (StatusCode, Value) {
    send(
        app,
        Method::POST,
        "/api/endpoints",
        Some(json!({
            "path": path,
            "access_key": "client-key",
            "provider_id": provider_id,
        })),
    )
    .await
}

#[tokio::test]
async fn test_health_reports_counts() {
    let (app, _ctx) = setup_app().await;

    let (status, body) = send(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["status"], json!("ok"));
    assert_eq!(body["data"]["routes"], json!(0));
    assert_eq!(body["data"]["retired_pending"], json!(0));
    assert_eq!(body["data"]["pending_migrations"], json!(0));
}

#[tokio::test]
async fn test_health_reports_pending_migrations() {
    let (app, ctx) = setup_app().await;
    Migrator::down(ctx.db.as_ref(), Some(1)).await.unwrap();

    let (status, body) = send(&app, Method::GET, "/api/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], json!("degraded"));
    assert_eq!(body["data"]["pending_migrations"], json!(1));
}

#[tokio::test]
async fn test_provider_is_listed_with_masked_key() {
    let (app, _ctx) = setup_app().await;
    create_provider(&app, "openai").await;

    let (status, body) = send(&app, Method::GET, "/api/providers", None).await;
    assert_eq!(status, StatusCode::OK);
    let providers = body["data"].as_array().unwrap();
    assert_eq!(providers.len(), 1);
    assert_eq!(providers[0]["api_key_masked"], json!("****6789"));
    assert!(providers[0].get("api_key").is_none());
}

#[tokio::test]
async fn test_endpoint_crud_is_reflected_in_cache() {
    let (app, ctx) = setup_app().await;
    let provider_id = create_provider(&app, "openai").await;

    let (status, body) = create_endpoint(&app, "/api/echo", provider_id).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["cache"]["status"], json!("synced"));
    assert_eq!(body["data"]["provider_name"], json!("openai"));
    let endpoint_id = body["data"]["id"].as_i64().unwrap();

    let (_, body) = send(&app, Method::GET, "/api/endpoints/cache", None).await;
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0]["path"], json!("/api/echo"));
    assert_eq!(entries[0]["stream_output"], json!(false));
    assert_eq!(entries[0]["provider"]["name"], json!("openai"));
    // 上游凭证不出现在管理接口输出中
    assert!(entries[0]["provider"].get("api_key").is_none());

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/endpoints/{endpoint_id}"),
        Some(json!({ "path": "/api/echo2", "stream_output": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["cache"]["status"], json!("synced"));
    assert!(ctx.routing.lookup("/api/echo").await.is_none());
    assert!(ctx.routing.lookup("/api/echo2").await.unwrap().stream_output);

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/endpoints/{endpoint_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(ctx.routing.is_empty().await);

    let (_, body) = send(&app, Method::GET, "/api/endpoints", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_path_is_conflict() {
    let (app, _ctx) = setup_app().await;
    let provider_id = create_provider(&app, "openai").await;

    let (status, _) = create_endpoint(&app, "/api/echo", provider_id).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = create_endpoint(&app, "/api/echo", provider_id).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"]["code"], json!("RESOURCE_CONFLICT"));
}

#[tokio::test]
async fn test_provider_in_use_cannot_be_deleted() {
    let (app, _ctx) = setup_app().await;
    let provider_id = create_provider(&app, "openai").await;
    create_endpoint(&app, "/api/echo", provider_id).await;

    let (status, body) = send(
        &app,
        Method::DELETE,
        &format!("/api/providers/{provider_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], json!("RESOURCE_CONFLICT"));

    let (_, body) = send(&app, Method::GET, "/api/providers", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_provider_update_refreshes_cached_routes() {
    let (app, ctx) = setup_app().await;
    let provider_id = create_provider(&app, "openai").await;
    create_endpoint(&app, "/api/echo", provider_id).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/providers/{provider_id}"),
        Some(json!({ "model_name": "gpt-4.1" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["cache"]["status"], json!("synced"));
    assert_eq!(
        ctx.routing.lookup("/api/echo").await.unwrap().provider.model_name,
        "gpt-4.1"
    );
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let (app, _ctx) = setup_app().await;
    let provider_id = create_provider(&app, "openai").await;

    let (status, body) = create_endpoint(&app, "no-leading-slash", provider_id).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));

    let (status, body) = create_endpoint(&app, "/api/echo", 9999).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/endpoints")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], json!("INVALID_BODY"));

    let (status, body) = send(&app, Method::PUT, "/api/endpoints/4242", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], json!("RESOURCE_NOT_FOUND"));
}

#[tokio::test]
async fn test_stats_sync_and_query() {
    let (app, ctx) = setup_app().await;
    let provider_id = create_provider(&app, "openai").await;
    let (_, body) = create_endpoint(&app, "/api/echo", provider_id).await;
    let endpoint_id = i32::try_from(body["data"]["id"].as_i64().unwrap()).unwrap();

    ctx.usage.add_usage(endpoint_id, 100, 50, 10).await.unwrap();
    ctx.usage.add_usage(endpoint_id, 5, 5, 0).await.unwrap();

    let (status, body) = send(&app, Method::GET, "/api/stats/live", None).await;
    assert_eq!(status, StatusCode::OK);
    let live = body["data"].as_array().unwrap();
    assert_eq!(live.len(), 1);
    assert_eq!(live[0]["path"], json!("/api/echo"));
    assert_eq!(live[0]["call_count"], json!(2));
    assert_eq!(live[0]["pending"], json!(true));

    let (status, body) = send(&app, Method::POST, "/api/stats/sync", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["written"], json!(1));
    assert_eq!(body["data"]["failed"], json!(0));

    let (status, body) = send(&app, Method::GET, "/api/stats?date=2025-03-14", None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["call_count"], json!(2));
    assert_eq!(rows[0]["input_tokens"], json!(105));
    assert_eq!(rows[0]["output_tokens"], json!(55));
    assert_eq!(rows[0]["cache_hit_tokens"], json!(10));
    assert_eq!(rows[0]["pending"], json!(false));

    // 缺省日期取聚合器时钟的当天
    let (_, body) = send(&app, Method::GET, "/api/stats", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // 未补零的日期按同一天处理
    let (status, body) = send(&app, Method::GET, "/api/stats?date=2025-3-14", None).await;
    assert_eq!(status, StatusCode::OK);
    let rows = body["data"].as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["date"], json!("2025-03-14"));

    let (_, body) = send(&app, Method::GET, "/api/stats?date=2025-03-13", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = send(&app, Method::GET, "/api/stats?date=14-03-2025", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], json!("VALIDATION_ERROR"));
}

#[tokio::test]
async fn test_cache_refresh_picks_up_database_state() {
    let (app, ctx) = setup_app().await;
    let provider_id = create_provider(&app, "openai").await;
    create_endpoint(&app, "/api/echo", provider_id).await;

    ctx.routing.remove("/api/echo").await;
    assert!(ctx.routing.is_empty().await);

    let (status, body) = send(&app, Method::POST, "/api/endpoints/cache/refresh", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["routes"], json!(1));
    assert!(ctx.routing.lookup("/api/echo").await.is_some());
}

/// 单条读取总是失败的路由存储，用于模拟缓存同步失败
struct FailingEndpointStore;

#[async_trait]
impl EndpointStore for FailingEndpointStore {
    async fn load_all_routes(&self) -> ai_gateway::Result<Vec<RouteEntry>> {
        Ok(Vec::new())
    }

    async fn load_route(&self, _endpoint_id: i32) -> ai_gateway::Result<Option<RouteEntry>> {
        Err(GatewayError::database("连接已断开"))
    }

    async fn load_routes_by_provider(&self, _provider_id: i32) -> ai_gateway::Result<Vec<RouteEntry>> {
        Err(GatewayError::database("连接已断开"))
    }
}

#[tokio::test]
async fn test_committed_write_with_failed_cache_sync_is_reported_stale() {
    let db = Arc::new(setup_test_db().await);
    let store = Arc::new(SeaOrmStore::new(Arc::clone(&db), Duration::from_secs(5)));
    let routing = Arc::new(RoutingCache::new(Arc::new(FailingEndpointStore)));
    let usage = Arc::new(UsageAggregator::new(store.clone(), test_clock()));
    let ctx = Arc::new(AppContext {
        config: Arc::new(AppConfig::default()),
        db,
        store,
        routing,
        usage,
    });
    let app = build_router(AppState::new(Arc::clone(&ctx)), false);

    let provider_id = create_provider(&app, "openai").await;
    let (status, body) = create_endpoint(&app, "/api/echo", provider_id).await;

    // 数据库写入已提交，只是缓存未同步
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["cache"]["status"], json!("stale"));
    assert!(body["data"]["cache"]["error"].as_str().is_some());
    assert_eq!(body["message"], json!("已保存，但路由缓存未同步"));
    assert!(ctx.routing.lookup("/api/echo").await.is_none());

    let (_, body) = send(&app, Method::GET, "/api/endpoints", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}
