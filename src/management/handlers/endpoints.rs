//! # API 路径管理处理器

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;

use super::{invalid_body, mutation_response};
use crate::management::services::{CreateEndpointRequest, EndpointService, UpdateEndpointRequest};
use crate::management::{response, server::AppState};

/// 列出 API 路径
pub async fn list_endpoints(State(state): State<AppState>) -> Response {
    match EndpointService::new(&state).list().await {
        Ok(items) => response::success(items),
        Err(e) => response::app_error(e),
    }
}

/// 创建 API 路径
pub async fn create_endpoint(
    State(state): State<AppState>,
    body: Result<Json<CreateEndpointRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_body(&rejection),
    };

    match EndpointService::new(&state).create(request).await {
        Ok(mutation) => {
            if mutation.cache.is_synced() {
                response::created(mutation, "创建成功")
            } else {
                mutation_response(mutation, "创建成功")
            }
        }
        Err(e) => response::app_error(e),
    }
}

/// 更新 API 路径
pub async fn update_endpoint(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Result<Json<UpdateEndpointRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_body(&rejection),
    };

    match EndpointService::new(&state).update(id, request).await {
        Ok(mutation) => mutation_response(mutation, "更新成功"),
        Err(e) => response::app_error(e),
    }
}

/// 删除 API 路径
pub async fn delete_endpoint(State(state): State<AppState>, Path(id): Path<i32>) -> Response {
    match EndpointService::new(&state).delete(id).await {
        Ok(mutation) => mutation_response(mutation, "删除成功"),
        Err(e) => response::app_error(e),
    }
}

/// 路由缓存快照
pub async fn cache_snapshot(State(state): State<AppState>) -> Response {
    let mut entries: Vec<_> = state.routing.snapshot().await.into_values().collect();
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    response::success(entries)
}

/// 从数据库重新加载路由缓存
pub async fn refresh_cache(State(state): State<AppState>) -> Response {
    match state.routing.refresh().await {
        Ok(count) => response::success_with_message(serde_json::json!({ "routes": count }), "路由缓存已刷新"),
        Err(e) => response::app_error(e),
    }
}
