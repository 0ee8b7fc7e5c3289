//! # 提供商管理处理器

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::Response;

use super::{invalid_body, mutation_response};
use crate::management::services::{CreateProviderRequest, ProviderService, UpdateProviderRequest};
use crate::management::{response, server::AppState};

pub async fn list_providers(State(state): State<AppState>) -> Response {
    match ProviderService::new(&state).list().await {
        Ok(items) => response::success(items),
        Err(e) => response::app_error(e),
    }
}

pub async fn create_provider(
    State(state): State<AppState>,
    body: Result<Json<CreateProviderRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_body(&rejection),
    };

    match ProviderService::new(&state).create(request).await {
        Ok(item) => response::created(item, "创建成功"),
        Err(e) => response::app_error(e),
    }
}

/// 更新提供商，同时刷新相关路由条目
pub async fn update_provider(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Result<Json<UpdateProviderRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => return invalid_body(&rejection),
    };

    match ProviderService::new(&state).update(id, request).await {
        Ok(mutation) => mutation_response(mutation, "更新成功"),
        Err(e) => response::app_error(e),
    }
}

pub async fn delete_provider(State(state): State<AppState>, Path(id): Path<i32>) -> Response {
    match ProviderService::new(&state).delete(id).await {
        Ok(item) => response::success_with_message(item, "删除成功"),
        Err(e) => response::app_error(e),
    }
}
