//! # 管理端 HTTP 处理器

pub mod endpoints;
pub mod health;
pub mod providers;
pub mod stats;

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::Response;
use serde::Serialize;

use crate::management::response;
use crate::management::services::Mutation;

/// 请求体解析失败时返回统一的错误格式
pub(crate) fn invalid_body(rejection: &JsonRejection) -> Response {
    response::error(StatusCode::BAD_REQUEST, "INVALID_BODY", &rejection.body_text())
}

/// 写操作结果：缓存同步与否给出不同提示
pub(crate) fn mutation_response<T: Serialize>(mutation: Mutation<T>, synced_message: &str) -> Response {
    if mutation.cache.is_synced() {
        response::success_with_message(mutation, synced_message)
    } else {
        response::success_with_message(mutation, "已保存，但路由缓存未同步")
    }
}
