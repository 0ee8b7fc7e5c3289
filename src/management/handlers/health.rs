//! 健康检查处理器

use axum::extract::State;
use axum::response::Response;
use serde::Serialize;

use crate::database::check_database_status;
use crate::management::{response, server::AppState};

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub routes: usize,
    pub live_counters: usize,
    pub retired_pending: usize,
    pub pending_migrations: usize,
}

/// 健康检查
///
/// 数据库不可达时返回错误；有待应用的迁移时状态为 `degraded`
pub async fn health_check(State(state): State<AppState>) -> Response {
    let pending_migrations = match check_database_status(&state.db).await {
        Ok(pending) => pending,
        Err(e) => return response::app_error(e),
    };

    response::success(HealthStatus {
        status: if pending_migrations == 0 { "ok" } else { "degraded" },
        routes: state.routing.len().await,
        live_counters: state.usage.live_counters().await.len(),
        retired_pending: state.usage.retired_pending().await,
        pending_migrations,
    })
}
