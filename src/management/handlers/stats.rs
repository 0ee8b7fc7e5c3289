//! # 用量统计处理器

use axum::extract::{Query, State};
use axum::response::Response;
use serde::Deserialize;

use crate::management::services::StatsService;
use crate::management::{response, server::AppState};

/// 统计查询参数
#[derive(Debug, Deserialize)]
pub struct StatsQuery {
    /// YYYY-MM-DD，缺省为当天
    pub date: Option<String>,
}

/// 某一天已落库的统计
pub async fn get_stats(State(state): State<AppState>, Query(query): Query<StatsQuery>) -> Response {
    match StatsService::new(&state).for_date(query.date.as_deref()).await {
        Ok(items) => response::success(items),
        Err(e) => response::app_error(e),
    }
}

/// 内存中的实时计数
pub async fn get_live_stats(State(state): State<AppState>) -> Response {
    match StatsService::new(&state).live().await {
        Ok(items) => response::success(items),
        Err(e) => response::app_error(e),
    }
}

/// 立即落库
pub async fn sync_stats(State(state): State<AppState>) -> Response {
    let report = StatsService::new(&state).sync_now().await;
    if report.is_clean() {
        response::success_with_message(report, "统计已落库")
    } else {
        response::success_with_message(report, "部分统计落库失败，将在下次同步时重试")
    }
}
