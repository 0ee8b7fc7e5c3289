//! # 用量统计查询服务

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use entity::api_endpoints;
use sea_orm::EntityTrait;
use serde::Serialize;

use crate::app::AppContext;
use crate::error::{GatewayError, Result};
use crate::store::{SeaOrmStore, UsageStore};
use crate::usage::{DATE_FORMAT, SyncReport, UsageAggregator, UsageCounter};

/// 统计列表项
#[derive(Debug, Clone, Serialize)]
pub struct StatsItem {
    pub id: Option<i32>,
    pub endpoint_id: i32,
    /// 已删除的 API 路径为 `None`
    pub path: Option<String>,
    pub date: String,
    pub call_count: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cache_hit_tokens: i64,
    pub last_updated: NaiveDateTime,
    /// 是否有尚未落库的增量
    pub pending: bool,
}

impl StatsItem {
    fn new(counter: UsageCounter, paths: &HashMap<i32, String>) -> Self {
        Self {
            id: counter.id,
            endpoint_id: counter.endpoint_id,
            path: paths.get(&counter.endpoint_id).cloned(),
            date: counter.date,
            call_count: counter.call_count,
            input_tokens: counter.input_tokens,
            output_tokens: counter.output_tokens,
            cache_hit_tokens: counter.cache_hit_tokens,
            last_updated: counter.last_updated,
            pending: counter.dirty,
        }
    }
}

/// 用量统计查询服务
pub struct StatsService {
    store: Arc<SeaOrmStore>,
    usage: Arc<UsageAggregator>,
}

impl StatsService {
    pub fn new(ctx: &AppContext) -> Self {
        Self {
            store: Arc::clone(&ctx.store),
            usage: Arc::clone(&ctx.usage),
        }
    }

    /// 某一天已落库的统计，默认当天
    pub async fn for_date(&self, date: Option<&str>) -> Result<Vec<StatsItem>> {
        let date = match date.map(str::trim).filter(|d| !d.is_empty()) {
            // 统一为补零格式，与落库的日期键一致
            Some(date) => NaiveDate::parse_from_str(date, DATE_FORMAT)
                .map_err(|_| {
                    GatewayError::validation(format!("日期格式应为 YYYY-MM-DD: {date}"), Some("date"))
                })?
                .format(DATE_FORMAT)
                .to_string(),
            None => self.usage.today(),
        };

        let counters = self.store.find_counters_for_date(&date).await?;
        let paths = self.endpoint_paths().await?;
        Ok(counters.into_iter().map(|c| StatsItem::new(c, &paths)).collect())
    }

    /// 内存中的实时计数
    pub async fn live(&self) -> Result<Vec<StatsItem>> {
        let counters = self.usage.live_counters().await;
        let paths = self.endpoint_paths().await?;
        Ok(counters.into_iter().map(|c| StatsItem::new(c, &paths)).collect())
    }

    /// 立即落库一次
    pub async fn sync_now(&self) -> SyncReport {
        self.usage.sync().await
    }

    async fn endpoint_paths(&self) -> Result<HashMap<i32, String>> {
        let rows = self
            .store
            .bounded("list_endpoint_paths", async {
                Ok(api_endpoints::Entity::find().all(self.store.db()).await?)
            })
            .await?;
        Ok(rows.into_iter().map(|m| (m.id, m.path)).collect())
    }
}
