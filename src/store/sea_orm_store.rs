//! # Sea-ORM 存储实现

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use entity::{api_endpoints, api_stats, providers};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder,
    Set, SqlErr,
};

use super::{EndpointStore, UsageStore};
use crate::error::{GatewayError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::routing::RouteEntry;
use crate::usage::UsageCounter;
use crate::{ldebug, lwarn};

/// 基于 Sea-ORM 的持久化存储
///
/// 每次调用都受 `timeout` 约束，超时返回 [`GatewayError::Timeout`]
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    db: Arc<DatabaseConnection>,
    timeout: Duration,
}

impl SeaOrmStore {
    #[must_use]
    pub const fn new(db: Arc<DatabaseConnection>, timeout: Duration) -> Self {
        Self { db, timeout }
    }

    /// 底层数据库连接
    #[must_use]
    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// 单次操作超时时间
    #[must_use]
    pub const fn operation_timeout(&self) -> Duration {
        self.timeout
    }

    /// 给存储操作加上超时
    pub async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        tokio::time::timeout(self.timeout, fut).await.unwrap_or_else(|_| {
            lwarn!(
                "system",
                LogStage::Db,
                LogComponent::Store,
                operation,
                "存储操作超时",
                timeout_ms = u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
            );
            Err(GatewayError::timeout(operation, self.timeout.as_secs()))
        })
    }
}

/// 把 (路径, 提供商) 连接结果转为路由条目，提供商缺失的行被跳过
fn join_routes(rows: Vec<(api_endpoints::Model, Option<providers::Model>)>) -> Vec<RouteEntry> {
    rows.into_iter()
        .filter_map(|(endpoint, provider)| match provider {
            Some(provider) => Some(RouteEntry::from_models(endpoint, provider)),
            None => {
                lwarn!(
                    "system",
                    LogStage::Cache,
                    LogComponent::Store,
                    "dangling_provider",
                    "API路径引用的提供商不存在，已跳过",
                    endpoint_id = endpoint.id,
                    path = %endpoint.path,
                    provider_id = endpoint.provider_id
                );
                None
            }
        })
        .collect()
}

fn counter_active_model(counter: &UsageCounter) -> api_stats::ActiveModel {
    api_stats::ActiveModel {
        api_endpoint_id: Set(counter.endpoint_id),
        date: Set(counter.date.clone()),
        call_count: Set(counter.call_count),
        input_tokens: Set(counter.input_tokens),
        output_tokens: Set(counter.output_tokens),
        cache_hit_tokens: Set(counter.cache_hit_tokens),
        last_updated: Set(counter.last_updated),
        ..Default::default()
    }
}

async fn update_counter_row(db: &DatabaseConnection, id: i32, counter: &UsageCounter) -> Result<()> {
    let mut active = counter_active_model(counter);
    active.id = Set(id);
    active.update(db).await.map_err(|e| {
        GatewayError::database_with_source(format!("更新统计行失败: id={id}"), e)
    })?;
    Ok(())
}

pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[async_trait]
impl EndpointStore for SeaOrmStore {
    async fn load_all_routes(&self) -> Result<Vec<RouteEntry>> {
        self.bounded("load_all_routes", async {
            let rows = api_endpoints::Entity::find()
                .find_also_related(providers::Entity)
                .order_by_asc(api_endpoints::Column::Id)
                .all(self.db())
                .await
                .map_err(|e| GatewayError::database_with_source("读取API路径失败", e))?;
            Ok(join_routes(rows))
        })
        .await
    }

    async fn load_route(&self, endpoint_id: i32) -> Result<Option<RouteEntry>> {
        self.bounded("load_route", async {
            let row = api_endpoints::Entity::find_by_id(endpoint_id)
                .find_also_related(providers::Entity)
                .one(self.db())
                .await
                .map_err(|e| {
                    GatewayError::database_with_source(format!("读取API路径失败: id={endpoint_id}"), e)
                })?;
            Ok(row.and_then(|row| join_routes(vec![row]).pop()))
        })
        .await
    }

    async fn load_routes_by_provider(&self, provider_id: i32) -> Result<Vec<RouteEntry>> {
        self.bounded("load_routes_by_provider", async {
            let rows = api_endpoints::Entity::find()
                .filter(api_endpoints::Column::ProviderId.eq(provider_id))
                .find_also_related(providers::Entity)
                .order_by_asc(api_endpoints::Column::Id)
                .all(self.db())
                .await
                .map_err(|e| {
                    GatewayError::database_with_source(
                        format!("读取提供商关联的API路径失败: provider_id={provider_id}"),
                        e,
                    )
                })?;
            Ok(join_routes(rows))
        })
        .await
    }
}

#[async_trait]
impl UsageStore for SeaOrmStore {
    async fn find_counter(&self, endpoint_id: i32, date: &str) -> Result<Option<UsageCounter>> {
        self.bounded("find_counter", async {
            let row = api_stats::Entity::find()
                .filter(api_stats::Column::ApiEndpointId.eq(endpoint_id))
                .filter(api_stats::Column::Date.eq(date))
                .one(self.db())
                .await
                .map_err(|e| GatewayError::database_with_source("读取统计行失败", e))?;
            Ok(row.map(UsageCounter::from))
        })
        .await
    }

    async fn find_counters_for_date(&self, date: &str) -> Result<Vec<UsageCounter>> {
        self.bounded("find_counters_for_date", async {
            let rows = api_stats::Entity::find()
                .filter(api_stats::Column::Date.eq(date))
                .order_by_asc(api_stats::Column::ApiEndpointId)
                .all(self.db())
                .await
                .map_err(|e| GatewayError::database_with_source("读取当日统计失败", e))?;
            Ok(rows.into_iter().map(UsageCounter::from).collect())
        })
        .await
    }

    async fn save_counter(&self, counter: &UsageCounter) -> Result<i32> {
        self.bounded("save_counter", async {
            if let Some(id) = counter.id {
                update_counter_row(self.db(), id, counter).await?;
                return Ok(id);
            }

            match api_stats::Entity::insert(counter_active_model(counter))
                .exec(self.db())
                .await
            {
                Ok(res) => Ok(res.last_insert_id),
                Err(err) if is_unique_violation(&err) => {
                    // 同一 (路径, 日期) 已有行：改为整行更新
                    let existing = api_stats::Entity::find()
                        .filter(api_stats::Column::ApiEndpointId.eq(counter.endpoint_id))
                        .filter(api_stats::Column::Date.eq(counter.date.as_str()))
                        .one(self.db())
                        .await
                        .map_err(|e| GatewayError::database_with_source("读取统计行失败", e))?
                        .ok_or_else(|| {
                            GatewayError::usage_with_source(
                                format!(
                                    "统计行唯一约束冲突但未找到已有行: endpoint_id={}, date={}",
                                    counter.endpoint_id, counter.date
                                ),
                                err,
                            )
                        })?;

                    ldebug!(
                        "system",
                        LogStage::Usage,
                        LogComponent::Store,
                        "save_counter_conflict",
                        "统计行已存在，改为更新",
                        endpoint_id = counter.endpoint_id,
                        date = %counter.date,
                        row_id = existing.id
                    );
                    update_counter_row(self.db(), existing.id, counter).await?;
                    Ok(existing.id)
                }
                Err(err) => Err(GatewayError::database_with_source(
                    format!(
                        "写入统计行失败: endpoint_id={}, date={}",
                        counter.endpoint_id, counter.date
                    ),
                    err,
                )),
            }
        })
        .await
    }
}
