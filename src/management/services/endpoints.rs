//! # API 路径管理服务
//!
//! 创建、更新、删除 API 路径，并把结果同步到路由缓存。

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use entity::{api_endpoints, providers};
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use serde::{Deserialize, Serialize};

use super::{CacheSync, Mutation};
use crate::app::AppContext;
use crate::ensure_valid;
use crate::error::{GatewayError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::routing::RoutingCache;
use crate::store::{SeaOrmStore, is_unique_violation};
use crate::{linfo, lwarn};

/// API 路径列表项
#[derive(Debug, Clone, Serialize)]
pub struct EndpointItem {
    pub id: i32,
    pub path: String,
    pub access_key: String,
    pub system_prompt: Option<String>,
    pub provider_id: i32,
    pub provider_name: Option<String>,
    pub stream_output: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl EndpointItem {
    fn from_models(endpoint: api_endpoints::Model, provider: Option<providers::Model>) -> Self {
        Self {
            id: endpoint.id,
            path: endpoint.path,
            access_key: endpoint.access_key,
            system_prompt: endpoint.system_prompt,
            provider_id: endpoint.provider_id,
            provider_name: provider.map(|p| p.name),
            stream_output: endpoint.stream_output,
            created_at: endpoint.created_at,
            updated_at: endpoint.updated_at,
        }
    }
}

/// 创建 API 路径请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateEndpointRequest {
    pub path: String,
    pub access_key: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    pub provider_id: i32,
    #[serde(default)]
    pub stream_output: bool,
}

/// 更新 API 路径请求，未提供的字段保持不变
///
/// `system_prompt` 传空字符串表示清除
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEndpointRequest {
    pub path: Option<String>,
    pub access_key: Option<String>,
    pub system_prompt: Option<String>,
    pub provider_id: Option<i32>,
    pub stream_output: Option<bool>,
}

/// API 路径管理服务
pub struct EndpointService {
    store: Arc<SeaOrmStore>,
    routing: Arc<RoutingCache>,
}

impl EndpointService {
    pub fn new(ctx: &AppContext) -> Self {
        Self {
            store: Arc::clone(&ctx.store),
            routing: Arc::clone(&ctx.routing),
        }
    }

    /// 列出全部 API 路径
    pub async fn list(&self) -> Result<Vec<EndpointItem>> {
        let rows = self
            .store
            .bounded("list_endpoints", async {
                Ok(api_endpoints::Entity::find()
                    .find_also_related(providers::Entity)
                    .order_by_asc(api_endpoints::Column::Id)
                    .all(self.store.db())
                    .await?)
            })
            .await?;

        Ok(rows
            .into_iter()
            .map(|(endpoint, provider)| EndpointItem::from_models(endpoint, provider))
            .collect())
    }

    /// 创建 API 路径，提交后写入缓存
    pub async fn create(&self, request: CreateEndpointRequest) -> Result<Mutation<EndpointItem>> {
        validate_path(&request.path)?;
        ensure_valid!(!request.access_key.trim().is_empty(), "access_key", "访问密钥不能为空");
        let provider = self.require_provider(request.provider_id).await?;

        let now = Utc::now().naive_utc();
        let model = self
            .store
            .bounded("create_endpoint", async {
                api_endpoints::ActiveModel {
                    path: Set(request.path.clone()),
                    access_key: Set(request.access_key.clone()),
                    system_prompt: Set(normalize_prompt(request.system_prompt.clone())),
                    provider_id: Set(request.provider_id),
                    stream_output: Set(request.stream_output),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(self.store.db())
                .await
                .map_err(|e| map_write_error(e, &request.path))
            })
            .await?;

        let cache = CacheSync::from_result(self.routing.upsert(model.id).await);
        log_mutation("create_endpoint", model.id, &model.path, &cache);

        Ok(Mutation::new(EndpointItem::from_models(model, Some(provider)), cache))
    }

    /// 更新 API 路径；路径变化时按改名处理
    pub async fn update(&self, id: i32, request: UpdateEndpointRequest) -> Result<Mutation<EndpointItem>> {
        let existing = self.require_endpoint(id).await?;

        if let Some(path) = &request.path {
            validate_path(path)?;
        }
        if let Some(access_key) = &request.access_key {
            ensure_valid!(!access_key.trim().is_empty(), "access_key", "访问密钥不能为空");
        }
        let provider_id = request.provider_id.unwrap_or(existing.provider_id);
        let provider = self.require_provider(provider_id).await?;

        let old_path = existing.path.clone();
        let mut active: api_endpoints::ActiveModel = existing.into();
        if let Some(path) = request.path.clone() {
            active.path = Set(path);
        }
        if let Some(access_key) = request.access_key {
            active.access_key = Set(access_key);
        }
        if let Some(prompt) = request.system_prompt {
            active.system_prompt = Set(normalize_prompt(Some(prompt)));
        }
        if let Some(stream_output) = request.stream_output {
            active.stream_output = Set(stream_output);
        }
        active.provider_id = Set(provider_id);
        active.updated_at = Set(Utc::now().naive_utc());

        let target_path = request.path.unwrap_or_else(|| old_path.clone());
        let model = self
            .store
            .bounded("update_endpoint", async {
                active
                    .update(self.store.db())
                    .await
                    .map_err(|e| map_write_error(e, &target_path))
            })
            .await?;

        let result = if model.path == old_path {
            self.routing.upsert(model.id).await
        } else {
            self.routing.rename(&old_path, model.id).await
        };
        let cache = CacheSync::from_result(result);
        log_mutation("update_endpoint", model.id, &model.path, &cache);

        Ok(Mutation::new(EndpointItem::from_models(model, Some(provider)), cache))
    }

    /// 删除 API 路径，提交后从缓存移除原路径
    ///
    /// 统计数据不随之删除
    pub async fn delete(&self, id: i32) -> Result<Mutation<EndpointItem>> {
        let existing = self.require_endpoint(id).await?;

        self.store
            .bounded("delete_endpoint", async {
                api_endpoints::Entity::delete_by_id(id)
                    .exec(self.store.db())
                    .await
                    .map_err(|e| GatewayError::database_with_source(format!("删除API路径失败: id={id}"), e))
            })
            .await?;

        self.routing.remove(&existing.path).await;
        let cache = CacheSync::Synced;
        log_mutation("delete_endpoint", id, &existing.path, &cache);

        Ok(Mutation::new(EndpointItem::from_models(existing, None), cache))
    }

    async fn require_endpoint(&self, id: i32) -> Result<api_endpoints::Model> {
        self.store
            .bounded("find_endpoint", async {
                Ok(api_endpoints::Entity::find_by_id(id).one(self.store.db()).await?)
            })
            .await?
            .ok_or_else(|| GatewayError::not_found("api_endpoint", id.to_string()))
    }

    async fn require_provider(&self, provider_id: i32) -> Result<providers::Model> {
        self.store
            .bounded("find_provider", async {
                Ok(providers::Entity::find_by_id(provider_id)
                    .one(self.store.db())
                    .await?)
            })
            .await?
            .ok_or_else(|| {
                GatewayError::validation(format!("提供商不存在: {provider_id}"), Some("provider_id"))
            })
    }
}

fn validate_path(path: &str) -> Result<()> {
    ensure_valid!(path.starts_with('/'), "path", "路径必须以 / 开头");
    ensure_valid!(path.len() > 1, "path", "路径不能为空");
    ensure_valid!(!path.chars().any(char::is_whitespace), "path", "路径不能包含空白字符");
    Ok(())
}

fn normalize_prompt(prompt: Option<String>) -> Option<String> {
    prompt.filter(|p| !p.trim().is_empty())
}

fn map_write_error(err: sea_orm::DbErr, path: &str) -> GatewayError {
    if is_unique_violation(&err) {
        GatewayError::conflict_with_source("api_endpoint", path, err)
    } else {
        GatewayError::database_with_source("写入API路径失败", err)
    }
}

fn log_mutation(operation: &str, id: i32, path: &str, cache: &CacheSync) {
    match cache {
        CacheSync::Synced => linfo!(
            "system",
            LogStage::Management,
            LogComponent::Management,
            operation,
            "API路径已提交并同步缓存",
            endpoint_id = id,
            path = %path
        ),
        CacheSync::Stale { error } => lwarn!(
            "system",
            LogStage::Management,
            LogComponent::Management,
            operation,
            "API路径已提交，但路由缓存未同步",
            endpoint_id = id,
            path = %path,
            error = %error
        ),
    }
}
