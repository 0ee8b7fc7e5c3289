//! # 提供商管理服务

use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use entity::{api_endpoints, providers};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, SqlErr,
};
use serde::{Deserialize, Serialize};

use super::{CacheSync, Mutation};
use crate::app::AppContext;
use crate::ensure_valid;
use crate::error::{GatewayError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::routing::RoutingCache;
use crate::store::SeaOrmStore;
use crate::{linfo, lwarn};

/// 提供商列表项，上游凭证只输出掩码
#[derive(Debug, Clone, Serialize)]
pub struct ProviderItem {
    pub id: i32,
    pub name: String,
    pub base_url: String,
    pub api_key_masked: String,
    pub model_name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<providers::Model> for ProviderItem {
    fn from(model: providers::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            base_url: model.base_url,
            api_key_masked: mask_secret(&model.api_key),
            model_name: model.model_name,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// 创建提供商请求
#[derive(Debug, Clone, Deserialize)]
pub struct CreateProviderRequest {
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    pub model_name: String,
}

/// 更新提供商请求，未提供的字段保持不变
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateProviderRequest {
    pub name: Option<String>,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub model_name: Option<String>,
}

/// 提供商管理服务
pub struct ProviderService {
    store: Arc<SeaOrmStore>,
    routing: Arc<RoutingCache>,
}

impl ProviderService {
    pub fn new(ctx: &AppContext) -> Self {
        Self {
            store: Arc::clone(&ctx.store),
            routing: Arc::clone(&ctx.routing),
        }
    }

    pub async fn list(&self) -> Result<Vec<ProviderItem>> {
        let rows = self
            .store
            .bounded("list_providers", async {
                Ok(providers::Entity::find()
                    .order_by_asc(providers::Column::Id)
                    .all(self.store.db())
                    .await?)
            })
            .await?;
        Ok(rows.into_iter().map(ProviderItem::from).collect())
    }

    pub async fn create(&self, request: CreateProviderRequest) -> Result<ProviderItem> {
        validate_fields(
            Some(&request.name),
            Some(&request.base_url),
            Some(&request.api_key),
            Some(&request.model_name),
        )?;

        let now = Utc::now().naive_utc();
        let model = self
            .store
            .bounded("create_provider", async {
                Ok(providers::ActiveModel {
                    name: Set(request.name.trim().to_string()),
                    base_url: Set(request.base_url.trim().to_string()),
                    api_key: Set(request.api_key.clone()),
                    model_name: Set(request.model_name.trim().to_string()),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(self.store.db())
                .await?)
            })
            .await?;

        linfo!(
            "system",
            LogStage::Management,
            LogComponent::Management,
            "create_provider",
            "提供商已创建",
            provider_id = model.id,
            name = %model.name
        );
        Ok(model.into())
    }

    /// 更新提供商，并刷新缓存中绑定该提供商的全部路由条目
    pub async fn update(&self, id: i32, request: UpdateProviderRequest) -> Result<Mutation<ProviderItem>> {
        validate_fields(
            request.name.as_ref(),
            request.base_url.as_ref(),
            request.api_key.as_ref(),
            request.model_name.as_ref(),
        )?;
        let existing = self.require_provider(id).await?;

        let mut active: providers::ActiveModel = existing.into();
        if let Some(name) = request.name {
            active.name = Set(name.trim().to_string());
        }
        if let Some(base_url) = request.base_url {
            active.base_url = Set(base_url.trim().to_string());
        }
        if let Some(api_key) = request.api_key {
            active.api_key = Set(api_key);
        }
        if let Some(model_name) = request.model_name {
            active.model_name = Set(model_name.trim().to_string());
        }
        active.updated_at = Set(Utc::now().naive_utc());

        let model = self
            .store
            .bounded("update_provider", async { Ok(active.update(self.store.db()).await?) })
            .await?;

        let cache = CacheSync::from_result(self.routing.refresh_provider(id).await);
        if let CacheSync::Stale { error } = &cache {
            lwarn!(
                "system",
                LogStage::Management,
                LogComponent::Management,
                "update_provider",
                "提供商已更新，但路由缓存未同步",
                provider_id = id,
                error = %error
            );
        }

        Ok(Mutation::new(model.into(), cache))
    }

    /// 删除提供商；仍有 API 路径引用时拒绝
    pub async fn delete(&self, id: i32) -> Result<ProviderItem> {
        let existing = self.require_provider(id).await?;

        let bound = self
            .store
            .bounded("count_provider_endpoints", async {
                Ok(api_endpoints::Entity::find()
                    .filter(api_endpoints::Column::ProviderId.eq(id))
                    .count(self.store.db())
                    .await?)
            })
            .await?;
        if bound > 0 {
            return Err(GatewayError::conflict(
                "provider",
                format!("{id} 仍被 {bound} 个API路径引用"),
            ));
        }

        self.store
            .bounded("delete_provider", async {
                providers::Entity::delete_by_id(id)
                    .exec(self.store.db())
                    .await
                    .map_err(|e| {
                        if matches!(e.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_))) {
                            GatewayError::conflict_with_source("provider", id.to_string(), e)
                        } else {
                            GatewayError::database_with_source(format!("删除提供商失败: id={id}"), e)
                        }
                    })
            })
            .await?;

        linfo!(
            "system",
            LogStage::Management,
            LogComponent::Management,
            "delete_provider",
            "提供商已删除",
            provider_id = id
        );
        Ok(existing.into())
    }

    async fn require_provider(&self, id: i32) -> Result<providers::Model> {
        self.store
            .bounded("find_provider", async {
                Ok(providers::Entity::find_by_id(id).one(self.store.db()).await?)
            })
            .await?
            .ok_or_else(|| GatewayError::not_found("provider", id.to_string()))
    }
}

fn validate_fields(
    name: Option<&String>,
    base_url: Option<&String>,
    api_key: Option<&String>,
    model_name: Option<&String>,
) -> Result<()> {
    if let Some(name) = name {
        ensure_valid!(!name.trim().is_empty(), "name", "提供商名称不能为空");
    }
    if let Some(base_url) = base_url {
        ensure_valid!(
            base_url.starts_with("http://") || base_url.starts_with("https://"),
            "base_url",
            "上游地址必须以 http:// 或 https:// 开头"
        );
    }
    if let Some(api_key) = api_key {
        ensure_valid!(!api_key.trim().is_empty(), "api_key", "上游凭证不能为空");
    }
    if let Some(model_name) = model_name {
        ensure_valid!(!model_name.trim().is_empty(), "model_name", "模型名称不能为空");
    }
    Ok(())
}

/// 只保留末尾 4 位
fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{tail}")
}
