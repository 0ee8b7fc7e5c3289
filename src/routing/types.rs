//! # 路由缓存数据类型

use entity::{api_endpoints, providers};
use serde::Serialize;

/// 内嵌在路由条目里的提供商快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderSnapshot {
    pub id: i32,
    pub name: String,
    pub base_url: String,
    /// 上游凭证，不对外输出
    #[serde(skip_serializing)]
    pub api_key: String,
    pub model_name: String,
}

impl From<providers::Model> for ProviderSnapshot {
    fn from(model: providers::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            base_url: model.base_url,
            api_key: model.api_key,
            model_name: model.model_name,
        }
    }
}

/// 缓存中的一条路由配置
///
/// 来自数据库的拷贝，提供商字段按值内嵌，查找时不需要再访问存储
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteEntry {
    pub id: i32,
    pub path: String,
    pub access_key: String,
    pub system_prompt: Option<String>,
    pub provider_id: i32,
    pub stream_output: bool,
    pub provider: ProviderSnapshot,
}

impl RouteEntry {
    /// 由 API 路径行和其提供商行组装
    #[must_use]
    pub fn from_models(endpoint: api_endpoints::Model, provider: providers::Model) -> Self {
        Self {
            id: endpoint.id,
            path: endpoint.path,
            access_key: endpoint.access_key,
            system_prompt: endpoint.system_prompt,
            provider_id: endpoint.provider_id,
            stream_output: endpoint.stream_output,
            provider: provider.into(),
        }
    }
}
