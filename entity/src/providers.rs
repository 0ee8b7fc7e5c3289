//! # AI 服务提供商实体定义
//!
//! 上游 AI 服务（地址、凭证、模型）的 Sea-ORM 实体模型

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// AI 服务提供商实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "providers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub base_url: String,
    pub api_key: String,
    pub model_name: String, // 模型名称，如 gpt-4o, deepseek-chat
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::api_endpoints::Entity")]
    ApiEndpoints,
}

impl Related<super::api_endpoints::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ApiEndpoints.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
