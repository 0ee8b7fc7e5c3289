//! # API 路径实体定义
//!
//! 管理员定义的路由路径与上游提供商绑定关系

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// API 路径实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "api_endpoints")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub path: String, // 如 /api/translate
    pub access_key: String, // 客户端调用此接口的 Key
    #[sea_orm(column_type = "Text", nullable)]
    pub system_prompt: Option<String>,
    pub provider_id: i32,
    pub stream_output: bool,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::providers::Entity",
        from = "Column::ProviderId",
        to = "super::providers::Column::Id",
        on_update = "Cascade",
        on_delete = "Restrict"
    )]
    Provider,
}

impl Related<super::providers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Provider.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
