//! # 每日调用统计实体定义
//!
//! 每个 API 路径每天一行，(api_endpoint_id, date) 唯一

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 每日调用统计实体
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "api_stats")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub api_endpoint_id: i32,
    pub date: String, // YYYY-MM-DD
    pub call_count: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cache_hit_tokens: i64,
    pub last_updated: DateTime,
}

// 统计行不挂外键：删除 API 路径后账单历史仍然保留
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
