use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// segment_type 为模板 key（如 `champions`），自定义分群统一为 `custom`。
/// auto_update = true 时按 conditions 规则重新计算成员；否则为手工维护的静态分群。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "segments")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub organization_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub segment_type: String,
    pub is_smart: bool,
    pub auto_update: bool,
    pub conditions: Option<Json>,
    pub customer_count: i64,
    pub last_evaluated_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
