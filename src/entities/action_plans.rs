use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "action_plan_status")]
#[serde(rename_all = "snake_case")]
pub enum ActionPlanStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "dormant")]
    Dormant,
}

/// plan_key 唯一：`{organization_id}:{template}:{segment_id}`，用于 generate-or-update。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "action_plans")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub organization_id: i64,
    #[sea_orm(unique)]
    pub plan_key: String,
    pub template: String,
    pub segment_id: i64,
    pub title: String,
    pub priority: String,
    pub recommendations: Json,
    pub target_count: i64,
    pub status: ActionPlanStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
