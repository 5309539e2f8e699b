use super::customers::LoyaltyTierLevel;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// 组织自定义等级表
/// - min_points: 达到该等级所需的最低积分
/// - benefits: JSON 字符串数组，按展示顺序
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "loyalty_tiers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub organization_id: i64,
    pub tier: LoyaltyTierLevel,
    pub min_points: i64,
    pub points_per_dollar: f64,
    pub benefits: Json,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
