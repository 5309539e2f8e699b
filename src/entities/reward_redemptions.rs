use super::customers::LoyaltyTierLevel;
use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Prefix shared by every tier-promotion reward code.
pub const TIER_CODE_PREFIX: &str = "TIER-";
/// Prefix for codes bought with redeemed points.
pub const REDEEM_CODE_PREFIX: &str = "RWD-";

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "reward_type")]
#[serde(rename_all = "snake_case")]
pub enum RewardType {
    #[sea_orm(string_value = "tier_promotion")]
    TierPromotion,
    #[sea_orm(string_value = "points_redemption")]
    PointsRedemption,
}

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "reward_status")]
#[serde(rename_all = "snake_case")]
pub enum RewardStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "used")]
    Used,
    #[sea_orm(string_value = "expired")]
    Expired,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "reward_redemptions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub organization_id: i64,
    pub customer_id: i64,
    #[sea_orm(unique)]
    pub code: String,
    pub reward_type: RewardType,
    pub tier: Option<LoyaltyTierLevel>,
    pub points_used: i64,
    pub description: Option<String>,
    pub status: RewardStatus,
    /// NULL 表示永不过期（TIER- 码必须为 NULL）
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn is_tier_code(&self) -> bool {
        self.code.starts_with(TIER_CODE_PREFIX)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
