use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Loyalty level. Declaration order is rank order, so `Ord` compares tiers.
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    ToSchema,
    DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "loyalty_tier_level")]
#[serde(rename_all = "UPPERCASE")]
pub enum LoyaltyTierLevel {
    #[sea_orm(string_value = "bronze")]
    Bronze,
    #[sea_orm(string_value = "silver")]
    Silver,
    #[sea_orm(string_value = "gold")]
    Gold,
    #[sea_orm(string_value = "platinum")]
    Platinum,
    #[sea_orm(string_value = "diamond")]
    Diamond,
}

impl LoyaltyTierLevel {
    /// 0 for BRONZE up to 4 for DIAMOND.
    pub fn rank(self) -> i32 {
        match self {
            LoyaltyTierLevel::Bronze => 0,
            LoyaltyTierLevel::Silver => 1,
            LoyaltyTierLevel::Gold => 2,
            LoyaltyTierLevel::Platinum => 3,
            LoyaltyTierLevel::Diamond => 4,
        }
    }
}

impl std::fmt::Display for LoyaltyTierLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoyaltyTierLevel::Bronze => write!(f, "BRONZE"),
            LoyaltyTierLevel::Silver => write!(f, "SILVER"),
            LoyaltyTierLevel::Gold => write!(f, "GOLD"),
            LoyaltyTierLevel::Platinum => write!(f, "PLATINUM"),
            LoyaltyTierLevel::Diamond => write!(f, "DIAMOND"),
        }
    }
}

/// Customer row. Money columns are cents.
///
/// - loyalty_points: lifetime points earned from qualifying orders
/// - loyalty_used: points already converted into rewards
/// - recency_days / r_score / f_score / m_score / engagement_score / churn_risk /
///   lifetime_value: derived metrics written by the segmentation pass
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "customers")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub organization_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub loyalty_member: bool,
    pub loyalty_points: i64,
    pub loyalty_tier: LoyaltyTierLevel,
    pub loyalty_used: i64,
    pub total_spent: i64,
    pub order_count: i32,
    pub special_points: i64,
    pub last_order_at: Option<DateTime<Utc>>,
    pub recency_days: Option<i32>,
    pub r_score: Option<i16>,
    pub f_score: Option<i16>,
    pub m_score: Option<i16>,
    pub engagement_score: f64,
    pub churn_risk: f64,
    pub lifetime_value: i64,
    pub metrics_updated_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    /// Points that can still be redeemed.
    pub fn available_points(&self) -> i64 {
        (self.loyalty_points - self.loyalty_used).max(0)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
