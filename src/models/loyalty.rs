use crate::engine::TierDefinition;
use crate::entities::{
    LoyaltyTierLevel, RewardStatus, RewardType, customer_entity as customers,
    reward_redemption_entity as rewards,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RedeemPointsRequest {
    pub points: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderCompletedPayload {
    pub customer_id: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NextTierProgress {
    pub tier: LoyaltyTierLevel,
    pub min_points: i64,
    pub points_needed: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CustomerLoyaltyProfile {
    pub customer_id: i64,
    pub name: String,
    pub loyalty_member: bool,
    pub tier: LoyaltyTierLevel,
    pub loyalty_points: i64,
    pub loyalty_used: i64,
    pub available_points: i64,
    pub special_points: i64,
    pub benefits: Vec<String>,
    pub next_tier: Option<NextTierProgress>,
    pub rewards: Vec<RewardResponse>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RewardResponse {
    pub id: i64,
    pub code: String,
    pub reward_type: RewardType,
    pub tier: Option<LoyaltyTierLevel>,
    pub points_used: i64,
    pub description: Option<String>,
    pub status: RewardStatus,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<rewards::Model> for RewardResponse {
    fn from(r: rewards::Model) -> Self {
        Self {
            id: r.id,
            code: r.code,
            reward_type: r.reward_type,
            tier: r.tier,
            points_used: r.points_used,
            description: r.description,
            status: r.status,
            expires_at: r.expires_at,
            created_at: r.created_at,
        }
    }
}

impl CustomerLoyaltyProfile {
    pub fn build(
        customer: customers::Model,
        current: Option<&TierDefinition>,
        next: Option<(&TierDefinition, i64)>,
        rewards: Vec<rewards::Model>,
    ) -> Self {
        Self {
            customer_id: customer.id,
            available_points: customer.available_points(),
            name: customer.name,
            loyalty_member: customer.loyalty_member,
            tier: customer.loyalty_tier,
            loyalty_points: customer.loyalty_points,
            loyalty_used: customer.loyalty_used,
            special_points: customer.special_points,
            benefits: current.map(|d| d.benefits.clone()).unwrap_or_default(),
            next_tier: next.map(|(def, points_needed)| NextTierProgress {
                tier: def.tier,
                min_points: def.min_points,
                points_needed,
            }),
            rewards: rewards.into_iter().map(RewardResponse::from).collect(),
        }
    }
}
