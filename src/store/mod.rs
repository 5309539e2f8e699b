//! Persistence seam for the loyalty core. `SeaOrmStore` is the production
//! implementation; services only see `Arc<dyn LoyaltyStore>`.

pub mod sea_orm_store;

#[cfg(test)]
pub mod memory;

pub use sea_orm_store::SeaOrmStore;

use crate::engine::CustomerMetrics;
use crate::entities::{
    ActionPlanStatus, LoyaltyTierLevel, RewardStatus, RewardType, action_plan_entity as plans,
    customer_entity as customers, loyalty_tier_entity as tiers, order_entity as orders,
    reward_redemption_entity as rewards, segment_entity as segments,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use serde_json::Value;
use std::sync::Arc;

pub type SharedStore = Arc<dyn LoyaltyStore>;

#[derive(Debug, Clone)]
pub struct NewLoyaltyTier {
    pub organization_id: i64,
    pub tier: LoyaltyTierLevel,
    pub min_points: i64,
    pub points_per_dollar: f64,
    pub benefits: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewReward {
    pub organization_id: i64,
    pub customer_id: i64,
    pub code: String,
    pub reward_type: RewardType,
    pub tier: Option<LoyaltyTierLevel>,
    pub points_used: i64,
    pub description: Option<String>,
    pub status: RewardStatus,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct NewSegment {
    pub organization_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub segment_type: String,
    pub is_smart: bool,
    pub auto_update: bool,
    pub conditions: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct NewActionPlan {
    pub organization_id: i64,
    pub plan_key: String,
    pub template: String,
    pub segment_id: i64,
    pub title: String,
    pub priority: String,
    pub recommendations: Value,
    pub target_count: i64,
}

/// In-place refresh of an existing plan.
#[derive(Debug, Clone)]
pub struct ActionPlanRefresh {
    pub title: String,
    pub recommendations: Value,
    pub target_count: i64,
    pub status: ActionPlanStatus,
}

/// Every method is a single-row write or a read, except `replace_segment_members`
/// and `redeem_points`, which are one transaction each. Update methods return
/// `false` when the target row no longer exists.
#[async_trait]
pub trait LoyaltyStore: Send + Sync {
    async fn list_organization_ids(&self) -> Result<Vec<i64>, DbErr>;

    // customers & orders
    async fn list_customers(&self, organization_id: i64) -> Result<Vec<customers::Model>, DbErr>;
    async fn find_customer(&self, customer_id: i64) -> Result<Option<customers::Model>, DbErr>;
    async fn list_customer_orders(&self, customer_id: i64) -> Result<Vec<orders::Model>, DbErr>;
    /// Raises stored points to `points`; never lowers them.
    async fn raise_loyalty_points(&self, customer_id: i64, points: i64) -> Result<bool, DbErr>;
    async fn set_loyalty_tier(
        &self,
        customer_id: i64,
        tier: LoyaltyTierLevel,
    ) -> Result<bool, DbErr>;
    /// Marks the customer as a loyalty member, starting at BRONZE when not one yet.
    async fn enroll_customer(&self, customer_id: i64) -> Result<Option<customers::Model>, DbErr>;
    async fn update_customer_metrics(
        &self,
        customer_id: i64,
        metrics: &CustomerMetrics,
        computed_at: DateTime<Utc>,
    ) -> Result<bool, DbErr>;

    // tiers
    async fn list_tiers(&self, organization_id: i64) -> Result<Vec<tiers::Model>, DbErr>;
    async fn insert_tier(&self, tier: NewLoyaltyTier) -> Result<tiers::Model, DbErr>;

    // rewards
    async fn reward_code_exists(&self, code: &str) -> Result<bool, DbErr>;
    async fn find_tier_reward(
        &self,
        customer_id: i64,
        tier: LoyaltyTierLevel,
    ) -> Result<Option<rewards::Model>, DbErr>;
    async fn list_customer_rewards(&self, customer_id: i64) -> Result<Vec<rewards::Model>, DbErr>;
    async fn insert_reward(&self, reward: NewReward) -> Result<rewards::Model, DbErr>;
    /// Atomically moves `reward.points_used` points into `loyalty_used` and
    /// stores the reward. `None` when the customer lacks available points.
    async fn redeem_points(&self, reward: NewReward) -> Result<Option<rewards::Model>, DbErr>;
    /// Nulls `expires_at` on every `TIER-` code; returns rows changed.
    async fn clear_tier_code_expiry(&self) -> Result<u64, DbErr>;
    /// Marks active non-`TIER-` codes past their expiry as expired.
    async fn expire_rewards_before(&self, now: DateTime<Utc>) -> Result<u64, DbErr>;

    // segments
    async fn list_segments(&self, organization_id: i64) -> Result<Vec<segments::Model>, DbErr>;
    async fn insert_segment(&self, segment: NewSegment) -> Result<segments::Model, DbErr>;
    async fn list_segment_member_ids(&self, segment_id: i64) -> Result<Vec<i64>, DbErr>;
    /// Rewrites membership and `customer_count` of one segment.
    async fn replace_segment_members(
        &self,
        segment_id: i64,
        customer_ids: &[i64],
        evaluated_at: DateTime<Utc>,
    ) -> Result<(), DbErr>;

    // action plans
    async fn list_action_plans(&self, organization_id: i64) -> Result<Vec<plans::Model>, DbErr>;
    async fn insert_action_plan(&self, plan: NewActionPlan) -> Result<plans::Model, DbErr>;
    async fn update_action_plan(
        &self,
        plan_id: i64,
        refresh: ActionPlanRefresh,
    ) -> Result<bool, DbErr>;
}
