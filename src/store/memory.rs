//! In-memory `LoyaltyStore` used by service tests, with failure injection.

use super::{
    ActionPlanRefresh, LoyaltyStore, NewActionPlan, NewLoyaltyTier, NewReward, NewSegment,
};
use crate::engine::CustomerMetrics;
use crate::entities::{
    ActionPlanStatus, LoyaltyTierLevel, RewardStatus, RewardType, action_plan_entity as plans,
    customer_entity as customers, loyalty_tier_entity as tiers, order_entity as orders,
    reward_redemption_entity as rewards, reward_redemption_entity::TIER_CODE_PREFIX,
    segment_entity as segments,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct State {
    organizations: Vec<i64>,
    customers: Vec<customers::Model>,
    orders: Vec<orders::Model>,
    tiers: Vec<tiers::Model>,
    rewards: Vec<rewards::Model>,
    segments: Vec<segments::Model>,
    members: Vec<(i64, i64)>,
    plans: Vec<plans::Model>,
    next_id: i64,
    failing_customers: HashSet<i64>,
    failing_segments: HashSet<i64>,
    failing_rewards: bool,
    unavailable: bool,
}

impl State {
    fn id(&mut self) -> i64 {
        self.next_id += 1;
        1000 + self.next_id
    }
}

#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

fn unreachable_store() -> DbErr {
    DbErr::Conn(sea_orm::RuntimeErr::Internal("store unreachable".into()))
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    fn available(&self) -> Result<MutexGuard<'_, State>, DbErr> {
        let state = self.lock();
        if state.unavailable {
            return Err(unreachable_store());
        }
        Ok(state)
    }

    fn writable(&self, customer_id: i64) -> Result<MutexGuard<'_, State>, DbErr> {
        let state = self.available()?;
        if state.failing_customers.contains(&customer_id) {
            return Err(DbErr::Custom(format!("write failed for customer {customer_id}")));
        }
        Ok(state)
    }

    pub fn add_organization(&self, organization_id: i64) {
        self.lock().organizations.push(organization_id);
    }

    pub fn add_customer(&self, customer: customers::Model) {
        self.lock().customers.push(customer);
    }

    pub fn add_order(&self, order: orders::Model) {
        self.lock().orders.push(order);
    }

    pub fn add_tier_row(&self, row: tiers::Model) {
        self.lock().tiers.push(row);
    }

    pub fn add_reward(&self, reward: rewards::Model) {
        self.lock().rewards.push(reward);
    }

    pub fn add_segment_member(&self, segment_id: i64, customer_id: i64) {
        self.lock().members.push((segment_id, customer_id));
    }

    pub fn remove_customer(&self, customer_id: i64) {
        self.lock().customers.retain(|c| c.id != customer_id);
    }

    pub fn fail_writes_for(&self, customer_id: i64) {
        self.lock().failing_customers.insert(customer_id);
    }

    pub fn fail_segment(&self, segment_id: i64) {
        self.lock().failing_segments.insert(segment_id);
    }

    pub fn fail_reward_writes(&self, failing: bool) {
        self.lock().failing_rewards = failing;
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    pub fn customer(&self, customer_id: i64) -> Option<customers::Model> {
        self.lock()
            .customers
            .iter()
            .find(|c| c.id == customer_id)
            .cloned()
    }

    pub fn rewards(&self) -> Vec<rewards::Model> {
        self.lock().rewards.clone()
    }

    pub fn segments(&self) -> Vec<segments::Model> {
        self.lock().segments.clone()
    }

    pub fn plans(&self) -> Vec<plans::Model> {
        self.lock().plans.clone()
    }

    pub fn tier_rows(&self) -> Vec<tiers::Model> {
        self.lock().tiers.clone()
    }
}

#[async_trait]
impl LoyaltyStore for MemoryStore {
    async fn list_organization_ids(&self) -> Result<Vec<i64>, DbErr> {
        Ok(self.available()?.organizations.clone())
    }

    async fn list_customers(&self, organization_id: i64) -> Result<Vec<customers::Model>, DbErr> {
        Ok(self
            .available()?
            .customers
            .iter()
            .filter(|c| c.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn find_customer(&self, customer_id: i64) -> Result<Option<customers::Model>, DbErr> {
        Ok(self
            .available()?
            .customers
            .iter()
            .find(|c| c.id == customer_id)
            .cloned())
    }

    async fn list_customer_orders(&self, customer_id: i64) -> Result<Vec<orders::Model>, DbErr> {
        Ok(self
            .available()?
            .orders
            .iter()
            .filter(|o| o.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn raise_loyalty_points(&self, customer_id: i64, points: i64) -> Result<bool, DbErr> {
        let mut state = self.writable(customer_id)?;
        match state
            .customers
            .iter_mut()
            .find(|c| c.id == customer_id && c.loyalty_points < points)
        {
            Some(c) => {
                c.loyalty_points = points;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_loyalty_tier(
        &self,
        customer_id: i64,
        tier: LoyaltyTierLevel,
    ) -> Result<bool, DbErr> {
        let mut state = self.writable(customer_id)?;
        match state.customers.iter_mut().find(|c| c.id == customer_id) {
            Some(c) => {
                c.loyalty_tier = tier;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn enroll_customer(&self, customer_id: i64) -> Result<Option<customers::Model>, DbErr> {
        let mut state = self.writable(customer_id)?;
        Ok(state
            .customers
            .iter_mut()
            .find(|c| c.id == customer_id)
            .map(|c| {
                if !c.loyalty_member {
                    c.loyalty_member = true;
                    c.loyalty_tier = LoyaltyTierLevel::Bronze;
                }
                c.clone()
            }))
    }

    async fn update_customer_metrics(
        &self,
        customer_id: i64,
        metrics: &CustomerMetrics,
        computed_at: DateTime<Utc>,
    ) -> Result<bool, DbErr> {
        let mut state = self.writable(customer_id)?;
        match state.customers.iter_mut().find(|c| c.id == customer_id) {
            Some(c) => {
                c.total_spent = metrics.total_spent;
                c.order_count = metrics.order_count;
                c.last_order_at = metrics.last_order_at;
                c.recency_days = metrics.recency_days;
                c.r_score = metrics.r_score;
                c.f_score = metrics.f_score;
                c.m_score = metrics.m_score;
                c.engagement_score = metrics.engagement_score;
                c.churn_risk = metrics.churn_risk;
                c.lifetime_value = metrics.lifetime_value;
                c.metrics_updated_at = Some(computed_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_tiers(&self, organization_id: i64) -> Result<Vec<tiers::Model>, DbErr> {
        Ok(self
            .available()?
            .tiers
            .iter()
            .filter(|t| t.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn insert_tier(&self, tier: NewLoyaltyTier) -> Result<tiers::Model, DbErr> {
        let mut state = self.available()?;
        let row = tiers::Model {
            id: state.id(),
            organization_id: tier.organization_id,
            tier: tier.tier,
            min_points: tier.min_points,
            points_per_dollar: tier.points_per_dollar,
            benefits: serde_json::json!(tier.benefits),
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        state.tiers.push(row.clone());
        Ok(row)
    }

    async fn reward_code_exists(&self, code: &str) -> Result<bool, DbErr> {
        Ok(self.available()?.rewards.iter().any(|r| r.code == code))
    }

    async fn find_tier_reward(
        &self,
        customer_id: i64,
        tier: LoyaltyTierLevel,
    ) -> Result<Option<rewards::Model>, DbErr> {
        Ok(self
            .available()?
            .rewards
            .iter()
            .find(|r| {
                r.customer_id == customer_id
                    && r.reward_type == RewardType::TierPromotion
                    && r.tier == Some(tier)
            })
            .cloned())
    }

    async fn list_customer_rewards(&self, customer_id: i64) -> Result<Vec<rewards::Model>, DbErr> {
        Ok(self
            .available()?
            .rewards
            .iter()
            .rev()
            .filter(|r| r.customer_id == customer_id)
            .cloned()
            .collect())
    }

    async fn insert_reward(&self, reward: NewReward) -> Result<rewards::Model, DbErr> {
        let mut state = self.writable(reward.customer_id)?;
        if state.failing_rewards {
            return Err(DbErr::Custom(format!("reward write failed for {}", reward.code)));
        }
        if state.rewards.iter().any(|r| r.code == reward.code) {
            return Err(DbErr::Custom(format!("duplicate reward code {}", reward.code)));
        }
        let row = reward_row(state.id(), reward);
        state.rewards.push(row.clone());
        Ok(row)
    }

    async fn redeem_points(&self, reward: NewReward) -> Result<Option<rewards::Model>, DbErr> {
        let mut state = self.writable(reward.customer_id)?;
        let Some(customer) = state
            .customers
            .iter_mut()
            .find(|c| c.id == reward.customer_id && c.loyalty_member)
        else {
            return Ok(None);
        };
        if customer.available_points() < reward.points_used {
            return Ok(None);
        }
        customer.loyalty_used += reward.points_used;
        let row = reward_row(state.id(), reward);
        state.rewards.push(row.clone());
        Ok(Some(row))
    }

    async fn clear_tier_code_expiry(&self) -> Result<u64, DbErr> {
        let mut state = self.available()?;
        let mut repaired = 0;
        for reward in state.rewards.iter_mut() {
            if reward.code.starts_with(TIER_CODE_PREFIX) && reward.expires_at.is_some() {
                reward.expires_at = None;
                repaired += 1;
            }
        }
        Ok(repaired)
    }

    async fn expire_rewards_before(&self, now: DateTime<Utc>) -> Result<u64, DbErr> {
        let mut state = self.available()?;
        let mut expired = 0;
        for reward in state.rewards.iter_mut() {
            let stale = reward.status == RewardStatus::Active
                && !reward.code.starts_with(TIER_CODE_PREFIX)
                && reward.expires_at.is_some_and(|at| at < now);
            if stale {
                reward.status = RewardStatus::Expired;
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn list_segments(&self, organization_id: i64) -> Result<Vec<segments::Model>, DbErr> {
        Ok(self
            .available()?
            .segments
            .iter()
            .filter(|s| s.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn insert_segment(&self, segment: NewSegment) -> Result<segments::Model, DbErr> {
        let mut state = self.available()?;
        let row = segments::Model {
            id: state.id(),
            organization_id: segment.organization_id,
            name: segment.name,
            description: segment.description,
            segment_type: segment.segment_type,
            is_smart: segment.is_smart,
            auto_update: segment.auto_update,
            conditions: segment.conditions,
            customer_count: 0,
            last_evaluated_at: None,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        state.segments.push(row.clone());
        Ok(row)
    }

    async fn list_segment_member_ids(&self, segment_id: i64) -> Result<Vec<i64>, DbErr> {
        let state = self.available()?;
        let mut ids: Vec<i64> = state
            .members
            .iter()
            .filter(|(s, _)| *s == segment_id)
            .map(|(_, c)| *c)
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn replace_segment_members(
        &self,
        segment_id: i64,
        customer_ids: &[i64],
        evaluated_at: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        let mut state = self.available()?;
        if state.failing_segments.contains(&segment_id) {
            return Err(DbErr::Custom(format!("write failed for segment {segment_id}")));
        }
        state.members.retain(|(s, _)| *s != segment_id);
        state
            .members
            .extend(customer_ids.iter().map(|c| (segment_id, *c)));
        let segment = state
            .segments
            .iter_mut()
            .find(|s| s.id == segment_id)
            .ok_or(DbErr::RecordNotUpdated)?;
        segment.customer_count = customer_ids.len() as i64;
        segment.last_evaluated_at = Some(evaluated_at);
        Ok(())
    }

    async fn list_action_plans(&self, organization_id: i64) -> Result<Vec<plans::Model>, DbErr> {
        Ok(self
            .available()?
            .plans
            .iter()
            .filter(|p| p.organization_id == organization_id)
            .cloned()
            .collect())
    }

    async fn insert_action_plan(&self, plan: NewActionPlan) -> Result<plans::Model, DbErr> {
        let mut state = self.available()?;
        if state.plans.iter().any(|p| p.plan_key == plan.plan_key) {
            return Err(DbErr::Custom(format!("duplicate plan key {}", plan.plan_key)));
        }
        let row = plans::Model {
            id: state.id(),
            organization_id: plan.organization_id,
            plan_key: plan.plan_key,
            template: plan.template,
            segment_id: plan.segment_id,
            title: plan.title,
            priority: plan.priority,
            recommendations: plan.recommendations,
            target_count: plan.target_count,
            status: ActionPlanStatus::Active,
            created_at: Some(Utc::now()),
            updated_at: Some(Utc::now()),
        };
        state.plans.push(row.clone());
        Ok(row)
    }

    async fn update_action_plan(
        &self,
        plan_id: i64,
        refresh: ActionPlanRefresh,
    ) -> Result<bool, DbErr> {
        let mut state = self.available()?;
        match state.plans.iter_mut().find(|p| p.id == plan_id) {
            Some(p) => {
                p.title = refresh.title;
                p.recommendations = refresh.recommendations;
                p.target_count = refresh.target_count;
                p.status = refresh.status;
                p.updated_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn reward_row(id: i64, reward: NewReward) -> rewards::Model {
    rewards::Model {
        id,
        organization_id: reward.organization_id,
        customer_id: reward.customer_id,
        code: reward.code,
        reward_type: reward.reward_type,
        tier: reward.tier,
        points_used: reward.points_used,
        description: reward.description,
        status: reward.status,
        expires_at: reward.expires_at,
        created_at: Some(Utc::now()),
    }
}
