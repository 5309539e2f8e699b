use super::{
    AccrualOutcome, AccrualService, ActionPlanService, RewardService, SegmentationService,
    TierService,
};
use crate::engine::TierTable;
use crate::entities::{LoyaltyTierLevel, customer_entity as customers};
use crate::error::{AppError, AppResult};
use crate::models::CustomerLoyaltyProfile;
use crate::store::SharedStore;
use serde::Serialize;
use std::collections::HashSet;
use utoipa::ToSchema;

/// Stages of one compound recalculation pass, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecalcStage {
    Idle,
    Accruing,
    TierResolving,
    Rewarding,
    Segmenting,
    PlanGenerating,
}

impl std::fmt::Display for RecalcStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecalcStage::Idle => write!(f, "idle"),
            RecalcStage::Accruing => write!(f, "accruing"),
            RecalcStage::TierResolving => write!(f, "tier_resolving"),
            RecalcStage::Rewarding => write!(f, "rewarding"),
            RecalcStage::Segmenting => write!(f, "segmenting"),
            RecalcStage::PlanGenerating => write!(f, "plan_generating"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, ToSchema, PartialEq)]
pub struct RecalculationSummary {
    pub processed: usize,
    pub failed: usize,
    pub rewards_issued: usize,
    pub tiers_changed: usize,
    pub customers_segmented: usize,
    pub segments_evaluated: usize,
    pub plans_generated: usize,
    pub plans_updated: usize,
    pub plans_retired: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct CustomerPassResult {
    pub customer_id: i64,
    pub loyalty_member: bool,
    pub loyalty_points: i64,
    pub previous_tier: LoyaltyTierLevel,
    pub tier: LoyaltyTierLevel,
    pub reward_code: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema, PartialEq)]
pub struct AllOrganizationsResult {
    pub organizations: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct LoyaltyService {
    store: SharedStore,
    tiers: TierService,
    accrual: AccrualService,
    rewards: RewardService,
    segmentation: SegmentationService,
    action_plans: ActionPlanService,
}

impl LoyaltyService {
    pub fn new(
        store: SharedStore,
        tiers: TierService,
        accrual: AccrualService,
        rewards: RewardService,
        segmentation: SegmentationService,
        action_plans: ActionPlanService,
    ) -> Self {
        Self {
            store,
            tiers,
            accrual,
            rewards,
            segmentation,
            action_plans,
        }
    }

    /// 积分 -> 等级 -> 奖励 -> 分群 -> 行动计划
    pub async fn run_for_organization(&self, organization_id: i64) -> AppResult<RecalculationSummary> {
        let customers = self.store.list_customers(organization_id).await?;
        let table = self.tiers.load_tier_table(organization_id).await?;
        let mut summary = RecalculationSummary::default();
        // 同一客户在多个阶段失败只计一次
        let mut failed: HashSet<i64> = HashSet::new();

        log_stage(organization_id, RecalcStage::Accruing);
        for customer in customers.iter().filter(|c| c.loyalty_member) {
            match self.process_customer(&table, customer).await {
                Ok(Some(pass)) => {
                    summary.processed += 1;
                    if pass.tier != pass.previous_tier {
                        summary.tiers_changed += 1;
                    }
                    if pass.reward_code.is_some() {
                        summary.rewards_issued += 1;
                    }
                }
                Ok(None) => log::debug!("Customer {} vanished during recalculation", customer.id),
                Err(e) => {
                    log::error!("Recalculation failed for customer {}: {e}", customer.id);
                    failed.insert(customer.id);
                }
            }
        }

        log_stage(organization_id, RecalcStage::Segmenting);
        let metrics = self
            .segmentation
            .recalculate_all_customers(organization_id)
            .await?;
        failed.extend(metrics.failed_customer_ids);
        summary.failed = failed.len();
        let segmentation = self
            .segmentation
            .evaluate_all_segments(organization_id)
            .await?;
        summary.segments_evaluated = segmentation.evaluated;
        summary.customers_segmented = segmentation.total_customers_segmented;

        log_stage(organization_id, RecalcStage::PlanGenerating);
        let plans = self
            .action_plans
            .generate_for_organization(organization_id)
            .await?;
        summary.plans_generated = plans.generated;
        summary.plans_updated = plans.updated;
        summary.plans_retired = plans.retired;

        log_stage(organization_id, RecalcStage::Idle);
        log::info!(
            "Recalculated organization {organization_id}: processed={} failed={} rewards_issued={} plans_generated={} plans_updated={}",
            summary.processed,
            summary.failed,
            summary.rewards_issued,
            summary.plans_generated,
            summary.plans_updated
        );
        Ok(summary)
    }

    /// Daily cron entry. One organization failing does not stop the others.
    pub async fn run_for_all_organizations(&self) -> AppResult<AllOrganizationsResult> {
        let organization_ids = self.store.list_organization_ids().await?;
        let mut result = AllOrganizationsResult {
            organizations: organization_ids.len(),
            ..Default::default()
        };

        for organization_id in organization_ids {
            match self.run_for_organization(organization_id).await {
                Ok(_) => result.succeeded += 1,
                Err(e) => {
                    log::error!("Recalculation failed for organization {organization_id}: {e}");
                    result.failed += 1;
                }
            }
        }
        Ok(result)
    }

    /// Accrual, tier and reward for one customer (order completed / signup).
    pub async fn run_for_customer(&self, customer_id: i64) -> AppResult<CustomerPassResult> {
        let customer = self
            .store
            .find_customer(customer_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Customer {customer_id} not found")))?;

        if !customer.loyalty_member {
            log::debug!("Customer {customer_id} is not a loyalty member, skipping");
            return Ok(CustomerPassResult {
                customer_id,
                loyalty_member: false,
                loyalty_points: customer.loyalty_points,
                previous_tier: customer.loyalty_tier,
                tier: customer.loyalty_tier,
                reward_code: None,
            });
        }

        let table = self.tiers.load_tier_table(customer.organization_id).await?;
        self.process_customer(&table, &customer)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Customer {customer_id} not found")))
    }

    /// Marks the customer as a member (BRONZE when new) and runs their pass.
    pub async fn enroll_customer(
        &self,
        organization_id: i64,
        customer_id: i64,
    ) -> AppResult<CustomerPassResult> {
        self.customer_in_organization(organization_id, customer_id)
            .await?;
        if self.store.enroll_customer(customer_id).await?.is_none() {
            return Err(AppError::NotFound(format!(
                "Customer {customer_id} not found"
            )));
        }
        log::info!("Customer {customer_id} enrolled in loyalty program");
        self.run_for_customer(customer_id).await
    }

    pub async fn customer_profile(
        &self,
        organization_id: i64,
        customer_id: i64,
    ) -> AppResult<CustomerLoyaltyProfile> {
        let customer = self
            .customer_in_organization(organization_id, customer_id)
            .await?;
        let table = self.tiers.load_tier_table(organization_id).await?;
        let rewards = self.store.list_customer_rewards(customer_id).await?;

        let current = table.definition(customer.loyalty_tier);
        let next = table.next_tier(customer.loyalty_points);
        Ok(CustomerLoyaltyProfile::build(customer, current, next, rewards))
    }

    async fn customer_in_organization(
        &self,
        organization_id: i64,
        customer_id: i64,
    ) -> AppResult<customers::Model> {
        self.store
            .find_customer(customer_id)
            .await?
            .filter(|c| c.organization_id == organization_id)
            .ok_or_else(|| AppError::NotFound(format!("Customer {customer_id} not found")))
    }

    /// `None` when the customer disappeared mid-pass.
    async fn process_customer(
        &self,
        table: &TierTable,
        customer: &customers::Model,
    ) -> AppResult<Option<CustomerPassResult>> {
        let outcome = self.accrual.recompute_points(customer).await?;
        let Some(points) = outcome.points() else {
            return Ok(None);
        };
        if let AccrualOutcome::Updated { previous, .. } = outcome {
            log::debug!(
                "[{}] customer {} {previous} -> {points}",
                RecalcStage::Accruing,
                customer.id
            );
        }

        let previous_tier = customer.loyalty_tier;
        let tier = table.resolve(points);

        // 先发奖励再写等级：任一步中断后重跑都能补齐
        let reward = self
            .rewards
            .on_tier_change(customer, previous_tier, tier)
            .await?;
        if let Some(r) = &reward {
            log::debug!("[{}] customer {} got {}", RecalcStage::Rewarding, customer.id, r.code);
        }

        if tier != previous_tier {
            log::debug!(
                "[{}] customer {} {previous_tier} -> {tier}",
                RecalcStage::TierResolving,
                customer.id
            );
            // 降级同样写入，但不发奖励
            if !self.store.set_loyalty_tier(customer.id, tier).await? {
                return Ok(None);
            }
        }

        Ok(Some(CustomerPassResult {
            customer_id: customer.id,
            loyalty_member: true,
            loyalty_points: points,
            previous_tier,
            tier,
            reward_code: reward.map(|r| r.code),
        }))
    }
}

fn log_stage(organization_id: i64, stage: RecalcStage) {
    log::info!("Organization {organization_id} recalculation stage: {stage}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoyaltyConfig;
    use crate::engine::accrual::tests::order;
    use crate::engine::segment_rules::tests::customer;
    use crate::entities::{FinancialStatus, OrderStatus};
    use crate::services::AppServices;
    use crate::store::LoyaltyStore;
    use crate::store::memory::MemoryStore;
    use std::sync::Arc;

    fn loyalty_service(store: Arc<MemoryStore>) -> LoyaltyService {
        AppServices::new(store, LoyaltyConfig::default()).loyalty
    }

    fn paid(id: i64, customer_id: i64, cents: i64) -> crate::entities::order_entity::Model {
        let mut o = order(id, cents, OrderStatus::Fulfilled, FinancialStatus::Paid);
        o.customer_id = customer_id;
        o
    }

    #[tokio::test]
    async fn test_refund_scenario_stays_bronze() {
        let store = Arc::new(MemoryStore::new());
        store.add_customer(customer(1));
        store.add_order(paid(1, 1, 12_000));
        store.add_order(order(2, 4_500, OrderStatus::Fulfilled, FinancialStatus::Refunded));
        store.add_order(paid(3, 1, 3_000));

        let pass = loyalty_service(store.clone())
            .run_for_customer(1)
            .await
            .unwrap();
        assert_eq!(pass.loyalty_points, 150);
        assert_eq!(pass.tier, LoyaltyTierLevel::Bronze);
        assert_eq!(pass.reward_code, None);
        assert!(store.rewards().is_empty());
    }

    #[tokio::test]
    async fn test_promotion_issues_one_reward() {
        let store = Arc::new(MemoryStore::new());
        store.add_organization(1);
        store.add_customer(customer(1));
        store.add_order(paid(1, 1, 160_000));
        let service = loyalty_service(store.clone());

        let summary = service.run_for_organization(1).await.unwrap();
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.tiers_changed, 1);
        assert_eq!(summary.rewards_issued, 1);

        let c = store.customer(1).unwrap();
        assert_eq!(c.loyalty_points, 1600);
        assert_eq!(c.loyalty_tier, LoyaltyTierLevel::Gold);
        let rewards = store.rewards();
        assert_eq!(rewards.len(), 1);
        assert!(rewards[0].code.starts_with("TIER-GOLD-"));
        assert_eq!(rewards[0].expires_at, None);

        let again = service.run_for_organization(1).await.unwrap();
        assert_eq!(again.rewards_issued, 0);
        assert_eq!(again.tiers_changed, 0);
        assert_eq!(store.customer(1).unwrap().loyalty_points, 1600);
    }

    #[tokio::test]
    async fn test_downgrade_is_silent() {
        let store = Arc::new(MemoryStore::new());
        let mut c = customer(1);
        c.loyalty_points = 600;
        c.loyalty_tier = LoyaltyTierLevel::Platinum;
        store.add_customer(c);
        store.add_order(paid(1, 1, 60_000));

        let pass = loyalty_service(store.clone())
            .run_for_customer(1)
            .await
            .unwrap();
        assert_eq!(pass.tier, LoyaltyTierLevel::Silver);
        assert_eq!(store.customer(1).unwrap().loyalty_tier, LoyaltyTierLevel::Silver);
        assert!(store.rewards().is_empty());
    }

    #[tokio::test]
    async fn test_customer_failure_does_not_abort_pass() {
        let store = Arc::new(MemoryStore::new());
        store.add_customer(customer(1));
        store.add_customer(customer(2));
        store.add_order(paid(1, 1, 60_000));
        store.add_order(paid(2, 2, 60_000));
        store.fail_writes_for(1);

        let summary = loyalty_service(store.clone())
            .run_for_organization(1)
            .await
            .unwrap();
        // customer 1 fails in accrual and again in the metrics pass
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(store.customer(2).unwrap().loyalty_tier, LoyaltyTierLevel::Silver);
    }

    #[tokio::test]
    async fn test_rerun_issues_reward_missed_after_tier_write() {
        let store = Arc::new(MemoryStore::new());
        store.add_organization(1);
        let mut c = customer(1);
        c.loyalty_points = 600;
        store.add_customer(c);
        store.add_order(paid(1, 1, 60_000));
        // tier persisted, reward never written
        store.set_loyalty_tier(1, LoyaltyTierLevel::Silver).await.unwrap();
        let service = loyalty_service(store.clone());

        let summary = service.run_for_organization(1).await.unwrap();
        assert_eq!(summary.rewards_issued, 1);
        assert_eq!(summary.tiers_changed, 0);
        let rewards = store.rewards();
        assert_eq!(rewards.len(), 1);
        assert!(rewards[0].code.starts_with("TIER-SILVER-"));

        let again = service.run_for_organization(1).await.unwrap();
        assert_eq!(again.rewards_issued, 0);
        assert_eq!(store.rewards().len(), 1);
    }

    #[tokio::test]
    async fn test_reward_failure_leaves_tier_for_rerun() {
        let store = Arc::new(MemoryStore::new());
        store.add_customer(customer(1));
        store.add_order(paid(1, 1, 60_000));
        store.fail_reward_writes(true);
        let service = loyalty_service(store.clone());

        assert!(service.run_for_customer(1).await.is_err());
        let c = store.customer(1).unwrap();
        assert_eq!(c.loyalty_points, 600);
        assert_eq!(c.loyalty_tier, LoyaltyTierLevel::Bronze);

        store.fail_reward_writes(false);
        let pass = service.run_for_customer(1).await.unwrap();
        assert_eq!(pass.previous_tier, LoyaltyTierLevel::Bronze);
        assert_eq!(pass.tier, LoyaltyTierLevel::Silver);
        assert!(pass.reward_code.unwrap().starts_with("TIER-SILVER-"));
        assert_eq!(store.rewards().len(), 1);
    }

    #[tokio::test]
    async fn test_unreachable_store_fails_whole_pass() {
        let store = Arc::new(MemoryStore::new());
        store.add_organization(1);
        store.set_unavailable(true);
        let service = loyalty_service(store.clone());

        assert!(service.run_for_organization(1).await.is_err());
        assert!(service.run_for_all_organizations().await.is_err());
    }

    #[tokio::test]
    async fn test_all_organizations_runs_each() {
        let store = Arc::new(MemoryStore::new());
        store.add_organization(1);
        store.add_organization(2);
        let result = loyalty_service(store)
            .run_for_all_organizations()
            .await
            .unwrap();
        assert_eq!(
            result,
            AllOrganizationsResult {
                organizations: 2,
                succeeded: 2,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_enroll_starts_at_bronze_and_accrues() {
        let store = Arc::new(MemoryStore::new());
        let mut c = customer(1);
        c.loyalty_member = false;
        store.add_customer(c);
        store.add_order(paid(1, 1, 55_000));
        let service = loyalty_service(store.clone());

        assert!(!service.run_for_customer(1).await.unwrap().loyalty_member);
        let pass = service.enroll_customer(1, 1).await.unwrap();
        assert!(pass.loyalty_member);
        assert_eq!(pass.loyalty_points, 550);
        assert_eq!(pass.tier, LoyaltyTierLevel::Silver);
        assert!(pass.reward_code.unwrap().starts_with("TIER-SILVER-"));

        assert!(matches!(
            service.enroll_customer(2, 1).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_profile_shows_progress() {
        let store = Arc::new(MemoryStore::new());
        store.add_customer(customer(1));
        store.add_order(paid(1, 1, 20_000));
        let service = loyalty_service(store.clone());
        service.run_for_customer(1).await.unwrap();

        let profile = service.customer_profile(1, 1).await.unwrap();
        assert_eq!(profile.loyalty_points, 200);
        assert_eq!(profile.available_points, 200);
        let next = profile.next_tier.unwrap();
        assert_eq!(next.tier, LoyaltyTierLevel::Silver);
        assert_eq!(next.points_needed, 300);
        assert!(!profile.benefits.is_empty());
    }
}
