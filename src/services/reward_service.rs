use crate::config::LoyaltyConfig;
use crate::entities::{
    LoyaltyTierLevel, RewardStatus, RewardType, customer_entity as customers,
    reward_redemption_entity as rewards,
    reward_redemption_entity::{REDEEM_CODE_PREFIX, TIER_CODE_PREFIX},
};
use crate::error::{AppError, AppResult};
use crate::store::{NewReward, SharedStore};
use crate::utils::generate_unique_reward_code;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RepairResult {
    pub rows_repaired: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExpireResult {
    pub rows_expired: u64,
}

#[derive(Clone)]
pub struct RewardService {
    store: SharedStore,
    config: LoyaltyConfig,
}

impl RewardService {
    pub fn new(store: SharedStore, config: LoyaltyConfig) -> Self {
        Self { store, config }
    }

    /// Issues the non-expiring TIER- code owed for `new_tier`. Downgrades and
    /// BRONZE never earn one; a tier that already holds its code is skipped,
    /// so an interrupted promotion is completed on the next pass.
    pub async fn on_tier_change(
        &self,
        customer: &customers::Model,
        old_tier: LoyaltyTierLevel,
        new_tier: LoyaltyTierLevel,
    ) -> AppResult<Option<rewards::Model>> {
        if new_tier < old_tier || new_tier == LoyaltyTierLevel::Bronze {
            return Ok(None);
        }

        if let Some(existing) = self.store.find_tier_reward(customer.id, new_tier).await? {
            log::info!(
                "Customer {} already holds {} for {new_tier}, not issuing again",
                customer.id,
                existing.code
            );
            return Ok(None);
        }

        let prefix = format!("{TIER_CODE_PREFIX}{new_tier}-");
        let code = generate_unique_reward_code(self.store.as_ref(), &prefix).await?;
        let reward = self
            .store
            .insert_reward(NewReward {
                organization_id: customer.organization_id,
                customer_id: customer.id,
                code,
                reward_type: RewardType::TierPromotion,
                tier: Some(new_tier),
                points_used: 0,
                description: Some(format!("Promotion to {new_tier}")),
                status: RewardStatus::Active,
                expires_at: None,
            })
            .await?;

        log::info!(
            "Issued {} to customer {} ({old_tier} -> {new_tier})",
            reward.code,
            customer.id
        );
        Ok(Some(reward))
    }

    /// Clears any expiry set on TIER- codes. Re-running repairs nothing.
    pub async fn repair_tier_code_expiry(&self) -> AppResult<RepairResult> {
        let rows_repaired = self.store.clear_tier_code_expiry().await?;
        if rows_repaired > 0 {
            log::warn!("Cleared expiry on {rows_repaired} tier reward codes");
        }
        Ok(RepairResult { rows_repaired })
    }

    /// Converts available points into a time-limited RWD- code.
    pub async fn redeem_points(
        &self,
        organization_id: i64,
        customer_id: i64,
        points: i64,
    ) -> AppResult<rewards::Model> {
        if points <= 0 {
            return Err(AppError::ValidationError(
                "Points to redeem must be positive".to_string(),
            ));
        }

        let customer = self
            .store
            .find_customer(customer_id)
            .await?
            .filter(|c| c.organization_id == organization_id)
            .ok_or_else(|| AppError::NotFound(format!("Customer {customer_id} not found")))?;
        if !customer.loyalty_member {
            return Err(AppError::ValidationError(
                "Customer is not a loyalty member".to_string(),
            ));
        }
        if customer.available_points() < points {
            return Err(AppError::InsufficientPoints {
                requested: points,
                available: customer.available_points(),
            });
        }

        let code = generate_unique_reward_code(self.store.as_ref(), REDEEM_CODE_PREFIX).await?;
        let value_cents = points * self.config.cents_per_point;
        let redeemed = self
            .store
            .redeem_points(NewReward {
                organization_id,
                customer_id,
                code,
                reward_type: RewardType::PointsRedemption,
                tier: None,
                points_used: points,
                description: Some(format!(
                    "{points} points redeemed for {}.{:02} off",
                    value_cents / 100,
                    value_cents % 100
                )),
                status: RewardStatus::Active,
                expires_at: Some(Utc::now() + Duration::days(self.config.redemption_expiry_days)),
            })
            .await?;

        // 余额在校验后被并发消耗
        let reward = redeemed.ok_or(AppError::InsufficientPoints {
            requested: points,
            available: 0,
        })?;
        log::info!(
            "Customer {customer_id} redeemed {points} points as {}",
            reward.code
        );
        Ok(reward)
    }

    pub async fn expire_stale_rewards(&self, now: DateTime<Utc>) -> AppResult<ExpireResult> {
        let rows_expired = self.store.expire_rewards_before(now).await?;
        if rows_expired > 0 {
            log::info!("Expired {rows_expired} reward codes");
        }
        Ok(ExpireResult { rows_expired })
    }
}
