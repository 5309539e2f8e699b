use super::{
    ActionPlanRefresh, LoyaltyStore, NewActionPlan, NewLoyaltyTier, NewReward, NewSegment,
};
use crate::engine::CustomerMetrics;
use crate::entities::{
    ActionPlanStatus, LoyaltyTierLevel, RewardStatus, RewardType, action_plan_entity as plans,
    customer_entity as customers, loyalty_tier_entity as tiers, order_entity as orders,
    organization_entity as organizations, reward_redemption_entity as rewards,
    reward_redemption_entity::TIER_CODE_PREFIX, segment_entity as segments,
    segment_member_entity as members,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

#[derive(Clone)]
pub struct SeaOrmStore {
    pool: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }
}

/// Partial ActiveModel updates report a vanished row as `RecordNotUpdated`.
fn row_updated<T>(result: Result<T, DbErr>) -> Result<bool, DbErr> {
    match result {
        Ok(_) => Ok(true),
        Err(DbErr::RecordNotUpdated) => Ok(false),
        Err(e) => Err(e),
    }
}

#[async_trait]
impl LoyaltyStore for SeaOrmStore {
    async fn list_organization_ids(&self) -> Result<Vec<i64>, DbErr> {
        organizations::Entity::find()
            .select_only()
            .column(organizations::Column::Id)
            .order_by_asc(organizations::Column::Id)
            .into_tuple::<i64>()
            .all(&self.pool)
            .await
    }

    async fn list_customers(&self, organization_id: i64) -> Result<Vec<customers::Model>, DbErr> {
        customers::Entity::find()
            .filter(customers::Column::OrganizationId.eq(organization_id))
            .order_by_asc(customers::Column::Id)
            .all(&self.pool)
            .await
    }

    async fn find_customer(&self, customer_id: i64) -> Result<Option<customers::Model>, DbErr> {
        customers::Entity::find_by_id(customer_id)
            .one(&self.pool)
            .await
    }

    async fn list_customer_orders(&self, customer_id: i64) -> Result<Vec<orders::Model>, DbErr> {
        orders::Entity::find()
            .filter(orders::Column::CustomerId.eq(customer_id))
            .order_by_asc(orders::Column::CreatedAt)
            .all(&self.pool)
            .await
    }

    async fn raise_loyalty_points(&self, customer_id: i64, points: i64) -> Result<bool, DbErr> {
        // 条件更新：只在新积分更大时写入，并发重算也不会把积分改小
        let res = customers::Entity::update_many()
            .col_expr(customers::Column::LoyaltyPoints, Expr::value(points))
            .col_expr(customers::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(customers::Column::Id.eq(customer_id))
            .filter(customers::Column::LoyaltyPoints.lt(points))
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected > 0)
    }

    async fn set_loyalty_tier(
        &self,
        customer_id: i64,
        tier: LoyaltyTierLevel,
    ) -> Result<bool, DbErr> {
        row_updated(
            customers::ActiveModel {
                id: Set(customer_id),
                loyalty_tier: Set(tier),
                updated_at: Set(Some(Utc::now())),
                ..Default::default()
            }
            .update(&self.pool)
            .await,
        )
    }

    async fn enroll_customer(&self, customer_id: i64) -> Result<Option<customers::Model>, DbErr> {
        let Some(current) = customers::Entity::find_by_id(customer_id)
            .one(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        if current.loyalty_member {
            return Ok(Some(current));
        }
        let updated = customers::ActiveModel {
            id: Set(customer_id),
            loyalty_member: Set(true),
            loyalty_tier: Set(LoyaltyTierLevel::Bronze),
            updated_at: Set(Some(Utc::now())),
            ..Default::default()
        }
        .update(&self.pool)
        .await?;
        Ok(Some(updated))
    }

    async fn update_customer_metrics(
        &self,
        customer_id: i64,
        metrics: &CustomerMetrics,
        computed_at: DateTime<Utc>,
    ) -> Result<bool, DbErr> {
        row_updated(
            customers::ActiveModel {
                id: Set(customer_id),
                total_spent: Set(metrics.total_spent),
                order_count: Set(metrics.order_count),
                last_order_at: Set(metrics.last_order_at),
                recency_days: Set(metrics.recency_days),
                r_score: Set(metrics.r_score),
                f_score: Set(metrics.f_score),
                m_score: Set(metrics.m_score),
                engagement_score: Set(metrics.engagement_score),
                churn_risk: Set(metrics.churn_risk),
                lifetime_value: Set(metrics.lifetime_value),
                metrics_updated_at: Set(Some(computed_at)),
                updated_at: Set(Some(computed_at)),
                ..Default::default()
            }
            .update(&self.pool)
            .await,
        )
    }

    async fn list_tiers(&self, organization_id: i64) -> Result<Vec<tiers::Model>, DbErr> {
        tiers::Entity::find()
            .filter(tiers::Column::OrganizationId.eq(organization_id))
            .order_by_asc(tiers::Column::MinPoints)
            .all(&self.pool)
            .await
    }

    async fn insert_tier(&self, tier: NewLoyaltyTier) -> Result<tiers::Model, DbErr> {
        let benefits = serde_json::to_value(&tier.benefits)
            .map_err(|e| DbErr::Custom(format!("Cannot encode tier benefits: {e}")))?;
        tiers::ActiveModel {
            organization_id: Set(tier.organization_id),
            tier: Set(tier.tier),
            min_points: Set(tier.min_points),
            points_per_dollar: Set(tier.points_per_dollar),
            benefits: Set(benefits),
            ..Default::default()
        }
        .insert(&self.pool)
        .await
    }

    async fn reward_code_exists(&self, code: &str) -> Result<bool, DbErr> {
        let count = rewards::Entity::find()
            .filter(rewards::Column::Code.eq(code))
            .count(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn find_tier_reward(
        &self,
        customer_id: i64,
        tier: LoyaltyTierLevel,
    ) -> Result<Option<rewards::Model>, DbErr> {
        rewards::Entity::find()
            .filter(rewards::Column::CustomerId.eq(customer_id))
            .filter(rewards::Column::RewardType.eq(RewardType::TierPromotion))
            .filter(rewards::Column::Tier.eq(tier))
            .one(&self.pool)
            .await
    }

    async fn list_customer_rewards(&self, customer_id: i64) -> Result<Vec<rewards::Model>, DbErr> {
        rewards::Entity::find()
            .filter(rewards::Column::CustomerId.eq(customer_id))
            .order_by_desc(rewards::Column::CreatedAt)
            .all(&self.pool)
            .await
    }

    async fn insert_reward(&self, reward: NewReward) -> Result<rewards::Model, DbErr> {
        reward_active_model(reward).insert(&self.pool).await
    }

    async fn redeem_points(&self, reward: NewReward) -> Result<Option<rewards::Model>, DbErr> {
        let txn = self.pool.begin().await?;
        let points = reward.points_used;

        // 原子扣减：仅当可用积分 (points - used) 足够时更新
        let res = customers::Entity::update_many()
            .col_expr(
                customers::Column::LoyaltyUsed,
                Expr::col(customers::Column::LoyaltyUsed).add(points),
            )
            .col_expr(customers::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(customers::Column::Id.eq(reward.customer_id))
            .filter(customers::Column::LoyaltyMember.eq(true))
            .filter(
                Expr::expr(
                    Expr::col(customers::Column::LoyaltyPoints)
                        .sub(Expr::col(customers::Column::LoyaltyUsed)),
                )
                .gte(points),
            )
            .exec(&txn)
            .await?;
        if res.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let inserted = reward_active_model(reward).insert(&txn).await?;
        txn.commit().await?;
        Ok(Some(inserted))
    }

    async fn clear_tier_code_expiry(&self) -> Result<u64, DbErr> {
        let res = rewards::Entity::update_many()
            .col_expr(
                rewards::Column::ExpiresAt,
                Expr::value(Option::<DateTime<Utc>>::None),
            )
            .filter(rewards::Column::Code.starts_with(TIER_CODE_PREFIX))
            .filter(rewards::Column::ExpiresAt.is_not_null())
            .exec(&self.pool)
            .await?;
        Ok(res.rows_affected)
    }

    async fn expire_rewards_before(&self, now: DateTime<Utc>) -> Result<u64, DbErr> {
        let stale = rewards::Entity::find()
            .filter(rewards::Column::Status.eq(RewardStatus::Active))
            .filter(rewards::Column::ExpiresAt.lt(now))
            .filter(rewards::Column::Code.not_like(format!("{TIER_CODE_PREFIX}%")))
            .all(&self.pool)
            .await?;

        let mut expired = 0u64;
        for reward in stale {
            let updated = row_updated(
                rewards::ActiveModel {
                    id: Set(reward.id),
                    status: Set(RewardStatus::Expired),
                    ..Default::default()
                }
                .update(&self.pool)
                .await,
            )?;
            if updated {
                expired += 1;
            }
        }
        Ok(expired)
    }

    async fn list_segments(&self, organization_id: i64) -> Result<Vec<segments::Model>, DbErr> {
        segments::Entity::find()
            .filter(segments::Column::OrganizationId.eq(organization_id))
            .order_by_asc(segments::Column::Id)
            .all(&self.pool)
            .await
    }

    async fn insert_segment(&self, segment: NewSegment) -> Result<segments::Model, DbErr> {
        segments::ActiveModel {
            organization_id: Set(segment.organization_id),
            name: Set(segment.name),
            description: Set(segment.description),
            segment_type: Set(segment.segment_type),
            is_smart: Set(segment.is_smart),
            auto_update: Set(segment.auto_update),
            conditions: Set(segment.conditions),
            customer_count: Set(0),
            ..Default::default()
        }
        .insert(&self.pool)
        .await
    }

    async fn list_segment_member_ids(&self, segment_id: i64) -> Result<Vec<i64>, DbErr> {
        members::Entity::find()
            .select_only()
            .column(members::Column::CustomerId)
            .filter(members::Column::SegmentId.eq(segment_id))
            .order_by_asc(members::Column::CustomerId)
            .into_tuple::<i64>()
            .all(&self.pool)
            .await
    }

    async fn replace_segment_members(
        &self,
        segment_id: i64,
        customer_ids: &[i64],
        evaluated_at: DateTime<Utc>,
    ) -> Result<(), DbErr> {
        let txn = self.pool.begin().await?;

        members::Entity::delete_many()
            .filter(members::Column::SegmentId.eq(segment_id))
            .exec(&txn)
            .await?;

        if !customer_ids.is_empty() {
            let rows = customer_ids.iter().map(|customer_id| members::ActiveModel {
                segment_id: Set(segment_id),
                customer_id: Set(*customer_id),
                ..Default::default()
            });
            members::Entity::insert_many(rows).exec(&txn).await?;
        }

        segments::ActiveModel {
            id: Set(segment_id),
            customer_count: Set(customer_ids.len() as i64),
            last_evaluated_at: Set(Some(evaluated_at)),
            updated_at: Set(Some(evaluated_at)),
            ..Default::default()
        }
        .update(&txn)
        .await?;

        txn.commit().await?;
        Ok(())
    }

    async fn list_action_plans(&self, organization_id: i64) -> Result<Vec<plans::Model>, DbErr> {
        plans::Entity::find()
            .filter(plans::Column::OrganizationId.eq(organization_id))
            .order_by_asc(plans::Column::Id)
            .all(&self.pool)
            .await
    }

    async fn insert_action_plan(&self, plan: NewActionPlan) -> Result<plans::Model, DbErr> {
        plans::ActiveModel {
            organization_id: Set(plan.organization_id),
            plan_key: Set(plan.plan_key),
            template: Set(plan.template),
            segment_id: Set(plan.segment_id),
            title: Set(plan.title),
            priority: Set(plan.priority),
            recommendations: Set(plan.recommendations),
            target_count: Set(plan.target_count),
            status: Set(ActionPlanStatus::Active),
            ..Default::default()
        }
        .insert(&self.pool)
        .await
    }

    async fn update_action_plan(
        &self,
        plan_id: i64,
        refresh: ActionPlanRefresh,
    ) -> Result<bool, DbErr> {
        row_updated(
            plans::ActiveModel {
                id: Set(plan_id),
                title: Set(refresh.title),
                recommendations: Set(refresh.recommendations),
                target_count: Set(refresh.target_count),
                status: Set(refresh.status),
                updated_at: Set(Some(Utc::now())),
                ..Default::default()
            }
            .update(&self.pool)
            .await,
        )
    }
}

fn reward_active_model(reward: NewReward) -> rewards::ActiveModel {
    rewards::ActiveModel {
        organization_id: Set(reward.organization_id),
        customer_id: Set(reward.customer_id),
        code: Set(reward.code),
        reward_type: Set(reward.reward_type),
        tier: Set(reward.tier),
        points_used: Set(reward.points_used),
        description: Set(reward.description),
        status: Set(reward.status),
        expires_at: Set(reward.expires_at),
        ..Default::default()
    }
}
