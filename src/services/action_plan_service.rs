use crate::engine::{build_recommendations, plan_key, plan_template_for, plan_title};
use crate::entities::{ActionPlanStatus, action_plan_entity as plans};
use crate::error::AppResult;
use crate::store::{ActionPlanRefresh, NewActionPlan, SharedStore};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Serialize, ToSchema, PartialEq)]
pub struct PlanGenerationResult {
    pub generated: usize,
    pub updated: usize,
    /// Plans whose segment emptied out and were marked dormant.
    pub retired: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct ActionPlanService {
    store: SharedStore,
}

impl ActionPlanService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// 按分群生成或刷新行动计划，plan_key 保证不重复
    pub async fn generate_for_organization(
        &self,
        organization_id: i64,
    ) -> AppResult<PlanGenerationResult> {
        let segments = self.store.list_segments(organization_id).await?;
        let mut existing: HashMap<String, plans::Model> = self
            .store
            .list_action_plans(organization_id)
            .await?
            .into_iter()
            .map(|p| (p.plan_key.clone(), p))
            .collect();
        let now = Utc::now();
        let mut result = PlanGenerationResult::default();

        for segment in &segments {
            let template = plan_template_for(&segment.segment_type);
            let key = plan_key(organization_id, template, segment.id);
            let current = existing.remove(&key);

            if segment.customer_count <= 0 {
                // 空分群：已有的活跃计划转为 dormant，不新建
                let Some(plan) = current.filter(|p| p.status == ActionPlanStatus::Active) else {
                    continue;
                };
                let refresh = ActionPlanRefresh {
                    title: plan.title.clone(),
                    recommendations: build_recommendations(template, segment, now),
                    target_count: 0,
                    status: ActionPlanStatus::Dormant,
                };
                match self.store.update_action_plan(plan.id, refresh).await {
                    Ok(_) => result.retired += 1,
                    Err(e) => {
                        log::error!("Failed to retire plan {key}: {e}");
                        result.failed += 1;
                    }
                }
                continue;
            }

            let recommendations = build_recommendations(template, segment, now);
            let title = plan_title(template, segment);
            // Ok(true) = refreshed in place, Ok(false) = newly created
            let written = match current {
                Some(plan) => self
                    .store
                    .update_action_plan(
                        plan.id,
                        ActionPlanRefresh {
                            title,
                            recommendations,
                            target_count: segment.customer_count,
                            status: ActionPlanStatus::Active,
                        },
                    )
                    .await
                    .map(|_| true),
                None => self
                    .store
                    .insert_action_plan(NewActionPlan {
                        organization_id,
                        plan_key: key.clone(),
                        template: template.key.to_string(),
                        segment_id: segment.id,
                        title,
                        priority: template.priority.to_string(),
                        recommendations,
                        target_count: segment.customer_count,
                    })
                    .await
                    .map(|_| false),
            };
            match written {
                Ok(true) => result.updated += 1,
                Ok(false) => result.generated += 1,
                Err(e) => {
                    log::error!("Failed to write plan {key}: {e}");
                    result.failed += 1;
                }
            }
        }

        log::info!(
            "Action plans for organization {organization_id}: generated={} updated={} retired={} failed={}",
            result.generated,
            result.updated,
            result.retired,
            result.failed
        );
        Ok(result)
    }

    pub async fn list_action_plans(&self, organization_id: i64) -> AppResult<Vec<plans::Model>> {
        Ok(self.store.list_action_plans(organization_id).await?)
    }
}
