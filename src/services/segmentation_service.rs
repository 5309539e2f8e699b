use crate::engine::{
    CUSTOM_SEGMENT_TYPE, SegmentRule, compute_metrics, find_segment_template, segment_templates,
};
use crate::entities::{customer_entity as customers, segment_entity as segments};
use crate::error::{AppError, AppResult};
use crate::models::CreateSegmentRequest;
use crate::store::{NewSegment, SharedStore};
use chrono::Utc;
use serde::Serialize;
use std::collections::HashSet;
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Serialize, ToSchema, PartialEq)]
pub struct MetricsRecalcResult {
    pub processed: usize,
    pub failed: usize,
    #[serde(skip)]
    pub failed_customer_ids: Vec<i64>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SegmentEvaluation {
    pub segment_id: i64,
    pub segment_type: String,
    pub name: String,
    pub customer_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct SegmentationSummary {
    pub evaluated: usize,
    /// Distinct customers placed in at least one segment.
    pub total_customers_segmented: usize,
    pub results: Vec<SegmentEvaluation>,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema, PartialEq)]
pub struct TemplateInitResult {
    pub created: Vec<String>,
    pub existing: Vec<String>,
}

#[derive(Clone)]
pub struct SegmentationService {
    store: SharedStore,
}

impl SegmentationService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// 按订单历史重算每个客户的 RFM、活跃度、流失风险与 LTV
    pub async fn recalculate_all_customers(
        &self,
        organization_id: i64,
    ) -> AppResult<MetricsRecalcResult> {
        let customers = self.store.list_customers(organization_id).await?;
        let now = Utc::now();
        let mut result = MetricsRecalcResult::default();

        for customer in &customers {
            match self.recalculate_customer(customer.id, now).await {
                Ok(true) => result.processed += 1,
                Ok(false) => log::debug!("Customer {} vanished during metrics pass", customer.id),
                Err(e) => {
                    log::error!("Metrics failed for customer {}: {e}", customer.id);
                    result.failed += 1;
                    result.failed_customer_ids.push(customer.id);
                }
            }
        }

        log::info!(
            "Metrics for organization {organization_id}: processed={} failed={}",
            result.processed,
            result.failed
        );
        Ok(result)
    }

    async fn recalculate_customer(
        &self,
        customer_id: i64,
        now: chrono::DateTime<Utc>,
    ) -> AppResult<bool> {
        let history = self.store.list_customer_orders(customer_id).await?;
        let metrics = compute_metrics(&history, now);
        Ok(self
            .store
            .update_customer_metrics(customer_id, &metrics, now)
            .await?)
    }

    /// Re-evaluates every segment of the organization and rewrites membership.
    pub async fn evaluate_all_segments(&self, organization_id: i64) -> AppResult<SegmentationSummary> {
        let customers = self.store.list_customers(organization_id).await?;
        let segments = self.store.list_segments(organization_id).await?;
        let now = Utc::now();

        let mut summary = SegmentationSummary::default();
        let mut segmented: HashSet<i64> = HashSet::new();

        for segment in segments {
            let evaluated = match self.members_of(&segment, &customers).await {
                Ok(ids) => self
                    .store
                    .replace_segment_members(segment.id, &ids, now)
                    .await
                    .map(|_| ids)
                    .map_err(AppError::from),
                Err(e) => Err(e),
            };

            match evaluated {
                Ok(ids) => {
                    summary.evaluated += 1;
                    segmented.extend(ids.iter().copied());
                    summary.results.push(SegmentEvaluation {
                        segment_id: segment.id,
                        segment_type: segment.segment_type,
                        name: segment.name,
                        customer_count: ids.len() as i64,
                        error: None,
                    });
                }
                Err(e) => {
                    log::error!("Segment {} evaluation failed: {e}", segment.id);
                    summary.results.push(SegmentEvaluation {
                        segment_id: segment.id,
                        segment_type: segment.segment_type,
                        name: segment.name,
                        customer_count: segment.customer_count,
                        error: Some(e.to_string()),
                    });
                }
            }
        }

        summary.total_customers_segmented = segmented.len();
        log::info!(
            "Evaluated {} segments for organization {organization_id}, {} customers segmented",
            summary.evaluated,
            summary.total_customers_segmented
        );
        Ok(summary)
    }

    pub async fn assign_to_segments(&self, organization_id: i64) -> AppResult<SegmentationSummary> {
        self.evaluate_all_segments(organization_id).await
    }

    async fn members_of(
        &self,
        segment: &segments::Model,
        customers: &[customers::Model],
    ) -> AppResult<Vec<i64>> {
        if segment.auto_update {
            let rule = rule_for(segment)?;
            return Ok(customers
                .iter()
                .filter(|c| rule.matches(c))
                .map(|c| c.id)
                .collect());
        }

        // 静态分群：保留仍属于该组织的手工成员
        let known: HashSet<i64> = customers.iter().map(|c| c.id).collect();
        let current = self.store.list_segment_member_ids(segment.id).await?;
        Ok(current.into_iter().filter(|id| known.contains(id)).collect())
    }

    pub async fn initialize_templates(&self, organization_id: i64) -> AppResult<TemplateInitResult> {
        let present: HashSet<String> = self
            .store
            .list_segments(organization_id)
            .await?
            .into_iter()
            .map(|s| s.segment_type)
            .collect();

        let mut result = TemplateInitResult::default();
        for template in segment_templates() {
            if present.contains(template.segment_type) {
                result.existing.push(template.segment_type.to_string());
                continue;
            }
            self.store
                .insert_segment(NewSegment {
                    organization_id,
                    name: template.name.to_string(),
                    description: Some(template.description.to_string()),
                    segment_type: template.segment_type.to_string(),
                    is_smart: true,
                    auto_update: true,
                    conditions: Some(template.rule.to_json()),
                })
                .await?;
            result.created.push(template.segment_type.to_string());
        }

        log::info!(
            "Segment templates for organization {organization_id}: created={:?} existing={:?}",
            result.created,
            result.existing
        );
        Ok(result)
    }

    pub async fn create_segment(
        &self,
        organization_id: i64,
        request: CreateSegmentRequest,
    ) -> AppResult<segments::Model> {
        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::ValidationError(
                "Segment name is required".to_string(),
            ));
        }

        match (request.conditions, request.customer_ids) {
            (Some(conditions), None) => {
                let rule = SegmentRule::from_json(&conditions)
                    .map_err(|e| AppError::ValidationError(format!("Invalid conditions: {e}")))?;
                if rule.all.is_empty() {
                    return Err(AppError::ValidationError(
                        "Conditions must contain at least one entry".to_string(),
                    ));
                }
                let segment = self
                    .store
                    .insert_segment(NewSegment {
                        organization_id,
                        name,
                        description: request.description,
                        segment_type: CUSTOM_SEGMENT_TYPE.to_string(),
                        is_smart: true,
                        auto_update: true,
                        conditions: Some(rule.to_json()),
                    })
                    .await?;
                Ok(segment)
            }
            (None, Some(customer_ids)) => {
                let known: HashSet<i64> = self
                    .store
                    .list_customers(organization_id)
                    .await?
                    .into_iter()
                    .map(|c| c.id)
                    .collect();
                if let Some(unknown) = customer_ids.iter().find(|id| !known.contains(id)) {
                    return Err(AppError::ValidationError(format!(
                        "Customer {unknown} does not belong to this organization"
                    )));
                }
                let mut ids = customer_ids;
                ids.sort_unstable();
                ids.dedup();

                let segment = self
                    .store
                    .insert_segment(NewSegment {
                        organization_id,
                        name,
                        description: request.description,
                        segment_type: CUSTOM_SEGMENT_TYPE.to_string(),
                        is_smart: false,
                        auto_update: false,
                        conditions: None,
                    })
                    .await?;
                let now = Utc::now();
                self.store
                    .replace_segment_members(segment.id, &ids, now)
                    .await?;
                Ok(segments::Model {
                    customer_count: ids.len() as i64,
                    last_evaluated_at: Some(now),
                    ..segment
                })
            }
            _ => Err(AppError::ValidationError(
                "Provide either conditions or customer_ids".to_string(),
            )),
        }
    }

    pub async fn list_segments(&self, organization_id: i64) -> AppResult<Vec<segments::Model>> {
        Ok(self.store.list_segments(organization_id).await?)
    }
}

/// Stored conditions win; catalog segments without stored conditions use
/// their template rule.
fn rule_for(segment: &segments::Model) -> AppResult<SegmentRule> {
    match &segment.conditions {
        Some(conditions) => {
            let rule = SegmentRule::from_json(conditions).inspect_err(|e| {
                log::error!("Segment {} has unreadable conditions: {e}", segment.id)
            })?;
            Ok(rule)
        }
        None => find_segment_template(&segment.segment_type)
            .map(|t| t.rule)
            .ok_or_else(|| {
                AppError::ValidationError(format!("Segment {} has no conditions", segment.id))
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::accrual::tests::order;
    use crate::engine::segment_rules::tests::customer;
    use crate::entities::{FinancialStatus, LoyaltyTierLevel, OrderStatus};
    use crate::store::memory::MemoryStore;
    use crate::store::{LoyaltyStore, NewSegment};
    use chrono::Duration;
    use serde_json::json;
    use std::sync::Arc;

    fn store_with_customers() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        let mut vip = customer(1);
        vip.loyalty_tier = LoyaltyTierLevel::Platinum;
        vip.churn_risk = 10.0;
        store.add_customer(vip);
        let mut lapsing = customer(2);
        lapsing.churn_risk = 80.0;
        lapsing.order_count = 4;
        store.add_customer(lapsing);
        store.add_customer(customer(3));
        store
    }

    fn custom_rule(field: &str, op: &str, value: f64) -> CreateSegmentRequest {
        CreateSegmentRequest {
            name: format!("{field} {op} {value}"),
            description: None,
            conditions: Some(json!({"all": [{"field": field, "op": op, "value": value}]})),
            customer_ids: None,
        }
    }

    #[tokio::test]
    async fn test_recalculate_writes_metrics() {
        let store = Arc::new(MemoryStore::new());
        store.add_customer(customer(1));
        let mut recent = order(1, 8_000, OrderStatus::Delivered, FinancialStatus::Paid);
        recent.created_at = Utc::now() - Duration::days(3);
        store.add_order(recent);
        store.add_order(order(2, 9_000, OrderStatus::Delivered, FinancialStatus::Refunded));

        let service = SegmentationService::new(store.clone());
        let result = service.recalculate_all_customers(1).await.unwrap();
        assert_eq!(result.processed, 1);
        assert_eq!(result.failed, 0);

        let c = store.customer(1).unwrap();
        assert_eq!(c.order_count, 1);
        assert_eq!(c.total_spent, 8_000);
        assert_eq!(c.recency_days, Some(3));
        assert!(c.r_score.is_some() && c.metrics_updated_at.is_some());
    }

    #[tokio::test]
    async fn test_recalculate_counts_failures() {
        let store = store_with_customers();
        store.fail_writes_for(2);
        let service = SegmentationService::new(store);
        let result = service.recalculate_all_customers(1).await.unwrap();
        assert_eq!(result.processed, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.failed_customer_ids, vec![2]);
    }

    #[tokio::test]
    async fn test_customer_without_orders_has_no_scores() {
        let store = Arc::new(MemoryStore::new());
        store.add_customer(customer(1));
        let service = SegmentationService::new(store.clone());
        let low_recency = service
            .create_segment(1, custom_rule("r_score", "lte", 2.0))
            .await
            .unwrap();

        service.recalculate_all_customers(1).await.unwrap();
        let summary = service.evaluate_all_segments(1).await.unwrap();

        let c = store.customer(1).unwrap();
        assert_eq!((c.r_score, c.f_score, c.m_score), (None, None, None));
        assert!(c.metrics_updated_at.is_some());
        assert_eq!(summary.results[0].segment_id, low_recency.id);
        assert_eq!(summary.results[0].customer_count, 0);
        assert_eq!(summary.total_customers_segmented, 0);
    }

    #[tokio::test]
    async fn test_template_initialization_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let service = SegmentationService::new(store.clone());

        let first = service.initialize_templates(1).await.unwrap();
        assert_eq!(first.created.len(), segment_templates().len());
        assert!(first.existing.is_empty());

        let second = service.initialize_templates(1).await.unwrap();
        assert!(second.created.is_empty());
        assert_eq!(second.existing, first.created);
        assert_eq!(store.segments().len(), segment_templates().len());
    }

    #[tokio::test]
    async fn test_smart_and_static_segments() {
        let store = store_with_customers();
        let service = SegmentationService::new(store.clone());

        let risky = service
            .create_segment(1, custom_rule("churn_risk", "gte", 60.0))
            .await
            .unwrap();
        let manual = service
            .create_segment(
                1,
                CreateSegmentRequest {
                    name: "Hand picked".to_string(),
                    description: None,
                    conditions: None,
                    customer_ids: Some(vec![3, 1, 3]),
                },
            )
            .await
            .unwrap();
        assert_eq!(manual.customer_count, 2);

        let summary = service.evaluate_all_segments(1).await.unwrap();
        assert_eq!(summary.evaluated, 2);
        assert_eq!(summary.total_customers_segmented, 3);
        let counts: Vec<(i64, i64)> = summary
            .results
            .iter()
            .map(|r| (r.segment_id, r.customer_count))
            .collect();
        assert_eq!(counts, vec![(risky.id, 1), (manual.id, 2)]);
        assert_eq!(store.segments()[0].customer_count, 1);
    }

    #[tokio::test]
    async fn test_static_segment_drops_foreign_members() {
        let store = store_with_customers();
        let service = SegmentationService::new(store.clone());
        let manual = service
            .create_segment(
                1,
                CreateSegmentRequest {
                    name: "Manual".to_string(),
                    description: None,
                    conditions: None,
                    customer_ids: Some(vec![1]),
                },
            )
            .await
            .unwrap();
        store.add_segment_member(manual.id, 99);

        let summary = service.evaluate_all_segments(1).await.unwrap();
        assert_eq!(summary.results[0].customer_count, 1);
    }

    #[tokio::test]
    async fn test_segment_failure_reported_not_fatal() {
        let store = store_with_customers();
        let service = SegmentationService::new(store.clone());
        let broken = service
            .create_segment(1, custom_rule("tier_rank", "gte", 3.0))
            .await
            .unwrap();
        service
            .create_segment(1, custom_rule("frequency", "gte", 2.0))
            .await
            .unwrap();
        store.fail_segment(broken.id);

        let summary = service.evaluate_all_segments(1).await.unwrap();
        assert_eq!(summary.evaluated, 1);
        assert!(summary.results[0].error.is_some());
        assert_eq!(summary.results[1].customer_count, 1);
    }

    #[tokio::test]
    async fn test_unreadable_stored_conditions_reported() {
        let store = store_with_customers();
        let corrupt = store
            .insert_segment(NewSegment {
                organization_id: 1,
                name: "Corrupt".to_string(),
                description: None,
                segment_type: CUSTOM_SEGMENT_TYPE.to_string(),
                is_smart: true,
                auto_update: true,
                conditions: Some(json!({"all": [{"field": "shoe_size"}]})),
            })
            .await
            .unwrap();
        let service = SegmentationService::new(store.clone());

        assert!(matches!(
            rule_for(&store.segments()[0]),
            Err(AppError::SerdeJsonError(_))
        ));
        let summary = service.evaluate_all_segments(1).await.unwrap();
        assert_eq!(summary.evaluated, 0);
        assert_eq!(summary.results[0].segment_id, corrupt.id);
        assert!(summary.results[0].error.is_some());
    }

    #[tokio::test]
    async fn test_invalid_segment_requests() {
        let service = SegmentationService::new(store_with_customers());
        let both = CreateSegmentRequest {
            name: "x".to_string(),
            description: None,
            conditions: Some(json!({"all": []})),
            customer_ids: Some(vec![1]),
        };
        assert!(matches!(
            service.create_segment(1, both).await,
            Err(AppError::ValidationError(_))
        ));
        let foreign = CreateSegmentRequest {
            name: "x".to_string(),
            description: None,
            conditions: None,
            customer_ids: Some(vec![42]),
        };
        assert!(matches!(
            service.create_segment(1, foreign).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            service.create_segment(1, custom_rule("nope", "gte", 1.0)).await,
            Err(AppError::ValidationError(_))
        ));
    }
}
