use crate::engine::{lifetime_points, qualifying_orders};
use crate::entities::customer_entity as customers;
use crate::error::AppResult;
use crate::store::SharedStore;
use serde::Serialize;
use utoipa::ToSchema;

/// Result of recomputing one customer's lifetime points.
#[derive(Debug, Clone, PartialEq)]
pub enum AccrualOutcome {
    /// Stored points were raised.
    Updated { previous: i64, points: i64 },
    /// Computed total is not above the stored one; nothing written.
    Unchanged { points: i64 },
    NoQualifyingOrders { points: i64 },
    /// The customer disappeared before the write.
    Missing,
}

impl AccrualOutcome {
    /// Points the customer holds after this recompute.
    pub fn points(&self) -> Option<i64> {
        match self {
            AccrualOutcome::Updated { points, .. }
            | AccrualOutcome::Unchanged { points }
            | AccrualOutcome::NoQualifyingOrders { points } => Some(*points),
            AccrualOutcome::Missing => None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, ToSchema, PartialEq)]
pub struct AccrualBatchResult {
    pub processed: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Clone)]
pub struct AccrualService {
    store: SharedStore,
}

impl AccrualService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// 从订单重新计算累计积分；只在结果更大时写回
    pub async fn recompute_points(&self, customer: &customers::Model) -> AppResult<AccrualOutcome> {
        let history = self.store.list_customer_orders(customer.id).await?;
        if qualifying_orders(&history).next().is_none() {
            log::debug!("Customer {} has no qualifying orders", customer.id);
            return Ok(AccrualOutcome::NoQualifyingOrders {
                points: customer.loyalty_points,
            });
        }

        let computed = lifetime_points(&history);
        if computed <= customer.loyalty_points {
            return Ok(AccrualOutcome::Unchanged {
                points: customer.loyalty_points,
            });
        }

        if self.store.raise_loyalty_points(customer.id, computed).await? {
            log::info!(
                "Customer {} points {} -> {computed}",
                customer.id,
                customer.loyalty_points
            );
            return Ok(AccrualOutcome::Updated {
                previous: customer.loyalty_points,
                points: computed,
            });
        }

        // 条件写入未命中：客户已被删除，或并发重算已写入更高积分
        match self.store.find_customer(customer.id).await? {
            Some(current) => Ok(AccrualOutcome::Unchanged {
                points: current.loyalty_points,
            }),
            None => Ok(AccrualOutcome::Missing),
        }
    }

    /// Backfill for every loyalty member of the organization.
    pub async fn recompute_organization(&self, organization_id: i64) -> AppResult<AccrualBatchResult> {
        let members = self.store.list_customers(organization_id).await?;
        let mut result = AccrualBatchResult::default();

        for customer in members.iter().filter(|c| c.loyalty_member) {
            result.processed += 1;
            match self.recompute_points(customer).await {
                Ok(AccrualOutcome::Updated { .. }) => result.updated += 1,
                Ok(AccrualOutcome::Missing) | Ok(AccrualOutcome::NoQualifyingOrders { .. }) => {
                    result.skipped += 1
                }
                Ok(AccrualOutcome::Unchanged { .. }) => {}
                Err(e) => {
                    log::error!("Accrual failed for customer {}: {e}", customer.id);
                    result.failed += 1;
                }
            }
        }

        log::info!(
            "Accrual for organization {organization_id}: processed={} updated={} skipped={} failed={}",
            result.processed,
            result.updated,
            result.skipped,
            result.failed
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::accrual::tests::order;
    use crate::engine::segment_rules::tests::customer;
    use crate::entities::{FinancialStatus, OrderStatus};
    use crate::store::memory::MemoryStore;
    use std::sync::Arc;

    fn seeded() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.add_organization(1);
        store.add_customer(customer(1));
        store.add_order(order(1, 12_000, OrderStatus::Fulfilled, FinancialStatus::Paid));
        store.add_order(order(2, 4_500, OrderStatus::Fulfilled, FinancialStatus::Refunded));
        store.add_order(order(3, 3_000, OrderStatus::Fulfilled, FinancialStatus::Paid));
        store
    }

    #[tokio::test]
    async fn test_refund_excluded_from_points() {
        let store = seeded();
        let service = AccrualService::new(store.clone());
        let c = store.customer(1).unwrap();

        let outcome = service.recompute_points(&c).await.unwrap();
        assert_eq!(
            outcome,
            AccrualOutcome::Updated {
                previous: 0,
                points: 150
            }
        );
        assert_eq!(store.customer(1).unwrap().loyalty_points, 150);
    }

    #[tokio::test]
    async fn test_recompute_is_idempotent() {
        let store = seeded();
        let service = AccrualService::new(store.clone());

        service.recompute_points(&store.customer(1).unwrap()).await.unwrap();
        let again = service
            .recompute_points(&store.customer(1).unwrap())
            .await
            .unwrap();
        assert_eq!(again, AccrualOutcome::Unchanged { points: 150 });
        assert_eq!(store.customer(1).unwrap().loyalty_points, 150);
    }

    #[tokio::test]
    async fn test_points_never_lowered() {
        let store = seeded();
        let mut c = customer(2);
        c.loyalty_points = 900;
        store.add_customer(c.clone());
        let mut o = order(10, 20_000, OrderStatus::Completed, FinancialStatus::Paid);
        o.customer_id = 2;
        store.add_order(o);

        let service = AccrualService::new(store.clone());
        let outcome = service.recompute_points(&c).await.unwrap();
        assert_eq!(outcome, AccrualOutcome::Unchanged { points: 900 });
        assert_eq!(store.customer(2).unwrap().loyalty_points, 900);
    }

    #[tokio::test]
    async fn test_no_qualifying_orders_skipped() {
        let store = Arc::new(MemoryStore::new());
        store.add_customer(customer(5));
        let mut pending = order(1, 5_000, OrderStatus::Pending, FinancialStatus::Pending);
        pending.customer_id = 5;
        store.add_order(pending);

        let service = AccrualService::new(store.clone());
        let result = service.recompute_organization(1).await.unwrap();
        assert_eq!(
            result,
            AccrualBatchResult {
                processed: 1,
                updated: 0,
                skipped: 1,
                failed: 0
            }
        );
    }

    #[tokio::test]
    async fn test_vanished_customer_is_missing() {
        let store = seeded();
        let service = AccrualService::new(store.clone());
        let c = store.customer(1).unwrap();
        store.remove_customer(1);

        let outcome = service.recompute_points(&c).await.unwrap();
        assert_eq!(outcome, AccrualOutcome::Missing);
        assert_eq!(outcome.points(), None);
    }

    #[tokio::test]
    async fn test_write_failure_isolated() {
        let store = seeded();
        store.add_customer(customer(2));
        let mut o = order(20, 70_000, OrderStatus::Delivered, FinancialStatus::Paid);
        o.customer_id = 2;
        store.add_order(o);
        store.fail_writes_for(1);

        let service = AccrualService::new(store.clone());
        let result = service.recompute_organization(1).await.unwrap();
        assert_eq!(result.processed, 2);
        assert_eq!(result.failed, 1);
        assert_eq!(result.updated, 1);
        assert_eq!(store.customer(2).unwrap().loyalty_points, 700);
    }

    #[tokio::test]
    async fn test_unreachable_store_propagates() {
        let store = seeded();
        store.set_unavailable(true);
        let service = AccrualService::new(store);
        assert!(service.recompute_organization(1).await.is_err());
    }
}
