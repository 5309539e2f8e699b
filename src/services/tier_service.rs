use crate::engine::{TierDefinition, TierTable, default_tiers};
use crate::entities::LoyaltyTierLevel;
use crate::error::AppResult;
use crate::store::{NewLoyaltyTier, SharedStore};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TierTableView {
    pub organization_id: i64,
    pub is_custom: bool,
    pub tiers: Vec<TierDefinition>,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct TierInitResult {
    pub created: usize,
    pub existing: usize,
}

#[derive(Clone)]
pub struct TierService {
    store: SharedStore,
}

impl TierService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Loads the organization's table once; callers reuse it for a whole pass.
    pub async fn load_tier_table(&self, organization_id: i64) -> AppResult<TierTable> {
        let rows = self.store.list_tiers(organization_id).await?;
        Ok(TierTable::from_rows(organization_id, rows))
    }

    pub async fn resolve_tier(
        &self,
        organization_id: i64,
        points: i64,
    ) -> AppResult<LoyaltyTierLevel> {
        Ok(self.load_tier_table(organization_id).await?.resolve(points))
    }

    pub async fn tier_table_view(&self, organization_id: i64) -> AppResult<TierTableView> {
        let table = self.load_tier_table(organization_id).await?;
        Ok(TierTableView {
            organization_id,
            is_custom: table.is_custom(),
            tiers: table.definitions().to_vec(),
        })
    }

    /// Writes the default table as organization rows. Organizations that
    /// already have rows are left alone.
    pub async fn initialize_default_tiers(&self, organization_id: i64) -> AppResult<TierInitResult> {
        let existing = self.store.list_tiers(organization_id).await?;
        if !existing.is_empty() {
            log::info!(
                "Organization {organization_id} already has {} tier rows",
                existing.len()
            );
            return Ok(TierInitResult {
                created: 0,
                existing: existing.len(),
            });
        }

        let mut created = 0;
        for def in default_tiers() {
            self.store
                .insert_tier(NewLoyaltyTier {
                    organization_id,
                    tier: def.tier,
                    min_points: def.min_points,
                    points_per_dollar: def.points_per_dollar,
                    benefits: def.benefits.clone(),
                })
                .await?;
            created += 1;
        }
        log::info!("Initialized {created} default tiers for organization {organization_id}");
        Ok(TierInitResult {
            created,
            existing: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_no_rows_uses_defaults() {
        let service = TierService::new(Arc::new(MemoryStore::new()));
        assert_eq!(
            service.resolve_tier(1, 1600).await.unwrap(),
            LoyaltyTierLevel::Gold
        );
        let view = service.tier_table_view(1).await.unwrap();
        assert!(!view.is_custom);
        assert_eq!(view.tiers.len(), 5);
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let service = TierService::new(store.clone());

        let first = service.initialize_default_tiers(4).await.unwrap();
        assert_eq!(first, TierInitResult { created: 5, existing: 0 });
        let second = service.initialize_default_tiers(4).await.unwrap();
        assert_eq!(second, TierInitResult { created: 0, existing: 5 });

        assert_eq!(store.tier_rows().len(), 5);
        let view = service.tier_table_view(4).await.unwrap();
        assert!(view.is_custom);
        assert_eq!(
            service.resolve_tier(4, 3000).await.unwrap(),
            LoyaltyTierLevel::Platinum
        );
    }
}
