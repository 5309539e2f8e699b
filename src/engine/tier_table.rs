use crate::entities::{LoyaltyTierLevel, loyalty_tier_entity as tiers};
use serde::Serialize;
use std::sync::OnceLock;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct TierDefinition {
    pub tier: LoyaltyTierLevel,
    pub min_points: i64,
    pub points_per_dollar: f64,
    pub benefits: Vec<String>,
}

#[derive(Debug, Error, PartialEq)]
pub enum TierTableError {
    #[error("tier table is empty")]
    Empty,
    #[error("lowest tier must be BRONZE, found {0}")]
    MissingBronze(LoyaltyTierLevel),
    #[error("BRONZE threshold must be 0, found {0}")]
    NonZeroBase(i64),
    #[error("threshold of {tier} ({min_points}) does not increase over the previous tier")]
    NonIncreasingThreshold {
        tier: LoyaltyTierLevel,
        min_points: i64,
    },
    #[error("{tier} is ranked at or below the tier before it")]
    TierOutOfOrder { tier: LoyaltyTierLevel },
}

/// Tier thresholds in effect for one organization, resolved once per invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum TierTable {
    Custom(Vec<TierDefinition>),
    Default,
}

pub fn default_tiers() -> &'static [TierDefinition] {
    static DEFAULTS: OnceLock<Vec<TierDefinition>> = OnceLock::new();
    DEFAULTS.get_or_init(|| {
        let def = |tier, min_points, points_per_dollar: f64, benefits: &[&str]| TierDefinition {
            tier,
            min_points,
            points_per_dollar,
            benefits: benefits.iter().map(|b| b.to_string()).collect(),
        };
        vec![
            def(
                LoyaltyTierLevel::Bronze,
                0,
                1.0,
                &["Earn 1 point per dollar", "Birthday greeting"],
            ),
            def(
                LoyaltyTierLevel::Silver,
                500,
                1.25,
                &["5% member discount", "Early sale access"],
            ),
            def(
                LoyaltyTierLevel::Gold,
                1500,
                1.5,
                &["10% member discount", "Free standard shipping"],
            ),
            def(
                LoyaltyTierLevel::Platinum,
                3000,
                2.0,
                &["15% member discount", "Priority support", "Free express shipping"],
            ),
            def(
                LoyaltyTierLevel::Diamond,
                5000,
                3.0,
                &[
                    "20% member discount",
                    "Dedicated account manager",
                    "Exclusive event invitations",
                ],
            ),
        ]
    })
}

/// Checks ascending order, strictly increasing thresholds and ranks, and a
/// BRONZE base at 0.
pub fn validate_tiers(definitions: &[TierDefinition]) -> Result<(), TierTableError> {
    let first = definitions.first().ok_or(TierTableError::Empty)?;
    if first.tier != LoyaltyTierLevel::Bronze {
        return Err(TierTableError::MissingBronze(first.tier));
    }
    if first.min_points != 0 {
        return Err(TierTableError::NonZeroBase(first.min_points));
    }
    for pair in definitions.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.min_points <= prev.min_points {
            return Err(TierTableError::NonIncreasingThreshold {
                tier: next.tier,
                min_points: next.min_points,
            });
        }
        if next.tier <= prev.tier {
            return Err(TierTableError::TierOutOfOrder { tier: next.tier });
        }
    }
    Ok(())
}

impl TierTable {
    /// Builds the table from an organization's rows. No rows, or a table that
    /// fails validation, yields the default table; tables are never mixed.
    pub fn from_rows(organization_id: i64, rows: Vec<tiers::Model>) -> Self {
        if rows.is_empty() {
            return TierTable::Default;
        }

        let mut definitions: Vec<TierDefinition> = rows
            .into_iter()
            .map(|row| {
                let benefits = serde_json::from_value::<Vec<String>>(row.benefits.clone())
                    .unwrap_or_else(|e| {
                        log::warn!(
                            "Organization {organization_id} tier {} has unreadable benefits: {e}",
                            row.tier
                        );
                        Vec::new()
                    });
                TierDefinition {
                    tier: row.tier,
                    min_points: row.min_points,
                    points_per_dollar: row.points_per_dollar,
                    benefits,
                }
            })
            .collect();
        definitions.sort_by_key(|d| (d.min_points, d.tier));

        match validate_tiers(&definitions) {
            Ok(()) => TierTable::Custom(definitions),
            Err(e) => {
                log::warn!(
                    "Organization {organization_id} has an invalid custom tier table ({e}), falling back to defaults"
                );
                TierTable::Default
            }
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, TierTable::Custom(_))
    }

    /// Definitions in ascending threshold order.
    pub fn definitions(&self) -> &[TierDefinition] {
        match self {
            TierTable::Custom(definitions) => definitions,
            TierTable::Default => default_tiers(),
        }
    }

    pub fn definition(&self, tier: LoyaltyTierLevel) -> Option<&TierDefinition> {
        self.definitions().iter().find(|d| d.tier == tier)
    }

    /// Highest tier whose threshold is at or below `points`.
    pub fn resolve(&self, points: i64) -> LoyaltyTierLevel {
        self.definitions()
            .iter()
            .rev()
            .find(|d| d.min_points <= points)
            .map(|d| d.tier)
            .unwrap_or(LoyaltyTierLevel::Bronze)
    }

    /// The next tier above `points` and how many points are still missing.
    pub fn next_tier(&self, points: i64) -> Option<(&TierDefinition, i64)> {
        self.definitions()
            .iter()
            .find(|d| d.min_points > points)
            .map(|d| (d, d.min_points - points))
    }
}
