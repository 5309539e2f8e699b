pub mod accrual_service;
pub mod action_plan_service;
pub mod loyalty_service;
pub mod reward_service;
pub mod segmentation_service;
pub mod tier_service;

pub use accrual_service::*;
pub use action_plan_service::*;
pub use loyalty_service::*;
pub use reward_service::*;
pub use segmentation_service::*;
pub use tier_service::*;

use crate::config::LoyaltyConfig;
use crate::store::SharedStore;

/// Every service wired to one store, built once at startup.
#[derive(Clone)]
pub struct AppServices {
    pub tiers: TierService,
    pub accrual: AccrualService,
    pub rewards: RewardService,
    pub segmentation: SegmentationService,
    pub action_plans: ActionPlanService,
    pub loyalty: LoyaltyService,
}

impl AppServices {
    pub fn new(store: SharedStore, loyalty_config: LoyaltyConfig) -> Self {
        let tiers = TierService::new(store.clone());
        let accrual = AccrualService::new(store.clone());
        let rewards = RewardService::new(store.clone(), loyalty_config);
        let segmentation = SegmentationService::new(store.clone());
        let action_plans = ActionPlanService::new(store.clone());
        let loyalty = LoyaltyService::new(
            store,
            tiers.clone(),
            accrual.clone(),
            rewards.clone(),
            segmentation.clone(),
            action_plans.clone(),
        );
        Self {
            tiers,
            accrual,
            rewards,
            segmentation,
            action_plans,
            loyalty,
        }
    }
}
