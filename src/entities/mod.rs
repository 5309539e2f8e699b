pub mod action_plans;
pub mod customers;
pub mod loyalty_tiers;
pub mod orders;
pub mod organizations;
pub mod reward_redemptions;
pub mod segment_members;
pub mod segments;

pub use action_plans as action_plan_entity;
pub use customers as customer_entity;
pub use loyalty_tiers as loyalty_tier_entity;
pub use orders as order_entity;
pub use organizations as organization_entity;
pub use reward_redemptions as reward_redemption_entity;
pub use segment_members as segment_member_entity;
pub use segments as segment_entity;

pub use action_plans::ActionPlanStatus;
pub use customers::LoyaltyTierLevel;
pub use orders::{FinancialStatus, OrderStatus};
pub use reward_redemptions::{RewardStatus, RewardType};
