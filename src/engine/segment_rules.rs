use crate::entities::customer_entity as customers;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MetricField {
    RecencyDays,
    Frequency,
    Monetary,
    RScore,
    FScore,
    MScore,
    EngagementScore,
    ChurnRisk,
    LifetimeValue,
    LoyaltyPoints,
    TierRank,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Comparison {
    Gt,
    Gte,
    Lt,
    Lte,
    Eq,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SegmentCondition {
    pub field: MetricField,
    pub op: Comparison,
    pub value: f64,
}

/// All conditions must hold. An empty rule matches every customer.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct SegmentRule {
    #[serde(default)]
    pub all: Vec<SegmentCondition>,
}

impl MetricField {
    /// `None` when the customer has no value yet (no orders, never scored).
    pub fn read(self, customer: &customers::Model) -> Option<f64> {
        match self {
            MetricField::RecencyDays => customer.recency_days.map(f64::from),
            MetricField::Frequency => Some(f64::from(customer.order_count)),
            MetricField::Monetary => Some(customer.total_spent as f64),
            MetricField::RScore => customer.r_score.map(f64::from),
            MetricField::FScore => customer.f_score.map(f64::from),
            MetricField::MScore => customer.m_score.map(f64::from),
            MetricField::EngagementScore => Some(customer.engagement_score),
            MetricField::ChurnRisk => Some(customer.churn_risk),
            MetricField::LifetimeValue => Some(customer.lifetime_value as f64),
            MetricField::LoyaltyPoints => Some(customer.loyalty_points as f64),
            MetricField::TierRank => Some(f64::from(customer.loyalty_tier.rank())),
        }
    }
}

impl SegmentCondition {
    pub fn new(field: MetricField, op: Comparison, value: f64) -> Self {
        Self { field, op, value }
    }

    pub fn matches(&self, customer: &customers::Model) -> bool {
        let Some(actual) = self.field.read(customer) else {
            return false;
        };
        match self.op {
            Comparison::Gt => actual > self.value,
            Comparison::Gte => actual >= self.value,
            Comparison::Lt => actual < self.value,
            Comparison::Lte => actual <= self.value,
            Comparison::Eq => (actual - self.value).abs() < f64::EPSILON,
        }
    }
}

impl SegmentRule {
    pub fn new(all: Vec<SegmentCondition>) -> Self {
        Self { all }
    }

    pub fn matches(&self, customer: &customers::Model) -> bool {
        self.all.iter().all(|c| c.matches(customer))
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value.clone())
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}
