use super::segment_rules::{Comparison as Op, MetricField as F, SegmentCondition, SegmentRule};

pub const CUSTOM_SEGMENT_TYPE: &str = "custom";

/// One entry of the fixed smart-segment catalog.
#[derive(Debug, Clone)]
pub struct SegmentTemplate {
    pub segment_type: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub rule: SegmentRule,
}

fn template(
    segment_type: &'static str,
    name: &'static str,
    description: &'static str,
    conditions: Vec<SegmentCondition>,
) -> SegmentTemplate {
    SegmentTemplate {
        segment_type,
        name,
        description,
        rule: SegmentRule::new(conditions),
    }
}

pub fn segment_templates() -> Vec<SegmentTemplate> {
    vec![
        template(
            "champions",
            "Champions",
            "Bought recently, buy often and spend the most",
            vec![
                SegmentCondition::new(F::RScore, Op::Gte, 4.0),
                SegmentCondition::new(F::FScore, Op::Gte, 4.0),
                SegmentCondition::new(F::MScore, Op::Gte, 4.0),
            ],
        ),
        template(
            "loyal_customers",
            "Loyal Customers",
            "Order regularly and are still active",
            vec![
                SegmentCondition::new(F::FScore, Op::Gte, 4.0),
                SegmentCondition::new(F::RScore, Op::Gte, 3.0),
            ],
        ),
        template(
            "new_customers",
            "New Customers",
            "First purchase within the last 30 days",
            vec![
                SegmentCondition::new(F::Frequency, Op::Eq, 1.0),
                SegmentCondition::new(F::RecencyDays, Op::Lte, 30.0),
            ],
        ),
        template(
            "at_risk",
            "At Risk",
            "Repeat buyers whose purchase rhythm has stalled",
            vec![
                SegmentCondition::new(F::Frequency, Op::Gte, 2.0),
                SegmentCondition::new(F::ChurnRisk, Op::Gte, 60.0),
            ],
        ),
        template(
            "hibernating",
            "Hibernating",
            "No purchase in over six months",
            vec![SegmentCondition::new(F::RecencyDays, Op::Gt, 180.0)],
        ),
        template(
            "high_value",
            "High Value",
            "Enhanced lifetime value of $1,000 or more",
            vec![SegmentCondition::new(F::LifetimeValue, Op::Gte, 100_000.0)],
        ),
        template(
            "vip_tier",
            "VIP Tier Members",
            "Loyalty members at PLATINUM or above",
            vec![SegmentCondition::new(F::TierRank, Op::Gte, 3.0)],
        ),
    ]
}

pub fn find_segment_template(segment_type: &str) -> Option<SegmentTemplate> {
    segment_templates()
        .into_iter()
        .find(|t| t.segment_type == segment_type)
}
