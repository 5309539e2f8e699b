use crate::entities::segment_entity as segments;
use chrono::{DateTime, Utc};
use serde_json::{Value, json};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanTemplate {
    pub key: &'static str,
    pub title: &'static str,
    pub priority: &'static str,
    pub channel: &'static str,
    pub offer: &'static str,
    pub actions: &'static [&'static str],
}

const PLAN_TEMPLATES: &[(&str, PlanTemplate)] = &[
    (
        "champions",
        PlanTemplate {
            key: "vip_appreciation",
            title: "Reward and retain champions",
            priority: "high",
            channel: "email",
            offer: "Early access to new products",
            actions: &[
                "Send a personal thank-you message",
                "Invite to the referral program",
                "Ask for a product review",
            ],
        },
    ),
    (
        "loyal_customers",
        PlanTemplate {
            key: "loyalty_bonus",
            title: "Grow share of wallet with loyal customers",
            priority: "medium",
            channel: "email",
            offer: "Double points weekend",
            actions: &[
                "Promote complementary products",
                "Highlight the next tier and its benefits",
            ],
        },
    ),
    (
        "new_customers",
        PlanTemplate {
            key: "onboarding_series",
            title: "Turn first-time buyers into repeat buyers",
            priority: "medium",
            channel: "email",
            offer: "10% off the second order",
            actions: &[
                "Start the welcome series",
                "Explain how loyalty points work",
            ],
        },
    ),
    (
        "at_risk",
        PlanTemplate {
            key: "win_back_campaign",
            title: "Win back customers at risk of churning",
            priority: "high",
            channel: "sms",
            offer: "Time-limited 15% comeback discount",
            actions: &[
                "Send a we-miss-you message",
                "Remind them of unused points",
                "Follow up by email after 7 days",
            ],
        },
    ),
    (
        "hibernating",
        PlanTemplate {
            key: "reactivation_offer",
            title: "Reactivate hibernating customers",
            priority: "low",
            channel: "email",
            offer: "Free shipping on the next order",
            actions: &[
                "Share what is new since their last visit",
                "Suppress from campaigns if there is no response",
            ],
        },
    ),
    (
        "high_value",
        PlanTemplate {
            key: "exclusive_access",
            title: "Protect high lifetime value customers",
            priority: "high",
            channel: "email",
            offer: "Invitation to an exclusive event",
            actions: &[
                "Assign a dedicated contact",
                "Offer a concierge service",
            ],
        },
    ),
    (
        "vip_tier",
        PlanTemplate {
            key: "tier_perks_reminder",
            title: "Make sure VIP members use their tier perks",
            priority: "medium",
            channel: "email",
            offer: "Bonus points on the next purchase",
            actions: &[
                "Recap tier benefits",
                "Show progress toward the next tier",
            ],
        },
    ),
];

const TARGETED_CAMPAIGN: PlanTemplate = PlanTemplate {
    key: "targeted_campaign",
    title: "Targeted campaign for a custom segment",
    priority: "medium",
    channel: "email",
    offer: "Segment-specific promotion",
    actions: &[
        "Review the segment definition",
        "Draft a campaign for this audience",
    ],
};

/// Catalog segments have dedicated plans; anything else gets a generic one.
pub fn plan_template_for(segment_type: &str) -> &'static PlanTemplate {
    PLAN_TEMPLATES
        .iter()
        .find(|(t, _)| *t == segment_type)
        .map(|(_, plan)| plan)
        .unwrap_or(&TARGETED_CAMPAIGN)
}

pub fn plan_key(organization_id: i64, template: &PlanTemplate, segment_id: i64) -> String {
    format!("{organization_id}:{}:{segment_id}", template.key)
}

pub fn plan_title(template: &PlanTemplate, segment: &segments::Model) -> String {
    format!("{} ({})", template.title, segment.name)
}

/// Recommendation payload derived from the current segment state.
pub fn build_recommendations(
    template: &PlanTemplate,
    segment: &segments::Model,
    now: DateTime<Utc>,
) -> Value {
    json!({
        "segment_id": segment.id,
        "segment_name": segment.name,
        "segment_type": segment.segment_type,
        "audience_size": segment.customer_count,
        "channel": template.channel,
        "offer": template.offer,
        "actions": template.actions,
        "segment_evaluated_at": segment.last_evaluated_at,
        "generated_at": now,
    })
}
