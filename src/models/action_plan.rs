use crate::entities::{ActionPlanStatus, action_plan_entity as plans};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActionPlanResponse {
    pub id: i64,
    pub plan_key: String,
    pub template: String,
    pub segment_id: i64,
    pub title: String,
    pub priority: String,
    #[schema(value_type = Object)]
    pub recommendations: Value,
    pub target_count: i64,
    pub status: ActionPlanStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<plans::Model> for ActionPlanResponse {
    fn from(p: plans::Model) -> Self {
        Self {
            id: p.id,
            plan_key: p.plan_key,
            template: p.template,
            segment_id: p.segment_id,
            title: p.title,
            priority: p.priority,
            recommendations: p.recommendations,
            target_count: p.target_count,
            status: p.status,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}
