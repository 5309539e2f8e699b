use crate::entities::segment_entity as segments;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// 自定义分群：提供 conditions 为智能分群，否则按 customer_ids 建静态分群
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateSegmentRequest {
    pub name: String,
    pub description: Option<String>,
    /// `{"all": [{"field": "churn_risk", "op": "gte", "value": 60}]}`
    #[schema(value_type = Option<Object>)]
    pub conditions: Option<Value>,
    pub customer_ids: Option<Vec<i64>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SegmentResponse {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub segment_type: String,
    pub is_smart: bool,
    pub auto_update: bool,
    #[schema(value_type = Option<Object>)]
    pub conditions: Option<Value>,
    pub customer_count: i64,
    pub last_evaluated_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<segments::Model> for SegmentResponse {
    fn from(s: segments::Model) -> Self {
        Self {
            id: s.id,
            name: s.name,
            description: s.description,
            segment_type: s.segment_type,
            is_smart: s.is_smart,
            auto_update: s.auto_update,
            conditions: s.conditions,
            customer_count: s.customer_count,
            last_evaluated_at: s.last_evaluated_at,
            created_at: s.created_at,
        }
    }
}
