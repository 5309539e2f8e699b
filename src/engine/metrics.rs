//! Recency / frequency / monetary metrics and the scores derived from them.

use super::accrual::qualifying_orders;
use crate::entities::order_entity as orders;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Days without a purchase after which a one-time buyer counts as lapsing.
const DEFAULT_EXPECTED_GAP_DAYS: f64 = 90.0;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerMetrics {
    pub total_spent: i64,
    pub order_count: i32,
    pub last_order_at: Option<DateTime<Utc>>,
    pub recency_days: Option<i32>,
    /// RFM scores 1..5; `None` until the customer has a qualifying order.
    pub r_score: Option<i16>,
    pub f_score: Option<i16>,
    pub m_score: Option<i16>,
    pub engagement_score: f64,
    pub churn_risk: f64,
    pub lifetime_value: i64,
}

pub fn recency_score(recency_days: Option<i32>) -> i16 {
    match recency_days {
        Some(d) if d <= 30 => 5,
        Some(d) if d <= 60 => 4,
        Some(d) if d <= 90 => 3,
        Some(d) if d <= 180 => 2,
        _ => 1,
    }
}

pub fn frequency_score(order_count: i32) -> i16 {
    match order_count {
        n if n >= 10 => 5,
        n if n >= 5 => 4,
        n if n >= 3 => 3,
        2 => 2,
        _ => 1,
    }
}

/// `monetary` in cents.
pub fn monetary_score(monetary: i64) -> i16 {
    match monetary {
        m if m >= 100_000 => 5,
        m if m >= 50_000 => 4,
        m if m >= 20_000 => 3,
        m if m >= 5_000 => 2,
        _ => 1,
    }
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Recomputes every derived metric from the order history as of `now`.
pub fn compute_metrics(history: &[orders::Model], now: DateTime<Utc>) -> CustomerMetrics {
    let qualifying: Vec<&orders::Model> = qualifying_orders(history).collect();
    let order_count = qualifying.len() as i32;
    let total_spent: i64 = qualifying.iter().map(|o| o.total_amount.max(0)).sum();

    let first_order_at = qualifying.iter().map(|o| o.created_at).min();
    let last_order_at = qualifying.iter().map(|o| o.created_at).max();
    let recency_days = last_order_at.map(|t| (now - t).num_days().max(0) as i32);

    if order_count == 0 {
        return CustomerMetrics {
            total_spent,
            order_count,
            last_order_at,
            recency_days,
            r_score: None,
            f_score: None,
            m_score: None,
            engagement_score: 0.0,
            churn_risk: 0.0,
            lifetime_value: 0,
        };
    }

    let r_score = recency_score(recency_days);
    let f_score = frequency_score(order_count);
    let m_score = monetary_score(total_spent);

    // 0-100, recency weighted highest
    let engagement_score = round1(
        f64::from(r_score - 1) / 4.0 * 40.0
            + f64::from(f_score - 1) / 4.0 * 35.0
            + f64::from(m_score - 1) / 4.0 * 25.0,
    );

    // recency measured against the customer's own purchase rhythm
    let span_days = match (first_order_at, last_order_at) {
        (Some(first), Some(last)) => (last - first).num_days().max(0) as f64,
        _ => 0.0,
    };
    let expected_gap = if order_count >= 2 {
        (span_days / f64::from(order_count - 1)).max(1.0)
    } else {
        DEFAULT_EXPECTED_GAP_DAYS
    };
    let ratio = f64::from(recency_days.unwrap_or(0)) / expected_gap;
    let churn_risk = round1((ratio / 3.0 * 100.0).clamp(0.0, 100.0));

    // historical spend plus one year of projected spend, discounted by churn risk
    let tenure_days = first_order_at
        .map(|first| (now - first).num_days().max(30) as f64)
        .unwrap_or(30.0);
    let average_order = total_spent as f64 / f64::from(order_count);
    let annual_orders = f64::from(order_count) * 365.0 / tenure_days;
    let projected = average_order * annual_orders * (1.0 - churn_risk / 100.0);
    let lifetime_value = total_spent + projected.round() as i64;

    CustomerMetrics {
        total_spent,
        order_count,
        last_order_at,
        recency_days,
        r_score: Some(r_score),
        f_score: Some(f_score),
        m_score: Some(m_score),
        engagement_score,
        churn_risk,
        lifetime_value,
    }
}
