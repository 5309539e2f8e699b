use crate::entities::order_entity as orders;

/// An order counts toward points when payment completed (paid, or a completed
/// fulfilment status) and it has not been refunded in whole or in part.
pub fn is_qualifying(order: &orders::Model) -> bool {
    let settled = order.financial_status == crate::entities::FinancialStatus::Paid
        || order.status.is_completed();
    settled && !order.financial_status.is_refunded()
}

/// One point per whole currency unit, floored. Non-positive totals earn nothing.
pub fn points_for_amount(total_cents: i64) -> i64 {
    if total_cents <= 0 {
        return 0;
    }
    total_cents / 100
}

pub fn qualifying_orders(orders: &[orders::Model]) -> impl Iterator<Item = &orders::Model> {
    orders.iter().filter(|o| is_qualifying(o))
}

/// Lifetime points recomputed from the full order history.
pub fn lifetime_points(orders: &[orders::Model]) -> i64 {
    qualifying_orders(orders)
        .map(|o| points_for_amount(o.total_amount))
        .sum()
}
