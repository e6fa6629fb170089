use bigdecimal::BigDecimal;
use num_traits::Zero;
use shared::{DateRange, Order, PopularItem, ReportSummary};
use std::collections::HashMap;
use uuid::Uuid;

const UNKNOWN_CAKE: &str = "Unknown";

/// Aggregates the orders created on a day inside `range`.
///
/// `cake_names` resolves cake ids to display names; orders whose cake has
/// since been deleted are grouped under "Unknown" per cake id.
pub fn summarize(
    range: DateRange,
    orders: &[Order],
    cake_names: &HashMap<Uuid, String>,
) -> ReportSummary {
    let mut summary = ReportSummary::empty(range.clone());
    let mut positions: HashMap<Uuid, usize> = HashMap::new();

    for order in orders
        .iter()
        .filter(|o| range.contains(o.created_at.date_naive()))
    {
        summary.total_orders += 1;
        summary.total_revenue += &order.total_price;
        *summary.status_counts.entry(order.status).or_insert(0) += 1;

        let index = *positions.entry(order.cake_id).or_insert_with(|| {
            summary.popular_items.push(PopularItem {
                cake_id: order.cake_id,
                name: cake_names
                    .get(&order.cake_id)
                    .cloned()
                    .unwrap_or_else(|| UNKNOWN_CAKE.to_string()),
                quantity: 0,
                revenue: BigDecimal::zero(),
            });
            summary.popular_items.len() - 1
        });
        let item = &mut summary.popular_items[index];
        item.quantity += i64::from(order.quantity);
        item.revenue += &order.total_price;
    }

    // Stable sort keeps first-seen order between equal revenues.
    summary
        .popular_items
        .sort_by(|a, b| b.revenue.cmp(&a.revenue));

    if summary.total_orders > 0 {
        let count = BigDecimal::from(summary.total_orders as u64);
        summary.avg_order_value = (summary.total_revenue.clone() / count).round(2);
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone, Utc};
    use shared::{DeliveryType, OrderStatus};

    fn order_on(day: u32, month: u32, cake_id: Uuid, total: i64, status: OrderStatus) -> Order {
        Order {
            id: Uuid::new_v4(),
            customer_id: None,
            customer_name: "Walk-in".to_string(),
            cake_id,
            quantity: 1,
            total_price: BigDecimal::from(total),
            status,
            created_at: Utc.with_ymd_and_hms(2024, month, day, 12, 0, 0).unwrap(),
            delivery_date: None,
            special_instructions: None,
            delivery_type: DeliveryType::Pickup,
            address: None,
            phone: None,
            email: None,
        }
    }

    fn january() -> DateRange {
        DateRange::parse("2024-01-01", "2024-01-31").unwrap()
    }

    #[test]
    fn test_totals_and_average_within_window() {
        let cake = Uuid::new_v4();
        let names = HashMap::from([(cake, "Carrot Cake".to_string())]);
        let orders = vec![
            order_on(2, 1, cake, 10, OrderStatus::Pending),
            order_on(15, 1, cake, 20, OrderStatus::Completed),
            order_on(31, 1, cake, 30, OrderStatus::Completed),
            order_on(1, 2, cake, 40, OrderStatus::Completed),
        ];

        let summary = summarize(january(), &orders, &names);
        assert_eq!(summary.total_orders, 3);
        assert_eq!(summary.total_revenue, BigDecimal::from(60));
        assert_eq!(summary.avg_order_value, BigDecimal::from(20));
        assert_eq!(summary.status_counts.get(&OrderStatus::Completed), Some(&2));
        assert_eq!(summary.status_counts.get(&OrderStatus::Pending), Some(&1));
        assert_eq!(summary.status_counts.get(&OrderStatus::Cancelled), None);
    }

    #[test]
    fn test_no_orders_means_zero_average() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let summary = summarize(DateRange::new(day, day).unwrap(), &[], &HashMap::new());
        assert_eq!(summary.total_orders, 0);
        assert!(summary.total_revenue.is_zero());
        assert!(summary.avg_order_value.is_zero());
        assert!(summary.popular_items.is_empty());
    }

    #[test]
    fn test_popular_items_rank_by_revenue_with_stable_ties() {
        let lemon = Uuid::new_v4();
        let carrot = Uuid::new_v4();
        let wedding = Uuid::new_v4();
        let names = HashMap::from([
            (lemon, "Lemon Drizzle Cake".to_string()),
            (carrot, "Carrot Cake".to_string()),
            (wedding, "Vanilla Wedding Cake".to_string()),
        ]);
        let orders = vec![
            order_on(3, 1, lemon, 25, OrderStatus::Completed),
            order_on(4, 1, carrot, 25, OrderStatus::Completed),
            order_on(5, 1, wedding, 120, OrderStatus::Completed),
        ];

        let summary = summarize(january(), &orders, &names);
        let ranked: Vec<&str> = summary.popular_items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(ranked, ["Vanilla Wedding Cake", "Lemon Drizzle Cake", "Carrot Cake"]);
    }

    #[test]
    fn test_deleted_cake_is_reported_as_unknown() {
        let gone = Uuid::new_v4();
        let orders = vec![
            order_on(3, 1, gone, 35, OrderStatus::Completed),
            order_on(4, 1, gone, 35, OrderStatus::Completed),
        ];

        let summary = summarize(january(), &orders, &HashMap::new());
        assert_eq!(summary.popular_items.len(), 1);
        assert_eq!(summary.popular_items[0].name, "Unknown");
        assert_eq!(summary.popular_items[0].quantity, 2);
        assert_eq!(summary.popular_items[0].revenue, BigDecimal::from(70));
    }

    #[test]
    fn test_average_is_rounded_to_cents() {
        let cake = Uuid::new_v4();
        let orders = vec![
            order_on(2, 1, cake, 10, OrderStatus::Pending),
            order_on(3, 1, cake, 10, OrderStatus::Pending),
            order_on(4, 1, cake, 5, OrderStatus::Pending),
        ];
        let summary = summarize(january(), &orders, &HashMap::new());
        assert_eq!(summary.avg_order_value, "8.33".parse::<BigDecimal>().unwrap());
    }
}
