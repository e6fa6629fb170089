use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use shared::*;
use uuid::Uuid;

/// Persistence backend for the five bakery tables.
///
/// Every method is one atomic unit: either all of its writes become visible
/// or none do. Callers supply ids and timestamps so that backends stay free of
/// clocks and id generation.
#[async_trait]
pub trait Store: Send + Sync {
    async fn user_count(&self) -> BakeryResult<i64>;
    /// Fails with `DuplicateUsername` when the username is taken.
    async fn insert_user(&self, user: &User) -> BakeryResult<()>;
    async fn find_user_by_username(&self, username: &str) -> BakeryResult<Option<User>>;
    async fn get_user(&self, id: Uuid) -> BakeryResult<Option<User>>;
    /// Returns false when no such user existed.
    async fn set_user_status(&self, id: Uuid, status: AccountStatus) -> BakeryResult<bool>;
    /// Ordered by name.
    async fn list_users_by_role(&self, role: Role) -> BakeryResult<Vec<User>>;

    /// Ordered by name, then id.
    async fn list_cakes(&self, filter: &CakeFilter) -> BakeryResult<Vec<Cake>>;
    async fn get_cake(&self, id: Uuid) -> BakeryResult<Option<Cake>>;
    async fn insert_cake(&self, cake: &Cake) -> BakeryResult<()>;
    /// Returns false when no such cake existed.
    async fn delete_cake(&self, id: Uuid) -> BakeryResult<bool>;
    /// Guarded decrement: never drives stock below zero.
    async fn decrement_stock(&self, id: Uuid, amount: i32) -> BakeryResult<Cake>;

    /// Decrements the cake's stock by `order.quantity`, inserts the order and
    /// its initial history record. Fails with `InsufficientStock` or
    /// `NotFound` without writing anything.
    async fn place_order(&self, order: &Order, initial: &StatusHistoryRecord) -> BakeryResult<()>;
    async fn get_order(&self, id: Uuid) -> BakeryResult<Option<Order>>;
    /// Newest first.
    async fn list_orders(&self, query: &OrderQuery) -> BakeryResult<Vec<Order>>;
    /// Orders created on calendar days `start..=end` (UTC), oldest first.
    async fn orders_between(&self, start: NaiveDate, end: NaiveDate) -> BakeryResult<Vec<Order>>;
    /// Compare-and-set on the order status: moves the order from `expected`
    /// to `record.status` and appends `record`. Fails with
    /// `InvalidTransition` if the order is no longer in `expected`.
    async fn transition_order(
        &self,
        expected: OrderStatus,
        record: &StatusHistoryRecord,
    ) -> BakeryResult<Order>;
    /// Oldest first.
    async fn order_history(&self, order_id: Uuid) -> BakeryResult<Vec<StatusHistoryRecord>>;

    /// Ordered by (category, item name).
    async fn list_inventory(&self) -> BakeryResult<Vec<InventoryItem>>;
    async fn low_stock(&self) -> BakeryResult<Vec<InventoryItem>>;
    async fn insert_inventory_item(&self, item: &InventoryItem) -> BakeryResult<()>;
    async fn set_inventory_quantity(
        &self,
        id: Uuid,
        quantity: f64,
        at: DateTime<Utc>,
    ) -> BakeryResult<InventoryItem>;
}

/// Half-open UTC instant bounds `[start 00:00, end+1 00:00)` for an inclusive day range.
pub fn day_bounds(start: NaiveDate, end: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let lower = start.and_time(NaiveTime::MIN).and_utc();
    let upper = (end + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();
    (lower, upper)
}

pub(crate) fn insufficient_stock(requested: i32, cake: &Cake) -> BakeryError {
    BakeryError::InsufficientStock {
        requested,
        available: cake.stock,
    }
}
