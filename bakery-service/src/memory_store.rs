use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use shared::*;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::store::{insufficient_stock, Store};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    cakes: Vec<Cake>,
    orders: Vec<Order>,
    history: Vec<StatusHistoryRecord>,
    inventory: Vec<InventoryItem>,
}

/// Process-local store. One lock guards every table, so each method runs as
/// a single atomic unit against all of them.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn order_not_found(id: Uuid) -> BakeryError {
    BakeryError::not_found("Order", id)
}

#[async_trait]
impl Store for MemoryStore {
    async fn user_count(&self) -> BakeryResult<i64> {
        Ok(self.tables.lock().await.users.len() as i64)
    }

    async fn insert_user(&self, user: &User) -> BakeryResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|u| u.username == user.username) {
            return Err(BakeryError::DuplicateUsername(user.username.clone()));
        }
        tables.users.push(user.clone());
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> BakeryResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn get_user(&self, id: Uuid) -> BakeryResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn set_user_status(&self, id: Uuid, status: AccountStatus) -> BakeryResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables.users.iter_mut().find(|u| u.id == id) {
            Some(user) => {
                user.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn list_users_by_role(&self, role: Role) -> BakeryResult<Vec<User>> {
        let tables = self.tables.lock().await;
        let mut users: Vec<User> = tables.users.iter().filter(|u| u.role == role).cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(users)
    }

    async fn list_cakes(&self, filter: &CakeFilter) -> BakeryResult<Vec<Cake>> {
        let tables = self.tables.lock().await;
        let mut cakes: Vec<Cake> = tables.cakes.iter().filter(|c| filter.matches(c)).cloned().collect();
        cakes.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(cakes)
    }

    async fn get_cake(&self, id: Uuid) -> BakeryResult<Option<Cake>> {
        let tables = self.tables.lock().await;
        Ok(tables.cakes.iter().find(|c| c.id == id).cloned())
    }

    async fn insert_cake(&self, cake: &Cake) -> BakeryResult<()> {
        self.tables.lock().await.cakes.push(cake.clone());
        Ok(())
    }

    async fn delete_cake(&self, id: Uuid) -> BakeryResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.cakes.len();
        tables.cakes.retain(|c| c.id != id);
        Ok(tables.cakes.len() != before)
    }

    async fn decrement_stock(&self, id: Uuid, amount: i32) -> BakeryResult<Cake> {
        let mut tables = self.tables.lock().await;
        let cake = tables
            .cakes
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| BakeryError::not_found("Cake", id))?;
        if cake.stock < amount {
            return Err(insufficient_stock(amount, cake));
        }
        cake.stock -= amount;
        Ok(cake.clone())
    }

    async fn place_order(&self, order: &Order, initial: &StatusHistoryRecord) -> BakeryResult<()> {
        let mut tables = self.tables.lock().await;
        let cake = tables
            .cakes
            .iter_mut()
            .find(|c| c.id == order.cake_id)
            .ok_or_else(|| BakeryError::not_found("Cake", order.cake_id))?;
        if cake.stock < order.quantity {
            return Err(insufficient_stock(order.quantity, cake));
        }
        cake.stock -= order.quantity;
        tables.orders.push(order.clone());
        tables.history.push(initial.clone());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> BakeryResult<Option<Order>> {
        let tables = self.tables.lock().await;
        Ok(tables.orders.iter().find(|o| o.id == id).cloned())
    }

    async fn list_orders(&self, query: &OrderQuery) -> BakeryResult<Vec<Order>> {
        let tables = self.tables.lock().await;
        // Walking the table backwards keeps equal timestamps newest-inserted first.
        let mut orders: Vec<Order> = tables
            .orders
            .iter()
            .rev()
            .filter(|o| query.matches(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn orders_between(&self, start: NaiveDate, end: NaiveDate) -> BakeryResult<Vec<Order>> {
        let tables = self.tables.lock().await;
        let mut orders: Vec<Order> = tables
            .orders
            .iter()
            .filter(|o| {
                let day = o.created_at.date_naive();
                start <= day && day <= end
            })
            .cloned()
            .collect();
        orders.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(orders)
    }

    async fn transition_order(
        &self,
        expected: OrderStatus,
        record: &StatusHistoryRecord,
    ) -> BakeryResult<Order> {
        let mut tables = self.tables.lock().await;
        let order = tables
            .orders
            .iter_mut()
            .find(|o| o.id == record.order_id)
            .ok_or_else(|| order_not_found(record.order_id))?;
        if order.status != expected {
            return Err(BakeryError::invalid_transition(format!(
                "order {} is {}, not {}",
                order.id, order.status, expected
            )));
        }
        order.status = record.status;
        let updated = order.clone();
        tables.history.push(record.clone());
        Ok(updated)
    }

    async fn order_history(&self, order_id: Uuid) -> BakeryResult<Vec<StatusHistoryRecord>> {
        let tables = self.tables.lock().await;
        let mut history: Vec<StatusHistoryRecord> = tables
            .history
            .iter()
            .filter(|r| r.order_id == order_id)
            .cloned()
            .collect();
        // Stable sort: equal timestamps keep insertion order.
        history.sort_by(|a, b| a.changed_at.cmp(&b.changed_at));
        Ok(history)
    }

    async fn list_inventory(&self) -> BakeryResult<Vec<InventoryItem>> {
        let tables = self.tables.lock().await;
        let mut items = tables.inventory.clone();
        items.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then_with(|| a.item_name.cmp(&b.item_name))
        });
        Ok(items)
    }

    async fn low_stock(&self) -> BakeryResult<Vec<InventoryItem>> {
        Ok(self
            .list_inventory()
            .await?
            .into_iter()
            .filter(InventoryItem::is_low_stock)
            .collect())
    }

    async fn insert_inventory_item(&self, item: &InventoryItem) -> BakeryResult<()> {
        self.tables.lock().await.inventory.push(item.clone());
        Ok(())
    }

    async fn set_inventory_quantity(
        &self,
        id: Uuid,
        quantity: f64,
        at: DateTime<Utc>,
    ) -> BakeryResult<InventoryItem> {
        let mut tables = self.tables.lock().await;
        let item = tables
            .inventory
            .iter_mut()
            .find(|i| i.id == id)
            .ok_or_else(|| BakeryError::not_found("Inventory item", id))?;
        item.quantity = quantity;
        item.last_updated = at;
        Ok(item.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bigdecimal::BigDecimal;

    fn cake(stock: i32) -> Cake {
        Cake {
            id: Uuid::new_v4(),
            name: "Chocolate Birthday Cake".to_string(),
            flavor: "chocolate".to_string(),
            size: "medium".to_string(),
            price: "35.00".parse().unwrap(),
            stock,
            category: "birthday".to_string(),
            description: String::new(),
            created_at: Utc::now(),
        }
    }

    fn pending_order(cake_id: Uuid, quantity: i32) -> (Order, StatusHistoryRecord) {
        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            customer_id: None,
            customer_name: "Walk-in".to_string(),
            cake_id,
            quantity,
            total_price: BigDecimal::from(35 * quantity),
            status: OrderStatus::Pending,
            created_at: now,
            delivery_date: None,
            special_instructions: None,
            delivery_type: DeliveryType::Pickup,
            address: None,
            phone: None,
            email: None,
        };
        let record = StatusHistoryRecord {
            id: Uuid::new_v4(),
            order_id: order.id,
            status: OrderStatus::Pending,
            changed_at: now,
            note: None,
        };
        (order, record)
    }

    #[tokio::test]
    async fn test_decrement_stock_is_guarded() {
        let store = MemoryStore::new();
        let cake = cake(3);
        store.insert_cake(&cake).await.unwrap();

        let updated = store.decrement_stock(cake.id, 2).await.unwrap();
        assert_eq!(updated.stock, 1);

        let err = store.decrement_stock(cake.id, 2).await.unwrap_err();
        assert!(matches!(
            err,
            BakeryError::InsufficientStock { requested: 2, available: 1 }
        ));
        assert_eq!(store.get_cake(cake.id).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_place_order_writes_nothing_when_stock_is_short() {
        let store = MemoryStore::new();
        let cake = cake(1);
        store.insert_cake(&cake).await.unwrap();

        let (order, record) = pending_order(cake.id, 2);
        assert!(store.place_order(&order, &record).await.is_err());
        assert!(store.get_order(order.id).await.unwrap().is_none());
        assert!(store.order_history(order.id).await.unwrap().is_empty());
        assert_eq!(store.get_cake(cake.id).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_transition_is_compare_and_set() {
        let store = MemoryStore::new();
        let cake = cake(5);
        store.insert_cake(&cake).await.unwrap();
        let (order, record) = pending_order(cake.id, 1);
        store.place_order(&order, &record).await.unwrap();

        let to_ready = StatusHistoryRecord {
            id: Uuid::new_v4(),
            order_id: order.id,
            status: OrderStatus::Ready,
            changed_at: Utc::now(),
            note: None,
        };
        let err = store
            .transition_order(OrderStatus::Preparing, &to_ready)
            .await
            .unwrap_err();
        assert!(matches!(err, BakeryError::InvalidTransition(_)));
        assert_eq!(store.order_history(order.id).await.unwrap().len(), 1);

        let updated = store
            .transition_order(OrderStatus::Pending, &to_ready)
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Ready);
        assert_eq!(store.order_history(order.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_history_with_equal_timestamps_keeps_write_order() {
        let store = MemoryStore::new();
        let cake = cake(5);
        store.insert_cake(&cake).await.unwrap();
        let (order, record) = pending_order(cake.id, 1);
        store.place_order(&order, &record).await.unwrap();

        let mut expected = OrderStatus::Pending;
        for status in [OrderStatus::Preparing, OrderStatus::Ready, OrderStatus::Preparing] {
            let next = StatusHistoryRecord {
                id: Uuid::new_v4(),
                order_id: order.id,
                status,
                changed_at: record.changed_at,
                note: None,
            };
            store.transition_order(expected, &next).await.unwrap();
            expected = status;
        }

        let statuses: Vec<OrderStatus> = store
            .order_history(order.id)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.status)
            .collect();
        assert_eq!(
            statuses,
            vec![
                OrderStatus::Pending,
                OrderStatus::Preparing,
                OrderStatus::Ready,
                OrderStatus::Preparing,
            ]
        );
        let current = store.get_order(order.id).await.unwrap().unwrap();
        assert_eq!(statuses.last(), Some(&current.status));
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let store = MemoryStore::new();
        let user = User {
            id: Uuid::new_v4(),
            username: "customer1".to_string(),
            password_hash: "x".to_string(),
            role: Role::Customer,
            name: "Alice Johnson".to_string(),
            email: "alice@example.com".to_string(),
            phone: None,
            status: AccountStatus::Active,
            created_at: Utc::now(),
        };
        store.insert_user(&user).await.unwrap();

        let again = User {
            id: Uuid::new_v4(),
            ..user
        };
        assert!(matches!(
            store.insert_user(&again).await,
            Err(BakeryError::DuplicateUsername(_))
        ));
        assert_eq!(store.user_count().await.unwrap(), 1);
    }
}
