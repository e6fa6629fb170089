use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use diesel::expression_methods::PgTextExpressionMethods;
use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::{AsyncConnection, AsyncPgConnection, RunQueryDsl};
use shared::*;
use uuid::Uuid;

use crate::models::*;
use crate::schema::*;
use crate::store::{day_bounds, insufficient_stock, Store};

pub type DbPool = bb8::Pool<AsyncDieselConnectionManager<AsyncPgConnection>>;

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let config = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = bb8::Pool::builder()
            .max_size(max_connections)
            .build(config)
            .await?;
        Ok(Self::new(pool))
    }

    async fn conn(
        &self,
    ) -> BakeryResult<bb8::PooledConnection<'_, AsyncDieselConnectionManager<AsyncPgConnection>>> {
        self.pool
            .get()
            .await
            .map_err(|e| BakeryError::Storage(anyhow::anyhow!("Failed to get connection: {}", e)))
    }
}

/// Escapes LIKE metacharacters so a search term only ever matches literally.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

async fn take_stock(conn: &mut AsyncPgConnection, cake_id: Uuid, amount: i32) -> BakeryResult<DbCake> {
    let updated = diesel::update(
        cakes::table
            .filter(cakes::id.eq(cake_id))
            .filter(cakes::stock.ge(amount)),
    )
    .set(cakes::stock.eq(cakes::stock - amount))
    .get_result::<DbCake>(conn)
    .await
    .optional()?;

    if let Some(cake) = updated {
        return Ok(cake);
    }

    let current = cakes::table
        .find(cake_id)
        .first::<DbCake>(conn)
        .await
        .optional()?;
    Err(match current {
        Some(cake) => insufficient_stock(amount, &Cake::from(cake)),
        None => BakeryError::not_found("Cake", cake_id),
    })
}

fn collect_orders(rows: Vec<DbOrder>) -> BakeryResult<Vec<Order>> {
    rows.into_iter()
        .map(|row| Order::try_from(row).map_err(BakeryError::from))
        .collect()
}

#[async_trait]
impl Store for PgStore {
    async fn user_count(&self) -> BakeryResult<i64> {
        let mut conn = self.conn().await?;
        Ok(users::table.count().get_result::<i64>(&mut conn).await?)
    }

    async fn insert_user(&self, user: &User) -> BakeryResult<()> {
        let mut conn = self.conn().await?;
        diesel::insert_into(users::table)
            .values(&DbUser::from(user))
            .execute(&mut conn)
            .await
            .map_err(|e| match e {
                diesel::result::Error::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    BakeryError::DuplicateUsername(user.username.clone())
                }
                other => BakeryError::from(other),
            })?;
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> BakeryResult<Option<User>> {
        let mut conn = self.conn().await?;
        let row = users::table
            .filter(users::username.eq(username))
            .first::<DbUser>(&mut conn)
            .await
            .optional()?;
        Ok(row.map(User::try_from).transpose()?)
    }

    async fn get_user(&self, id: Uuid) -> BakeryResult<Option<User>> {
        let mut conn = self.conn().await?;
        let row = users::table
            .find(id)
            .first::<DbUser>(&mut conn)
            .await
            .optional()?;
        Ok(row.map(User::try_from).transpose()?)
    }

    async fn set_user_status(&self, id: Uuid, status: AccountStatus) -> BakeryResult<bool> {
        let mut conn = self.conn().await?;
        let updated = diesel::update(users::table.find(id))
            .set(users::status.eq(status.as_str()))
            .execute(&mut conn)
            .await?;
        Ok(updated > 0)
    }

    async fn list_users_by_role(&self, role: Role) -> BakeryResult<Vec<User>> {
        let mut conn = self.conn().await?;
        let rows = users::table
            .filter(users::role.eq(role.as_str()))
            .order(users::name.asc())
            .load::<DbUser>(&mut conn)
            .await?;
        rows.into_iter()
            .map(|row| User::try_from(row).map_err(BakeryError::from))
            .collect()
    }

    async fn list_cakes(&self, filter: &CakeFilter) -> BakeryResult<Vec<Cake>> {
        let mut conn = self.conn().await?;
        let mut query = cakes::table.into_boxed();
        if filter.in_stock_only {
            query = query.filter(cakes::stock.gt(0));
        }
        if let Some(category) = filter.category() {
            query = query.filter(cakes::category.eq(category.to_string()));
        }
        if let Some(term) = filter.search() {
            let pattern = like_pattern(term);
            query = query.filter(
                cakes::name
                    .ilike(pattern.clone())
                    .or(cakes::flavor.ilike(pattern.clone()))
                    .or(cakes::description.ilike(pattern)),
            );
        }
        let rows = query
            .order((cakes::name.asc(), cakes::id.asc()))
            .load::<DbCake>(&mut conn)
            .await?;
        Ok(rows.into_iter().map(Cake::from).collect())
    }

    async fn get_cake(&self, id: Uuid) -> BakeryResult<Option<Cake>> {
        let mut conn = self.conn().await?;
        let row = cakes::table
            .find(id)
            .first::<DbCake>(&mut conn)
            .await
            .optional()?;
        Ok(row.map(Cake::from))
    }

    async fn insert_cake(&self, cake: &Cake) -> BakeryResult<()> {
        let mut conn = self.conn().await?;
        diesel::insert_into(cakes::table)
            .values(&DbCake::from(cake))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete_cake(&self, id: Uuid) -> BakeryResult<bool> {
        let mut conn = self.conn().await?;
        let deleted = diesel::delete(cakes::table.find(id))
            .execute(&mut conn)
            .await?;
        Ok(deleted > 0)
    }

    async fn decrement_stock(&self, id: Uuid, amount: i32) -> BakeryResult<Cake> {
        let mut conn = self.conn().await?;
        Ok(take_stock(&mut conn, id, amount).await?.into())
    }

    async fn place_order(&self, order: &Order, initial: &StatusHistoryRecord) -> BakeryResult<()> {
        let mut conn = self.conn().await?;
        let new_order = DbOrder::from(order);
        let history = DbStatusHistory::from(initial);

        conn.transaction::<_, BakeryError, _>(|conn| {
            Box::pin(async move {
                take_stock(conn, new_order.cake_id, new_order.quantity).await?;

                diesel::insert_into(orders::table)
                    .values(&new_order)
                    .execute(conn)
                    .await?;

                diesel::insert_into(order_status_history::table)
                    .values(&history)
                    .execute(conn)
                    .await?;

                Ok(())
            })
        })
        .await
    }

    async fn get_order(&self, id: Uuid) -> BakeryResult<Option<Order>> {
        let mut conn = self.conn().await?;
        let row = orders::table
            .find(id)
            .first::<DbOrder>(&mut conn)
            .await
            .optional()?;
        Ok(row.map(Order::try_from).transpose()?)
    }

    async fn list_orders(&self, query: &OrderQuery) -> BakeryResult<Vec<Order>> {
        let mut conn = self.conn().await?;
        let mut select = orders::table.into_boxed();
        if let Some(customer_id) = query.customer_id {
            select = select.filter(orders::customer_id.eq(customer_id));
        }
        if let Some(status) = query.status {
            select = select.filter(orders::status.eq(status.as_str()));
        }
        if query.active_only {
            select = select
                .filter(orders::status.ne(OrderStatus::Completed.as_str()))
                .filter(orders::status.ne(OrderStatus::Cancelled.as_str()));
        }
        let rows = select
            .order(orders::created_at.desc())
            .load::<DbOrder>(&mut conn)
            .await?;
        collect_orders(rows)
    }

    async fn orders_between(&self, start: NaiveDate, end: NaiveDate) -> BakeryResult<Vec<Order>> {
        let mut conn = self.conn().await?;
        let (lower, upper) = day_bounds(start, end);
        let rows = orders::table
            .filter(orders::created_at.ge(lower))
            .filter(orders::created_at.lt(upper))
            .order(orders::created_at.asc())
            .load::<DbOrder>(&mut conn)
            .await?;
        collect_orders(rows)
    }

    async fn transition_order(
        &self,
        expected: OrderStatus,
        record: &StatusHistoryRecord,
    ) -> BakeryResult<Order> {
        let mut conn = self.conn().await?;
        let order_id = record.order_id;
        let from = expected.as_str();
        let to = record.status.as_str();
        let history = DbStatusHistory::from(record);

        conn.transaction::<_, BakeryError, _>(|conn| {
            Box::pin(async move {
                let updated = diesel::update(
                    orders::table
                        .filter(orders::id.eq(order_id))
                        .filter(orders::status.eq(from)),
                )
                .set(orders::status.eq(to))
                .get_result::<DbOrder>(conn)
                .await
                .optional()?;

                let Some(row) = updated else {
                    let current = orders::table
                        .find(order_id)
                        .select(orders::status)
                        .first::<String>(conn)
                        .await
                        .optional()?;
                    return Err(match current {
                        Some(status) => BakeryError::invalid_transition(format!(
                            "order {} is {}, not {}",
                            order_id, status, from
                        )),
                        None => BakeryError::not_found("Order", order_id),
                    });
                };

                diesel::insert_into(order_status_history::table)
                    .values(&history)
                    .execute(conn)
                    .await?;

                Ok(Order::try_from(row)?)
            })
        })
        .await
    }

    async fn order_history(&self, order_id: Uuid) -> BakeryResult<Vec<StatusHistoryRecord>> {
        let mut conn = self.conn().await?;
        let rows = order_status_history::table
            .filter(order_status_history::order_id.eq(order_id))
            .select((
                order_status_history::id,
                order_status_history::order_id,
                order_status_history::status,
                order_status_history::changed_at,
                order_status_history::notes,
            ))
            // seq breaks ties between records written within the same instant.
            .order((order_status_history::changed_at.asc(), order_status_history::seq.asc()))
            .load::<DbStatusHistory>(&mut conn)
            .await?;
        rows.into_iter()
            .map(|row| StatusHistoryRecord::try_from(row).map_err(BakeryError::from))
            .collect()
    }

    async fn list_inventory(&self) -> BakeryResult<Vec<InventoryItem>> {
        let mut conn = self.conn().await?;
        let rows = inventory::table
            .order((inventory::category.asc(), inventory::item_name.asc()))
            .load::<DbInventoryItem>(&mut conn)
            .await?;
        Ok(rows.into_iter().map(InventoryItem::from).collect())
    }

    async fn low_stock(&self) -> BakeryResult<Vec<InventoryItem>> {
        let mut conn = self.conn().await?;
        let rows = inventory::table
            .filter(inventory::quantity.le(inventory::min_stock_level))
            .order((inventory::category.asc(), inventory::item_name.asc()))
            .load::<DbInventoryItem>(&mut conn)
            .await?;
        Ok(rows.into_iter().map(InventoryItem::from).collect())
    }

    async fn insert_inventory_item(&self, item: &InventoryItem) -> BakeryResult<()> {
        let mut conn = self.conn().await?;
        diesel::insert_into(inventory::table)
            .values(&DbInventoryItem::from(item))
            .execute(&mut conn)
            .await?;
        Ok(())
    }

    async fn set_inventory_quantity(
        &self,
        id: Uuid,
        quantity: f64,
        at: DateTime<Utc>,
    ) -> BakeryResult<InventoryItem> {
        let mut conn = self.conn().await?;
        let row = diesel::update(inventory::table.find(id))
            .set((
                inventory::quantity.eq(quantity),
                inventory::last_updated.eq(at),
            ))
            .get_result::<DbInventoryItem>(&mut conn)
            .await
            .optional()?;
        row.map(InventoryItem::from)
            .ok_or_else(|| BakeryError::not_found("Inventory item", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("choc"), "%choc%");
        assert_eq!(like_pattern("100%_off"), "%100\\%\\_off%");
    }
}
