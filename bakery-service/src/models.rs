use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDateTime, Utc};
use diesel::prelude::*;
use shared::*;
use uuid::Uuid;

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::cakes)]
pub struct DbCake {
    pub id: Uuid,
    pub name: String,
    pub flavor: String,
    pub size: String,
    pub price: BigDecimal,
    pub stock: i32,
    pub category: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::inventory)]
pub struct DbInventoryItem {
    pub id: Uuid,
    pub item_name: String,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    pub min_stock_level: f64,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::order_status_history)]
pub struct DbStatusHistory {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: String,
    pub changed_at: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::orders)]
pub struct DbOrder {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub cake_id: Uuid,
    pub quantity: i32,
    pub total_price: BigDecimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub delivery_date: Option<NaiveDateTime>,
    pub special_instructions: Option<String>,
    pub delivery_type: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Queryable, Insertable)]
#[diesel(table_name = crate::schema::users)]
pub struct DbUser {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: String,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<DbCake> for Cake {
    fn from(db_cake: DbCake) -> Self {
        Self {
            id: db_cake.id,
            name: db_cake.name,
            flavor: db_cake.flavor,
            size: db_cake.size,
            price: db_cake.price,
            stock: db_cake.stock,
            category: db_cake.category,
            description: db_cake.description,
            created_at: db_cake.created_at,
        }
    }
}

impl From<&Cake> for DbCake {
    fn from(cake: &Cake) -> Self {
        Self {
            id: cake.id,
            name: cake.name.clone(),
            flavor: cake.flavor.clone(),
            size: cake.size.clone(),
            price: cake.price.clone(),
            stock: cake.stock,
            category: cake.category.clone(),
            description: cake.description.clone(),
            created_at: cake.created_at,
        }
    }
}

impl From<DbInventoryItem> for InventoryItem {
    fn from(item: DbInventoryItem) -> Self {
        Self {
            id: item.id,
            item_name: item.item_name,
            category: item.category,
            quantity: item.quantity,
            unit: item.unit,
            min_stock_level: item.min_stock_level,
            last_updated: item.last_updated,
        }
    }
}

impl From<&InventoryItem> for DbInventoryItem {
    fn from(item: &InventoryItem) -> Self {
        Self {
            id: item.id,
            item_name: item.item_name.clone(),
            category: item.category.clone(),
            quantity: item.quantity,
            unit: item.unit.clone(),
            min_stock_level: item.min_stock_level,
            last_updated: item.last_updated,
        }
    }
}

impl TryFrom<DbStatusHistory> for StatusHistoryRecord {
    type Error = anyhow::Error;

    fn try_from(record: DbStatusHistory) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            order_id: record.order_id,
            status: parse_stored(&record.status)?,
            changed_at: record.changed_at,
            note: record.notes,
        })
    }
}

impl From<&StatusHistoryRecord> for DbStatusHistory {
    fn from(record: &StatusHistoryRecord) -> Self {
        Self {
            id: record.id,
            order_id: record.order_id,
            status: record.status.as_str().to_string(),
            changed_at: record.changed_at,
            notes: record.note.clone(),
        }
    }
}

impl TryFrom<DbOrder> for Order {
    type Error = anyhow::Error;

    fn try_from(db_order: DbOrder) -> Result<Self, Self::Error> {
        Ok(Self {
            id: db_order.id,
            customer_id: db_order.customer_id,
            customer_name: db_order.customer_name,
            cake_id: db_order.cake_id,
            quantity: db_order.quantity,
            total_price: db_order.total_price,
            status: parse_stored(&db_order.status)?,
            created_at: db_order.created_at,
            delivery_date: db_order.delivery_date,
            special_instructions: db_order.special_instructions,
            delivery_type: parse_stored(&db_order.delivery_type)?,
            address: db_order.address,
            phone: db_order.phone,
            email: db_order.email,
        })
    }
}

impl From<&Order> for DbOrder {
    fn from(order: &Order) -> Self {
        Self {
            id: order.id,
            customer_id: order.customer_id,
            customer_name: order.customer_name.clone(),
            cake_id: order.cake_id,
            quantity: order.quantity,
            total_price: order.total_price.clone(),
            status: order.status.as_str().to_string(),
            created_at: order.created_at,
            delivery_date: order.delivery_date,
            special_instructions: order.special_instructions.clone(),
            delivery_type: order.delivery_type.as_str().to_string(),
            address: order.address.clone(),
            phone: order.phone.clone(),
            email: order.email.clone(),
        }
    }
}

impl TryFrom<DbUser> for User {
    type Error = anyhow::Error;

    fn try_from(db_user: DbUser) -> Result<Self, Self::Error> {
        Ok(Self {
            id: db_user.id,
            username: db_user.username,
            password_hash: db_user.password_hash,
            role: parse_stored(&db_user.role)?,
            name: db_user.name,
            email: db_user.email,
            phone: db_user.phone,
            status: AccountStatus::parse(&db_user.status),
            created_at: db_user.created_at,
        })
    }
}

impl From<&User> for DbUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            password_hash: user.password_hash.clone(),
            role: user.role.as_str().to_string(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            status: user.status.as_str().to_string(),
            created_at: user.created_at,
        }
    }
}

/// Enum columns are plain varchar; a value we cannot parse means the row is corrupt.
fn parse_stored<T>(raw: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr<Err = BakeryError>,
{
    raw.parse::<T>()
        .map_err(|e| anyhow::anyhow!("corrupt stored value '{}': {}", raw, e))
}
