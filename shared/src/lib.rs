use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

mod error;
pub mod report;

pub use error::*;
pub use report::*;

/// Surcharge added to every `delivery` order unless the service is configured otherwise.
pub const DEFAULT_DELIVERY_FEE: i64 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// The fixed, ordered set offered to staff when changing an order's status.
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = BakeryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| BakeryError::invalid_transition(format!("unknown order status '{}'", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryType {
    Pickup,
    Delivery,
}

impl DeliveryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryType::Pickup => "pickup",
            DeliveryType::Delivery => "delivery",
        }
    }
}

impl FromStr for DeliveryType {
    type Err = BakeryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pickup" => Ok(DeliveryType::Pickup),
            "delivery" => Ok(DeliveryType::Delivery),
            other => Err(BakeryError::invalid_input(format!("unknown delivery type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Customer => "customer",
        }
    }

    /// Admins can do everything staff can.
    pub fn is_staff(&self) -> bool {
        matches!(self, Role::Admin | Role::Staff)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = BakeryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "customer" => Ok(Role::Customer),
            other => Err(BakeryError::invalid_input(format!("unknown role '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Inactive,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Inactive => "inactive",
        }
    }

    /// Anything other than `active` keeps the account locked out.
    pub fn parse(s: &str) -> Self {
        if s == "active" {
            AccountStatus::Active
        } else {
            AccountStatus::Inactive
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cake {
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

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCake {
    pub name: String,
    pub flavor: String,
    pub size: String,
    pub price: BigDecimal,
    pub stock: i32,
    pub category: String,
    #[serde(default)]
    pub description: String,
}

impl NewCake {
    pub fn validate(&self) -> BakeryResult<()> {
        if self.name.trim().is_empty() {
            return Err(BakeryError::invalid_input("cake name is required"));
        }
        if self.price <= BigDecimal::from(0) {
            return Err(BakeryError::invalid_input("cake price must be greater than zero"));
        }
        // Prices are stored as NUMERIC(10, 2).
        if self.price.with_scale(2) != self.price {
            return Err(BakeryError::invalid_input("cake price cannot have more than two decimal places"));
        }
        if self.price >= BigDecimal::from(100_000_000) {
            return Err(BakeryError::invalid_input("cake price is too large"));
        }
        if self.stock < 0 {
            return Err(BakeryError::invalid_input("cake stock cannot be negative"));
        }
        Ok(())
    }
}

/// Catalog listing filter. A category of `"all"` is the same as no category.
#[derive(Debug, Clone, Default)]
pub struct CakeFilter {
    pub category: Option<String>,
    pub search: Option<String>,
    pub in_stock_only: bool,
}

impl CakeFilter {
    pub fn category(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != "all")
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn matches(&self, cake: &Cake) -> bool {
        if self.in_stock_only && cake.stock <= 0 {
            return false;
        }
        if let Some(category) = self.category() {
            if cake.category != category {
                return false;
            }
        }
        if let Some(term) = self.search() {
            let term = term.to_lowercase();
            return [&cake.name, &cake.flavor, &cake.description]
                .iter()
                .any(|field| field.to_lowercase().contains(&term));
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: Uuid,
    pub item_name: String,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    pub min_stock_level: f64,
    pub last_updated: DateTime<Utc>,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.min_stock_level
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewInventoryItem {
    pub item_name: String,
    pub category: String,
    pub quantity: f64,
    pub unit: String,
    pub min_stock_level: f64,
}

impl NewInventoryItem {
    pub fn validate(&self) -> BakeryResult<()> {
        if self.item_name.trim().is_empty() {
            return Err(BakeryError::invalid_input("item name is required"));
        }
        validate_quantity(self.quantity)?;
        if !self.min_stock_level.is_finite() || self.min_stock_level < 0.0 {
            return Err(BakeryError::invalid_input("minimum stock level cannot be negative"));
        }
        Ok(())
    }
}

pub fn validate_quantity(quantity: f64) -> BakeryResult<()> {
    if !quantity.is_finite() || quantity < 0.0 {
        return Err(BakeryError::invalid_input("quantity cannot be negative"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum InventoryUpsert {
    Create(NewInventoryItem),
    SetQuantity { id: Uuid, quantity: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub cake_id: Uuid,
    pub quantity: i32,
    pub total_price: BigDecimal,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub delivery_date: Option<NaiveDateTime>,
    pub special_instructions: Option<String>,
    pub delivery_type: DeliveryType,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl Order {
    pub fn summary(&self) -> OrderSummary {
        OrderSummary {
            id: self.id,
            customer_name: self.customer_name.clone(),
            status: self.status,
            total_price: self.total_price.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: Uuid,
    pub customer_name: String,
    pub status: OrderStatus,
    pub total_price: BigDecimal,
}

/// A placement request as submitted by a customer or by staff at the counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceOrder {
    /// Only honoured for staff placing on behalf of a registered customer.
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    pub customer_name: String,
    pub cake_id: Uuid,
    pub quantity: i32,
    pub delivery_type: DeliveryType,
    #[serde(default)]
    pub delivery_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// Accepts `YYYY-MM-DD`, `YYYY-MM-DD HH:MM` or `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_delivery_date(raw: &str) -> BakeryResult<NaiveDateTime> {
    let raw = raw.trim();
    for format in ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(parsed);
        }
    }
    parse_date(raw)?
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| BakeryError::invalid_input(format!("invalid delivery date '{}'", raw)))
}

/// Order price arithmetic: `price * quantity`, plus the fee for deliveries.
pub fn order_total(
    price: &BigDecimal,
    quantity: i32,
    delivery_type: DeliveryType,
    delivery_fee: &BigDecimal,
) -> BigDecimal {
    let base = price * BigDecimal::from(quantity);
    match delivery_type {
        DeliveryType::Delivery => base + delivery_fee,
        DeliveryType::Pickup => base,
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderQuery {
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub status: Option<OrderStatus>,
    /// Restrict to orders that are neither completed nor cancelled.
    #[serde(default)]
    pub active_only: bool,
}

impl OrderQuery {
    pub fn matches(&self, order: &Order) -> bool {
        if let Some(customer_id) = self.customer_id {
            if order.customer_id != Some(customer_id) {
                return false;
            }
        }
        if let Some(status) = self.status {
            if order.status != status {
                return false;
            }
        }
        !(self.active_only && order.status.is_terminal())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusHistoryRecord {
    pub id: Uuid,
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub changed_at: DateTime<Utc>,
    pub note: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

/// Registration or provisioning request. The password is plain text here and
/// hashed before it reaches any store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
}

/// The authenticated caller, passed explicitly into every core operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user_id: Uuid,
    pub name: String,
    pub role: Role,
}

impl Session {
    pub fn require_staff(&self) -> BakeryResult<()> {
        if self.role.is_staff() {
            Ok(())
        } else {
            Err(BakeryError::Forbidden(format!("{} accounts cannot do this", self.role)))
        }
    }

    pub fn require_admin(&self) -> BakeryResult<()> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(BakeryError::Forbidden("admin access required".to_string()))
        }
    }
}

impl From<UserSummary> for Session {
    fn from(user: UserSummary) -> Self {
        Self {
            user_id: user.id,
            name: user.name,
            role: user.role,
        }
    }
}
