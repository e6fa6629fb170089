use bigdecimal::BigDecimal;
use chrono::{DateTime, NaiveDate, Utc};
use num_traits::Zero;
use shared::*;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::access;
use crate::lifecycle::{self, TransitionKind};
use crate::notify::{self, Notifier};
use crate::reports;
use crate::store::Store;

pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// The core operations of the storefront. Every operation that depends on
/// who is asking takes the caller's [`Session`] explicitly.
#[derive(Clone)]
pub struct BakeryService {
    store: Arc<dyn Store>,
    notifier: Arc<dyn Notifier>,
    clock: Clock,
    delivery_fee: BigDecimal,
}

impl BakeryService {
    pub fn new(store: Arc<dyn Store>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            clock: Arc::new(Utc::now),
            delivery_fee: BigDecimal::from(DEFAULT_DELIVERY_FEE),
        }
    }

    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Utc> + Send + Sync + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn with_delivery_fee(mut self, fee: BigDecimal) -> Self {
        self.delivery_fee = fee;
        self
    }

    pub(crate) fn store(&self) -> &dyn Store {
        self.store.as_ref()
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    // ---- access control ----

    /// Fails with the same `AuthFailure` whichever of username, password,
    /// role or account status was wrong.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
        role: Role,
    ) -> BakeryResult<UserSummary> {
        let Some(user) = self.store.find_user_by_username(username).await? else {
            return Err(BakeryError::AuthFailure);
        };
        let password_ok = access::verify_password(password, &user.password_hash);
        if !password_ok || user.role != role || user.status != AccountStatus::Active {
            debug!("Rejected login for {}", username);
            return Err(BakeryError::AuthFailure);
        }
        info!(user_id = %user.id, role = %user.role, "User logged in");
        Ok(user.summary())
    }

    pub async fn register_customer(&self, new_user: NewUser) -> BakeryResult<UserSummary> {
        let user = self.create_user(new_user, Role::Customer).await?;
        Ok(user.summary())
    }

    pub async fn add_staff(&self, session: &Session, new_user: NewUser) -> BakeryResult<UserSummary> {
        session.require_admin()?;
        let user = self.create_user(new_user, Role::Staff).await?;
        Ok(user.summary())
    }

    pub async fn list_users(&self, session: &Session, role: Role) -> BakeryResult<Vec<User>> {
        session.require_admin()?;
        self.store.list_users_by_role(role).await
    }

    /// Re-checks a previously issued session against the stored account, so a
    /// deactivated or deleted user is locked out straight away.
    pub async fn resume_session(&self, session: &Session) -> BakeryResult<Session> {
        let Some(user) = self.store.get_user(session.user_id).await? else {
            return Err(BakeryError::AuthFailure);
        };
        if user.role != session.role || user.status != AccountStatus::Active {
            debug!(user_id = %user.id, "Session no longer valid");
            return Err(BakeryError::AuthFailure);
        }
        Ok(Session::from(user.summary()))
    }

    pub async fn set_account_status(
        &self,
        session: &Session,
        user_id: Uuid,
        status: AccountStatus,
    ) -> BakeryResult<()> {
        session.require_admin()?;
        if user_id == session.user_id && status != AccountStatus::Active {
            return Err(BakeryError::invalid_input("admins cannot deactivate their own account"));
        }
        if !self.store.set_user_status(user_id, status).await? {
            return Err(BakeryError::not_found("User", user_id));
        }
        info!(%user_id, status = status.as_str(), "Account status changed");
        Ok(())
    }

    pub(crate) async fn create_user(&self, new_user: NewUser, role: Role) -> BakeryResult<User> {
        access::validate_new_user(&new_user)?;
        let user = User {
            id: Uuid::new_v4(),
            username: new_user.username.trim().to_string(),
            password_hash: access::hash_password(&new_user.password)?,
            role,
            name: new_user.name.trim().to_string(),
            email: new_user.email.trim().to_string(),
            phone: non_empty(new_user.phone),
            status: AccountStatus::Active,
            created_at: self.now(),
        };
        self.store.insert_user(&user).await?;
        info!(user_id = %user.id, %role, "Created user {}", user.username);
        Ok(user)
    }

    // ---- catalog ----

    /// Customer-facing listing: only cakes that are in stock.
    pub async fn list_cakes(
        &self,
        category: Option<&str>,
        search: Option<&str>,
    ) -> BakeryResult<Vec<Cake>> {
        self.store
            .list_cakes(&cake_filter(category, search, true))
            .await
    }

    pub async fn list_all_cakes(
        &self,
        session: &Session,
        category: Option<&str>,
        search: Option<&str>,
    ) -> BakeryResult<Vec<Cake>> {
        session.require_staff()?;
        self.store
            .list_cakes(&cake_filter(category, search, false))
            .await
    }

    pub async fn get_cake(&self, id: Uuid) -> BakeryResult<Cake> {
        self.store
            .get_cake(id)
            .await?
            .ok_or_else(|| BakeryError::not_found("Cake", id))
    }

    pub async fn add_cake(&self, session: &Session, new_cake: NewCake) -> BakeryResult<Cake> {
        session.require_admin()?;
        new_cake.validate()?;
        let cake = Cake {
            id: Uuid::new_v4(),
            name: new_cake.name.trim().to_string(),
            flavor: new_cake.flavor,
            size: new_cake.size,
            price: new_cake.price,
            stock: new_cake.stock,
            category: new_cake.category,
            description: new_cake.description,
            created_at: self.now(),
        };
        self.store.insert_cake(&cake).await?;
        info!(cake_id = %cake.id, "Added cake {}", cake.name);
        Ok(cake)
    }

    /// Orders that reference the cake keep pointing at its id.
    pub async fn delete_cake(&self, session: &Session, id: Uuid) -> BakeryResult<()> {
        session.require_admin()?;
        if !self.store.delete_cake(id).await? {
            return Err(BakeryError::not_found("Cake", id));
        }
        info!(cake_id = %id, "Deleted cake");
        Ok(())
    }

    pub async fn decrement_stock(&self, session: &Session, id: Uuid, amount: i32) -> BakeryResult<Cake> {
        session.require_admin()?;
        if amount <= 0 {
            return Err(BakeryError::invalid_input("amount must be greater than zero"));
        }
        let cake = self.store.decrement_stock(id, amount).await?;
        info!(cake_id = %id, amount, stock = cake.stock, "Decremented cake stock");
        Ok(cake)
    }

    // ---- order ledger ----

    /// Creates a `pending` order, its first history record and the stock
    /// decrement as one unit.
    pub async fn place_order(&self, session: &Session, request: PlaceOrder) -> BakeryResult<Order> {
        if request.quantity <= 0 {
            return Err(BakeryError::invalid_input("quantity must be greater than zero"));
        }
        let address = non_empty(request.address);
        if request.delivery_type == DeliveryType::Delivery && address.is_none() {
            return Err(BakeryError::invalid_input("delivery orders need an address"));
        }

        let owner_id = match session.role {
            Role::Customer => Some(session.user_id),
            _ => request.customer_id,
        };
        let owner = match owner_id {
            Some(id) => Some(
                self.store
                    .get_user(id)
                    .await?
                    .ok_or_else(|| BakeryError::not_found("User", id))?,
            ),
            None => None,
        };

        let now = self.now();
        let delivery_date = match (session.role, request.delivery_date) {
            (_, Some(date)) => date,
            (Role::Customer, None) => {
                return Err(BakeryError::invalid_input("a delivery date is required"));
            }
            (_, None) => now.naive_utc(),
        };

        let mut customer_name = request.customer_name.trim().to_string();
        let mut phone = non_empty(request.phone);
        let mut email = non_empty(request.email);
        match &owner {
            Some(user) => {
                // Customers always order under their own name.
                if session.role == Role::Customer || customer_name.is_empty() {
                    customer_name = user.name.clone();
                }
                phone = phone.or_else(|| user.phone.clone());
                email = email.or_else(|| Some(user.email.clone()));
            }
            None if phone.is_none() => {
                return Err(BakeryError::invalid_input("walk-in orders need a phone number"));
            }
            None => {}
        }
        if customer_name.is_empty() {
            return Err(BakeryError::invalid_input("customer name is required"));
        }

        let cake = self.get_cake(request.cake_id).await?;
        if cake.stock < request.quantity {
            return Err(BakeryError::InsufficientStock {
                requested: request.quantity,
                available: cake.stock,
            });
        }

        let order = Order {
            id: Uuid::new_v4(),
            customer_id: owner.as_ref().map(|u| u.id),
            customer_name,
            cake_id: cake.id,
            quantity: request.quantity,
            total_price: order_total(
                &cake.price,
                request.quantity,
                request.delivery_type,
                &self.delivery_fee,
            ),
            status: OrderStatus::Pending,
            created_at: now,
            delivery_date: Some(delivery_date),
            special_instructions: non_empty(request.instructions),
            delivery_type: request.delivery_type,
            address,
            phone,
            email,
        };
        let initial = StatusHistoryRecord {
            id: Uuid::new_v4(),
            order_id: order.id,
            status: OrderStatus::Pending,
            changed_at: now,
            note: None,
        };
        self.store.place_order(&order, &initial).await?;

        info!(
            order_id = %order.id,
            cake_id = %cake.id,
            quantity = order.quantity,
            total = %order.total_price,
            "Order placed by {}",
            session.role
        );
        Ok(order)
    }

    /// Customer sessions only ever see their own orders, whatever the query says.
    pub async fn list_orders(&self, session: &Session, mut query: OrderQuery) -> BakeryResult<Vec<Order>> {
        if session.role == Role::Customer {
            query.customer_id = Some(session.user_id);
        }
        self.store.list_orders(&query).await
    }

    /// Another customer's order is reported as missing rather than forbidden.
    pub async fn get_order(&self, session: &Session, id: Uuid) -> BakeryResult<Order> {
        let order = self
            .store
            .get_order(id)
            .await?
            .filter(|o| session.role.is_staff() || o.customer_id == Some(session.user_id))
            .ok_or_else(|| BakeryError::not_found("Order", id))?;
        Ok(order)
    }

    pub async fn order_history(&self, session: &Session, id: Uuid) -> BakeryResult<Vec<StatusHistoryRecord>> {
        let order = self.get_order(session, id).await?;
        self.store.order_history(order.id).await
    }

    pub async fn accept_order(&self, session: &Session, id: Uuid) -> BakeryResult<OrderSummary> {
        let order = self.apply_transition(session, id, TransitionKind::Accept, None).await?;
        self.notify_customer(&order).await;
        Ok(order.summary())
    }

    /// Declining needs the caller to have confirmed it explicitly.
    pub async fn decline_order(
        &self,
        session: &Session,
        id: Uuid,
        confirmed: bool,
    ) -> BakeryResult<OrderSummary> {
        if !confirmed {
            return Err(BakeryError::invalid_input("declining an order must be confirmed"));
        }
        let order = self.apply_transition(session, id, TransitionKind::Decline, None).await?;
        self.notify_customer(&order).await;
        Ok(order.summary())
    }

    pub async fn transition_order(
        &self,
        session: &Session,
        id: Uuid,
        status: OrderStatus,
        note: Option<String>,
    ) -> BakeryResult<OrderSummary> {
        let order = self
            .apply_transition(session, id, TransitionKind::Set(status), note)
            .await?;
        Ok(order.summary())
    }

    /// Status given by name, as picked from the staff dropdown.
    pub async fn set_order_status(
        &self,
        session: &Session,
        id: Uuid,
        status: &str,
        note: Option<String>,
    ) -> BakeryResult<OrderSummary> {
        let status: OrderStatus = status.trim().parse()?;
        self.transition_order(session, id, status, note).await
    }

    pub async fn cancel_order(&self, session: &Session, id: Uuid) -> BakeryResult<OrderSummary> {
        let order = self
            .apply_transition(session, id, TransitionKind::CustomerCancel, None)
            .await?;
        Ok(order.summary())
    }

    async fn apply_transition(
        &self,
        session: &Session,
        id: Uuid,
        kind: TransitionKind,
        note: Option<String>,
    ) -> BakeryResult<Order> {
        let order = self.get_order(session, id).await?;
        let target = lifecycle::check_transition(order.status, kind, session.role)?;

        let record = StatusHistoryRecord {
            id: Uuid::new_v4(),
            order_id: order.id,
            status: target,
            changed_at: self.now(),
            note: Some(non_empty(note).unwrap_or_else(|| kind.default_note(session.role))),
        };
        let updated = self.store.transition_order(order.status, &record).await?;
        info!(
            order_id = %updated.id,
            from = %order.status,
            to = %updated.status,
            "Order status changed by {}",
            session.role
        );
        Ok(updated)
    }

    async fn notify_customer(&self, order: &Order) {
        let Some(email) = order.email.as_deref().filter(|e| !e.is_empty()) else {
            debug!(order_id = %order.id, "No e-mail on order, skipping notification");
            return;
        };
        let Some((subject, body)) = notify::status_message(order) else {
            return;
        };
        if !self.notifier.send(email, &subject, &body).await {
            warn!(order_id = %order.id, "Failed to notify {}", email);
        }
    }

    // ---- inventory ----

    pub async fn list_inventory(&self, session: &Session) -> BakeryResult<Vec<InventoryItem>> {
        session.require_staff()?;
        self.store.list_inventory().await
    }

    pub async fn low_stock(&self, session: &Session) -> BakeryResult<Vec<InventoryItem>> {
        session.require_staff()?;
        self.store.low_stock().await
    }

    pub async fn add_inventory_item(
        &self,
        session: &Session,
        new_item: NewInventoryItem,
    ) -> BakeryResult<InventoryItem> {
        session.require_admin()?;
        new_item.validate()?;
        let item = InventoryItem {
            id: Uuid::new_v4(),
            item_name: new_item.item_name.trim().to_string(),
            category: new_item.category,
            quantity: new_item.quantity,
            unit: new_item.unit,
            min_stock_level: new_item.min_stock_level,
            last_updated: self.now(),
        };
        self.store.insert_inventory_item(&item).await?;
        info!(item_id = %item.id, "Added inventory item {}", item.item_name);
        Ok(item)
    }

    /// Absolute set, not a delta.
    pub async fn set_inventory_quantity(
        &self,
        session: &Session,
        id: Uuid,
        quantity: f64,
    ) -> BakeryResult<InventoryItem> {
        session.require_admin()?;
        validate_quantity(quantity)?;
        let item = self
            .store
            .set_inventory_quantity(id, quantity, self.now())
            .await?;
        if item.is_low_stock() {
            warn!(item_id = %item.id, quantity, "{} is low on stock", item.item_name);
        }
        Ok(item)
    }

    pub async fn upsert_inventory(
        &self,
        session: &Session,
        upsert: InventoryUpsert,
    ) -> BakeryResult<InventoryItem> {
        match upsert {
            InventoryUpsert::Create(new_item) => self.add_inventory_item(session, new_item).await,
            InventoryUpsert::SetQuantity { id, quantity } => {
                self.set_inventory_quantity(session, id, quantity).await
            }
        }
    }

    // ---- reporting ----

    pub async fn report(&self, session: &Session, range: DateRange) -> BakeryResult<ReportSummary> {
        session.require_staff()?;
        let orders = self.store.orders_between(range.start, range.end).await?;
        let cake_names: HashMap<Uuid, String> = self
            .store
            .list_cakes(&CakeFilter::default())
            .await?
            .into_iter()
            .map(|cake| (cake.id, cake.name))
            .collect();
        Ok(reports::summarize(range, &orders, &cake_names))
    }

    pub async fn report_for_period(
        &self,
        session: &Session,
        period: ReportPeriod,
    ) -> BakeryResult<ReportSummary> {
        self.report(session, DateRange::for_period(period, self.today()))
            .await
    }

    pub async fn dashboard(&self, session: &Session) -> BakeryResult<DashboardStats> {
        session.require_admin()?;
        let today = self.today();
        let todays_orders = self.store.orders_between(today, today).await?;
        let today_revenue = todays_orders
            .iter()
            .fold(BigDecimal::zero(), |sum, o| sum + &o.total_price);
        let available_cakes = self
            .store
            .list_cakes(&cake_filter(None, None, true))
            .await?
            .len();
        let low_stock_items = self.store.low_stock().await?.len();

        Ok(DashboardStats {
            today_orders: todays_orders.len(),
            today_revenue,
            available_cakes,
            low_stock_items,
        })
    }
}

fn cake_filter(category: Option<&str>, search: Option<&str>, in_stock_only: bool) -> CakeFilter {
    CakeFilter {
        category: category.map(str::to_string),
        search: search.map(str::to_string),
        in_stock_only,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
