use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::Json,
    routing::{get, post, put},
    Router,
};
use serde::{Deserialize, Serialize};
use shared::*;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::handlers::BakeryService;

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(12 * 60 * 60);

/// Bearer tokens issued by `/login`. A token expires `ttl` after it was
/// issued and is evicted the next time anyone opens a session or uses it.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<String, (Session, Instant)>>>,
    ttl: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL)
    }
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn open(&self, session: Session) -> String {
        let token = Uuid::new_v4().simple().to_string();
        let mut sessions = self.sessions.write().await;
        let ttl = self.ttl;
        sessions.retain(|_, (_, issued)| issued.elapsed() < ttl);
        sessions.insert(token.clone(), (session, Instant::now()));
        token
    }

    pub async fn get(&self, token: &str) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        match sessions.get(token) {
            Some((session, issued)) if issued.elapsed() < self.ttl => Some(session.clone()),
            Some(_) => {
                sessions.remove(token);
                None
            }
            None => None,
        }
    }

    pub async fn close(&self, token: &str) -> bool {
        self.sessions.write().await.remove(token).is_some()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub service: BakeryService,
    pub sessions: SessionRegistry,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);
type ApiResult<T> = Result<Json<T>, ApiError>;

fn api_error(err: BakeryError) -> ApiError {
    let status = match &err {
        BakeryError::NotFound { .. } => StatusCode::NOT_FOUND,
        BakeryError::InvalidInput(_) | BakeryError::InvalidEmail(_) => StatusCode::BAD_REQUEST,
        BakeryError::InsufficientStock { .. } | BakeryError::DuplicateUsername(_) => {
            StatusCode::CONFLICT
        }
        BakeryError::InvalidTransition(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BakeryError::AuthFailure => StatusCode::UNAUTHORIZED,
        BakeryError::Forbidden(_) => StatusCode::FORBIDDEN,
        BakeryError::Database(_) | BakeryError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let error = if err.is_client_error() {
        err.to_string()
    } else {
        tracing::error!("Request failed: {}", err);
        "Internal server error".to_string()
    };
    (status, Json(ErrorResponse { error }))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/register", post(register))
        .route("/staff", get(list_staff).post(add_staff))
        .route("/users/:id/status", put(set_account_status))
        .route("/cakes", get(list_cakes).post(add_cake))
        .route("/cakes/all", get(list_all_cakes))
        .route("/cakes/:id", get(get_cake).delete(delete_cake))
        .route("/cakes/:id/decrement", post(decrement_stock))
        .route("/orders", get(list_orders).post(place_order))
        .route("/orders/:id", get(get_order))
        .route("/orders/:id/history", get(order_history))
        .route("/orders/:id/accept", post(accept_order))
        .route("/orders/:id/decline", post(decline_order))
        .route("/orders/:id/cancel", post(cancel_order))
        .route("/orders/:id/status", post(set_order_status))
        .route("/inventory", get(list_inventory).post(upsert_inventory))
        .route("/inventory/low-stock", get(low_stock))
        .route("/inventory/:id", put(set_inventory_quantity))
        .route("/reports", get(report))
        .route("/reports/text", get(report_text))
        .route("/dashboard", get(dashboard))
        .with_state(state)
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
}

/// Resolves the bearer token and re-checks the account behind it. A token
/// whose account was deactivated is revoked on the spot.
async fn session(state: &AppState, headers: &HeaderMap) -> Result<Session, ApiError> {
    let token = bearer_token(headers).ok_or_else(|| api_error(BakeryError::AuthFailure))?;
    let session = state
        .sessions
        .get(token)
        .await
        .ok_or_else(|| api_error(BakeryError::AuthFailure))?;
    match state.service.resume_session(&session).await {
        Ok(session) => Ok(session),
        Err(err) => {
            if matches!(err, BakeryError::AuthFailure) {
                state.sessions.close(token).await;
            }
            Err(api_error(err))
        }
    }
}

pub async fn health_check() -> &'static str {
    "OK"
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: UserSummary,
}

pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<LoginResponse> {
    // An unknown role is just another wrong credential.
    let role: Role = request
        .role
        .parse()
        .map_err(|_| api_error(BakeryError::AuthFailure))?;
    let user = state
        .service
        .authenticate(&request.username, &request.password, role)
        .await
        .map_err(api_error)?;
    let token = state.sessions.open(Session::from(user.clone())).await;
    Ok(Json(LoginResponse { token, user }))
}

pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    match bearer_token(&headers) {
        Some(token) if state.sessions.close(token).await => StatusCode::NO_CONTENT,
        _ => StatusCode::UNAUTHORIZED,
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<NewUser>,
) -> Result<(StatusCode, Json<UserSummary>), ApiError> {
    let user = state
        .service
        .register_customer(request)
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_staff(State(state): State<AppState>, headers: HeaderMap) -> ApiResult<Vec<User>> {
    let session = session(&state, &headers).await?;
    let users = state
        .service
        .list_users(&session, Role::Staff)
        .await
        .map_err(api_error)?;
    Ok(Json(users))
}

#[derive(Debug, Deserialize)]
pub struct AccountStatusRequest {
    pub status: AccountStatus,
}

pub async fn set_account_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<AccountStatusRequest>,
) -> Result<StatusCode, ApiError> {
    let session = session(&state, &headers).await?;
    state
        .service
        .set_account_status(&session, id, request.status)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_staff(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<NewUser>,
) -> Result<(StatusCode, Json<UserSummary>), ApiError> {
    let session = session(&state, &headers).await?;
    let user = state
        .service
        .add_staff(&session, request)
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[derive(Debug, Default, Deserialize)]
pub struct CakeQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

pub async fn list_cakes(
    State(state): State<AppState>,
    Query(query): Query<CakeQuery>,
) -> ApiResult<Vec<Cake>> {
    let cakes = state
        .service
        .list_cakes(query.category.as_deref(), query.search.as_deref())
        .await
        .map_err(api_error)?;
    Ok(Json(cakes))
}

pub async fn list_all_cakes(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CakeQuery>,
) -> ApiResult<Vec<Cake>> {
    let session = session(&state, &headers).await?;
    let cakes = state
        .service
        .list_all_cakes(&session, query.category.as_deref(), query.search.as_deref())
        .await
        .map_err(api_error)?;
    Ok(Json(cakes))
}

pub async fn get_cake(State(state): State<AppState>, Path(id): Path<Uuid>) -> ApiResult<Cake> {
    let cake = state.service.get_cake(id).await.map_err(api_error)?;
    Ok(Json(cake))
}

pub async fn add_cake(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<NewCake>,
) -> Result<(StatusCode, Json<Cake>), ApiError> {
    let session = session(&state, &headers).await?;
    let cake = state
        .service
        .add_cake(&session, request)
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(cake)))
}

pub async fn delete_cake(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let session = session(&state, &headers).await?;
    state
        .service
        .delete_cake(&session, id)
        .await
        .map_err(api_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
pub struct DecrementRequest {
    pub amount: i32,
}

pub async fn decrement_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<DecrementRequest>,
) -> ApiResult<Cake> {
    let session = session(&state, &headers).await?;
    let cake = state
        .service
        .decrement_stock(&session, id, request.amount)
        .await
        .map_err(api_error)?;
    Ok(Json(cake))
}

/// Placement body; `delivery_date` is free text in any format
/// [`parse_delivery_date`] understands.
#[derive(Debug, Deserialize)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub customer_id: Option<Uuid>,
    #[serde(default)]
    pub customer_name: String,
    pub cake_id: Uuid,
    pub quantity: i32,
    pub delivery_type: DeliveryType,
    #[serde(default)]
    pub delivery_date: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub instructions: Option<String>,
}

impl TryFrom<PlaceOrderRequest> for PlaceOrder {
    type Error = BakeryError;

    fn try_from(request: PlaceOrderRequest) -> Result<Self, Self::Error> {
        let delivery_date = request
            .delivery_date
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(parse_delivery_date)
            .transpose()?;
        Ok(Self {
            customer_id: request.customer_id,
            customer_name: request.customer_name,
            cake_id: request.cake_id,
            quantity: request.quantity,
            delivery_type: request.delivery_type,
            delivery_date,
            address: request.address,
            phone: request.phone,
            email: request.email,
            instructions: request.instructions,
        })
    }
}

pub async fn place_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let session = session(&state, &headers).await?;
    let request = PlaceOrder::try_from(request).map_err(api_error)?;
    let order = state
        .service
        .place_order(&session, request)
        .await
        .map_err(api_error)?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<OrderQuery>,
) -> ApiResult<Vec<Order>> {
    let session = session(&state, &headers).await?;
    let orders = state
        .service
        .list_orders(&session, query)
        .await
        .map_err(api_error)?;
    Ok(Json(orders))
}

pub async fn get_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<Order> {
    let session = session(&state, &headers).await?;
    let order = state
        .service
        .get_order(&session, id)
        .await
        .map_err(api_error)?;
    Ok(Json(order))
}

pub async fn order_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<Vec<StatusHistoryRecord>> {
    let session = session(&state, &headers).await?;
    let history = state
        .service
        .order_history(&session, id)
        .await
        .map_err(api_error)?;
    Ok(Json(history))
}

pub async fn accept_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderSummary> {
    let session = session(&state, &headers).await?;
    let order = state
        .service
        .accept_order(&session, id)
        .await
        .map_err(api_error)?;
    Ok(Json(order))
}

#[derive(Debug, Default, Deserialize)]
pub struct DeclineRequest {
    #[serde(default)]
    pub confirm: bool,
}

pub async fn decline_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    request: Option<Json<DeclineRequest>>,
) -> ApiResult<OrderSummary> {
    let session = session(&state, &headers).await?;
    // A missing or unreadable body means the decline was not confirmed.
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let order = state
        .service
        .decline_order(&session, id, request.confirm)
        .await
        .map_err(api_error)?;
    Ok(Json(order))
}

pub async fn cancel_order(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<OrderSummary> {
    let session = session(&state, &headers).await?;
    let order = state
        .service
        .cancel_order(&session, id)
        .await
        .map_err(api_error)?;
    Ok(Json(order))
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: String,
    #[serde(default)]
    pub note: Option<String>,
}

pub async fn set_order_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<StatusRequest>,
) -> ApiResult<OrderSummary> {
    let session = session(&state, &headers).await?;
    let order = state
        .service
        .set_order_status(&session, id, &request.status, request.note)
        .await
        .map_err(api_error)?;
    Ok(Json(order))
}

pub async fn list_inventory(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Vec<InventoryItem>> {
    let session = session(&state, &headers).await?;
    let items = state
        .service
        .list_inventory(&session)
        .await
        .map_err(api_error)?;
    Ok(Json(items))
}

pub async fn low_stock(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Vec<InventoryItem>> {
    let session = session(&state, &headers).await?;
    let items = state.service.low_stock(&session).await.map_err(api_error)?;
    Ok(Json(items))
}

pub async fn upsert_inventory(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<InventoryUpsert>,
) -> ApiResult<InventoryItem> {
    let session = session(&state, &headers).await?;
    let item = state
        .service
        .upsert_inventory(&session, request)
        .await
        .map_err(api_error)?;
    Ok(Json(item))
}

#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    pub quantity: f64,
}

pub async fn set_inventory_quantity(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<QuantityRequest>,
) -> ApiResult<InventoryItem> {
    let session = session(&state, &headers).await?;
    let item = state
        .service
        .set_inventory_quantity(&session, id, request.quantity)
        .await
        .map_err(api_error)?;
    Ok(Json(item))
}

/// Either `period=daily|weekly|monthly` or both `start` and `end` as `YYYY-MM-DD`.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub period: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
}

async fn build_report(state: &AppState, headers: &HeaderMap, query: ReportQuery) -> Result<ReportSummary, ApiError> {
    let session = session(state, headers).await?;
    let result = match (query.period, query.start, query.end) {
        (Some(period), _, _) => match period.parse::<ReportPeriod>() {
            Ok(period) => state.service.report_for_period(&session, period).await,
            Err(e) => Err(e),
        },
        (None, Some(start), Some(end)) => match DateRange::parse(&start, &end) {
            Ok(range) => state.service.report(&session, range).await,
            Err(e) => Err(e),
        },
        _ => Err(BakeryError::invalid_input(
            "pass either a period or both start and end dates",
        )),
    };
    result.map_err(api_error)
}

pub async fn report(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> ApiResult<ReportSummary> {
    let summary = build_report(&state, &headers, query).await?;
    Ok(Json(summary))
}

pub async fn report_text(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ReportQuery>,
) -> Result<String, ApiError> {
    let summary = build_report(&state, &headers, query).await?;
    Ok(summary.to_string())
}

pub async fn dashboard(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<DashboardStats> {
    let session = session(&state, &headers).await?;
    let stats = state.service.dashboard(&session).await.map_err(api_error)?;
    Ok(Json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::MemoryStore;
    use crate::notify::LogNotifier;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn app() -> Router {
        let service = BakeryService::new(Arc::new(MemoryStore::new()), Arc::new(LogNotifier));
        service.seed_sample_data().await.unwrap();
        create_router(AppState {
            service,
            sessions: SessionRegistry::default(),
        })
    }

    async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn login(app: &Router, username: &str, role: &str) -> String {
        let (status, body) = send(
            app,
            "POST",
            "/login",
            None,
            Some(json!({ "username": username, "password": username, "role": role })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_login_failures_look_the_same() {
        let app = app().await;
        let attempts = [
            json!({ "username": "admin", "password": "wrong", "role": "admin" }),
            json!({ "username": "admin", "password": "admin", "role": "staff" }),
            json!({ "username": "nobody", "password": "admin", "role": "admin" }),
            json!({ "username": "admin", "password": "admin", "role": "baker" }),
        ];
        for attempt in attempts {
            let (status, body) = send(&app, "POST", "/login", None, Some(attempt)).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(body["error"], "Invalid credentials");
        }
    }

    #[tokio::test]
    async fn test_customer_order_flow_over_http() {
        let app = app().await;
        let customer = login(&app, "customer1", "customer").await;
        let staff = login(&app, "staff1", "staff").await;

        let (_, cakes) = send(&app, "GET", "/cakes?search=carrot", None, None).await;
        let cake_id = cakes[0]["id"].as_str().unwrap().to_string();

        let (status, order) = send(
            &app,
            "POST",
            "/orders",
            Some(&customer),
            Some(json!({
                "cake_id": cake_id,
                "quantity": 2,
                "delivery_type": "delivery",
                "delivery_date": "2024-05-01 14:00",
                "address": "12 High Street"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(order["status"], "pending");
        assert_eq!(order["email"], "alice@example.com");
        let order_id = order["id"].as_str().unwrap().to_string();

        let (status, _) = send(&app, "POST", &format!("/orders/{}/accept", order_id), Some(&customer), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (status, accepted) = send(&app, "POST", &format!("/orders/{}/accept", order_id), Some(&staff), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(accepted["status"], "preparing");

        let (status, _) = send(&app, "POST", &format!("/orders/{}/cancel", order_id), Some(&customer), None).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

        let (_, history) = send(&app, "GET", &format!("/orders/{}/history", order_id), Some(&customer), None).await;
        assert_eq!(history.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let app = app().await;
        let admin = login(&app, "admin", "admin").await;
        let customer = login(&app, "customer1", "customer").await;

        let (status, _) = send(&app, "GET", &format!("/cakes/{}", Uuid::new_v4()), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, "GET", "/inventory", Some(&customer), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, _) = send(&app, "GET", "/inventory", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = send(&app, "GET", "/reports?start=2024-02-01&end=2024-01-01", Some(&admin), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            "POST",
            "/register",
            None,
            Some(json!({
                "username": "customer1",
                "password": "pw",
                "name": "Someone Else",
                "email": "else@example.com"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_logout_revokes_token() {
        let app = app().await;
        let admin = login(&app, "admin", "admin").await;

        let (status, _) = send(&app, "GET", "/dashboard", Some(&admin), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(&app, "POST", "/logout", Some(&admin), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, "GET", "/dashboard", Some(&admin), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_deactivated_account_loses_its_token() {
        let app = app().await;
        let admin = login(&app, "admin", "admin").await;
        let (status, body) = send(
            &app,
            "POST",
            "/login",
            None,
            Some(json!({ "username": "customer1", "password": "customer1", "role": "customer" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let customer = body["token"].as_str().unwrap().to_string();
        let customer_id = body["user"]["id"].as_str().unwrap().to_string();

        let (status, _) = send(&app, "GET", "/orders", Some(&customer), None).await;
        assert_eq!(status, StatusCode::OK);

        let uri = format!("/users/{}/status", customer_id);
        let (status, _) = send(&app, "PUT", &uri, Some(&admin), Some(json!({ "status": "inactive" }))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, "GET", "/orders", Some(&customer), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Invalid credentials");

        // The token stays revoked after the account comes back.
        let (status, _) = send(&app, "PUT", &uri, Some(&admin), Some(json!({ "status": "active" }))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&app, "GET", "/orders", Some(&customer), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        let customer = login(&app, "customer1", "customer").await;
        let (status, _) = send(&app, "GET", "/orders", Some(&customer), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_expired_tokens_are_evicted() {
        let registry = SessionRegistry::new(Duration::ZERO);
        let session = Session {
            user_id: Uuid::new_v4(),
            name: "Alice Johnson".to_string(),
            role: Role::Customer,
        };
        let token = registry.open(session.clone()).await;
        assert!(registry.get(&token).await.is_none());
        assert!(!registry.close(&token).await);

        let registry = SessionRegistry::default();
        let token = registry.open(session).await;
        assert_eq!(registry.get(&token).await.map(|s| s.role), Some(Role::Customer));
    }

    #[tokio::test]
    async fn test_decline_without_body_is_unconfirmed() {
        let app = app().await;
        let customer = login(&app, "customer1", "customer").await;
        let staff = login(&app, "staff1", "staff").await;

        let (_, cakes) = send(&app, "GET", "/cakes?search=lemon", None, None).await;
        let cake_id = cakes[0]["id"].as_str().unwrap().to_string();
        let (status, order) = send(
            &app,
            "POST",
            "/orders",
            Some(&customer),
            Some(json!({
                "cake_id": cake_id,
                "quantity": 1,
                "delivery_type": "pickup",
                "delivery_date": "2024-05-01 14:00"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let uri = format!("/orders/{}/decline", order["id"].as_str().unwrap());

        let (status, body) = send(&app, "POST", &uri, Some(&staff), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("confirmed"));

        let (status, declined) = send(&app, "POST", &uri, Some(&staff), Some(json!({ "confirm": true }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(declined["status"], "cancelled");
    }

    #[tokio::test]
    async fn test_text_report() {
        let app = app().await;
        let staff = login(&app, "staff1", "staff").await;

        let request = Request::builder()
            .uri("/reports/text?period=daily")
            .header(header::AUTHORIZATION, format!("Bearer {}", staff))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.starts_with("Daily Report ("));
        assert!(text.contains("Total Orders: 0"));
    }
}
