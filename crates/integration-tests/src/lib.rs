//! Integration tests for the Lockshop client.
//!
//! The tests run the real client against [`MockBackend`], an in-process
//! `axum` server that speaks the storefront REST API under `/api/v1`. The
//! backend records every request it sees, so tests can assert how many
//! refresh calls were made or that no request was sent at all.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p lockshop-integration-tests
//! ```

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::{Barrier, oneshot};
use tokio::task::JoinHandle;

use lockshop_client::credentials::SessionCredentials;
use lockshop_client::{ClientConfig, SessionClient, TokenStore};
use lockshop_core::{CartProduct, CheckoutForm, PaymentType, Price, ProductId};

/// Password the mock backend accepts on sign-in.
pub const VALID_PASSWORD: &str = "correct-horse";
/// Access token the backend treats as expired.
pub const EXPIRED_ACCESS_TOKEN: &str = "access-expired";
/// Refresh token the backend accepts initially.
pub const VALID_REFRESH_TOKEN: &str = "refresh-1";

// =============================================================================
// Recorded traffic
// =============================================================================

/// One request as the backend saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub query: Option<String>,
    pub authorization: Option<String>,
    pub accept_language: Option<String>,
    pub request_id: Option<String>,
}

/// Knobs for a test backend.
#[derive(Debug, Default)]
pub struct BackendOptions {
    /// Hold this many unauthorized responses until all of them are pending.
    pub unauthorized_barrier: Option<usize>,
    /// Delay before answering a refresh.
    pub refresh_delay: Option<Duration>,
    /// Hand out a new refresh token on every refresh.
    pub rotate_refresh_token: bool,
}

/// Shared state behind the mock routes.
#[derive(Debug)]
pub struct BackendState {
    access_token: Mutex<String>,
    refresh_token: Mutex<String>,
    token_generation: AtomicUsize,
    requests: Mutex<Vec<RecordedRequest>>,
    orders: Mutex<Vec<Value>>,
    comments: Mutex<Vec<Value>>,
    reject_orders: AtomicBool,
    reject_everything: AtomicBool,
    rotate_refresh_token: bool,
    refresh_delay: Option<Duration>,
    unauthorized_barrier: Option<Barrier>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BackendState {
    fn new(options: &BackendOptions) -> Self {
        Self {
            access_token: Mutex::new("access-1".to_string()),
            refresh_token: Mutex::new(VALID_REFRESH_TOKEN.to_string()),
            token_generation: AtomicUsize::new(1),
            requests: Mutex::new(Vec::new()),
            orders: Mutex::new(Vec::new()),
            comments: Mutex::new(vec![json!({
                "id": 1, "lockId": 7, "content": "Installed in ten minutes", "rating": 5,
                "userName": "Dilnoza", "createdAt": "2024-12-01T09:30:00"
            })]),
            reject_orders: AtomicBool::new(false),
            reject_everything: AtomicBool::new(false),
            rotate_refresh_token: options.rotate_refresh_token,
            refresh_delay: options.refresh_delay,
            unauthorized_barrier: options.unauthorized_barrier.map(Barrier::new),
        }
    }

    /// The access token protected routes currently accept.
    #[must_use]
    pub fn valid_access_token(&self) -> String {
        lock(&self.access_token).clone()
    }

    /// The refresh token the refresh route currently accepts.
    #[must_use]
    pub fn valid_refresh_token(&self) -> String {
        lock(&self.refresh_token).clone()
    }

    /// Every request received so far, in arrival order.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }

    /// Requests received for `path` (relative to `/api/v1`).
    #[must_use]
    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        let full = format!("/api/v1{path}");
        self.requests()
            .into_iter()
            .filter(|r| r.path == full)
            .collect()
    }

    /// Number of requests received for `path`.
    #[must_use]
    pub fn calls_to(&self, path: &str) -> usize {
        self.requests_to(path).len()
    }

    /// Order bodies accepted by `/order/add`.
    #[must_use]
    pub fn orders(&self) -> Vec<Value> {
        lock(&self.orders).clone()
    }

    /// Reviews stored so far, including the seeded one for lock 7.
    #[must_use]
    pub fn comments(&self) -> Vec<Value> {
        lock(&self.comments).clone()
    }

    /// Make `/order/add` answer 400.
    pub fn reject_orders(&self, reject: bool) {
        self.reject_orders.store(reject, Ordering::SeqCst);
    }

    /// Make every protected route answer 401, whatever the token.
    pub fn reject_everything(&self, reject: bool) {
        self.reject_everything.store(reject, Ordering::SeqCst);
    }

    fn record(&self, request: &Request) {
        let header = |name: &str| {
            request
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let recorded = RecordedRequest {
            method: request.method().to_string(),
            path: request.uri().path().to_string(),
            query: request.uri().query().map(str::to_string),
            authorization: header(header::AUTHORIZATION.as_str()),
            accept_language: header(header::ACCEPT_LANGUAGE.as_str()),
            request_id: header("x-request-id"),
        };
        lock(&self.requests).push(recorded);
    }

    async fn authorize(&self, headers: &HeaderMap) -> Result<(), Response> {
        let expected = format!("Bearer {}", self.valid_access_token());
        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        if !self.reject_everything.load(Ordering::SeqCst) && presented == Some(expected.as_str())
        {
            return Ok(());
        }
        if let Some(barrier) = &self.unauthorized_barrier {
            barrier.wait().await;
        }
        Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Token expired" })),
        )
            .into_response())
    }

    fn issue_tokens(&self) -> Value {
        json!({
            "accessToken": self.valid_access_token(),
            "refreshToken": self.valid_refresh_token(),
            "user": { "id": 1, "name": "Aziz", "email": "aziz@example.uz", "roles": ["ROLE_USER"] }
        })
    }
}

// =============================================================================
// Routes
// =============================================================================

type Shared = State<Arc<BackendState>>;

async fn record_request(State(state): Shared, request: Request, next: Next) -> Response {
    state.record(&request);
    next.run(request).await
}

async fn sign_in(State(state): Shared, Json(body): Json<Value>) -> Response {
    if body["password"] == VALID_PASSWORD {
        Json(state.issue_tokens()).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Bad credentials" })),
        )
            .into_response()
    }
}

async fn sign_up(State(state): Shared, Json(body): Json<Value>) -> Response {
    if body["email"] == "taken@example.uz" {
        return (
            StatusCode::CONFLICT,
            Json(json!({ "message": "Email already registered" })),
        )
            .into_response();
    }
    let mut tokens = state.issue_tokens();
    tokens["user"] = Value::Null;
    (StatusCode::CREATED, Json(tokens)).into_response()
}

async fn refresh(State(state): Shared, Json(body): Json<Value>) -> Response {
    if let Some(delay) = state.refresh_delay {
        tokio::time::sleep(delay).await;
    }
    if body["refreshToken"] != state.valid_refresh_token() {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid refresh token" })),
        )
            .into_response();
    }

    let generation = state.token_generation.fetch_add(1, Ordering::SeqCst) + 1;
    let access = format!("access-{generation}");
    *lock(&state.access_token) = access.clone();

    if state.rotate_refresh_token {
        let rotated = format!("refresh-{generation}");
        *lock(&state.refresh_token) = rotated.clone();
        Json(json!({ "accessToken": access, "refreshToken": rotated })).into_response()
    } else {
        Json(json!({ "access_token": access })).into_response()
    }
}

async fn categories(headers: HeaderMap) -> Json<Value> {
    let name = match headers
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|v| v.to_str().ok())
    {
        Some("uz") => "Mehmonxona qulflari",
        Some("en") => "Hotel locks",
        _ => "Гостиничные замки",
    };
    Json(json!({
        "data": [
            { "id": 1, "name": name, "photoPath": "/img/hotel.png", "createdAt": "2024-01-01T00:00:00" }
        ]
    }))
}

async fn products(Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let page: u32 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(0);
    if page > 0 {
        return Json(json!({ "data": [] }));
    }
    let start = query.get("startPrice").and_then(|p| p.parse::<u64>().ok());
    let end = query.get("endPrice").and_then(|p| p.parse::<u64>().ok());

    let all = [
        json!({ "id": 7, "name": "Smart Lock X1", "price": 1_250_000, "lockType": "FINGERPRINT",
                "photos": ["/img/x1.jpg"] }),
        json!({ "id": 8, "name": "Hotel Card Lock", "price": 850_000, "lockType": "CARD",
                "photos": [], "hasGift": true, "gift": "Spare card" }),
    ];
    let data: Vec<Value> = all
        .into_iter()
        .filter(|p| {
            let price = p["price"].as_u64().unwrap_or_default();
            start.is_none_or(|s| price >= s) && end.is_none_or(|e| price <= e)
        })
        .collect();
    Json(json!({ "data": data }))
}

async fn profile(State(state): Shared, headers: HeaderMap) -> Response {
    if let Err(rejection) = state.authorize(&headers).await {
        return rejection;
    }
    Json(json!({
        "username": "aziz",
        "firstName": "Aziz",
        "lastName": "Karimov",
        "isAdmin": false
    }))
    .into_response()
}

async fn update_profile(State(state): Shared, headers: HeaderMap) -> Response {
    if let Err(rejection) = state.authorize(&headers).await {
        return rejection;
    }
    Json(json!({ "success": true, "message": "Profile updated" })).into_response()
}

async fn add_order(State(state): Shared, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if let Err(rejection) = state.authorize(&headers).await {
        return rejection;
    }
    if state.reject_orders.load(Ordering::SeqCst) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "message": "Promo code expired" })),
        )
            .into_response();
    }
    lock(&state.orders).push(body);
    Json(json!({ "success": true, "message": "Order accepted", "data": { "orderId": 101 } }))
        .into_response()
}

async fn lock_comments(State(state): Shared, Path(lock_id): Path<i64>) -> Json<Value> {
    let data: Vec<Value> = state
        .comments()
        .into_iter()
        .filter(|c| c["lockId"].as_i64() == Some(lock_id))
        .collect();
    Json(json!({ "success": true, "data": data }))
}

async fn add_comment(
    State(state): Shared,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Err(rejection) = state.authorize(&headers).await {
        return rejection;
    }
    let stored = {
        let mut comments = lock(&state.comments);
        let mut stored = body;
        stored["id"] = json!(comments.len() + 1);
        stored["userName"] = json!("Aziz");
        comments.push(stored.clone());
        stored
    };
    (
        StatusCode::CREATED,
        Json(json!({ "success": true, "message": "Comment added", "data": stored })),
    )
        .into_response()
}

async fn add_contact(Json(body): Json<Value>) -> Json<Value> {
    Json(body)
}

async fn add_application(Json(body): Json<Value>) -> Response {
    if body["lockAmount"].as_u64().unwrap_or_default() > 10_000 {
        return Json(json!({ "success": false, "message": "Amount too large" })).into_response();
    }
    Json(json!({ "success": true })).into_response()
}

fn router(state: Arc<BackendState>) -> Router {
    let api = Router::new()
        .route("/auth/sign-in", post(sign_in))
        .route("/auth/sign-up", post(sign_up))
        .route("/auth/refresh", post(refresh))
        .route("/category/get-all", get(categories))
        .route("/lock/get-all-by-filter", get(products))
        .route("/user/home", get(profile))
        .route("/user/update-profile", put(update_profile))
        .route("/comment/get-all-by-lock/{id}", get(lock_comments))
        .route("/comment/add", post(add_comment))
        .route("/order/add", post(add_order))
        .route("/contact/add", post(add_contact))
        .route("/application/add", post(add_application));

    Router::new()
        .nest("/api/v1", api)
        .layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            record_request,
        ))
        .with_state(state)
}

// =============================================================================
// MockBackend
// =============================================================================

/// A running mock backend. Shuts down when dropped.
pub struct MockBackend {
    addr: SocketAddr,
    state: Arc<BackendState>,
    shutdown: Option<oneshot::Sender<()>>,
    _handle: JoinHandle<()>,
}

impl MockBackend {
    /// Start a backend with default options.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        Self::start_with(BackendOptions::default()).await
    }

    /// Start a backend on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start_with(options: BackendOptions) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock backend");
        let addr = listener.local_addr().expect("mock backend address");
        let state = Arc::new(BackendState::new(&options));

        let app = router(Arc::clone(&state));
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app.into_make_service());
            let _ = serve
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            addr,
            state,
            shutdown: Some(shutdown_tx),
            _handle: handle,
        }
    }

    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api/v1", self.addr)
    }

    #[must_use]
    pub fn state(&self) -> &BackendState {
        &self.state
    }

    /// Client configuration pointing at this backend.
    ///
    /// # Panics
    ///
    /// Panics if the base URL is rejected, which would be a bug in the
    /// backend setup.
    #[must_use]
    pub fn config(&self) -> ClientConfig {
        let mut config = ClientConfig::new(&self.base_url()).expect("mock base url");
        config.http_timeout = Duration::from_secs(5);
        config
    }

    /// A session with no stored credentials.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn session(&self) -> SessionClient {
        SessionClient::new(self.config()).expect("session client")
    }

    /// A session holding an expired access token and the given refresh
    /// token.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn expired_session(&self, refresh_token: Option<&str>) -> SessionClient {
        let tokens = TokenStore::in_memory();
        tokens
            .set_credentials(&SessionCredentials::new(
                SecretString::from(EXPIRED_ACCESS_TOKEN),
                refresh_token.map(SecretString::from),
            ))
            .expect("store credentials");
        SessionClient::with_token_store(self.config(), tokens).expect("session client")
    }

    /// A session holding the currently valid tokens.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn signed_in_session(&self) -> SessionClient {
        let tokens = TokenStore::in_memory();
        tokens
            .set_credentials(&SessionCredentials::new(
                SecretString::from(self.state.valid_access_token()),
                Some(SecretString::from(self.state.valid_refresh_token())),
            ))
            .expect("store credentials");
        SessionClient::with_token_store(self.config(), tokens).expect("session client")
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

/// A cart product priced in whole so'm.
#[must_use]
pub fn cart_product(id: i64, name: &str, price: u64) -> CartProduct {
    CartProduct {
        id: ProductId::new(id),
        name: name.to_string(),
        price: Price::from_whole(price),
        image: format!("/img/{id}.jpg"),
        gift: None,
    }
}

/// A checkout form that passes validation.
#[must_use]
pub fn checkout_form() -> CheckoutForm {
    CheckoutForm {
        first_name: "Aziz".to_string(),
        last_name: "Karimov".to_string(),
        phone: "+998901234567".to_string(),
        email: Some("aziz@example.uz".to_string()),
        city: "Tashkent".to_string(),
        branch: "Chilonzor".to_string(),
        payment: PaymentType::WithCard,
        installation: true,
        comment: String::new(),
        promo_code: "WELCOME".to_string(),
    }
}
