// In-process mock of the storefront API
// Shared by the integration tests; every route counts its hits

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};

use storefront_sync::session::MemoryCredentialStore;
use storefront_sync::{Credentials, Storefront, StorefrontConfig};

pub const USERNAME: &str = "alice";
pub const PASSWORD: &str = "secret";

#[derive(Clone)]
pub struct MockProduct {
    pub id: u64,
    pub name: String,
    pub price: f64,
    pub stock: u32,
}

pub struct MockUser {
    pub id: u64,
    pub password: String,
    pub balance: f64,
}

#[derive(Default)]
pub struct MockState {
    pub products: BTreeMap<u64, MockProduct>,
    pub users: HashMap<String, MockUser>,
    pub tokens: HashMap<String, u64>,
    pub carts: HashMap<u64, BTreeMap<u64, u32>>,
    pub hits: HashMap<String, usize>,
    /// Answer 401 to any request that carries a bearer token
    pub reject_tokens: bool,
    /// Answer 500 on the cart summary route
    pub fail_summary: bool,
    issued_tokens: u64,
}

impl MockState {
    fn seeded() -> Self {
        let mut state = Self::default();
        for (id, name, price, stock) in [
            (7, "Desk Lamp", 100.0, 3),
            (8, "Mug", 50.0, 10),
            (9, "Chair", 80.0, 0),
            (42, "Kettle", 25.5, 5),
        ] {
            state.products.insert(
                id,
                MockProduct {
                    id,
                    name: name.to_string(),
                    price,
                    stock,
                },
            );
        }
        state.users.insert(
            USERNAME.to_string(),
            MockUser {
                id: 1,
                password: PASSWORD.to_string(),
                balance: 200.0,
            },
        );
        state
    }

    fn hit(&mut self, route: &str) {
        *self.hits.entry(route.to_string()).or_insert(0) += 1;
    }

    fn issue_token(&mut self, user_id: u64) -> String {
        self.issued_tokens += 1;
        let token = format!("token-{}-{}", user_id, self.issued_tokens);
        self.tokens.insert(token.clone(), user_id);
        token
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<u64, Response> {
        let token = bearer(headers);
        if self.reject_tokens && token.is_some() {
            return Err(unauthorized());
        }
        token
            .and_then(|t| self.tokens.get(&t).copied())
            .ok_or_else(unauthorized)
    }

    fn user_mut(&mut self, user_id: u64) -> Option<(&String, &mut MockUser)> {
        self.users.iter_mut().find(|(_, u)| u.id == user_id)
    }

    fn cart_items(&self, user_id: u64) -> Vec<Value> {
        self.carts
            .get(&user_id)
            .map(|lines| {
                lines
                    .iter()
                    .map(|(product_id, quantity)| {
                        let Some(p) = self.products.get(product_id) else {
                            // Left join with the product row gone
                            return json!({
                                "id": product_id * 100 + user_id,
                                "userId": user_id,
                                "productId": product_id,
                                "productName": null,
                                "productDescription": null,
                                "productPrice": null,
                                "productImageUrl": null,
                                "productStock": null,
                                "quantity": quantity,
                                "totalPrice": null,
                            });
                        };
                        json!({
                            "id": product_id * 100 + user_id,
                            "userId": user_id,
                            "productId": p.id,
                            "productName": p.name,
                            "productDescription": format!("{} description", p.name),
                            "productPrice": p.price,
                            "productImageUrl": format!("/img/{}.png", p.id),
                            "productStock": p.stock,
                            "quantity": quantity,
                            "totalPrice": p.price * *quantity as f64,
                        })
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn cart_total(&self, user_id: u64) -> (usize, u64, f64) {
        let Some(lines) = self.carts.get(&user_id) else {
            return (0, 0, 0.0);
        };
        let quantity = lines.values().map(|q| *q as u64).sum();
        let amount = lines
            .iter()
            .filter_map(|(id, q)| self.products.get(id).map(|p| p.price * *q as f64))
            .sum();
        (lines.len(), quantity, amount)
    }

    fn product_json(p: &MockProduct) -> Value {
        json!({
            "id": p.id,
            "name": p.name,
            "description": format!("{} description", p.name),
            "price": p.price,
            "imageUrl": format!("/img/{}.png", p.id),
            "popularity": 10,
            "stock": p.stock,
        })
    }
}

type Shared = Arc<Mutex<MockState>>;

pub struct MockServer {
    pub base_url: String,
    pub state: Shared,
    handle: tokio::task::JoinHandle<()>,
}

impl MockServer {
    pub async fn start() -> Self {
        let state: Shared = Arc::new(Mutex::new(MockState::seeded()));
        let app = router(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            state,
            handle,
        }
    }

    pub fn config(&self) -> StorefrontConfig {
        StorefrontConfig::default().with_base_url(self.base_url.clone())
    }

    /// Fresh client with an empty in-memory credential store
    pub async fn storefront(&self) -> Storefront {
        Storefront::with_credentials(self.config(), Arc::new(MemoryCredentialStore::new()))
            .await
            .unwrap()
    }

    /// Client logged in as alice, with the post-login cart fetch landed
    pub async fn logged_in(&self) -> Storefront {
        let store = self.storefront().await;
        store
            .auth()
            .login(&Credentials::new(USERNAME, PASSWORD))
            .await
            .unwrap();
        eventually(|| self.hits("GET /api/cart/summary") >= 1).await;
        store
    }

    pub fn hits(&self, route: &str) -> usize {
        self.state.lock().hits.get(route).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.state.lock().hits.values().sum()
    }

    pub fn reject_tokens(&self, reject: bool) {
        self.state.lock().reject_tokens = reject;
    }

    pub fn fail_summary(&self, fail: bool) {
        self.state.lock().fail_summary = fail;
    }

    /// Delete a product while leaving cart lines that point at it
    pub fn remove_product(&self, product_id: u64) {
        self.state.lock().products.remove(&product_id);
    }

    /// Put a line straight into alice's server-side cart
    pub fn seed_cart(&self, product_id: u64, quantity: u32) {
        self.state
            .lock()
            .carts
            .entry(1)
            .or_default()
            .insert(product_id, quantity);
    }

    pub fn balance(&self) -> f64 {
        self.state.lock().users[USERNAME].balance
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Poll until `condition` holds, failing the test after two seconds
pub async fn eventually<F: Fn() -> bool>(condition: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("condition not reached within 2s");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/products", get(list_products))
        .route("/api/products/all", get(all_products))
        .route("/api/products/:id", get(get_product))
        .route("/api/products/:id/stock", get(product_stock))
        .route("/api/user/login", post(login))
        .route("/api/user/register", post(register))
        .route("/api/user/profile", get(profile))
        .route("/api/user/balance", get(balance))
        .route("/api/user/recharge", post(recharge))
        .route("/api/cart", get(cart_items))
        .route("/api/cart/summary", get(cart_summary))
        .route("/api/cart/add", post(cart_add))
        .route("/api/cart/update", put(cart_update))
        .route("/api/cart/remove/:product_id", delete(cart_remove))
        .route("/api/cart/clear", delete(cart_clear))
        .route("/api/cart/checkout", post(cart_checkout))
        .with_state(state)
}

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string)
}

fn unauthorized() -> Response {
    (StatusCode::UNAUTHORIZED, Json(json!({"error": "unauthorized"}))).into_response()
}

fn bad_request(message: &str) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({"error": message}))).into_response()
}

/// Public routes still honour `reject_tokens`
fn check_public(state: &MockState, headers: &HeaderMap) -> Result<(), Response> {
    if state.reject_tokens && bearer(headers).is_some() {
        return Err(unauthorized());
    }
    Ok(())
}

#[derive(Deserialize)]
struct ListQuery {
    #[serde(default)]
    page: usize,
    #[serde(default = "default_size")]
    size: usize,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    delay_ms: Option<u64>,
}

fn default_size() -> usize {
    8
}

async fn list_products(State(state): State<Shared>, headers: HeaderMap, Query(q): Query<ListQuery>) -> Response {
    if let Some(delay) = q.delay_ms {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }

    let mut s = state.lock();
    s.hit("GET /api/products");
    if let Err(resp) = check_public(&s, &headers) {
        return resp;
    }

    let all: Vec<&MockProduct> = s
        .products
        .values()
        .filter(|p| q.category.as_deref().map_or(true, |c| p.name.to_lowercase().contains(c)))
        .collect();
    let size = q.size.max(1);
    let total_pages = (all.len() + size - 1) / size;
    let content: Vec<Value> = all
        .iter()
        .skip(q.page * size)
        .take(size)
        .map(|p| MockState::product_json(p))
        .collect();

    Json(json!({
        "content": content,
        "totalPages": total_pages,
        "totalElements": all.len(),
        "size": size,
        "number": q.page,
    }))
    .into_response()
}

async fn all_products(State(state): State<Shared>) -> Response {
    let mut s = state.lock();
    s.hit("GET /api/products/all");
    let all: Vec<Value> = s.products.values().map(MockState::product_json).collect();
    Json(Value::Array(all)).into_response()
}

async fn get_product(State(state): State<Shared>, headers: HeaderMap, Path(id): Path<u64>) -> Response {
    let mut s = state.lock();
    s.hit("GET /api/products/{id}");
    if let Err(resp) = check_public(&s, &headers) {
        return resp;
    }
    match s.products.get(&id) {
        Some(p) => Json(MockState::product_json(p)).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn product_stock(State(state): State<Shared>, Path(id): Path<u64>) -> Response {
    let mut s = state.lock();
    s.hit("GET /api/products/{id}/stock");
    match s.products.get(&id) {
        Some(p) => Json(json!({"productId": p.id, "productName": p.name, "stock": p.stock})).into_response(),
        None => (StatusCode::NOT_FOUND, "product not found").into_response(),
    }
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

async fn login(State(state): State<Shared>, Json(body): Json<LoginBody>) -> Response {
    let mut s = state.lock();
    s.hit("POST /api/user/login");

    let user_id = match s.users.get(&body.username) {
        Some(user) if user.password == body.password => user.id,
        _ => {
            return (StatusCode::UNAUTHORIZED, Json(json!({"message": "invalid username or password"})))
                .into_response()
        }
    };

    let token = s.issue_token(user_id);
    Json(json!({
        "message": "login successful",
        "token": token,
        "user": {"id": user_id, "username": body.username, "email": "", "roles": ["ROLE_USER"]},
    }))
    .into_response()
}

#[derive(Deserialize)]
struct RegisterBody {
    username: String,
    password: String,
}

async fn register(State(state): State<Shared>, Json(body): Json<RegisterBody>) -> Response {
    let mut s = state.lock();
    s.hit("POST /api/user/register");

    if s.users.contains_key(&body.username) {
        return (StatusCode::BAD_REQUEST, "username already exists").into_response();
    }
    let id = s.users.len() as u64 + 1;
    s.users.insert(
        body.username,
        MockUser {
            id,
            password: body.password,
            balance: 0.0,
        },
    );
    (StatusCode::OK, "registration successful").into_response()
}

async fn profile(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut s = state.lock();
    s.hit("GET /api/user/profile");
    let user_id = match s.authorize(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match s.user_mut(user_id) {
        Some((name, user)) => Json(json!({
            "id": user.id,
            "username": name,
            "email": format!("{}@example.com", name),
            "enabled": true,
            "roles": ["ROLE_USER"],
            "balance": user.balance,
        }))
        .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn balance(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut s = state.lock();
    s.hit("GET /api/user/balance");
    let user_id = match s.authorize(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let balance = s.user_mut(user_id).map(|(_, u)| u.balance).unwrap_or_default();
    Json(json!({"balance": balance})).into_response()
}

#[derive(Deserialize)]
struct RechargeBody {
    amount: f64,
}

async fn recharge(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<RechargeBody>) -> Response {
    let mut s = state.lock();
    s.hit("POST /api/user/recharge");
    let user_id = match s.authorize(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if body.amount <= 0.0 {
        return bad_request("amount must be greater than 0");
    }
    let Some((_, user)) = s.user_mut(user_id) else {
        return bad_request("user not found");
    };
    user.balance += body.amount;
    Json(json!({"message": "recharge successful", "amount": body.amount, "balance": user.balance})).into_response()
}

async fn cart_items(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut s = state.lock();
    s.hit("GET /api/cart");
    match s.authorize(&headers) {
        Ok(user_id) => Json(Value::Array(s.cart_items(user_id))).into_response(),
        Err(resp) => resp,
    }
}

async fn cart_summary(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut s = state.lock();
    s.hit("GET /api/cart/summary");
    let user_id = match s.authorize(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    if s.fail_summary {
        return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"error": "summary unavailable"}))).into_response();
    }
    let (items, quantity, amount) = s.cart_total(user_id);
    Json(json!({"totalItems": items, "totalQuantity": quantity, "totalAmount": amount})).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineBody {
    product_id: u64,
    quantity: u32,
}

async fn cart_add(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<LineBody>) -> Response {
    let mut s = state.lock();
    s.hit("POST /api/cart/add");
    let user_id = match s.authorize(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Some(stock) = s.products.get(&body.product_id).map(|p| p.stock) else {
        return bad_request("product not found");
    };
    let current = s.carts.get(&user_id).and_then(|c| c.get(&body.product_id)).copied().unwrap_or(0);
    if current + body.quantity > stock {
        return bad_request("insufficient stock");
    }
    s.carts.entry(user_id).or_default().insert(body.product_id, current + body.quantity);

    let item = s
        .cart_items(user_id)
        .into_iter()
        .find(|i| i["productId"] == body.product_id)
        .unwrap_or(Value::Null);
    Json(item).into_response()
}

async fn cart_update(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<LineBody>) -> Response {
    let mut s = state.lock();
    s.hit("PUT /api/cart/update");
    let user_id = match s.authorize(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let Some(stock) = s.products.get(&body.product_id).map(|p| p.stock) else {
        return bad_request("product not found");
    };
    if body.quantity > stock {
        return bad_request("insufficient stock");
    }
    match s.carts.get_mut(&user_id).and_then(|c| c.get_mut(&body.product_id)) {
        Some(quantity) => *quantity = body.quantity,
        None => return bad_request("item not in cart"),
    }
    let item = s
        .cart_items(user_id)
        .into_iter()
        .find(|i| i["productId"] == body.product_id)
        .unwrap_or(Value::Null);
    Json(item).into_response()
}

async fn cart_remove(State(state): State<Shared>, headers: HeaderMap, Path(product_id): Path<u64>) -> Response {
    let mut s = state.lock();
    s.hit("DELETE /api/cart/remove/{id}");
    let user_id = match s.authorize(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    match s.carts.get_mut(&user_id).and_then(|c| c.remove(&product_id)) {
        Some(_) => Json(json!({"message": "removed from cart"})).into_response(),
        None => bad_request("item not in cart"),
    }
}

async fn cart_clear(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut s = state.lock();
    s.hit("DELETE /api/cart/clear");
    let user_id = match s.authorize(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    s.carts.remove(&user_id);
    Json(json!({"message": "cart cleared"})).into_response()
}

async fn cart_checkout(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut s = state.lock();
    s.hit("POST /api/cart/checkout");
    let user_id = match s.authorize(&headers) {
        Ok(id) => id,
        Err(resp) => return resp,
    };
    let (lines, _, total) = s.cart_total(user_id);
    if lines == 0 {
        return bad_request("cart is empty");
    }
    let Some((_, user)) = s.user_mut(user_id) else {
        return bad_request("user not found");
    };
    if user.balance < total {
        return bad_request("insufficient balance");
    }
    user.balance -= total;
    let remaining = user.balance;
    s.carts.remove(&user_id);

    Json(json!({
        "success": true,
        "message": "success",
        "totalAmount": total,
        "remainingBalance": remaining,
    }))
    .into_response()
}
