//! Integration tests for Medicart cart synchronization.
//!
//! [`TestBackend`] serves the four cart endpoints from memory on a random
//! local port, so tests drive the real `RestClient` over HTTP.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p medicart-integration-tests
//! ```

use std::collections::{HashMap, HashSet};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    routing::{get, post, put},
};
use medicart_cart::CartConfig;
use serde::Deserialize;
use serde_json::{Value, json};
use url::Url;

/// Token the backend accepts.
pub const VALID_TOKEN: &str = "test-session-token";

pub const GET_CART: &str = "/user/get-cart";
pub const ADD_TO_CART: &str = "/user/add-to-cart";
pub const CHANGE_QUANTITY: &str = "/user/change-cart-product-quantity";
pub const REMOVE_FROM_CART: &str = "/user/remove-item-from-cart";

#[derive(Default)]
struct BackendState {
    cart: Vec<(String, u32)>,
    hits: HashMap<&'static str, usize>,
    out_of_stock: HashSet<String>,
    bodies: Vec<Value>,
}

type Shared = Arc<Mutex<BackendState>>;

/// In-memory cart server.
pub struct TestBackend {
    addr: SocketAddr,
    state: Shared,
    server: tokio::task::JoinHandle<()>,
}

impl TestBackend {
    /// Bind to `127.0.0.1:0` and start serving.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn start() -> Self {
        let state = Shared::default();
        let app = Router::new()
            .route(GET_CART, get(get_cart))
            .route(ADD_TO_CART, post(add_to_cart))
            .route(CHANGE_QUANTITY, put(change_quantity))
            .route(REMOVE_FROM_CART, put(remove_item))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test backend");
        let addr = listener.local_addr().expect("Listener has no address");
        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("Test backend stopped: {e}");
            }
        });

        Self {
            addr,
            state,
            server,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Base URL of the running server.
    ///
    /// # Panics
    ///
    /// Panics if the bound address does not form a URL.
    #[must_use]
    pub fn base_url(&self) -> Url {
        Url::parse(&format!("http://{}", self.addr)).expect("Invalid backend URL")
    }

    /// Cart configuration pointing at this server.
    #[must_use]
    pub fn config(&self) -> CartConfig {
        CartConfig::new(self.base_url())
    }

    /// Put items in the server cart.
    pub fn seed(&self, items: &[(&str, u32)]) {
        self.lock().cart = items
            .iter()
            .map(|(id, quantity)| ((*id).to_string(), *quantity))
            .collect();
    }

    /// Make adds of this product fail with 409.
    pub fn mark_out_of_stock(&self, product_id: &str) {
        self.lock().out_of_stock.insert(product_id.to_string());
    }

    /// Current server cart.
    #[must_use]
    pub fn cart(&self) -> Vec<(String, u32)> {
        self.lock().cart.clone()
    }

    /// Authorized requests received on `path`.
    #[must_use]
    pub fn hits(&self, path: &str) -> usize {
        self.lock().hits.get(path).copied().unwrap_or(0)
    }

    /// JSON bodies received, in order.
    #[must_use]
    pub fn bodies(&self) -> Vec<Value> {
        self.lock().bodies.clone()
    }
}

impl Drop for TestBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// ============================================================================
// Handlers
// ============================================================================

type Reply = (StatusCode, Json<Value>);

fn reply(status: StatusCode, body: Value) -> Reply {
    (status, Json(body))
}

fn authorize(headers: &HeaderMap) -> Result<(), Reply> {
    let expected = format!("Bearer {VALID_TOKEN}");
    match headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        Some(value) if value == expected => Ok(()),
        _ => Err(reply(
            StatusCode::UNAUTHORIZED,
            json!({"message": "Invalid session token"}),
        )),
    }
}

fn record<'a>(state: &'a Shared, path: &'static str, body: Option<&Value>) -> std::sync::MutexGuard<'a, BackendState> {
    let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
    *state.hits.entry(path).or_default() += 1;
    if let Some(body) = body {
        state.bodies.push(body.clone());
    }
    state
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddBody {
    product_id: String,
    quantity: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemBody {
    item_id: String,
    #[serde(default)]
    quantity: Option<u32>,
}

async fn get_cart(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    if let Err(denied) = authorize(&headers) {
        return denied;
    }
    let state = record(&state, GET_CART, None);
    let items: Vec<Value> = state
        .cart
        .iter()
        .map(|(id, quantity)| {
            json!({
                "itemId": id,
                "quantity": quantity,
                "product": {"name": format!("Product {id}"), "price": "25.00"}
            })
        })
        .collect();
    reply(StatusCode::OK, json!({"cart": {"items": items}}))
}

async fn add_to_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    if let Err(denied) = authorize(&headers) {
        return denied;
    }
    let mut state = record(&state, ADD_TO_CART, Some(&body));
    let Ok(add) = serde_json::from_value::<AddBody>(body) else {
        return reply(StatusCode::BAD_REQUEST, json!({"error": "Malformed body"}));
    };
    if state.out_of_stock.contains(&add.product_id) {
        return reply(
            StatusCode::CONFLICT,
            json!({"message": "Product out of stock"}),
        );
    }
    if let Some(line) = state.cart.iter_mut().find(|(id, _)| *id == add.product_id) {
        line.1 += add.quantity;
    } else {
        state.cart.push((add.product_id, add.quantity));
    }
    reply(StatusCode::OK, json!({"message": "Added to cart"}))
}

async fn change_quantity(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    if let Err(denied) = authorize(&headers) {
        return denied;
    }
    let mut state = record(&state, CHANGE_QUANTITY, Some(&body));
    let Ok(ItemBody {
        item_id,
        quantity: Some(quantity),
    }) = serde_json::from_value::<ItemBody>(body)
    else {
        return reply(StatusCode::BAD_REQUEST, json!({"error": "Malformed body"}));
    };
    match state.cart.iter_mut().find(|(id, _)| *id == item_id) {
        Some(line) => {
            line.1 = quantity;
            reply(StatusCode::OK, json!({"message": "Quantity updated"}))
        }
        None => reply(StatusCode::NOT_FOUND, json!({"message": "Item not in cart"})),
    }
}

async fn remove_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    if let Err(denied) = authorize(&headers) {
        return denied;
    }
    let mut state = record(&state, REMOVE_FROM_CART, Some(&body));
    let Ok(ItemBody { item_id, .. }) = serde_json::from_value::<ItemBody>(body) else {
        return reply(StatusCode::BAD_REQUEST, json!({"error": "Malformed body"}));
    };
    state.cart.retain(|(id, _)| *id != item_id);
    reply(StatusCode::OK, json!({"message": "Removed from cart"}))
}
