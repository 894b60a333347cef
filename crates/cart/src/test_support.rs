//! Test doubles for the cart's collaborators.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::http::cart_api::{ADD_TO_CART, CHANGE_QUANTITY, GET_CART, REMOVE_FROM_CART};
use crate::http::{ApiRequest, ApiResponse, HttpMethod, HttpRequester};
use crate::storage::{KeyValueStore, MemoryStore, StorageError};

/// In-process stand-in for the cart endpoints.
#[derive(Clone, Default)]
pub(crate) struct FakeBackend {
    inner: Arc<Mutex<FakeBackendState>>,
}

#[derive(Default)]
struct FakeBackendState {
    cart: Vec<(String, u32)>,
    requests: Vec<ApiRequest>,
    failing_paths: HashMap<String, String>,
    failing_items: HashSet<String>,
    delay: Option<Duration>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_cart(items: &[(&str, u32)]) -> Self {
        let backend = Self::new();
        backend.lock().cart = items.iter().map(|(id, q)| ((*id).to_string(), *q)).collect();
        backend
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeBackendState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Every request to `path` fails with `message`.
    pub(crate) fn fail_path(&self, path: &str, message: &str) {
        self.lock()
            .failing_paths
            .insert(path.to_string(), message.to_string());
    }

    /// Adds of this item fail.
    pub(crate) fn fail_item(&self, item_id: &str) {
        self.lock().failing_items.insert(item_id.to_string());
    }

    /// Each request waits this long before answering.
    pub(crate) fn set_delay(&self, delay: Duration) {
        self.lock().delay = Some(delay);
    }

    pub(crate) fn requests(&self) -> Vec<ApiRequest> {
        self.lock().requests.clone()
    }

    pub(crate) fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.url == path)
            .collect()
    }

    pub(crate) fn cart(&self) -> Vec<(String, u32)> {
        self.lock().cart.clone()
    }
}

fn field<'a>(payload: &'a Value, key: &str) -> Option<&'a Value> {
    payload.get(key)
}

#[async_trait]
impl HttpRequester for FakeBackend {
    async fn request(&self, request: ApiRequest) -> ApiResponse {
        let delay = {
            let mut state = self.lock();
            state.requests.push(request.clone());
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        if let Some(message) = state.failing_paths.get(&request.url) {
            return ApiResponse::err(message.clone());
        }

        let payload = request.payload.clone().unwrap_or(Value::Null);
        let item_id = field(&payload, "productId")
            .or_else(|| field(&payload, "itemId"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let quantity = field(&payload, "quantity")
            .and_then(Value::as_u64)
            .and_then(|q| u32::try_from(q).ok());

        match (request.method, request.url.as_str(), item_id) {
            (HttpMethod::Get, GET_CART, _) => {
                let items: Vec<Value> = state
                    .cart
                    .iter()
                    .map(|(id, q)| json!({"itemId": id, "quantity": q}))
                    .collect();
                ApiResponse::ok(json!({ "items": items }))
            }
            (HttpMethod::Post, ADD_TO_CART, Some(id)) => {
                if state.failing_items.contains(&id) {
                    return ApiResponse::err("Product out of stock");
                }
                let quantity = quantity.unwrap_or(1);
                if let Some(entry) = state.cart.iter_mut().find(|(existing, _)| *existing == id) {
                    entry.1 += quantity;
                } else {
                    state.cart.push((id, quantity));
                }
                ApiResponse::ok(json!({"message": "Added to cart"}))
            }
            (HttpMethod::Put, CHANGE_QUANTITY, Some(id)) => {
                if let Some(entry) = state.cart.iter_mut().find(|(existing, _)| *existing == id) {
                    entry.1 = quantity.unwrap_or(entry.1);
                }
                ApiResponse::ok(json!({"message": "Quantity updated"}))
            }
            (HttpMethod::Put, REMOVE_FROM_CART, Some(id)) => {
                state.cart.retain(|(existing, _)| *existing != id);
                ApiResponse::ok(json!({"message": "Removed"}))
            }
            _ => ApiResponse::err("HTTP 404 Not Found"),
        }
    }
}

/// Memory store that counts writes.
#[derive(Clone, Default)]
pub(crate) struct CountingStore {
    pub(crate) inner: MemoryStore,
    writes: Arc<AtomicUsize>,
}

impl CountingStore {
    pub(crate) fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl KeyValueStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove(key).await
    }
}

/// Memory store that can hold one write back before applying it.
#[derive(Clone, Default)]
pub(crate) struct StallingStore {
    pub(crate) inner: MemoryStore,
    stall: Arc<Mutex<Option<Duration>>>,
}

impl StallingStore {
    /// Delay the next `set` by `delay`. Its value is captured on entry.
    pub(crate) fn stall_next_write(&self, delay: Duration) {
        *self.stall.lock().unwrap_or_else(PoisonError::into_inner) = Some(delay);
    }
}

#[async_trait]
impl KeyValueStore for StallingStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let stall = self.stall.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(delay) = stall {
            tokio::time::sleep(delay).await;
        }
        self.inner.set(key, value).await
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key).await
    }
}

/// Storage whose every operation fails.
pub(crate) struct BrokenStore;

#[async_trait]
impl KeyValueStore for BrokenStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Io(std::io::Error::other("disk unavailable")))
    }

    async fn set(&self, _key: &str, _value: String) -> Result<(), StorageError> {
        Err(StorageError::Io(std::io::Error::other("disk unavailable")))
    }

    async fn remove(&self, _key: &str) -> Result<(), StorageError> {
        Err(StorageError::Io(std::io::Error::other("disk unavailable")))
    }
}
