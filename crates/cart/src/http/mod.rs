//! HTTP request collaborator.
//!
//! The cart never talks to a transport directly. It hands an [`ApiRequest`]
//! to an [`HttpRequester`] and gets back an [`ApiResponse`] with either
//! `data` or a human-readable `error`. Ordinary failures (bad status,
//! unreachable host, missing token) are reported through `error`, never by
//! panicking or returning a transport error type.
//!
//! # Implementations
//!
//! - [`RestClient`] - `reqwest`-based client for the Medicart REST backend

pub mod cart_api;
mod rest;

pub use cart_api::{CartApi, ServerCart};
pub use rest::RestClient;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::CartError;

/// HTTP methods used by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

/// A request for the HTTP collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Path relative to the backend base URL (e.g. `/user/get-cart`).
    pub url: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// JSON body.
    pub payload: Option<Value>,
    /// Query parameters.
    pub params: Vec<(String, String)>,
    /// Whether the session token must be attached.
    pub auth_required: bool,
}

impl ApiRequest {
    /// Build a request without body or query parameters.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            payload: None,
            params: Vec::new(),
            auth_required: false,
        }
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }

    /// Append a query parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((key.into(), value.into()));
        self
    }

    /// Require the session token.
    #[must_use]
    pub const fn authenticated(mut self) -> Self {
        self.auth_required = true;
        self
    }
}

/// Result of a request: either `data` or a human-readable `error`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiResponse {
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl ApiResponse {
    /// Successful response.
    #[must_use]
    pub const fn ok(data: Value) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    /// Failed response.
    #[must_use]
    pub fn err(message: impl Into<String>) -> Self {
        Self {
            data: None,
            error: Some(message.into()),
        }
    }

    /// Collapse into a `Result`. A present `error` wins over `data`; a missing
    /// body is `Value::Null`.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Network` carrying the error message.
    pub fn into_result(self) -> Result<Value, CartError> {
        match self.error {
            Some(message) => Err(CartError::Network(message)),
            None => Ok(self.data.unwrap_or(Value::Null)),
        }
    }
}

/// Performs HTTP calls on behalf of the cart.
///
/// Implementations own headers, retries, and timeouts.
#[async_trait]
pub trait HttpRequester: Send + Sync {
    async fn request(&self, request: ApiRequest) -> ApiResponse;
}
