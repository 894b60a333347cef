//! `reqwest` implementation of the HTTP collaborator.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use url::Url;

use super::{ApiRequest, ApiResponse, HttpMethod, HttpRequester};
use crate::config::CartConfig;

/// Client for the Medicart REST backend.
///
/// Holds the session token for requests marked `auth_required`. Clones share
/// the connection pool and the token.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<RestClientInner>,
}

struct RestClientInner {
    client: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<SecretString>>,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("token", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Create a new client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(config: &CartConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(RestClientInner {
                client,
                base_url: config.api_base_url.clone(),
                token: RwLock::new(None),
            }),
        })
    }

    /// Attach a session token to subsequent authenticated requests.
    pub async fn set_token(&self, token: SecretString) {
        *self.inner.token.write().await = Some(token);
    }

    /// Forget the session token.
    pub async fn clear_token(&self) {
        *self.inner.token.write().await = None;
    }

    /// Whether a session token is present.
    pub async fn has_token(&self) -> bool {
        self.inner.token.read().await.is_some()
    }

    /// Resolve a request path against the base URL, keeping any path prefix
    /// the base URL carries (e.g. `https://host/api`).
    fn resolve(&self, path: &str, params: &[(String, String)]) -> Result<Url, url::ParseError> {
        let base = self.inner.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        let mut url = Url::parse(&format!("{base}/{path}"))?;
        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));
        }
        Ok(url)
    }

    async fn send(&self, request: ApiRequest) -> Result<Value, String> {
        let url = self
            .resolve(&request.url, &request.params)
            .map_err(|e| format!("Invalid request URL {}: {e}", request.url))?;

        let mut builder = self.inner.client.request(to_reqwest_method(request.method), url);

        if request.auth_required {
            let token = self.inner.token.read().await;
            let Some(token) = token.as_ref() else {
                return Err("Not authenticated".to_string());
            };
            builder = builder.bearer_auth(token.expose_secret());
        }

        if let Some(payload) = &request.payload {
            builder = builder.json(payload);
        }

        let response = builder.send().await.map_err(|e| e.to_string())?;
        let status = response.status();
        let body = response.text().await.map_err(|e| e.to_string())?;

        if !status.is_success() {
            warn!(
                status = %status,
                body = %body.chars().take(200).collect::<String>(),
                "Backend returned non-success status"
            );
            return Err(error_message(status, &body));
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        serde_json::from_str(&body).map_err(|e| format!("Invalid response body: {e}"))
    }
}

#[async_trait]
impl HttpRequester for RestClient {
    #[instrument(skip(self, request), fields(method = request.method.as_str(), url = %request.url))]
    async fn request(&self, request: ApiRequest) -> ApiResponse {
        match self.send(request).await {
            Ok(data) => {
                debug!("Request succeeded");
                ApiResponse::ok(data)
            }
            Err(message) => ApiResponse::err(message),
        }
    }
}

const fn to_reqwest_method(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
        HttpMethod::Delete => Method::DELETE,
    }
}

/// Pull a readable message out of an error body, falling back to the status.
fn error_message(status: reqwest::StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| {
            ["message", "error"]
                .iter()
                .find_map(|key| value.get(key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| format!("HTTP {status}"))
}
