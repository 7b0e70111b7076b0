//! Typed client for the AuditPulse REST API.
//!
//! Every call reads the bearer token from storage at request time; nothing is
//! cached on the client. Calls are never retried here.

use std::sync::Arc;

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::storage::{Storage, TOKEN_KEY};

mod audits;
mod auth;
mod error;
mod subscriptions;

pub use audits::{AuditArtifact, AuditSource, filename_from_disposition};
pub use error::{ApiError, ApiResult};

/// Standard User-Agent header for AuditPulse API requests.
pub const USER_AGENT: &str = concat!("auditpulse/", env!("CARGO_PKG_VERSION"));

const JSON: &str = "application/json";

/// Request payload encodings accepted by the backend.
#[derive(Debug, Clone)]
pub enum Body {
    Empty,
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded` fields (password-grant login only).
    Form(Vec<(&'static str, String)>),
}

impl Body {
    /// # Errors
    /// Returns an error if `value` cannot be represented as JSON.
    pub fn json<T: Serialize>(value: &T) -> ApiResult<Self> {
        serde_json::to_value(value)
            .map(Body::Json)
            .map_err(|err| ApiError::new(None, format!("Failed to encode request: {err}")))
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    storage: Arc<dyn Storage>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, storage: Arc<dyn Storage>) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            storage,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URL for a resource path such as `/audits/`.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Current bearer token, read fresh from storage.
    pub fn token(&self) -> Option<String> {
        self.storage
            .get(TOKEN_KEY)
            .filter(|token| !token.trim().is_empty())
    }

    /// Performs a call and decodes the JSON response into `T`.
    ///
    /// # Errors
    /// Returns an [`ApiError`] for transport failures, non-2xx statuses, and
    /// bodies that do not decode into `T`.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Body,
    ) -> ApiResult<T> {
        let response = self.send(method, path, body).await?;
        let status = response.status().as_u16();
        let bytes = response.bytes().await.map_err(|err| ApiError::transport(&err))?;
        serde_json::from_slice(&bytes).map_err(|err| ApiError::decode(status, err))
    }

    /// Like [`ApiClient::request`] but ignores the response body.
    ///
    /// # Errors
    /// Returns an [`ApiError`] for transport failures and non-2xx statuses.
    pub async fn request_empty(&self, method: Method, path: &str, body: Body) -> ApiResult<()> {
        let response = self.send(method, path, body).await?;
        response
            .bytes()
            .await
            .map(|_| ())
            .map_err(|err| ApiError::transport(&err))
    }

    /// Sends the request and returns the successful response with its headers.
    pub(crate) async fn send(&self, method: Method, path: &str, body: Body) -> ApiResult<Response> {
        let builder = self.build(method.clone(), path, body);
        let response = builder.send().await.map_err(|err| {
            debug!(%method, path, error = %err, "request failed before response");
            ApiError::transport(&err)
        })?;
        let status = response.status();
        debug!(%method, path, status = status.as_u16(), "api response");
        Self::check(response).await
    }

    fn build(&self, method: Method, path: &str, body: Body) -> RequestBuilder {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSON));

        let mut builder = self.http.request(method, self.url(path));
        builder = match body {
            Body::Empty => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
                builder
            }
            Body::Json(value) => builder.json(&value),
            Body::Form(fields) => builder.form(&fields),
        };
        builder = builder.headers(headers);

        match self.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::from_response(status.as_u16(), &body))
    }
}
