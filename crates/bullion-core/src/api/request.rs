use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

use super::ApiError;

/// A request descriptor that can be sent, inspected by middleware, and
/// re-sent once after a token refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the configured API base URL, e.g. `/cost-centers`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: HeaderMap,
    retried: bool,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: HeaderMap::new(),
            retried: false,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn json_value(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a serializable body.
    pub fn json<B: Serialize + ?Sized>(self, body: &B) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body)
            .map_err(|e| ApiError::InvalidRequest(format!("Failed to serialize body: {}", e)))?;
        Ok(self.json_value(value))
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Set `Authorization: Bearer <token>`, replacing any previous value.
    pub fn set_bearer(&mut self, token: &str) -> Result<(), ApiError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ApiError::InvalidRequest("Access token is not a valid header value".into()))?;
        value.set_sensitive(true);
        self.headers.insert(header::AUTHORIZATION, value);
        Ok(())
    }

    /// The bearer token currently attached, if any.
    pub fn bearer(&self) -> Option<&str> {
        self.headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }

    /// Reject absolute URLs; the base location is process-wide config.
    pub fn validate(&self) -> Result<(), ApiError> {
        let lower = self.path.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("//") {
            return Err(ApiError::InvalidRequest(format!(
                "Expected a relative API path, got {}",
                self.path
            )));
        }
        if self.path.is_empty() {
            return Err(ApiError::InvalidRequest("Empty request path".into()));
        }
        Ok(())
    }

    /// Path with a guaranteed leading slash.
    pub fn normalized_path(&self) -> String {
        if self.path.starts_with('/') {
            self.path.clone()
        } else {
            format!("/{}", self.path)
        }
    }
}
