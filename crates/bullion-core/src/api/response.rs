use std::borrow::Cow;

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::ApiError;
use crate::models::{DataEnvelope, ErrorPayload};

/// A fully buffered response.
///
/// The body is read eagerly so middleware can look at error payloads and
/// still hand the response on untouched.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: StatusCode, headers: HeaderMap, body: Vec<u8>) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    pub async fn from_reqwest(response: reqwest::Response) -> Result<Self, ApiError> {
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(Self::new(status, headers, body))
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == StatusCode::UNAUTHORIZED
    }

    /// Deserialize the body. An empty body reads as `null`, so `()` and
    /// `Option<T>` work for 204 answers.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let body: &[u8] = if self.body.iter().all(u8::is_ascii_whitespace) {
            b"null"
        } else {
            &self.body
        };
        serde_json::from_slice(body).map_err(|e| {
            ApiError::InvalidResponse(format!(
                "Failed to parse JSON ({}): {}",
                e,
                ApiError::truncate_body(&self.text())
            ))
        })
    }

    /// Unwrap the `{ "data": ... }` envelope the API puts around payloads.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        self.json::<DataEnvelope<T>>().map(|envelope| envelope.data)
    }

    /// Structured `{ code, message }` body of an error response.
    pub fn error_payload(&self) -> Option<ErrorPayload> {
        if self.status.is_success() {
            return None;
        }
        serde_json::from_slice::<ErrorPayload>(&self.body)
            .ok()
            .filter(|p| p.code.is_some() || p.message.is_some())
    }

    /// Turn non-2xx responses into errors.
    pub fn error_for_status(self) -> Result<Self, ApiError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(ApiError::from_response(&self))
        }
    }
}
