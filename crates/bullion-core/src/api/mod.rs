//! REST API client module for the bullion back-office services.
//!
//! This module provides the `ApiClient` every screen issues its requests
//! through. Requests travel down a middleware pipeline:
//!
//! `TracingMiddleware` -> `SessionRefreshMiddleware` -> `BearerAuthMiddleware`
//! -> `ReqwestTransport`
//!
//! The API uses bearer access tokens plus a refresh-token cookie; an expired
//! access token is refreshed once, transparently, per request.

pub mod client;
pub mod error;
pub mod middleware;
pub mod refresh;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{ApiClient, ApiClientBuilder};
pub use error::{ApiError, SessionEndReason};
pub use middleware::{BearerAuthMiddleware, Middleware, Next, TracingMiddleware};
pub use refresh::{RefreshOutcome, Refresher, SessionRefreshMiddleware};
pub use request::ApiRequest;
pub use response::ApiResponse;
pub use transport::{ReqwestTransport, Transport};

pub use reqwest::{Method, StatusCode};
