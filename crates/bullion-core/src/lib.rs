//! Core library for the bullion back-office API.
//!
//! Everything the back-office screens need to talk to the REST API lives
//! here:
//!
//! - `api`: the authenticated `ApiClient`, its middleware pipeline and the
//!   silent token refresh flow
//! - `auth`: token storage backends behind the `TokenStore` trait
//! - `session`: the session expiry notifier
//! - `models`: wire payloads and the registry running-balance helper
//! - `config`: process-wide configuration

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod session;
pub mod utils;

pub use api::{ApiClient, ApiError, ApiRequest, ApiResponse};
pub use auth::{FileTokenStore, KeyringTokenStore, MemoryTokenStore, TokenStore};
pub use config::{Config, TokenBackend};
pub use session::{SessionExpiryNotifier, SessionPresenter, TracingPresenter};
