//! Session expiry handling.
//!
//! When silent refresh is no longer possible the `SessionExpiryNotifier`
//! clears the stored token, shows a short warning and then asks the front
//! end for a full restart at the entry route.

pub mod notifier;

pub use notifier::{SessionExpiryNotifier, SessionPresenter, TracingPresenter, SESSION_EXPIRED_WARNING};
