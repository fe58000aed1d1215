//! Wire models for the back-office API.
//!
//! - `DataEnvelope`, `AccessTokenPayload`, `ErrorPayload`, `LoginCredentials`:
//!   the pinned auth/error payload shapes
//! - `RegistryEntry`, `BalancedEntry`: registry/statement rows and their
//!   running balance

pub mod auth;
pub mod registry;

pub use auth::{AccessTokenPayload, DataEnvelope, ErrorPayload, LoginCredentials};
pub use registry::{running_balances, totals, BalancedEntry, RegistryEntry, StatementTotals};
