//! Access token storage.
//!
//! This module provides:
//! - `TokenStore`: the single shared slot every request reads its bearer
//!   token from
//! - `MemoryTokenStore`: process-local backing
//! - `FileTokenStore`: token persisted under the cache directory
//! - `KeyringTokenStore`: token persisted in the OS keychain
//!
//! Only login and the refresh flow write the slot; the session expiry
//! notifier and logout clear it.

pub mod credentials;
pub mod session;
pub mod token_store;

use std::sync::Arc;

use anyhow::Result;

use crate::config::{Config, TokenBackend};

pub use credentials::KeyringTokenStore;
pub use session::{FileTokenStore, SessionFile};
pub use token_store::{MemoryTokenStore, TokenStore};

/// Open the token store selected in the config.
pub fn open_token_store(config: &Config) -> Result<Arc<dyn TokenStore>> {
    let store: Arc<dyn TokenStore> = match config.token_backend {
        TokenBackend::Memory => Arc::new(MemoryTokenStore::new()),
        TokenBackend::File => Arc::new(FileTokenStore::open(config.cache_dir()?)?),
        TokenBackend::Keyring => Arc::new(KeyringTokenStore::open()?),
    };
    Ok(store)
}
