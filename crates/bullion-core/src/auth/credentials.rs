use std::sync::RwLock;

use anyhow::{Context, Result};
use keyring::Entry;
use tracing::debug;

use super::TokenStore;

const SERVICE_NAME: &str = "bullion-desk";

/// Keychain account the access token is stored under
const TOKEN_ACCOUNT: &str = "token";

/// Token slot backed by the OS keychain.
pub struct KeyringTokenStore {
    entry: Entry,
    token: RwLock<Option<String>>,
}

impl KeyringTokenStore {
    pub fn open() -> Result<Self> {
        Self::open_account(TOKEN_ACCOUNT)
    }

    pub fn open_account(account: &str) -> Result<Self> {
        let entry = Entry::new(SERVICE_NAME, account).context("Failed to create keyring entry")?;
        let token = match entry.get_password() {
            Ok(token) => Some(token),
            Err(keyring::Error::NoEntry) => None,
            Err(e) => {
                return Err(e).context("Failed to retrieve token from keychain");
            }
        };
        debug!(has_token = token.is_some(), "Keychain token loaded");
        Ok(Self {
            entry,
            token: RwLock::new(token),
        })
    }
}

impl TokenStore for KeyringTokenStore {
    fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set(&self, token: &str) -> Result<()> {
        let mut slot = self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.entry
            .set_password(token)
            .context("Failed to store token in keychain")?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let mut slot = self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = None;
        match self.entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete token from keychain"),
        }
    }
}
