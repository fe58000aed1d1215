use std::sync::RwLock;

use anyhow::Result;

/// A single mutable slot holding the current access token.
///
/// Shared by every in-flight request. Implementations must make `set` and
/// `clear` atomic with respect to `get`: a reader sees either the old or the
/// new token, never a mix.
pub trait TokenStore: Send + Sync {
    fn get(&self) -> Option<String>;

    fn set(&self, token: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;

    fn has_token(&self) -> bool {
        self.get().is_some()
    }
}

/// In-process token slot. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: RwLock<Option<String>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(token.into())),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn get(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn set(&self, token: &str) -> Result<()> {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}
