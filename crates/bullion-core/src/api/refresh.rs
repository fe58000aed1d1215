//! Silent access-token refresh.
//!
//! The refresh credential is a server-managed cookie this client never sees;
//! `POST /refresh` exchanges it for a fresh access token. The
//! `SessionRefreshMiddleware` drives the per-request state machine:
//!
//! ```text
//! Initial -> Sent -> Succeeded
//!                 -> AuthFailed -> Refreshing -> RetrySent -> Succeeded | SessionExpired
//!                                             -> SessionExpired | Failed
//! ```
//!
//! `AuthFailed -> Refreshing` is taken at most once per request.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Method;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::error::SessionEndReason;
use super::middleware::{Middleware, Next};
use super::transport::Transport;
use super::{ApiError, ApiRequest, ApiResponse};
use crate::auth::TokenStore;
use crate::config::Config;
use crate::models::{AccessTokenPayload, ErrorPayload};
use crate::session::SessionExpiryNotifier;

pub const REFRESH_TOKEN_EXPIRED: &str = "REFRESH_TOKEN_EXPIRED";
pub const INVALID_REFRESH_TOKEN: &str = "INVALID_REFRESH_TOKEN";
pub const MISSING_REFRESH_TOKEN: &str = "MISSING_REFRESH_TOKEN";

/// Message the server sends when only a fresh login can help.
pub const REFRESH_EXPIRED_MESSAGE: &str = "Refresh token has expired. Please log in again.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Success(String),
    ExpiredRefreshToken,
    InvalidRefreshToken,
    MissingRefreshToken,
    OtherFailure(String),
}

impl RefreshOutcome {
    /// Map a refresh error payload to its tagged failure, if it has one.
    pub fn from_error_payload(payload: &ErrorPayload) -> Option<Self> {
        match payload.code.as_deref() {
            Some(REFRESH_TOKEN_EXPIRED) => return Some(RefreshOutcome::ExpiredRefreshToken),
            Some(INVALID_REFRESH_TOKEN) => return Some(RefreshOutcome::InvalidRefreshToken),
            Some(MISSING_REFRESH_TOKEN) => return Some(RefreshOutcome::MissingRefreshToken),
            _ => {}
        }
        if payload.message.as_deref() == Some(REFRESH_EXPIRED_MESSAGE) {
            return Some(RefreshOutcome::ExpiredRefreshToken);
        }
        None
    }

    pub fn from_response(response: &ApiResponse) -> Self {
        if response.is_success() {
            return match response.data::<AccessTokenPayload>() {
                Ok(payload) if !payload.access_token.is_empty() => {
                    RefreshOutcome::Success(payload.access_token)
                }
                Ok(_) => RefreshOutcome::OtherFailure("Refresh returned an empty access token".into()),
                Err(e) => RefreshOutcome::OtherFailure(e.to_string()),
            };
        }

        response
            .error_payload()
            .and_then(|payload| Self::from_error_payload(&payload))
            .unwrap_or_else(|| {
                RefreshOutcome::OtherFailure(ApiError::from_response(response).to_string())
            })
    }

    /// Terminal failures end the session; `OtherFailure` does not.
    pub fn session_end_reason(&self) -> Option<SessionEndReason> {
        match self {
            RefreshOutcome::ExpiredRefreshToken => Some(SessionEndReason::RefreshTokenExpired),
            RefreshOutcome::InvalidRefreshToken => Some(SessionEndReason::InvalidRefreshToken),
            RefreshOutcome::MissingRefreshToken => Some(SessionEndReason::MissingRefreshToken),
            RefreshOutcome::Success(_) | RefreshOutcome::OtherFailure(_) => None,
        }
    }
}

/// True when an error response says the refresh token itself is gone,
/// regardless of status code.
pub fn signals_refresh_expired(response: &ApiResponse) -> bool {
    response.error_payload().is_some_and(|p| {
        p.code.as_deref() == Some(REFRESH_TOKEN_EXPIRED)
            || p.message.as_deref() == Some(REFRESH_EXPIRED_MESSAGE)
    })
}

/// Issues the refresh call straight to the transport, bypassing the
/// middleware pipeline.
#[derive(Clone)]
pub struct Refresher {
    transport: Arc<dyn Transport>,
    path: String,
}

impl Refresher {
    pub fn new(transport: Arc<dyn Transport>, path: impl Into<String>) -> Self {
        Self {
            transport,
            path: path.into(),
        }
    }

    /// One `POST /refresh` with no body. Never retries.
    pub async fn refresh(&self) -> RefreshOutcome {
        let request = ApiRequest::new(Method::POST, self.path.clone());
        match self.transport.execute(&request).await {
            Ok(response) => RefreshOutcome::from_response(&response),
            Err(e) => RefreshOutcome::OtherFailure(e.to_string()),
        }
    }
}

/// Recovers from an expired access token with one refresh and one retry.
pub struct SessionRefreshMiddleware {
    config: Arc<Config>,
    store: Arc<dyn TokenStore>,
    refresher: Refresher,
    notifier: Arc<SessionExpiryNotifier>,
    /// Present when concurrent refreshes are coalesced.
    refresh_lock: Option<Mutex<()>>,
}

impl SessionRefreshMiddleware {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn TokenStore>,
        refresher: Refresher,
        notifier: Arc<SessionExpiryNotifier>,
    ) -> Self {
        let refresh_lock = config.coalesce_refresh.then(|| Mutex::new(()));
        Self {
            config,
            store,
            refresher,
            notifier,
            refresh_lock,
        }
    }

    fn expire(&self, reason: SessionEndReason) -> ApiError {
        warn!(%reason, "Session cannot be recovered");
        self.notifier.notify_expired();
        ApiError::SessionExpired(reason)
    }

    /// Make a usable token available: either one a concurrent request
    /// already obtained, or a new one from the refresh endpoint.
    async fn recover(&self, sent_token: Option<String>) -> Result<(), ApiError> {
        let _guard = match self.refresh_lock {
            Some(ref lock) => Some(lock.lock().await),
            None => None,
        };

        if self.refresh_lock.is_some() {
            let current = self.store.get();
            if current != sent_token {
                return match current {
                    Some(_) => {
                        debug!("Token was refreshed by a concurrent request");
                        Ok(())
                    }
                    None => Err(ApiError::SessionExpired(SessionEndReason::SessionCleared)),
                };
            }
        }

        match self.refresher.refresh().await {
            RefreshOutcome::Success(token) => {
                self.store.set(&token).map_err(ApiError::storage)?;
                info!("Access token refreshed");
                Ok(())
            }
            outcome => match outcome.session_end_reason() {
                Some(reason) => Err(self.expire(reason)),
                None => {
                    let reason = match outcome {
                        RefreshOutcome::OtherFailure(reason) => reason,
                        other => format!("{:?}", other),
                    };
                    warn!(%reason, "Token refresh failed");
                    Err(ApiError::RefreshFailed(reason))
                }
            },
        }
    }
}

impl Middleware for SessionRefreshMiddleware {
    fn handle<'a>(
        &'a self,
        mut request: ApiRequest,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<ApiResponse, ApiError>> {
        async move {
            if self.config.is_public_path(&request.normalized_path()) {
                return next.run(request).await;
            }

            let sent_token = self.store.get();
            let response = next.run(request.clone()).await?;

            if signals_refresh_expired(&response) {
                return Err(self.expire(SessionEndReason::RefreshTokenExpired));
            }
            if !response.is_unauthorized() {
                return Ok(response);
            }

            debug!(path = %request.path, "Access token rejected, refreshing");
            request.mark_retried();
            self.recover(sent_token).await?;

            let retried = next.run(request).await?;
            if retried.is_unauthorized() || signals_refresh_expired(&retried) {
                return Err(self.expire(SessionEndReason::RetryRejected));
            }
            Ok(retried)
        }
        .boxed()
    }
}
