//! API client for the bullion back-office REST API.
//!
//! This module provides the `ApiClient` struct all screens issue requests
//! through, plus the login/register/logout calls that manage the token.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info, warn};

use super::middleware::{BearerAuthMiddleware, Middleware, Next, TracingMiddleware};
use super::refresh::{Refresher, SessionRefreshMiddleware};
use super::transport::{ReqwestTransport, Transport};
use super::{ApiError, ApiRequest, ApiResponse};
use crate::auth::{open_token_store, TokenStore};
use crate::config::Config;
use crate::models::{AccessTokenPayload, LoginCredentials};
use crate::session::{SessionExpiryNotifier, SessionPresenter, TracingPresenter};

/// Assembles an `ApiClient`. Anything not supplied falls back to what the
/// config selects.
pub struct ApiClientBuilder {
    config: Config,
    store: Option<Arc<dyn TokenStore>>,
    presenter: Option<Arc<dyn SessionPresenter>>,
    transport: Option<Arc<dyn Transport>>,
    extra_middleware: Vec<Arc<dyn Middleware>>,
}

impl ApiClientBuilder {
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn presenter(mut self, presenter: Arc<dyn SessionPresenter>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Append a middleware. It runs innermost, after the bearer token has
    /// been attached.
    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.extra_middleware.push(middleware);
        self
    }

    pub fn build(self) -> Result<ApiClient> {
        let config = Arc::new(self.config);

        let store = match self.store {
            Some(store) => store,
            None => open_token_store(&config).context("Failed to open token store")?,
        };
        let presenter = self
            .presenter
            .unwrap_or_else(|| Arc::new(TracingPresenter));
        let transport: Arc<dyn Transport> = match self.transport {
            Some(transport) => transport,
            None => Arc::new(
                ReqwestTransport::new(&config).context("Failed to build HTTP client")?,
            ),
        };

        let notifier = Arc::new(SessionExpiryNotifier::new(
            Arc::clone(&store),
            presenter,
            &config,
        ));
        let refresher = Refresher::new(Arc::clone(&transport), config.refresh_path.clone());

        let mut pipeline: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(TracingMiddleware),
            Arc::new(SessionRefreshMiddleware::new(
                Arc::clone(&config),
                Arc::clone(&store),
                refresher,
                Arc::clone(&notifier),
            )),
            Arc::new(BearerAuthMiddleware::new(Arc::clone(&config), Arc::clone(&store))),
        ];
        pipeline.extend(self.extra_middleware);

        Ok(ApiClient {
            config,
            store,
            transport,
            pipeline: pipeline.into(),
            notifier,
        })
    }
}

/// Authenticated client for the back-office API.
/// Clone is cheap - all state is shared behind `Arc`s.
#[derive(Clone)]
pub struct ApiClient {
    config: Arc<Config>,
    store: Arc<dyn TokenStore>,
    transport: Arc<dyn Transport>,
    pipeline: Arc<[Arc<dyn Middleware>]>,
    notifier: Arc<SessionExpiryNotifier>,
}

impl ApiClient {
    /// Create a client with the backends selected in `config`.
    pub fn new(config: Config) -> Result<Self> {
        Self::builder(config).build()
    }

    pub fn builder(config: Config) -> ApiClientBuilder {
        ApiClientBuilder {
            config,
            store: None,
            presenter: None,
            transport: None,
            extra_middleware: Vec::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn token_store(&self) -> &Arc<dyn TokenStore> {
        &self.store
    }

    pub fn notifier(&self) -> &Arc<SessionExpiryNotifier> {
        &self.notifier
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.has_token()
    }

    /// Send a request through the middleware pipeline.
    ///
    /// Any response that is not an unrecoverable authentication failure is
    /// returned as is, error statuses included.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        request.validate()?;
        Next::new(&self.pipeline, self.transport.as_ref())
            .run(request)
            .await
    }

    /// Send and deserialize the JSON body, failing on non-2xx.
    pub async fn send_json<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.send(request).await?.error_for_status()?.json()
    }

    /// Send and unwrap the `{ "data": ... }` envelope, failing on non-2xx.
    pub async fn send_data<T: DeserializeOwned>(&self, request: ApiRequest) -> Result<T, ApiError> {
        self.send(request).await?.error_for_status()?.data()
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(ApiRequest::get(path)).await
    }

    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let request = query
            .iter()
            .fold(ApiRequest::get(path), |req, (k, v)| req.query(*k, *v));
        self.send_json(request).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send_json(ApiRequest::post(path).json(body)?).await
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send_json(ApiRequest::put(path).json(body)?).await
    }

    pub async fn patch<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        self.send_json(ApiRequest::patch(path).json(body)?).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send_json(ApiRequest::delete(path)).await
    }

    // ===== Session =====

    /// Log in and store the access token from `{ data: { accessToken } }`.
    pub async fn login(&self, credentials: &LoginCredentials) -> Result<(), ApiError> {
        let request = ApiRequest::post(self.config.login_path.clone()).json(credentials)?;
        let payload: AccessTokenPayload = self.send_data(request).await?;
        if payload.access_token.is_empty() {
            return Err(ApiError::InvalidResponse(
                "Login returned an empty access token".into(),
            ));
        }
        self.store
            .set(&payload.access_token)
            .map_err(ApiError::storage)?;
        info!(username = %credentials.username, "Logged in");
        Ok(())
    }

    /// Create an account. Returns the unwrapped `data` payload.
    pub async fn register<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        body: &B,
    ) -> Result<T, ApiError> {
        let request = ApiRequest::post(self.config.register_path.clone()).json(body)?;
        self.send_data(request).await
    }

    /// Tell the server to drop the refresh cookie, then clear the local
    /// token no matter what the server answered.
    ///
    /// Goes straight to the transport: a rejected logout must not trigger a
    /// refresh or a session-expired restart.
    pub async fn logout(&self) -> Result<(), ApiError> {
        let mut request = ApiRequest::new(Method::POST, self.config.logout_path.clone());
        if let Some(token) = self.store.get() {
            request.set_bearer(&token)?;
        }

        match self.transport.execute(&request).await {
            Ok(response) if response.is_success() => debug!("Server session closed"),
            Ok(response) => warn!(status = response.status().as_u16(), "Logout rejected by server"),
            Err(e) => warn!(error = %e, "Logout request failed"),
        }

        self.store.clear().map_err(ApiError::storage)?;
        info!("Logged out");
        Ok(())
    }
}
