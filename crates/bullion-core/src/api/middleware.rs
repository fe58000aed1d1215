//! Request middleware.
//!
//! A middleware sees the request on its way down and the response on its way
//! back up. It may rewrite the request, short-circuit, or call `next` more
//! than once (the refresh layer does, to retry).

use std::sync::Arc;
use std::time::Instant;

use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, warn};

use super::transport::Transport;
use super::{ApiError, ApiRequest, ApiResponse};
use crate::auth::TokenStore;
use crate::config::Config;

pub trait Middleware: Send + Sync {
    fn handle<'a>(
        &'a self,
        request: ApiRequest,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<ApiResponse, ApiError>>;
}

/// The remainder of the pipeline below the current middleware.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    middleware: &'a [Arc<dyn Middleware>],
    transport: &'a dyn Transport,
}

impl<'a> Next<'a> {
    pub fn new(middleware: &'a [Arc<dyn Middleware>], transport: &'a dyn Transport) -> Self {
        Self {
            middleware,
            transport,
        }
    }

    pub fn run(self, request: ApiRequest) -> BoxFuture<'a, Result<ApiResponse, ApiError>> {
        match self.middleware.split_first() {
            Some((current, rest)) => current.handle(request, Next::new(rest, self.transport)),
            None => {
                let transport = self.transport;
                async move { transport.execute(&request).await }.boxed()
            }
        }
    }
}

/// Attaches `Authorization: Bearer <token>` to every non-public request.
pub struct BearerAuthMiddleware {
    config: Arc<Config>,
    store: Arc<dyn TokenStore>,
}

impl BearerAuthMiddleware {
    pub fn new(config: Arc<Config>, store: Arc<dyn TokenStore>) -> Self {
        Self { config, store }
    }
}

impl Middleware for BearerAuthMiddleware {
    fn handle<'a>(
        &'a self,
        mut request: ApiRequest,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<ApiResponse, ApiError>> {
        async move {
            if !self.config.is_public_path(&request.normalized_path()) {
                if let Some(token) = self.store.get() {
                    request.set_bearer(&token)?;
                }
            }
            next.run(request).await
        }
        .boxed()
    }
}

/// Logs every request with its outcome and latency.
#[derive(Default)]
pub struct TracingMiddleware;

impl Middleware for TracingMiddleware {
    fn handle<'a>(
        &'a self,
        request: ApiRequest,
        next: Next<'a>,
    ) -> BoxFuture<'a, Result<ApiResponse, ApiError>> {
        async move {
            let method = request.method.clone();
            let path = request.path.clone();
            let started = Instant::now();

            let result = next.run(request).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match &result {
                Ok(response) => {
                    debug!(%method, %path, status = response.status().as_u16(), elapsed_ms, "Request finished")
                }
                Err(e) => warn!(%method, %path, elapsed_ms, error = %e, "Request failed"),
            }
            result
        }
        .boxed()
    }
}
