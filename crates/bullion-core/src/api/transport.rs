use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{header, Client};
use tracing::debug;

use super::{ApiError, ApiRequest, ApiResponse};
use crate::config::Config;

/// The bottom of the pipeline: puts a request on the wire.
pub trait Transport: Send + Sync {
    fn execute<'a>(&'a self, request: &'a ApiRequest) -> BoxFuture<'a, Result<ApiResponse, ApiError>>;
}

/// reqwest-backed transport.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
    base_url: String,
}

impl ReqwestTransport {
    pub fn new(config: &Config) -> Result<Self, ApiError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        // The refresh token lives in a server-managed cookie, so the jar
        // must be shared by every request including the refresh call.
        let mut builder = Client::builder()
            .default_headers(headers)
            .cookie_store(true);
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: config.base_url().to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, request: &ApiRequest) -> String {
        format!("{}{}", self.base_url, request.normalized_path())
    }
}

impl Transport for ReqwestTransport {
    fn execute<'a>(&'a self, request: &'a ApiRequest) -> BoxFuture<'a, Result<ApiResponse, ApiError>> {
        async move {
            let url = self.url_for(request);
            debug!(method = %request.method, url = %url, "Sending request");

            let mut builder = self
                .client
                .request(request.method.clone(), &url)
                .headers(request.headers.clone());
            if !request.query.is_empty() {
                builder = builder.query(&request.query);
            }
            if let Some(ref body) = request.body {
                builder = builder.json(body);
            }

            let response = builder.send().await?;
            ApiResponse::from_reqwest(response).await
        }
        .boxed()
    }
}
