//! HTTP transport backed by `reqwest`.

use std::time::Duration;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode};

use super::{BoxFuture, ResponseBody, Transport};
use crate::config::ManagerConfig;
use crate::error::{NetworkError, NetworkResult};
use crate::request::Request;

/// Real HTTP transport using a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Create a transport using the timeout and user agent from `config`.
    pub fn new(config: &ManagerConfig) -> NetworkResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                NetworkError::InvalidRequest(format!("failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            timeout: config.timeout,
        })
    }

    /// Configured client-level timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Map a reqwest error onto the closed error set.
fn map_error(url: &str, err: reqwest::Error, timeout: Duration) -> NetworkError {
    if err.is_timeout() {
        NetworkError::Timeout {
            url: url.to_string(),
            timeout_secs: timeout.as_secs(),
        }
    } else if err.is_builder() {
        NetworkError::InvalidRequest(err.to_string())
    } else if err.is_connect() || err.is_request() {
        NetworkError::Unreachable {
            url: url.to_string(),
            reason: err.to_string(),
        }
    } else {
        NetworkError::Transfer {
            url: url.to_string(),
            reason: err.to_string(),
        }
    }
}

impl Transport for ReqwestTransport {
    fn name(&self) -> &str {
        "reqwest"
    }

    fn send<'a>(
        &'a self,
        request: &'a Request,
    ) -> BoxFuture<'a, NetworkResult<Box<dyn ResponseBody>>> {
        Box::pin(async move {
            let url = request.url().to_string();
            let timeout = request.timeout().unwrap_or(self.timeout);

            let mut builder = self
                .client
                .request(request.method().clone(), request.url().clone())
                .headers(request.headers().clone())
                .timeout(timeout);
            if let Some(body) = request.body() {
                builder = builder.body(body.clone());
            }

            let response = builder
                .send()
                .await
                .map_err(|e| map_error(&url, e, timeout))?;

            Ok(Box::new(ReqwestBody {
                url,
                timeout,
                response,
            }) as Box<dyn ResponseBody>)
        })
    }
}

struct ReqwestBody {
    url: String,
    timeout: Duration,
    response: reqwest::Response,
}

impl ResponseBody for ReqwestBody {
    fn status(&self) -> StatusCode {
        self.response.status()
    }

    fn headers(&self) -> &HeaderMap {
        self.response.headers()
    }

    fn content_length(&self) -> Option<u64> {
        self.response.content_length()
    }

    fn next_chunk(&mut self) -> BoxFuture<'_, NetworkResult<Option<Bytes>>> {
        Box::pin(async move {
            let timeout = self.timeout;
            let url = &self.url;
            self.response
                .chunk()
                .await
                .map_err(|e| map_error(url, e, timeout))
        })
    }
}
