//! In-memory transport serving canned responses.
//!
//! Responses are registered per URL. Each one can be split into chunks,
//! delayed between chunks, or scripted to fail, which makes it possible to
//! drive every path of the manager without a network.
//!
//! ```ignore
//! use netmanager::transport::{CannedResponse, MemoryTransport};
//!
//! let transport = MemoryTransport::new()
//!     .with_route("http://test/data.bin", CannedResponse::ok(vec![0u8; 4096]).with_chunk_size(512))
//!     .with_route("http://test/down", CannedResponse::unreachable());
//! ```

use std::collections::HashMap;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};

use super::{BoxFuture, ResponseBody, Transport};
use crate::error::{NetworkError, NetworkResult};
use crate::request::Request;

/// Default chunk size for canned bodies (16KB).
const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

/// Scripted failure for a canned response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// Fail the request as if the host could not be reached.
    Unreachable,
    /// Never answer. Only a timeout or cancellation ends the request.
    Stall,
    /// Break the body stream after this many bytes.
    BreakAfter(usize),
}

/// A response registered with [`MemoryTransport`].
#[derive(Debug, Clone)]
pub struct CannedResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    chunk_size: usize,
    chunk_delay: Duration,
    declare_length: bool,
    failure: Option<Failure>,
}

impl CannedResponse {
    /// A `200 OK` response with the given body.
    pub fn ok(body: impl Into<Bytes>) -> Self {
        Self::with_status(StatusCode::OK, body)
    }

    /// A response with an arbitrary status.
    pub fn with_status(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: Duration::ZERO,
            declare_length: true,
            failure: None,
        }
    }

    /// A request to this URL fails as unreachable.
    pub fn unreachable() -> Self {
        Self::ok(Bytes::new()).with_failure(Failure::Unreachable)
    }

    /// A request to this URL never gets an answer.
    pub fn stall() -> Self {
        Self::ok(Bytes::new()).with_failure(Failure::Stall)
    }

    /// Add a response header. Invalid headers are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Deliver the body in chunks of `size` bytes (minimum 1).
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    /// Sleep this long before each chunk.
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = delay;
        self
    }

    /// Do not declare a content length, so the total is unknown.
    pub fn without_length(mut self) -> Self {
        self.declare_length = false;
        self
    }

    /// Script a failure.
    pub fn with_failure(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }
}

/// Transport answering from a table of canned responses.
///
/// Unknown URLs are answered with `404 Not Found` and an empty body.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    routes: RwLock<HashMap<String, CannedResponse>>,
    requests: Mutex<Vec<(Method, String)>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route, builder style.
    pub fn with_route(self, url: &str, response: CannedResponse) -> Self {
        self.insert(url, response);
        self
    }

    /// Register or replace a route.
    pub fn insert(&self, url: &str, response: CannedResponse) {
        self.routes.write().insert(normalize(url), response);
    }

    /// Remove a route. Returns true if it existed.
    pub fn remove(&self, url: &str) -> bool {
        self.routes.write().remove(&normalize(url)).is_some()
    }

    /// Requests seen so far, in order.
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.requests.lock().clone()
    }
}

fn normalize(url: &str) -> String {
    Url::parse(url)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| url.to_string())
}

impl Transport for MemoryTransport {
    fn name(&self) -> &str {
        "memory"
    }

    fn send<'a>(
        &'a self,
        request: &'a Request,
    ) -> BoxFuture<'a, NetworkResult<Box<dyn ResponseBody>>> {
        Box::pin(async move {
            let url = request.url().to_string();
            self.requests
                .lock()
                .push((request.method().clone(), url.clone()));

            let canned = self.routes.read().get(&url).cloned();
            let canned = match canned {
                Some(canned) => canned,
                None => CannedResponse::with_status(StatusCode::NOT_FOUND, Bytes::new()),
            };

            match canned.failure {
                Some(Failure::Unreachable) => {
                    return Err(NetworkError::Unreachable {
                        url,
                        reason: "no route to host".to_string(),
                    })
                }
                Some(Failure::Stall) => std::future::pending::<()>().await,
                _ => {}
            }

            let body = if *request.method() == Method::HEAD {
                Bytes::new()
            } else {
                canned.body.clone()
            };

            Ok(Box::new(MemoryBody {
                url,
                content_length: canned.declare_length.then_some(canned.body.len() as u64),
                status: canned.status,
                headers: canned.headers,
                body,
                offset: 0,
                chunk_size: canned.chunk_size,
                chunk_delay: canned.chunk_delay,
                break_after: match canned.failure {
                    Some(Failure::BreakAfter(n)) => Some(n),
                    _ => None,
                },
            }) as Box<dyn ResponseBody>)
        })
    }
}

struct MemoryBody {
    url: String,
    content_length: Option<u64>,
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
    offset: usize,
    chunk_size: usize,
    chunk_delay: Duration,
    break_after: Option<usize>,
}

impl ResponseBody for MemoryBody {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    fn next_chunk(&mut self) -> BoxFuture<'_, NetworkResult<Option<Bytes>>> {
        Box::pin(async move {
            if !self.chunk_delay.is_zero() {
                tokio::time::sleep(self.chunk_delay).await;
            }

            let len = self.body.len();
            if let Some(limit) = self.break_after {
                if limit < len && self.offset >= limit {
                    return Err(NetworkError::Transfer {
                        url: self.url.clone(),
                        reason: "connection reset by peer".to_string(),
                    });
                }
            }
            if self.offset >= len {
                return Ok(None);
            }

            let mut end = (self.offset + self.chunk_size).min(len);
            if let Some(limit) = self.break_after {
                if limit > self.offset {
                    end = end.min(limit);
                }
            }

            let chunk = self.body.slice(self.offset..end);
            self.offset = end;
            Ok(Some(chunk))
        })
    }
}
