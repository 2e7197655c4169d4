//! Transport abstraction for running HTTP requests.
//!
//! The [`NetworkManager`](crate::NetworkManager) never talks to the network
//! directly. It hands each [`Request`] to a [`Transport`] and pulls the body
//! chunk by chunk from the returned [`ResponseBody`], which is where progress
//! is measured.
//!
//! # Implementations
//!
//! - [`ReqwestTransport`]: real HTTP(S) via `reqwest`
//! - [`MemoryTransport`]: canned in-memory responses for tests and offline use
//!
//! Both traits return boxed futures so they stay dyn-compatible and can be
//! shared as `Arc<dyn Transport>`.

mod http;
mod memory;

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;

use crate::error::NetworkResult;
use crate::request::Request;

pub use http::ReqwestTransport;
pub use memory::{CannedResponse, Failure, MemoryTransport};

/// Boxed future type for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Streaming body of a response whose head has been received.
pub trait ResponseBody: Send {
    /// HTTP status of the response.
    fn status(&self) -> StatusCode;

    /// Response headers.
    fn headers(&self) -> &HeaderMap;

    /// Declared body length, if the server sent one.
    fn content_length(&self) -> Option<u64>;

    /// Next chunk of the body, or `None` at the end of the body.
    fn next_chunk(&mut self) -> BoxFuture<'_, NetworkResult<Option<Bytes>>>;
}

/// Runs requests and returns streaming responses.
pub trait Transport: Send + Sync {
    /// Short name for logging.
    fn name(&self) -> &str;

    /// Send a request and wait for the response head.
    ///
    /// Connection-level failures are reported here. Non-success HTTP statuses
    /// are not errors at this layer.
    fn send<'a>(
        &'a self,
        request: &'a Request,
    ) -> BoxFuture<'a, NetworkResult<Box<dyn ResponseBody>>>;
}
