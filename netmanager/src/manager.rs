//! The Network Manager: runs requests and reports through callbacks.
//!
//! Every operation runs as its own tokio task on the runtime captured when
//! the manager was built. Within that task the manager:
//!
//! 1. waits for a concurrency slot (bounded by
//!    [`ManagerConfig::max_concurrent_operations`]),
//! 2. sends the request through the [`Transport`],
//! 3. streams the body, reporting progress fractions as it goes,
//! 4. delivers the payload to the data callback on success,
//! 5. delivers the final result to the completion callback, exactly once.
//!
//! All callbacks of an operation run on the worker executing that task, one
//! after another. The only exception is an operation started after
//! [`NetworkManager::shutdown`]: it is completed with
//! [`NetworkError::Shutdown`] on the calling thread before `fetch` returns.
//!
//! # Example
//!
//! ```ignore
//! use netmanager::{ManagerConfig, NetworkManager, Request};
//!
//! let manager = NetworkManager::new(ManagerConfig::default())?;
//!
//! // Future style
//! let response = manager.send(Request::get("https://example.com/")?, None).await?;
//!
//! // Callback style
//! let handle = manager.fetch_data(
//!     Request::get("https://example.com/big.bin")?,
//!     Some(Box::new(|fraction| println!("{:.0}%", fraction * 100.0))),
//!     Some(Box::new(|bytes| println!("got {} bytes", bytes.len()))),
//!     netmanager::with_error_code(|len, code| println!("done: {:?} code {}", len, code)),
//! );
//! handle.wait().await;
//! ```

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::BytesMut;
use serde::de::DeserializeOwned;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::callback::{
    CallbackDispatcher, CompletionCallback, DataCallback, Handlers, ProgressCallback,
};
use crate::config::ManagerConfig;
use crate::error::{NetworkError, NetworkResult};
use crate::operation::{OperationHandle, OperationId, OperationStatus};
use crate::progress::ProgressTracker;
use crate::request::{Request, Response};
use crate::transport::{ReqwestTransport, Transport};

/// Upper bound for the initial body buffer, whatever the declared length.
const INITIAL_BUFFER_CAP: u64 = 1024 * 1024;

/// Runs network operations and reports their outcome.
///
/// Cloning is cheap; clones share the transport, the concurrency limit and
/// the shutdown state.
#[derive(Clone)]
pub struct NetworkManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: ManagerConfig,
    transport: Arc<dyn Transport>,
    runtime: Handle,
    permits: Arc<Semaphore>,
    shutdown: CancellationToken,
    next_id: AtomicU64,
    in_flight: Arc<AtomicUsize>,
}

impl std::fmt::Debug for NetworkManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkManager")
            .field("config", &self.inner.config)
            .field("transport", &self.inner.transport.name())
            .field("in_flight", &self.in_flight())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Decrements the in-flight counter when an operation task ends, however it ends.
struct InFlightGuard(Arc<AtomicUsize>);

impl InFlightGuard {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl NetworkManager {
    /// Create a manager using the real HTTP transport.
    ///
    /// Must be called from within a tokio runtime; otherwise this fails
    /// with [`NetworkError::Shutdown`].
    pub fn new(config: ManagerConfig) -> NetworkResult<Self> {
        let transport = ReqwestTransport::new(&config)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a manager with a custom transport on the current runtime.
    pub fn with_transport(
        config: ManagerConfig,
        transport: Arc<dyn Transport>,
    ) -> NetworkResult<Self> {
        let runtime = Handle::try_current().map_err(|_| NetworkError::Shutdown)?;
        Ok(Self::with_runtime(config, transport, runtime))
    }

    /// Create a manager whose operations run on the given runtime.
    pub fn with_runtime(
        config: ManagerConfig,
        transport: Arc<dyn Transport>,
        runtime: Handle,
    ) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_operations.max(1)));
        Self {
            inner: Arc::new(Inner {
                config,
                transport,
                runtime,
                permits,
                shutdown: CancellationToken::new(),
                next_id: AtomicU64::new(1),
                in_flight: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    /// Number of operations that have not completed yet.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.shutdown.is_cancelled()
    }

    /// Cancel every in-flight operation and refuse new ones.
    ///
    /// Operations already transferring complete with
    /// [`NetworkError::Cancelled`]; operations still waiting for a slot
    /// complete with [`NetworkError::Shutdown`].
    pub fn shutdown(&self) {
        if !self.inner.shutdown.is_cancelled() {
            debug!(in_flight = self.in_flight(), "Shutting down network manager");
        }
        self.inner.shutdown.cancel();
    }

    /// Run a request and report the full response.
    pub fn fetch(&self, request: Request, handlers: Handlers<Response>) -> OperationHandle {
        self.start(request, handlers, Ok)
    }

    /// Run a request with the three classic callbacks.
    ///
    /// The completion callback receives the payload length on success; the
    /// payload itself goes to the data callback first.
    pub fn fetch_data(
        &self,
        request: Request,
        progress: Option<ProgressCallback>,
        data: Option<DataCallback>,
        completion: CompletionCallback<u64>,
    ) -> OperationHandle {
        let handlers = Handlers::from_parts(progress, data, Some(completion));
        self.start(request, handlers, |response| {
            Ok(response.body().len() as u64)
        })
    }

    /// Run a request and decode the body as JSON.
    ///
    /// A body that fails to decode completes with [`NetworkError::Decode`]
    /// and the data callback is not invoked.
    pub fn fetch_json<T>(&self, request: Request, handlers: Handlers<T>) -> OperationHandle
    where
        T: DeserializeOwned + Send + 'static,
    {
        self.start(request, handlers, |response| response.json::<T>())
    }

    /// Run a request and await the response.
    ///
    /// Dropping the returned future cancels the operation.
    pub async fn send(
        &self,
        request: Request,
        progress: Option<ProgressCallback>,
    ) -> NetworkResult<Response> {
        let (tx, rx) = oneshot::channel();
        let completion: CompletionCallback<Response> =
            Box::new(move |result: NetworkResult<Response>| {
                // The receiver is gone only if the caller stopped waiting.
                let _ = tx.send(result);
            });

        let handle = self.fetch(request, Handlers::from_parts(progress, None, Some(completion)));
        let guard = handle.cancellation_token().drop_guard();

        let result = rx.await.unwrap_or(Err(NetworkError::Shutdown));
        let _ = guard.disarm();
        result
    }

    fn start<T, F>(&self, request: Request, handlers: Handlers<T>, finish: F) -> OperationHandle
    where
        T: Send + 'static,
        F: FnOnce(Response) -> NetworkResult<T> + Send + 'static,
    {
        let id = OperationId::new(self.inner.next_id.fetch_add(1, Ordering::SeqCst));
        let cancel = self.inner.shutdown.child_token();
        let (progress_tx, progress_rx) = watch::channel(0.0);
        let (status_tx, status_rx) = watch::channel(None);
        let handle = OperationHandle::new(id, cancel.clone(), progress_rx, status_rx);

        let mut dispatcher = CallbackDispatcher::new(id, handlers).with_progress_watch(progress_tx);

        if self.is_shut_down() {
            debug!(op = %id, url = %request.url(), "Rejected operation after shutdown");
            let result: NetworkResult<T> = Err(NetworkError::Shutdown);
            let status = OperationStatus::from_result(&result);
            dispatcher.complete(result);
            status_tx.send_replace(Some(status));
            return handle;
        }

        let guard = InFlightGuard::enter(&self.inner.in_flight);
        let inner = Arc::clone(&self.inner);

        self.inner.runtime.spawn(async move {
            let started = Instant::now();
            debug!(
                op = %id,
                method = %request.method(),
                url = %request.url(),
                transport = inner.transport.name(),
                "Operation started"
            );

            let outcome = match inner.run(&request, &cancel, &mut dispatcher).await {
                Ok(response) => {
                    let payload = response.body().clone();
                    finish(response).map(|value| (value, payload))
                }
                Err(e) => Err(e),
            };

            let result = match outcome {
                Ok((value, payload)) => {
                    debug!(
                        op = %id,
                        url = %request.url(),
                        bytes = payload.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Operation succeeded"
                    );
                    dispatcher.data(payload);
                    Ok(value)
                }
                Err(e) => {
                    if e.is_cancellation() {
                        debug!(
                            op = %id,
                            url = %request.url(),
                            code = e.code().value(),
                            "Operation cancelled"
                        );
                    } else {
                        warn!(
                            op = %id,
                            url = %request.url(),
                            code = e.code().value(),
                            error = %e,
                            "Operation failed"
                        );
                    }
                    Err(e)
                }
            };

            let status = OperationStatus::from_result(&result);
            dispatcher.complete(result);
            drop(guard);
            status_tx.send_replace(Some(status));
        });

        handle
    }
}

impl Inner {
    /// Wait for a slot, then transfer under the operation's timeout.
    async fn run<T>(
        &self,
        request: &Request,
        cancel: &CancellationToken,
        dispatcher: &mut CallbackDispatcher<T>,
    ) -> NetworkResult<Response> {
        let _permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(if self.shutdown.is_cancelled() {
                    NetworkError::Shutdown
                } else {
                    NetworkError::Cancelled
                });
            }
            permit = Arc::clone(&self.permits).acquire_owned() => {
                permit.map_err(|_| NetworkError::Shutdown)?
            }
        };

        let timeout = request.timeout().unwrap_or(self.config.timeout);
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(NetworkError::Cancelled),
            result = tokio::time::timeout(timeout, self.transfer(request, dispatcher)) => {
                result.unwrap_or_else(|_| Err(timeout_error(request, timeout)))
            }
        }
    }

    /// Send the request and collect the body, reporting progress.
    async fn transfer<T>(
        &self,
        request: &Request,
        dispatcher: &mut CallbackDispatcher<T>,
    ) -> NetworkResult<Response> {
        let mut body = self.transport.send(request).await?;
        let url = request.url();

        let status = body.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let limit = self.config.max_body_bytes;
        let declared = body.content_length();
        if declared.is_some_and(|len| len > limit) {
            return Err(too_large(request, limit));
        }

        let mut tracker = ProgressTracker::new(declared, self.config.progress_step);
        let capacity = declared.unwrap_or(0).min(INITIAL_BUFFER_CAP) as usize;
        let mut buffer = BytesMut::with_capacity(capacity);

        while let Some(chunk) = body.next_chunk().await? {
            if (buffer.len() + chunk.len()) as u64 > limit {
                return Err(too_large(request, limit));
            }
            buffer.extend_from_slice(&chunk);

            if let Some(fraction) = tracker.advance(chunk.len() as u64) {
                dispatcher.progress(fraction);
            }
        }
        if let Some(fraction) = tracker.finish() {
            dispatcher.progress(fraction);
        }

        Ok(Response::new(
            url.clone(),
            status,
            body.headers().clone(),
            buffer.freeze(),
        ))
    }
}

fn timeout_error(request: &Request, timeout: Duration) -> NetworkError {
    NetworkError::Timeout {
        url: request.url().to_string(),
        timeout_secs: timeout.as_secs(),
    }
}

fn too_large(request: &Request, limit: u64) -> NetworkError {
    NetworkError::TooLarge {
        url: request.url().to_string(),
        limit,
    }
}
