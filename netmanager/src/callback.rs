//! Notification shapes for asynchronous network operations.
//!
//! An operation reports to its caller through up to three callbacks:
//!
//! ```text
//! progress(f64)*  ──►  data(Bytes)  ──►  completion(NetworkResult<T>)
//!   0..n times          success only       exactly once
//! ```
//!
//! The [`CallbackDispatcher`] owned by each running operation enforces that
//! order: progress fractions are clamped and never decrease, the payload is
//! delivered at most once and only before completion, and nothing is
//! delivered after completion. Callbacks run on the tokio worker that drives
//! the operation, one at a time, and must not block.
//!
//! # Example
//!
//! ```ignore
//! use netmanager::{Handlers, Request, Response};
//!
//! let handlers = Handlers::<Response>::new()
//!     .on_progress(|fraction| println!("{:.0}%", fraction * 100.0))
//!     .on_data(|bytes| println!("{} bytes", bytes.len()))
//!     .on_complete_with_code(|response, code| {
//!         println!("finished with code {} ({})", code, response.is_some());
//!     });
//! manager.fetch(Request::get("https://example.com/")?, handlers);
//! ```

use bytes::Bytes;
use tokio::sync::watch;
use tracing::debug;

use crate::error::{error_code_of, NetworkError, NetworkResult};
use crate::operation::OperationId;

/// Invoked once when an operation has fully terminated.
pub type CompletionCallback<T> = Box<dyn FnOnce(NetworkResult<T>) + Send>;

/// Invoked zero or more times with a completion fraction in `[0.0, 1.0]`.
pub type ProgressCallback = Box<dyn FnMut(f64) + Send>;

/// Invoked once with the complete response payload of a successful operation.
pub type DataCallback = Box<dyn FnOnce(Bytes) + Send>;

/// Adapt a `(result, error code)` closure into a [`CompletionCallback`].
///
/// Success is delivered as `(Some(value), 0)`, failure as `(None, code)`
/// where `code` is the failure's nonzero [`ErrorCode`](crate::ErrorCode).
pub fn with_error_code<T, F>(f: F) -> CompletionCallback<T>
where
    T: 'static,
    F: FnOnce(Option<T>, u32) + Send + 'static,
{
    Box::new(move |result: NetworkResult<T>| {
        let code = error_code_of(&result);
        f(result.ok(), code);
    })
}

/// The set of callbacks attached to one operation.
pub struct Handlers<T> {
    progress: Option<ProgressCallback>,
    data: Option<DataCallback>,
    completion: Option<CompletionCallback<T>>,
}

impl<T> Default for Handlers<T> {
    fn default() -> Self {
        Self {
            progress: None,
            data: None,
            completion: None,
        }
    }
}

impl<T> std::fmt::Debug for Handlers<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handlers")
            .field("progress", &self.progress.is_some())
            .field("data", &self.data.is_some())
            .field("completion", &self.completion.is_some())
            .finish()
    }
}

impl<T: 'static> Handlers<T> {
    /// Create an empty handler set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the progress callback.
    pub fn on_progress(mut self, f: impl FnMut(f64) + Send + 'static) -> Self {
        self.progress = Some(Box::new(f));
        self
    }

    /// Set the data callback.
    pub fn on_data(mut self, f: impl FnOnce(Bytes) + Send + 'static) -> Self {
        self.data = Some(Box::new(f));
        self
    }

    /// Set the completion callback.
    pub fn on_complete(mut self, f: impl FnOnce(NetworkResult<T>) + Send + 'static) -> Self {
        self.completion = Some(Box::new(f));
        self
    }

    /// Set the completion callback in `(result, error code)` form.
    pub fn on_complete_with_code(self, f: impl FnOnce(Option<T>, u32) + Send + 'static) -> Self {
        let completion = with_error_code(f);
        self.on_complete(completion)
    }

    pub(crate) fn from_parts(
        progress: Option<ProgressCallback>,
        data: Option<DataCallback>,
        completion: Option<CompletionCallback<T>>,
    ) -> Self {
        Self {
            progress,
            data,
            completion,
        }
    }
}

/// Delivers callbacks for one operation and enforces their contract.
///
/// If the dispatcher is dropped before completion (for example because the
/// runtime shut down underneath the operation), the completion callback
/// still fires once with [`NetworkError::Shutdown`].
pub struct CallbackDispatcher<T> {
    op: OperationId,
    handlers: Handlers<T>,
    progress_watch: Option<watch::Sender<f64>>,
    last_progress: Option<f64>,
    data_delivered: bool,
    terminated: bool,
}

impl<T> CallbackDispatcher<T> {
    /// Create a dispatcher for operation `op`.
    pub fn new(op: OperationId, handlers: Handlers<T>) -> Self {
        Self {
            op,
            handlers,
            progress_watch: None,
            last_progress: None,
            data_delivered: false,
            terminated: false,
        }
    }

    /// Mirror every delivered progress value into a watch channel.
    pub(crate) fn with_progress_watch(mut self, tx: watch::Sender<f64>) -> Self {
        self.progress_watch = Some(tx);
        self
    }

    /// Returns true once the completion has been delivered.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Last progress fraction delivered, if any.
    pub fn last_progress(&self) -> Option<f64> {
        self.last_progress
    }

    /// Deliver a progress fraction.
    ///
    /// The value is clamped to `[0.0, 1.0]`. NaN, repeats and values below
    /// the previous one are dropped.
    pub fn progress(&mut self, fraction: f64) {
        if self.terminated {
            debug!(op = %self.op, fraction, "Progress after completion ignored");
            return;
        }
        if fraction.is_nan() {
            return;
        }

        let fraction = fraction.clamp(0.0, 1.0);
        if self.last_progress.is_some_and(|last| fraction <= last) {
            return;
        }
        self.last_progress = Some(fraction);

        if let Some(tx) = &self.progress_watch {
            tx.send_replace(fraction);
        }
        if let Some(cb) = self.handlers.progress.as_mut() {
            cb(fraction);
        }
    }

    /// Deliver the response payload. Only the first call has any effect.
    pub fn data(&mut self, payload: Bytes) {
        if self.terminated || self.data_delivered {
            debug!(op = %self.op, "Duplicate or late data delivery ignored");
            return;
        }
        self.data_delivered = true;

        if let Some(cb) = self.handlers.data.take() {
            cb(payload);
        }
    }

    /// Deliver the final outcome. Only the first call has any effect.
    pub fn complete(&mut self, result: NetworkResult<T>) {
        if self.terminated {
            debug!(op = %self.op, "Duplicate completion ignored");
            return;
        }
        self.terminated = true;

        // Drop the remaining callbacks so nothing can fire afterwards.
        self.handlers.progress = None;
        self.handlers.data = None;
        self.progress_watch = None;

        if let Some(cb) = self.handlers.completion.take() {
            cb(result);
        }
    }
}

impl<T> Drop for CallbackDispatcher<T> {
    fn drop(&mut self) {
        if !self.terminated {
            debug!(op = %self.op, "Operation dropped before completion");
            self.complete(Err(NetworkError::Shutdown));
        }
    }
}
