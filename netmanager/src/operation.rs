//! Handles for in-flight operations.
//!
//! Starting an operation on the [`NetworkManager`](crate::NetworkManager)
//! returns an [`OperationHandle`]. The handle is the task object of the
//! operation: it exposes the latest progress, allows cooperative
//! cancellation and can be awaited for the final status. Dropping the
//! handle does not cancel the operation.

use std::fmt;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{ErrorCode, NetworkResult};

/// Identifier of one operation, unique within a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(u64);

impl OperationId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "op-{}", self.0)
    }
}

/// Terminal state of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStatus {
    /// Completed with error code 0.
    Succeeded,
    /// Completed with the given nonzero error code.
    Failed(ErrorCode),
    /// Cancelled by the caller or by manager shutdown.
    Cancelled,
}

impl OperationStatus {
    /// Derive the status from an operation result.
    pub fn from_result<T>(result: &NetworkResult<T>) -> Self {
        match result {
            Ok(_) => Self::Succeeded,
            Err(e) if e.is_cancellation() => Self::Cancelled,
            Err(e) => Self::Failed(e.code()),
        }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Caller-side view of a running operation.
#[derive(Debug, Clone)]
pub struct OperationHandle {
    id: OperationId,
    cancel: CancellationToken,
    progress: watch::Receiver<f64>,
    status: watch::Receiver<Option<OperationStatus>>,
}

impl OperationHandle {
    pub(crate) fn new(
        id: OperationId,
        cancel: CancellationToken,
        progress: watch::Receiver<f64>,
        status: watch::Receiver<Option<OperationStatus>>,
    ) -> Self {
        Self {
            id,
            cancel,
            progress,
            status,
        }
    }

    pub fn id(&self) -> OperationId {
        self.id
    }

    /// Request cancellation.
    ///
    /// The operation completes with [`NetworkError::Cancelled`](crate::NetworkError::Cancelled)
    /// unless it has already finished, in which case this is a no-op.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Latest progress fraction delivered for this operation.
    pub fn progress(&self) -> f64 {
        *self.progress.borrow()
    }

    /// Receiver that observes every progress update.
    pub fn subscribe_progress(&self) -> watch::Receiver<f64> {
        self.progress.clone()
    }

    /// Final status, or `None` while the operation is still running.
    pub fn status(&self) -> Option<OperationStatus> {
        *self.status.borrow()
    }

    /// Returns true once the completion callback has run.
    pub fn is_finished(&self) -> bool {
        self.status().is_some()
    }

    /// Wait until the operation has completed and return its status.
    pub async fn wait(&self) -> OperationStatus {
        let mut status = self.status.clone();
        let finished = match status.wait_for(Option::is_some).await {
            Ok(current) => *current,
            // The operation task went away without publishing a status.
            Err(_) => None,
        };
        finished.unwrap_or(OperationStatus::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NetworkError;

    fn handle() -> (
        OperationHandle,
        watch::Sender<f64>,
        watch::Sender<Option<OperationStatus>>,
    ) {
        let (progress_tx, progress_rx) = watch::channel(0.0);
        let (status_tx, status_rx) = watch::channel(None);
        let handle = OperationHandle::new(
            OperationId::new(9),
            CancellationToken::new(),
            progress_rx,
            status_rx,
        );
        (handle, progress_tx, status_tx)
    }

    #[test]
    fn test_operation_id_display() {
        assert_eq!(OperationId::new(12).to_string(), "op-12");
    }

    #[test]
    fn test_status_from_result() {
        let ok: NetworkResult<()> = Ok(());
        assert_eq!(OperationStatus::from_result(&ok), OperationStatus::Succeeded);

        let cancelled: NetworkResult<()> = Err(NetworkError::Cancelled);
        assert_eq!(
            OperationStatus::from_result(&cancelled),
            OperationStatus::Cancelled
        );

        let failed: NetworkResult<()> = Err(NetworkError::Status {
            url: "http://a".into(),
            status: 500,
        });
        assert_eq!(
            OperationStatus::from_result(&failed),
            OperationStatus::Failed(ErrorCode::STATUS)
        );
    }

    #[test]
    fn test_handle_reflects_progress() {
        let (handle, progress_tx, _status_tx) = handle();

        assert_eq!(handle.progress(), 0.0);
        progress_tx.send_replace(0.75);
        assert_eq!(handle.progress(), 0.75);
        assert!(!handle.is_finished());
    }

    #[test]
    fn test_cancel_sets_token() {
        let (handle, _progress_tx, _status_tx) = handle();

        handle.cancel();

        assert!(handle.cancel.is_cancelled());
    }

    #[tokio::test]
    async fn test_wait_returns_published_status() {
        let (handle, _progress_tx, status_tx) = handle();

        tokio::spawn(async move {
            status_tx.send_replace(Some(OperationStatus::Succeeded));
        });

        assert_eq!(handle.wait().await, OperationStatus::Succeeded);
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_wait_when_task_vanishes() {
        let (handle, _progress_tx, status_tx) = handle();

        drop(status_tx);

        assert_eq!(handle.wait().await, OperationStatus::Cancelled);
    }
}
