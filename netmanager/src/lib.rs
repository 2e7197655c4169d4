//! netmanager - asynchronous HTTP operations with progress, data and
//! completion notifications.
//!
//! The crate exposes two ways of running a request through a
//! [`NetworkManager`]:
//!
//! - **Callbacks**: [`NetworkManager::fetch`], [`NetworkManager::fetch_data`]
//!   and [`NetworkManager::fetch_json`] take a set of [`Handlers`] and return
//!   an [`OperationHandle`] for progress, cancellation and waiting.
//! - **Futures**: [`NetworkManager::send`] resolves to a [`NetworkResult`].
//!
//! Outcomes are tagged results. Each failure kind has a stable numeric
//! [`ErrorCode`], with `0` meaning success, for callers that need the
//! `(result, code)` shape (see [`with_error_code`]).

pub mod callback;
pub mod config;
pub mod error;
pub mod manager;
pub mod operation;
pub mod progress;
pub mod request;
pub mod transport;

pub use callback::{
    with_error_code, CallbackDispatcher, CompletionCallback, DataCallback, Handlers,
    ProgressCallback,
};
pub use config::ManagerConfig;
pub use error::{error_code_of, ConfigError, ErrorCode, NetworkError, NetworkResult};
pub use manager::NetworkManager;
pub use operation::{OperationHandle, OperationId, OperationStatus};
pub use progress::ProgressTracker;
pub use request::{Request, Response};
pub use transport::{CannedResponse, Failure, MemoryTransport, ReqwestTransport, Transport};
