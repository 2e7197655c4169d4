//! Error types for network operations.
//!
//! Every failure an operation can report is one variant of [`NetworkError`].
//! Each variant maps to a stable numeric [`ErrorCode`] so that callers which
//! only understand the `(result, code)` completion shape still receive a
//! meaningful value. Code `0` is reserved for success.

use std::fmt;

use thiserror::Error;

/// Result type for network operations.
pub type NetworkResult<T> = Result<T, NetworkError>;

/// Errors that can occur during a network operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum NetworkError {
    /// The request could not be built (bad URL, bad header, ...).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The host could not be reached.
    #[error("{url} is unreachable: {reason}")]
    Unreachable { url: String, reason: String },

    /// The request did not finish within its timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout { url: String, timeout_secs: u64 },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The response body stream broke before it was complete.
    #[error("transfer from {url} failed: {reason}")]
    Transfer { url: String, reason: String },

    /// The response body could not be decoded into the requested type.
    #[error("failed to decode response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// The operation was cancelled by its caller.
    #[error("operation cancelled")]
    Cancelled,

    /// The manager was shut down before the operation could run.
    #[error("network manager is shut down")]
    Shutdown,

    /// The response body exceeded the configured limit.
    #[error("response from {url} exceeds {limit} bytes")]
    TooLarge { url: String, limit: u64 },
}

impl NetworkError {
    /// Stable numeric code for this failure kind. Never zero.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidRequest(_) => ErrorCode::INVALID_REQUEST,
            Self::Unreachable { .. } => ErrorCode::UNREACHABLE,
            Self::Timeout { .. } => ErrorCode::TIMEOUT,
            Self::Status { .. } => ErrorCode::STATUS,
            Self::Transfer { .. } => ErrorCode::TRANSFER,
            Self::Decode { .. } => ErrorCode::DECODE,
            Self::Cancelled => ErrorCode::CANCELLED,
            Self::Shutdown => ErrorCode::SHUTDOWN,
            Self::TooLarge { .. } => ErrorCode::TOO_LARGE,
        }
    }

    /// Returns true if the failure was caused by cancellation or shutdown
    /// rather than by the remote side.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Shutdown)
    }
}

/// Numeric identifier of an operation outcome.
///
/// `0` means success; every other value names exactly one
/// [`NetworkError`] variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ErrorCode(u32);

impl ErrorCode {
    pub const SUCCESS: ErrorCode = ErrorCode(0);
    pub const INVALID_REQUEST: ErrorCode = ErrorCode(1);
    pub const UNREACHABLE: ErrorCode = ErrorCode(2);
    pub const TIMEOUT: ErrorCode = ErrorCode(3);
    pub const STATUS: ErrorCode = ErrorCode(4);
    pub const TRANSFER: ErrorCode = ErrorCode(5);
    pub const DECODE: ErrorCode = ErrorCode(6);
    pub const CANCELLED: ErrorCode = ErrorCode(7);
    pub const SHUTDOWN: ErrorCode = ErrorCode(8);
    pub const TOO_LARGE: ErrorCode = ErrorCode(9);

    /// All codes in ascending order, success first.
    pub const ALL: [ErrorCode; 10] = [
        Self::SUCCESS,
        Self::INVALID_REQUEST,
        Self::UNREACHABLE,
        Self::TIMEOUT,
        Self::STATUS,
        Self::TRANSFER,
        Self::DECODE,
        Self::CANCELLED,
        Self::SHUTDOWN,
        Self::TOO_LARGE,
    ];

    /// Raw numeric value.
    pub fn value(self) -> u32 {
        self.0
    }

    /// Look up a known code. Returns `None` for values outside the table.
    pub fn from_value(value: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.0 == value)
    }

    pub fn is_success(self) -> bool {
        self == Self::SUCCESS
    }

    /// Short machine-friendly name of the failure kind.
    pub fn kind_name(self) -> &'static str {
        match self.0 {
            0 => "success",
            1 => "invalid-request",
            2 => "unreachable",
            3 => "timeout",
            4 => "http-status",
            5 => "transfer",
            6 => "decode",
            7 => "cancelled",
            8 => "shutdown",
            9 => "too-large",
            _ => "unknown",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.0, self.kind_name())
    }
}

impl From<&NetworkError> for ErrorCode {
    fn from(err: &NetworkError) -> Self {
        err.code()
    }
}

impl From<ErrorCode> for u32 {
    fn from(code: ErrorCode) -> Self {
        code.0
    }
}

/// Error code carried by an operation result: `0` on success.
pub fn error_code_of<T>(result: &NetworkResult<T>) -> u32 {
    match result {
        Ok(_) => ErrorCode::SUCCESS.value(),
        Err(e) => e.code().value(),
    }
}

/// Errors raised while loading a [`ManagerConfig`](crate::ManagerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read or parse the INI file.
    #[error("failed to load config {path}: {reason}")]
    Load { path: String, reason: String },

    /// A key holds a value of the wrong shape.
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}
