use axum::http::StatusCode;
use thiserror::Error;

/// Failure reported by a [`SeriesStore`](crate::data::store::SeriesStore) collaborator.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("signal {0} not found")]
    NotFound(String),
    #[error("signal {0} already exists")]
    AlreadyExists(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Error kinds surfaced to callers of the signal service.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SignalError {
    #[error("signal {0} not found")]
    NotFound(String),
    #[error("signal {0} already exists")]
    AlreadyExists(String),
    #[error("input signal values exceed max size ({len} > {max})")]
    BatchTooLarge { len: usize, max: usize },
    #[error("signal {0} has no samples")]
    EmptySeries(String),
    #[error("confirmation failed")]
    ConfirmationFailed,
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("invalid range: start {start} is past end {end}")]
    InvalidRange { start: usize, end: usize },
}

impl SignalError {
    /// Stable machine-readable code used in HTTP error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            SignalError::NotFound(_) => "not_found",
            SignalError::AlreadyExists(_) => "already_exists",
            SignalError::BatchTooLarge { .. } => "batch_too_large",
            SignalError::EmptySeries(_) => "empty_series",
            SignalError::ConfirmationFailed => "confirmation_failed",
            SignalError::StoreUnavailable(_) => "store_unavailable",
            SignalError::InvalidRange { .. } => "invalid_range",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            SignalError::NotFound(_) => StatusCode::NOT_FOUND,
            SignalError::AlreadyExists(_) => StatusCode::CONFLICT,
            SignalError::BatchTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            SignalError::EmptySeries(_) => StatusCode::UNPROCESSABLE_ENTITY,
            SignalError::ConfirmationFailed => StatusCode::BAD_REQUEST,
            SignalError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            SignalError::InvalidRange { .. } => StatusCode::BAD_REQUEST,
        }
    }

    /// Only backend failures are worth retrying; everything else is a
    /// property of the request or of the stored data.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SignalError::StoreUnavailable(_))
    }
}

impl From<StoreError> for SignalError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::NotFound(id) => SignalError::NotFound(id),
            StoreError::AlreadyExists(id) => SignalError::AlreadyExists(id),
            StoreError::Unavailable(message) => SignalError::StoreUnavailable(message),
        }
    }
}
