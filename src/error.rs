//! Rotator error types with HTTP status code mapping.
//!
//! [`RotatorError`] is the central error type for the service. Each variant
//! maps to a specific HTTP status code and structured JSON error response.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Seconds a client should wait before retrying a [`RotatorError::Transient`].
const RETRY_AFTER_SECS: u32 = 1;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4001,
///     "message": "no attendant available for link 6f1c…",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see ranges on [`RotatorError`]).
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category        | HTTP Status                  |
/// |-----------|-----------------|------------------------------|
/// | 1000–1999 | Validation      | 400 Bad Request              |
/// | 2000–2999 | State/Not Found | 404 Not Found / 409 Conflict |
/// | 3000–3999 | Server          | 500 / 503                    |
/// | 4000–4999 | Rotation        | 422 Unprocessable Entity     |
#[derive(Debug, thiserror::Error)]
pub enum RotatorError {
    /// Link with the given ID or slug was not found.
    #[error("link not found: {0}")]
    LinkNotFound(String),

    /// Link exists but has been disabled by its operator.
    #[error("link is inactive: {0}")]
    LinkInactive(uuid::Uuid),

    /// Link has no attendants configured.
    #[error("no attendant available for link {0}")]
    NoContacts(uuid::Uuid),

    /// Storage contention or timeout while advancing the rotation cursor.
    /// Nothing was written; the caller may retry with backoff.
    #[error("transient storage failure: {0}")]
    Transient(String),

    /// Denormalized link counters could not be updated.
    #[error("analytics update failed: {0}")]
    AnalyticsUpdateFailed(String),

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Another link already uses this slug.
    #[error("slug already in use: {0}")]
    SlugTaken(String),

    /// A contact position outside the link's list was referenced.
    #[error("position {position} out of range for {len} contacts")]
    PositionOutOfRange {
        /// Requested position.
        position: usize,
        /// Current contact count.
        len: usize,
    },

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    PersistenceError(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RotatorError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::PositionOutOfRange { .. } => 1002,
            Self::LinkNotFound(_) => 2001,
            Self::SlugTaken(_) => 2002,
            Self::Internal(_) => 3000,
            Self::PersistenceError(_) => 3001,
            Self::Transient(_) => 3002,
            Self::AnalyticsUpdateFailed(_) => 3003,
            Self::NoContacts(_) => 4001,
            Self::LinkInactive(_) => 4002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::PositionOutOfRange { .. } => StatusCode::BAD_REQUEST,
            Self::LinkNotFound(_) => StatusCode::NOT_FOUND,
            Self::SlugTaken(_) => StatusCode::CONFLICT,
            Self::NoContacts(_) | Self::LinkInactive(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::PersistenceError(_) | Self::AnalyticsUpdateFailed(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns `true` if the caller may safely retry the failed operation.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Shorthand for [`RotatorError::LinkNotFound`] keyed by a link id.
    #[must_use]
    pub fn link_not_found(id: impl std::fmt::Display) -> Self {
        Self::LinkNotFound(id.to_string())
    }
}

impl IntoResponse for RotatorError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let retryable = self.is_retryable();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        if retryable {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(RETRY_AFTER_SECS));
        }
        response
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn no_contacts_is_unprocessable() {
        let err = RotatorError::NoContacts(uuid::Uuid::new_v4());
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.error_code(), 4001);
        assert!(!err.is_retryable());
    }

    #[test]
    fn transient_sets_retry_after() {
        let response = RotatorError::Transient("lock timeout".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key(header::RETRY_AFTER));
    }

    #[test]
    fn slug_taken_is_conflict() {
        let response = RotatorError::SlugTaken("promo".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        assert!(!response.headers().contains_key(header::RETRY_AFTER));
    }

    #[test]
    fn position_out_of_range_message() {
        let err = RotatorError::PositionOutOfRange {
            position: 7,
            len: 3,
        };
        assert_eq!(err.to_string(), "position 7 out of range for 3 contacts");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
