/// Service error taxonomy
///
/// Every service and identity-provider operation fails with exactly one
/// [`ServiceError`] kind. The API layer maps each kind to one HTTP status.

use thiserror::Error;

use crate::auth::authorization::AuthzError;
use crate::auth::middleware::AuthError;
use crate::store::StoreError;

/// Error type for service operations
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The named resource does not exist (or the ID is malformed)
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The requester is authenticated but not allowed
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Input failed a domain rule
    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// Missing, invalid or expired credentials
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// The resource store failed
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Hashing, signing or another internal step failed
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Builds a validation error for one field
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ServiceError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::Denied { reason, .. } => ServiceError::PermissionDenied(reason.to_string()),
        }
    }
}

impl From<AuthError> for ServiceError {
    fn from(err: AuthError) -> Self {
        ServiceError::Unauthenticated(err.to_string())
    }
}

/// Result alias for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
