//! Error types owned by the dispatcher.
//!
//! Only failures that happen before a handler runs are represented here.
//! Anything a handler or behavior returns travels back to the caller as the
//! same `anyhow::Error` it was created as, so callers can still downcast to
//! their own error types.

use thiserror::Error;

use crate::key::HandlerKey;

/// Errors raised by the dispatcher and the registration facility.
#[derive(Debug, Error)]
pub enum ErrandError {
    /// A call precondition was violated.
    #[error("invalid argument '{parameter}': {message}")]
    InvalidArgument {
        parameter: &'static str,
        message: String,
    },

    /// No handler is registered for the (request, response) pair.
    #[error(
        "No handler found for request type '{request_type}' with response type '{response_type}'. \
         Make sure you have registered the handler using add_errand() or add_handler()."
    )]
    HandlerNotFound {
        request_type: &'static str,
        response_type: &'static str,
    },

    /// The resolver returned an instance that is not the requested capability.
    #[error(
        "resolver returned an instance of the wrong type for {capability}, \
         expected {expected}"
    )]
    InstanceMismatch {
        capability: String,
        expected: &'static str,
    },
}

impl ErrandError {
    /// Creates an [`ErrandError::InvalidArgument`] for the named parameter.
    pub fn invalid_argument(parameter: &'static str, message: impl Into<String>) -> Self {
        ErrandError::InvalidArgument {
            parameter,
            message: message.into(),
        }
    }

    /// Creates an [`ErrandError::HandlerNotFound`] naming both types of `key`.
    pub fn handler_not_found(key: &HandlerKey) -> Self {
        ErrandError::HandlerNotFound {
            request_type: key.request_name(),
            response_type: key.response_name(),
        }
    }

    /// Returns true if this is a missing-handler error.
    pub fn is_handler_not_found(&self) -> bool {
        matches!(self, ErrandError::HandlerNotFound { .. })
    }

    /// Returns the offending parameter for invalid-argument errors.
    pub fn parameter(&self) -> Option<&'static str> {
        match self {
            ErrandError::InvalidArgument { parameter, .. } => Some(*parameter),
            _ => None,
        }
    }
}

/// Result type for dispatcher operations.
pub type Result<T> = std::result::Result<T, ErrandError>;
