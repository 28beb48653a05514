//! Plugin-level error types
//!
//! These never cross the dispatcher boundary; they are logged where
//! they occur, inside plugin construction or a dispatch task.

use thiserror::Error;

/// Authentication against the external service failed at plugin
/// construction. The affected host is dropped; the process continues.
#[derive(Debug, Error)]
#[error("credential verification failed: {0}")]
pub struct CredentialError(pub String);

/// A notification could not be delivered
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Transient connectivity failure, eligible for retry
    #[error("connection error: {0}")]
    Connection(String),

    /// The service rejected the request; never retried
    #[error("rejected by service: {0}")]
    Api(String),
}

impl DeliveryError {
    /// Whether a retry may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, DeliveryError::Connection(_))
    }

    /// Classify a transport error: an HTTP status error is an API
    /// rejection, everything else (DNS, connect, timeout) is transient.
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_status() {
            DeliveryError::Api(err.to_string())
        } else {
            DeliveryError::Connection(err.to_string())
        }
    }
}
