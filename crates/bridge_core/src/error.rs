//! Bridge error types

use bridge_proto::ProtoError;
use thiserror::Error;

/// Failure outcome of a bridge request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    // ===== Rejected before any host interaction =====
    /// A required argument was missing
    #[error("{0}")]
    Validation(String),

    /// An expected channel, method or object is absent and not emulated
    #[error("Required capability is not available: {0}")]
    MissingCapability(String),

    #[error("{0} not initialized")]
    NotConnected(String),

    // ===== Host interaction failures =====
    /// Message delivered on the error channel
    #[error("{0}")]
    Host(String),

    #[error("Operation timed out")]
    Timeout,

    /// The host call itself failed
    #[error("Failed to {operation}: {message}")]
    Invocation { operation: String, message: String },

    /// Every listing strategy failed and substitution is disabled
    #[error("Directory listing unavailable: {0}")]
    ListingUnavailable(String),

    #[error("Malformed host payload: {0}")]
    Payload(String),

    // ===== Connection lifecycle =====
    #[error("Host runtime not ready: {0}")]
    NotReady(String),

    #[error("Host runtime already announced")]
    AlreadyConnected,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl BridgeError {
    /// Was the request rejected before the host was invoked?
    pub fn is_immediate(&self) -> bool {
        matches!(
            self,
            BridgeError::Validation(_)
                | BridgeError::MissingCapability(_)
                | BridgeError::NotConnected(_)
        )
    }

    /// Did the failure come from the deadline?
    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::Timeout)
    }

    /// Get a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            BridgeError::MissingCapability(_) => {
                "This feature is not available in the current host".to_string()
            }
            BridgeError::NotConnected(_) | BridgeError::NotReady(_) => {
                "File system is not connected".to_string()
            }
            BridgeError::Timeout => "The operation took too long and was cancelled".to_string(),
            BridgeError::ListingUnavailable(path) if path.is_empty() => {
                "Cannot list the home directory".to_string()
            }
            BridgeError::ListingUnavailable(path) => format!("Cannot list {}", path),
            _ => self.to_string(),
        }
    }
}

impl From<ProtoError> for BridgeError {
    fn from(e: ProtoError) -> Self {
        BridgeError::Payload(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            BridgeError::Validation("File path is required".into()).to_string(),
            "File path is required"
        );
        assert_eq!(BridgeError::Timeout.to_string(), "Operation timed out");
        assert_eq!(
            BridgeError::Invocation {
                operation: "delete file".into(),
                message: "gone".into()
            }
            .to_string(),
            "Failed to delete file: gone"
        );
    }

    #[test]
    fn test_classification() {
        assert!(BridgeError::Validation("x".into()).is_immediate());
        assert!(BridgeError::MissingCapability("signal fileCreated".into()).is_immediate());
        assert!(!BridgeError::Host("disk full".into()).is_immediate());
        assert!(BridgeError::Timeout.is_timeout());
        assert_eq!(
            BridgeError::ListingUnavailable(String::new()).user_message(),
            "Cannot list the home directory"
        );
    }
}
