// Error handling for the bridge

use thiserror::Error;

/// Bridge error kinds surfaced to host callers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BridgeError {
    /// Handle missing, already released, or operation invalid in the current state
    #[error("Illegal state: {0}")]
    IllegalState(String),

    /// Malformed input (missing required string, unencodable text)
    #[error("Illegal argument: {0}")]
    IllegalArgument(String),

    /// Allocation failure at a construction step
    #[error("Out of memory: {0}")]
    OutOfMemory(String),

    /// Failure reported by the native engine, passed through uninterpreted
    #[error("Engine error: {0}")]
    Engine(String),
}

impl BridgeError {
    pub fn illegal_state(msg: impl Into<String>) -> Self {
        BridgeError::IllegalState(msg.into())
    }

    pub fn illegal_argument(msg: impl Into<String>) -> Self {
        BridgeError::IllegalArgument(msg.into())
    }
}

/// Result type alias for bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;
