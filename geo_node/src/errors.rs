use std::fmt::{self, Display};
use std::io;

use super::storage_engine::errors::StorageEngineError;
use geo_protocol::errors::ProtocolError;
use logger::LoggerError;

/// Enum representing the possible errors that can occur within the `Node`.
#[derive(Debug)]
pub enum NodeError {
    /// Input/output (I/O) error.
    IoError(io::Error),
    /// Error related to lock acquisition.
    LockError,
    /// Error related to thread creation or handling.
    ThreadError,
    /// Error related to wire protocol operations.
    ProtocolError(ProtocolError),
    /// Error related to the snapshot storage.
    StorageEngineError(StorageEngineError),
    /// Error related to the logger.
    LoggerError(LoggerError),
}

impl Display for NodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeError::IoError(e) => write!(f, "I/O Error: {}", e),
            NodeError::LockError => write!(f, "Failed to acquire lock"),
            NodeError::ThreadError => write!(f, "Thread Error"),
            NodeError::ProtocolError(e) => write!(f, "Protocol Error: {}", e),
            NodeError::StorageEngineError(e) => write!(f, "Storage Engine Error: {}", e),
            NodeError::LoggerError(e) => write!(f, "Logger Error: {}", e),
        }
    }
}

impl std::error::Error for NodeError {}

impl From<io::Error> for NodeError {
    fn from(error: io::Error) -> Self {
        NodeError::IoError(error)
    }
}

impl<T> From<std::sync::PoisonError<T>> for NodeError {
    /// Conversion from a lock error (`PoisonError`) to `NodeError`.
    fn from(_: std::sync::PoisonError<T>) -> Self {
        NodeError::LockError
    }
}

impl From<ProtocolError> for NodeError {
    fn from(error: ProtocolError) -> Self {
        NodeError::ProtocolError(error)
    }
}

impl From<StorageEngineError> for NodeError {
    fn from(error: StorageEngineError) -> Self {
        NodeError::StorageEngineError(error)
    }
}

impl From<LoggerError> for NodeError {
    fn from(error: LoggerError) -> Self {
        NodeError::LoggerError(error)
    }
}
