use std::fmt;

/// Enumeration of possible errors that can be returned by the `StorageEngine`.
#[derive(Debug)]
pub enum StorageEngineError {
    /// Error when a directory creation operation fails.
    DirectoryCreationFailed,

    /// Error when attempting to read the snapshot fails.
    FileReadFailed,

    /// Error when attempting to write the temporary snapshot fails.
    FileWriteFailed,

    /// Error when replacing the snapshot with the freshly written one fails.
    FileReplacementFailed,

    /// A snapshot row that cannot be loaded back into the store.
    ///
    /// Carries the 1-based row number and the reason.
    InvalidRecord(usize, String),
}

impl fmt::Display for StorageEngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageEngineError::DirectoryCreationFailed => {
                write!(f, "Failed to create the storage directory")
            }
            StorageEngineError::FileReadFailed => write!(f, "Failed to read the snapshot"),
            StorageEngineError::FileWriteFailed => write!(f, "Failed to write the snapshot"),
            StorageEngineError::FileReplacementFailed => {
                write!(f, "Failed to replace the snapshot")
            }
            StorageEngineError::InvalidRecord(row, reason) => {
                write!(f, "Invalid snapshot row {}: {}", row, reason)
            }
        }
    }
}

impl std::error::Error for StorageEngineError {}
