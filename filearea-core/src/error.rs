use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileAreaError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("invalid path: {0}")]
    InvalidPath(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// A create collided with an existing slot; the whole batch was rejected.
    #[error("slot already exists: {0}")]
    Conflict(String),

    #[error("no free draft item id after {0} attempts")]
    AllocationExhausted(u32),

    #[error("content ended after {got} of {expected} bytes")]
    Truncated { expected: u64, got: u64 },

    #[error("transfer exceeded its time limit after {bytes_sent} bytes")]
    TransferTimedOut { bytes_sent: u64 },

    #[error("config error: {0}")]
    Config(String),
}

// Convenient crate-wide result type
pub type Result<T> = std::result::Result<T, FileAreaError>;
