//! Error types for Trellis

use thiserror::Error;

/// The main error type for Trellis operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database connection or execution error raised by a sqlx-backed adapter
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A builder was requested while no connection was available
    #[error("No initial instance of Connection created")]
    NoConnection,

    /// The builder chain cannot be rendered into a complete statement
    #[error("Invalid statement: {message}")]
    InvalidStatement { message: String },

    /// Execution failure reported by an adapter
    #[error("Adapter error: {message}")]
    Adapter { message: String },

    /// A transaction was rolled back because one of its statements failed
    #[error("Transaction rolled back: {message}")]
    TransactionAborted { message: String },

    /// Row decoding error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience Result type for Trellis operations
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a new invalid statement error
    pub fn invalid_statement(message: impl Into<String>) -> Self {
        Self::InvalidStatement {
            message: message.into(),
        }
    }

    /// Create a new adapter error
    pub fn adapter(message: impl Into<String>) -> Self {
        Self::Adapter {
            message: message.into(),
        }
    }

    /// Create a new transaction aborted error
    pub fn transaction_aborted(message: impl Into<String>) -> Self {
        Self::TransactionAborted {
            message: message.into(),
        }
    }

    /// Whether the error came out of the database layer rather than the builder
    pub fn is_adapter_fault(&self) -> bool {
        matches!(self, Error::Database(_) | Error::Adapter { .. })
    }
}
