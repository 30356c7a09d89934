//! Error types for the rill query system.

use alloc::string::String;
use core::fmt;

/// Result type alias for rill operations.
pub type Result<T> = core::result::Result<T, Error>;

/// Error types shared across the rill workspace.
///
/// Errors are cloneable: a memoized query-handle producer resolves once and
/// its failure is replayed to every later consumer.
#[derive(Clone, Debug)]
pub enum Error {
    /// Table not found.
    TableNotFound {
        name: String,
    },
    /// Column not found.
    ColumnNotFound {
        table: String,
        column: String,
    },
    /// Invalid schema definition.
    InvalidSchema {
        message: String,
    },
    /// A query-handle producer failed to yield a handle.
    SourceUnavailable {
        message: String,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TableNotFound { name } => {
                write!(f, "Table not found: {}", name)
            }
            Error::ColumnNotFound { table, column } => {
                write!(f, "Column {} not found in table {}", column, table)
            }
            Error::InvalidSchema { message } => {
                write!(f, "Invalid schema: {}", message)
            }
            Error::SourceUnavailable { message } => {
                write!(f, "Query source unavailable: {}", message)
            }
        }
    }
}

impl Error {
    /// Creates a table not found error.
    pub fn table_not_found(name: impl Into<String>) -> Self {
        Error::TableNotFound { name: name.into() }
    }

    /// Creates a column not found error.
    pub fn column_not_found(table: impl Into<String>, column: impl Into<String>) -> Self {
        Error::ColumnNotFound {
            table: table.into(),
            column: column.into(),
        }
    }

    /// Creates an invalid schema error.
    pub fn invalid_schema(message: impl Into<String>) -> Self {
        Error::InvalidSchema {
            message: message.into(),
        }
    }

    /// Creates a source unavailable error.
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Error::SourceUnavailable {
            message: message.into(),
        }
    }
}
