//! Error type surfaced by the listing repository.

use std::path::PathBuf;

use housing_core::{ContextError, RecordId, ValidationError};
use rusqlite::ErrorCode;
use thiserror::Error;

/// Failures raised by repository calls.
///
/// Storage failures abort the enclosing transaction before they surface; no
/// variant is retried inside the crate.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The connection pool could not be built or a connection could not be
    /// borrowed before the checkout timeout.
    #[error("storage unavailable at {path}")]
    Connection {
        /// Database the pool targets.
        path: PathBuf,
        /// Pool failure.
        #[source]
        source: r2d2::Error,
    },
    /// A statement failed or violated a constraint.
    #[error("failed to {operation}")]
    Query {
        /// Stage that failed, e.g. `"insert room"`.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// No row matched a singular read or write.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Table-level name of the missing entity.
        entity: &'static str,
        /// Identifier that was looked up.
        id: RecordId,
    },
    /// Input was rejected before reaching storage.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The call was cancelled or ran past its deadline.
    #[error(transparent)]
    Context(#[from] ContextError),
    /// A schema migration step failed.
    #[error("failed to execute migration step '{step}'")]
    Schema {
        /// Migration step that failed.
        step: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: rusqlite::Error,
    },
    /// The database carries a schema version this build does not understand.
    #[error(
        "expected listing schema version {expected} but found {found}; apply migrations before retrying"
    )]
    SchemaVersion {
        /// Version this build writes.
        expected: i64,
        /// Version recorded in the database.
        found: i64,
    },
}

impl RepositoryError {
    /// Wrap a `rusqlite` failure with the stage it happened in.
    #[must_use]
    pub const fn query(operation: &'static str, source: rusqlite::Error) -> Self {
        Self::Query { operation, source }
    }

    /// Whether SQLite stopped the statement through the progress handler.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        match self {
            Self::Query { source, .. } | Self::Schema { source, .. } => {
                source.sqlite_error_code() == Some(ErrorCode::OperationInterrupted)
            }
            _ => false,
        }
    }

    /// Whether the error reports a missing entity.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Build a closure mapping a `rusqlite` error onto [`RepositoryError::Query`].
pub(crate) fn query_failed(operation: &'static str) -> impl FnOnce(rusqlite::Error) -> RepositoryError {
    move |source| RepositoryError::query(operation, source)
}
