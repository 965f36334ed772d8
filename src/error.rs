use thiserror::Error;

/// Errors surfaced by the facade.
///
/// Every engine-level error is converted at this boundary; `rusqlite` types
/// never cross the public API. Operations on closed handles report
/// [`DbError::InvalidHandle`] instead of panicking, so callers embedded in a
/// long-running host can treat failures as ordinary return values.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to open database: {0}")]
    Open(String),

    #[error("failed to prepare statement: {0}")]
    Prepare(String),

    /// Malformed SQL or a constraint violation during execute/step.
    #[error("sql error (code {code}): {message}")]
    Sql { code: i32, message: String },

    #[error("failed to bind parameter '{name}': {reason}")]
    Bind { name: String, reason: String },

    #[error("a transaction is already active on this connection")]
    TransactionAlreadyActive,

    /// Commit failed; the transaction stays open until an explicit rollback.
    #[error("failed to commit transaction: {0}")]
    Commit(String),

    /// Operation attempted on a closed connection, statement, or transaction.
    #[error("{0} used after close")]
    InvalidHandle(&'static str),

    #[error("backup failed: {0}")]
    Backup(String),

    #[error("query returned no rows")]
    NoRows,

    /// Async layer only: the worker thread is gone or refused the command.
    #[error("database worker unavailable: {0}")]
    WorkerGone(String),
}

impl From<rusqlite::Error> for DbError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => DbError::NoRows,
            rusqlite::Error::SqliteFailure(e, message) => DbError::Sql {
                code: e.extended_code,
                message: message.unwrap_or_else(|| e.to_string()),
            },
            other => DbError::Sql {
                code: -1,
                message: other.to_string(),
            },
        }
    }
}
