//! Small embedded SQLite access facade.
//!
//! One [`Connection`] per database file gate-keeps prepared [`Statement`]s
//! (named parameters, step/reset cursor) and at most one live
//! [`Transaction`]. Statements and transactions never outlive their
//! connection: closing it invalidates them instead of leaving them dangling.
//! Callers that cannot block drive the same facade through
//! [`AsyncDatabase`], a worker thread that completes each operation over its
//! own oneshot channel.

pub mod config;
pub mod connection;
pub mod error;
pub mod prelude;
pub mod rows;
pub mod statement;
pub mod transaction;
pub mod types;
pub mod worker;

pub use config::{DatabaseConfig, OpenMode};
pub use connection::Connection;
pub use error::DbError;
pub use rows::{DbRow, RowSet};
pub use statement::Statement;
pub use transaction::Transaction;
pub use types::{DbValue, TransactionBehavior};
pub use worker::AsyncDatabase;
