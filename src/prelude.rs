//! Convenient imports for common functionality.

pub use crate::config::{DatabaseConfig, OpenMode};
pub use crate::connection::Connection;
pub use crate::error::DbError;
pub use crate::rows::{DbRow, RowSet};
pub use crate::statement::Statement;
pub use crate::transaction::Transaction;
pub use crate::types::{DbValue, TransactionBehavior};
pub use crate::worker::AsyncDatabase;
