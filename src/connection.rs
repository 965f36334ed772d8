use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::config::DatabaseConfig;
use crate::error::DbError;
use crate::statement::Statement;
use crate::transaction::Transaction;
use crate::types::{DbValue, TransactionBehavior};

/// Shared by the connection and every statement/transaction it issues.
/// `conn: None` means the handle has been released; everyone observing that
/// state reports [`DbError::InvalidHandle`] instead of touching the engine.
pub(crate) struct ConnState {
    pub(crate) conn: Option<rusqlite::Connection>,
    pub(crate) tx_active: bool,
}

/// An open handle to one SQLite database file.
///
/// The connection gate-keeps all statement creation and the transaction
/// lifecycle: statements and transactions hold weak back-references and
/// become permanently invalid once the connection closes. All operations
/// are synchronous and blocking; callers that cannot block should go
/// through [`crate::AsyncDatabase`] instead.
///
/// Not `Send`: one connection belongs to one logical owner at a time.
pub struct Connection {
    state: Rc<RefCell<ConnState>>,
    config: DatabaseConfig,
}

impl Connection {
    /// Open the database described by `config`, applying its busy timeout.
    ///
    /// # Errors
    /// Returns [`DbError::Open`] when the path cannot be derived or created,
    /// or the engine rejects the open flags.
    pub fn open(config: DatabaseConfig) -> Result<Self, DbError> {
        let conn = if config.is_in_memory() {
            rusqlite::Connection::open_in_memory()
                .map_err(|e| DbError::Open(e.to_string()))?
        } else {
            let path = config.db_path()?;
            let mode = config.open_mode();
            if mode.create && !mode.read_only {
                if let Some(dir) = path.parent() {
                    std::fs::create_dir_all(dir).map_err(|e| {
                        DbError::Open(format!("{}: {e}", dir.display()))
                    })?;
                }
            }
            rusqlite::Connection::open_with_flags(&path, mode.to_flags())
                .map_err(|e| DbError::Open(format!("{}: {e}", path.display())))?
        };

        let timeout = config.busy_timeout();
        if timeout > 0 {
            conn.busy_timeout(Duration::from_millis(u64::from(timeout)))
                .map_err(|e| DbError::Open(e.to_string()))?;
        }

        debug!(db = config.display_name(), "opened database");
        Ok(Self {
            state: Rc::new(RefCell::new(ConnState {
                conn: Some(conn),
                tx_active: false,
            })),
            config,
        })
    }

    /// True while the engine handle is open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state.borrow().conn.is_some()
    }

    /// Run one or more semicolon-separated statements with no result set and
    /// return the engine's modified-row count for the last of them.
    ///
    /// # Errors
    /// Returns [`DbError::Sql`] on malformed SQL or a constraint violation,
    /// [`DbError::InvalidHandle`] on a closed connection.
    pub fn execute(&self, sql: &str) -> Result<i64, DbError> {
        let state = self.state.borrow();
        let conn = state.conn.as_ref().ok_or(DbError::InvalidHandle("connection"))?;
        conn.execute_batch(sql)?;
        Ok(i64::try_from(conn.changes()).unwrap_or(i64::MAX))
    }

    /// Prepare, step once, and return the first column of the first row.
    ///
    /// # Errors
    /// Returns [`DbError::NoRows`] when the result set is empty, otherwise
    /// the same failures as [`Connection::execute`].
    pub fn fetch_one(&self, sql: &str) -> Result<DbValue, DbError> {
        let state = self.state.borrow();
        let conn = state.conn.as_ref().ok_or(DbError::InvalidHandle("connection"))?;
        let value: rusqlite::types::Value = conn.query_row(sql, [], |row| row.get(0))?;
        Ok(value.into())
    }

    /// Prepare `sql` for repeated execution with named parameters.
    ///
    /// The SQL is validated eagerly; later executions reuse the engine's
    /// statement cache rather than reparsing.
    ///
    /// # Errors
    /// Returns [`DbError::Prepare`] on malformed or empty SQL,
    /// [`DbError::InvalidHandle`] on a closed connection.
    pub fn prepare(&self, sql: &str) -> Result<Statement, DbError> {
        if sql.trim().is_empty() {
            return Err(DbError::Prepare("empty statement".into()));
        }
        {
            let state = self.state.borrow();
            let conn = state.conn.as_ref().ok_or(DbError::InvalidHandle("connection"))?;
            conn.prepare_cached(sql)
                .map_err(|e| DbError::Prepare(e.to_string()))?;
        }
        Ok(Statement::new(Rc::downgrade(&self.state), sql))
    }

    /// Begin a transaction; at most one may be live per connection.
    ///
    /// # Errors
    /// Returns [`DbError::TransactionAlreadyActive`] while another
    /// transaction is open, leaving that one untouched.
    pub fn begin_transaction(
        &self,
        behavior: TransactionBehavior,
    ) -> Result<Transaction, DbError> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        let conn = state.conn.as_ref().ok_or(DbError::InvalidHandle("connection"))?;
        if state.tx_active {
            return Err(DbError::TransactionAlreadyActive);
        }
        conn.execute_batch(behavior.begin_sql())?;
        state.tx_active = true;
        debug!(db = self.config.display_name(), mode = ?behavior, "transaction started");
        Ok(Transaction::new(Rc::downgrade(&self.state)))
    }

    /// Close the connection. Idempotent.
    ///
    /// Rolls back any active transaction, releases the engine handle exactly
    /// once, and permanently invalidates outstanding statements.
    pub fn close(&self) {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;
        if state.tx_active {
            if let Some(conn) = state.conn.as_ref() {
                if let Err(err) = conn.execute_batch("ROLLBACK") {
                    warn!(%err, "rollback during close failed");
                }
            }
            state.tx_active = false;
        }
        if state.conn.take().is_some() {
            debug!(db = self.config.display_name(), "closed database");
        }
    }

    /// Modified-row count of the most recent statement, or `-1` on a closed
    /// connection.
    #[must_use]
    pub fn changes(&self) -> i64 {
        match self.state.borrow().conn.as_ref() {
            Some(conn) => i64::try_from(conn.changes()).unwrap_or(i64::MAX),
            None => {
                warn!("changes() queried on a closed connection");
                -1
            }
        }
    }

    /// Rowid of the most recent successful INSERT, or `-1` on a closed
    /// connection.
    #[must_use]
    pub fn last_insert_rowid(&self) -> i64 {
        match self.state.borrow().conn.as_ref() {
            Some(conn) => conn.last_insert_rowid(),
            None => -1,
        }
    }

    /// Online copy of the whole database to `dest`, creating parent
    /// directories as needed.
    ///
    /// # Errors
    /// Returns [`DbError::Backup`] on I/O or locking failure.
    pub fn backup_to(&self, dest: impl AsRef<Path>) -> Result<(), DbError> {
        let dest = dest.as_ref();
        let state = self.state.borrow();
        let conn = state.conn.as_ref().ok_or(DbError::InvalidHandle("connection"))?;
        if let Some(dir) = dest.parent() {
            std::fs::create_dir_all(dir).map_err(|e| DbError::Backup(e.to_string()))?;
        }
        conn.backup(rusqlite::MAIN_DB, dest, None)
            .map_err(|e| DbError::Backup(e.to_string()))?;
        debug!(dest = %dest.display(), "database backup written");
        Ok(())
    }

    /// Backup to the timestamped default location,
    /// `<root>/<folder>/Backups/<name>-backup-<timestamp>.db`.
    ///
    /// # Errors
    /// Returns [`DbError::Backup`] for in-memory databases (no file layout)
    /// and on copy failure.
    pub fn backup(&self) -> Result<PathBuf, DbError> {
        let dest = self.config.backup_path().ok_or_else(|| {
            DbError::Backup("in-memory database has no backup location".into())
        })?;
        self.backup_to(&dest)?;
        Ok(dest)
    }

    #[must_use]
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("db", &self.config.display_name())
            .field("open", &self.is_open())
            .finish()
    }
}
