use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

use tracing::{debug, warn};

use crate::connection::ConnState;
use crate::error::DbError;

/// A bounded scope of atomic changes against one connection.
///
/// At most one transaction is live per connection. Dropping the handle
/// without committing rolls back, so an abandoned transaction never blocks
/// later writers.
pub struct Transaction {
    state: Weak<RefCell<ConnState>>,
    open: bool,
}

impl Transaction {
    pub(crate) fn new(state: Weak<RefCell<ConnState>>) -> Self {
        Self { state, open: true }
    }

    /// True while neither commit nor rollback has run and the connection is
    /// still open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open
            && self
                .state
                .upgrade()
                .is_some_and(|state| {
                    let guard = state.borrow();
                    guard.conn.is_some() && guard.tx_active
                })
    }

    /// Flush everything executed since the transaction began.
    ///
    /// # Errors
    /// Returns [`DbError::Commit`] if the engine refuses the commit; the
    /// transaction then stays open until an explicit [`Transaction::rollback`].
    /// Returns [`DbError::InvalidHandle`] once the transaction or its
    /// connection is gone.
    pub fn commit(&mut self) -> Result<(), DbError> {
        if !self.open {
            return Err(DbError::InvalidHandle("transaction"));
        }
        let state = self
            .state
            .upgrade()
            .ok_or(DbError::InvalidHandle("transaction"))?;
        let mut guard = state.borrow_mut();
        let state = &mut *guard;
        let conn = state
            .conn
            .as_ref()
            .ok_or(DbError::InvalidHandle("transaction"))?;
        if !state.tx_active {
            // Connection closed and rolled us back underneath.
            self.open = false;
            return Err(DbError::InvalidHandle("transaction"));
        }
        conn.execute_batch("COMMIT")
            .map_err(|e| DbError::Commit(e.to_string()))?;
        state.tx_active = false;
        self.open = false;
        debug!("transaction committed");
        Ok(())
    }

    /// Discard everything executed since the transaction began.
    ///
    /// Best-effort and idempotent: rolling back an already-completed
    /// transaction is a no-op.
    pub fn rollback(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        let Some(state) = self.state.upgrade() else {
            return;
        };
        let mut guard = state.borrow_mut();
        let state = &mut *guard;
        if !state.tx_active {
            return;
        }
        if let Some(conn) = state.conn.as_ref() {
            if let Err(err) = conn.execute_batch("ROLLBACK") {
                warn!(%err, "rollback failed");
            } else {
                debug!("transaction rolled back");
            }
        }
        state.tx_active = false;
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        self.rollback();
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("open", &self.is_open())
            .finish()
    }
}
