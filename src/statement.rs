use std::cell::RefCell;
use std::fmt;
use std::rc::Weak;

use tracing::warn;

use crate::connection::ConnState;
use crate::error::DbError;
use crate::rows::RowSet;
use crate::types::DbValue;

/// A prepared, parameterized query bound to one connection.
///
/// The cursor follows `Prepared → Step* → Done`; [`Statement::reset`]
/// rewinds it without reparsing (bindings persist until
/// [`Statement::clear_bindings`]). The first [`Statement::step`] runs the
/// query and materializes its rows, so a step error surfaces there rather
/// than mid-iteration.
///
/// The statement is valid only while its connection is open: closing the
/// connection turns every operation here into a guarded failure.
pub struct Statement {
    state: Weak<RefCell<ConnState>>,
    sql: String,
    bindings: Vec<(String, DbValue)>,
    cursor: Option<RowCursor>,
    closed: bool,
}

struct RowCursor {
    set: RowSet,
    pos: usize,
    started: bool,
}

impl RowCursor {
    fn exhausted() -> Self {
        Self {
            set: RowSet::default(),
            pos: 0,
            started: true,
        }
    }
}

/// Parameter names are stored with the engine's leading `:` marker; callers
/// may pass either form.
fn qualify(name: &str) -> String {
    if name.starts_with(':') || name.starts_with('@') || name.starts_with('$') {
        name.to_owned()
    } else {
        format!(":{name}")
    }
}

impl Statement {
    pub(crate) fn new(state: Weak<RefCell<ConnState>>, sql: &str) -> Self {
        Self {
            state,
            sql: sql.to_owned(),
            bindings: Vec::new(),
            cursor: None,
            closed: false,
        }
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&rusqlite::Connection) -> Result<T, DbError>,
    ) -> Result<T, DbError> {
        if self.closed {
            return Err(DbError::InvalidHandle("statement"));
        }
        let state = self
            .state
            .upgrade()
            .ok_or(DbError::InvalidHandle("statement"))?;
        let guard = state.borrow();
        let conn = guard
            .conn
            .as_ref()
            .ok_or(DbError::InvalidHandle("statement"))?;
        f(conn)
    }

    /// True while the owning connection is open and the statement has not
    /// been closed.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.closed
            && self
                .state
                .upgrade()
                .is_some_and(|state| state.borrow().conn.is_some())
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Bind a value to a named parameter.
    ///
    /// Unknown parameter names fail with [`DbError::Bind`] and a warning
    /// record; the statement and its other bindings are left untouched.
    ///
    /// # Errors
    /// Returns [`DbError::Bind`] on a name the statement does not declare,
    /// [`DbError::InvalidHandle`] once the statement is invalid.
    pub fn bind(&mut self, name: &str, value: impl Into<DbValue>) -> Result<(), DbError> {
        let name = qualify(name);
        let known = self.with_conn(|conn| {
            let stmt = conn
                .prepare_cached(&self.sql)
                .map_err(|e| DbError::Prepare(e.to_string()))?;
            Ok(stmt.parameter_index(&name)?.is_some())
        })?;
        if !known {
            warn!(param = %name, "no such parameter in statement");
            return Err(DbError::Bind {
                name,
                reason: "no such parameter".into(),
            });
        }
        let value = value.into();
        if let Some(slot) = self.bindings.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.bindings.push((name, value));
        }
        Ok(())
    }

    fn run_query(&self) -> Result<RowSet, DbError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare_cached(&self.sql)
                .map_err(|e| DbError::Prepare(e.to_string()))?;
            let columns: Vec<String> = stmt
                .column_names()
                .iter()
                .map(|name| (*name).to_owned())
                .collect();
            let column_count = columns.len();
            let params: Vec<(String, rusqlite::types::Value)> = self
                .bindings
                .iter()
                .map(|(n, v)| (n.clone(), v.clone().into()))
                .collect();
            let param_refs: Vec<(&str, &dyn rusqlite::ToSql)> = params
                .iter()
                .map(|(n, v)| (n.as_str(), v as &dyn rusqlite::ToSql))
                .collect();

            let mut set = RowSet::new(columns);
            let mut rows = stmt.query(&param_refs[..])?;
            while let Some(row) = rows.next()? {
                let mut values = Vec::with_capacity(column_count);
                for i in 0..column_count {
                    let value: rusqlite::types::Value = row.get(i)?;
                    values.push(value.into());
                }
                set.push(values);
            }
            Ok(set)
        })
    }

    /// Advance the cursor one row.
    ///
    /// Returns `Ok(true)` while rows remain, `Ok(false)` once exhausted. The
    /// first call executes the statement, so DML run through `step` takes
    /// effect even though it yields no rows.
    ///
    /// # Errors
    /// Returns [`DbError::Sql`] on a constraint or I/O failure and
    /// [`DbError::InvalidHandle`] on an invalid statement; stop stepping on
    /// either.
    pub fn step(&mut self) -> Result<bool, DbError> {
        // The buffered walk must not outlive the connection: a statement
        // mid-iteration goes invalid the moment its connection closes.
        if !self.is_valid() {
            return Err(DbError::InvalidHandle("statement"));
        }
        if self.cursor.is_none() {
            let set = self.run_query()?;
            self.cursor = Some(RowCursor {
                set,
                pos: 0,
                started: false,
            });
        }
        let Some(cursor) = self.cursor.as_mut() else {
            return Err(DbError::InvalidHandle("statement"));
        };
        if cursor.started {
            cursor.pos += 1;
        } else {
            cursor.started = true;
        }
        Ok(cursor.pos < cursor.set.len())
    }

    /// Run the statement to completion, ignoring any result rows, and
    /// return the affected-row count. The statement is left `Done`.
    ///
    /// # Errors
    /// Same failure modes as [`Statement::step`].
    pub fn execute(&mut self) -> Result<usize, DbError> {
        let affected = self.with_conn(|conn| {
            let mut stmt = conn
                .prepare_cached(&self.sql)
                .map_err(|e| DbError::Prepare(e.to_string()))?;
            let params: Vec<(String, rusqlite::types::Value)> = self
                .bindings
                .iter()
                .map(|(n, v)| (n.clone(), v.clone().into()))
                .collect();
            let param_refs: Vec<(&str, &dyn rusqlite::ToSql)> = params
                .iter()
                .map(|(n, v)| (n.as_str(), v as &dyn rusqlite::ToSql))
                .collect();
            stmt.execute(&param_refs[..]).map_err(DbError::from)
        })?;
        self.cursor = Some(RowCursor::exhausted());
        Ok(affected)
    }

    /// Run the query and return every remaining row at once, leaving the
    /// statement `Done`.
    ///
    /// # Errors
    /// Same failure modes as [`Statement::step`].
    pub fn fetch_all(&mut self) -> Result<RowSet, DbError> {
        let set = self.run_query()?;
        self.cursor = Some(RowCursor::exhausted());
        Ok(set)
    }

    /// Rewind the cursor so the statement can be stepped again without
    /// re-preparing. Bindings are kept.
    pub fn reset(&mut self) {
        self.cursor = None;
    }

    /// Remove all bound parameter values; unbound parameters read as NULL.
    pub fn clear_bindings(&mut self) {
        self.bindings.clear();
    }

    /// True once the cursor has moved past the last row.
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.cursor
            .as_ref()
            .is_some_and(|c| c.started && c.pos >= c.set.len())
    }

    fn current_row(&self) -> Option<&crate::rows::DbRow> {
        let cursor = self.cursor.as_ref()?;
        if !cursor.started || cursor.pos >= cursor.set.len() {
            return None;
        }
        cursor.set.row(cursor.pos)
    }

    /// Value at `index` of the current row. `None` when the statement is
    /// invalid, not positioned on a row, or the index is out of range.
    #[must_use]
    pub fn column(&self, index: usize) -> Option<DbValue> {
        if !self.is_valid() {
            return None;
        }
        let row = self.current_row()?;
        let value = row.get(index);
        if value.is_none() {
            warn!(column = index, "no such column");
        }
        value.cloned()
    }

    /// Value of the named column of the current row; `None` under the same
    /// conditions as [`Statement::column`].
    #[must_use]
    pub fn column_by_name(&self, name: &str) -> Option<DbValue> {
        if !self.is_valid() {
            return None;
        }
        let row = self.current_row()?;
        let value = row.get_named(name);
        if value.is_none() {
            warn!(column = name, "no such column");
        }
        value.cloned()
    }

    /// Explicit invalidation. Idempotent; further operations fail.
    pub fn close(&mut self) {
        self.closed = true;
        self.cursor = None;
        self.bindings.clear();
    }
}

impl fmt::Debug for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Statement")
            .field("sql", &self.sql)
            .field("valid", &self.is_valid())
            .finish()
    }
}
