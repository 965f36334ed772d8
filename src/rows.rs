use std::sync::Arc;

use crate::types::DbValue;

/// One materialized row from a query result.
///
/// Column names are shared across all rows of the same result set.
#[derive(Debug, Clone)]
pub struct DbRow {
    columns: Arc<Vec<String>>,
    values: Vec<DbValue>,
}

impl DbRow {
    pub(crate) fn new(columns: Arc<Vec<String>>, values: Vec<DbValue>) -> Self {
        Self { columns, values }
    }

    /// Value at `index`, or `None` when out of range.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&DbValue> {
        self.values.get(index)
    }

    /// Value of the named column, or `None` when no such column exists.
    #[must_use]
    pub fn get_named(&self, name: &str) -> Option<&DbValue> {
        let idx = self.columns.iter().position(|col| col == name)?;
        self.values.get(idx)
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A fully materialized query result.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    columns: Arc<Vec<String>>,
    rows: Vec<DbRow>,
}

impl RowSet {
    pub(crate) fn new(columns: Vec<String>) -> Self {
        Self {
            columns: Arc::new(columns),
            rows: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, values: Vec<DbValue>) {
        self.rows
            .push(DbRow::new(Arc::clone(&self.columns), values));
    }

    #[must_use]
    pub fn rows(&self) -> &[DbRow] {
        &self.rows
    }

    #[must_use]
    pub fn row(&self, index: usize) -> Option<&DbRow> {
        self.rows.get(index)
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
