/// A single typed cell read from the current row of a statement, or a value
/// to bind to a named parameter.
///
/// SQLite stores one integer width; [`DbValue::as_int32`] is a checked
/// narrowing view over the stored 64-bit integer.
///
/// ```rust
/// use smooth_sqlite::DbValue;
///
/// let v = DbValue::from(42);
/// assert_eq!(v.as_int64(), Some(42));
/// assert_eq!(v.as_int32(), Some(42));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum DbValue {
    /// Integer value (64-bit)
    Integer(i64),
    /// Floating point value (64-bit)
    Real(f64),
    /// Text/string value
    Text(String),
    /// Binary data
    Blob(Vec<u8>),
    /// NULL value
    Null,
}

impl DbValue {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int64(&self) -> Option<i64> {
        if let DbValue::Integer(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    /// 32-bit view of a stored integer; `None` when the value does not fit.
    #[must_use]
    pub fn as_int32(&self) -> Option<i32> {
        self.as_int64().and_then(|v| i32::try_from(v).ok())
    }

    #[must_use]
    pub fn as_real(&self) -> Option<f64> {
        if let DbValue::Real(value) = self {
            Some(*value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let DbValue::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let DbValue::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// Integers 0/1 read back as booleans; anything else is `None`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self.as_int64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        }
    }
}

impl From<i32> for DbValue {
    fn from(value: i32) -> Self {
        DbValue::Integer(i64::from(value))
    }
}

impl From<i64> for DbValue {
    fn from(value: i64) -> Self {
        DbValue::Integer(value)
    }
}

impl From<f64> for DbValue {
    fn from(value: f64) -> Self {
        DbValue::Real(value)
    }
}

impl From<bool> for DbValue {
    fn from(value: bool) -> Self {
        DbValue::Integer(i64::from(value))
    }
}

impl From<&str> for DbValue {
    fn from(value: &str) -> Self {
        DbValue::Text(value.to_owned())
    }
}

impl From<String> for DbValue {
    fn from(value: String) -> Self {
        DbValue::Text(value)
    }
}

impl From<Vec<u8>> for DbValue {
    fn from(value: Vec<u8>) -> Self {
        DbValue::Blob(value)
    }
}

impl From<&[u8]> for DbValue {
    fn from(value: &[u8]) -> Self {
        DbValue::Blob(value.to_vec())
    }
}

impl From<DbValue> for rusqlite::types::Value {
    fn from(value: DbValue) -> Self {
        match value {
            DbValue::Integer(i) => rusqlite::types::Value::Integer(i),
            DbValue::Real(f) => rusqlite::types::Value::Real(f),
            DbValue::Text(s) => rusqlite::types::Value::Text(s),
            DbValue::Blob(b) => rusqlite::types::Value::Blob(b),
            DbValue::Null => rusqlite::types::Value::Null,
        }
    }
}

impl From<rusqlite::types::Value> for DbValue {
    fn from(value: rusqlite::types::Value) -> Self {
        match value {
            rusqlite::types::Value::Integer(i) => DbValue::Integer(i),
            rusqlite::types::Value::Real(f) => DbValue::Real(f),
            rusqlite::types::Value::Text(s) => DbValue::Text(s),
            rusqlite::types::Value::Blob(b) => DbValue::Blob(b),
            rusqlite::types::Value::Null => DbValue::Null,
        }
    }
}

/// How a transaction acquires its locks, mirroring SQLite's `BEGIN` variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionBehavior {
    /// Locks are taken lazily on first read/write.
    #[default]
    Deferred,
    /// A reserved write lock is taken immediately.
    Immediate,
    /// An exclusive lock is taken immediately.
    Exclusive,
}

impl TransactionBehavior {
    pub(crate) fn begin_sql(self) -> &'static str {
        match self {
            TransactionBehavior::Deferred => "BEGIN DEFERRED",
            TransactionBehavior::Immediate => "BEGIN IMMEDIATE",
            TransactionBehavior::Exclusive => "BEGIN EXCLUSIVE",
        }
    }
}
