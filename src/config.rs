use std::path::{Path, PathBuf};

use crate::connection::Connection;
use crate::error::DbError;

/// Open-mode flags mapped onto the engine's open flags.
///
/// The default is read-write with create, the mode a game save database
/// typically wants. `read_only` takes precedence over `create`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenMode {
    pub read_only: bool,
    pub create: bool,
    /// Interpret the path as a `file:` URI.
    pub uri: bool,
    pub no_mutex: bool,
    pub shared_cache: bool,
    pub private_cache: bool,
}

impl Default for OpenMode {
    fn default() -> Self {
        Self {
            read_only: false,
            create: true,
            uri: false,
            no_mutex: false,
            shared_cache: false,
            private_cache: false,
        }
    }
}

impl OpenMode {
    pub(crate) fn to_flags(self) -> rusqlite::OpenFlags {
        let mut flags = if self.read_only {
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
        } else {
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
        };
        if self.create && !self.read_only {
            flags |= rusqlite::OpenFlags::SQLITE_OPEN_CREATE;
        }
        if self.uri {
            flags |= rusqlite::OpenFlags::SQLITE_OPEN_URI;
        }
        if self.no_mutex {
            flags |= rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX;
        }
        if self.shared_cache {
            flags |= rusqlite::OpenFlags::SQLITE_OPEN_SHARED_CACHE;
        }
        if self.private_cache {
            flags |= rusqlite::OpenFlags::SQLITE_OPEN_PRIVATE_CACHE;
        }
        flags
    }
}

/// Where a database lives and how to open it.
///
/// File-backed databases live at `<root>/<folder>/<name>.db`; `root` is
/// typically the project or save-game directory. Builder methods adjust the
/// busy timeout and open mode:
///
/// ```rust,no_run
/// use smooth_sqlite::DatabaseConfig;
///
/// let conn = DatabaseConfig::new("/var/game", "saves", "player")
///     .busy_timeout_ms(250)
///     .open()?;
/// # Ok::<(), smooth_sqlite::DbError>(())
/// ```
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    root: PathBuf,
    folder: String,
    name: String,
    busy_timeout_ms: u32,
    mode: OpenMode,
    in_memory: bool,
}

impl DatabaseConfig {
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        folder: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            folder: folder.into(),
            name: name.into(),
            busy_timeout_ms: 0,
            mode: OpenMode::default(),
            in_memory: false,
        }
    }

    /// Private in-memory database; nothing touches the filesystem.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            root: PathBuf::new(),
            folder: String::new(),
            name: String::new(),
            busy_timeout_ms: 0,
            mode: OpenMode::default(),
            in_memory: true,
        }
    }

    /// Maximum wait before a blocked operation fails with `SQLITE_BUSY`.
    #[must_use]
    pub fn busy_timeout_ms(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    #[must_use]
    pub fn mode(mut self, mode: OpenMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.mode.read_only = read_only;
        self
    }

    /// Open a [`Connection`] with this configuration.
    ///
    /// # Errors
    /// Returns [`DbError::Open`] if the path is invalid or the engine rejects
    /// the flag combination.
    pub fn open(self) -> Result<Connection, DbError> {
        Connection::open(self)
    }

    /// Derived database file path. Fails for an in-memory configuration or
    /// when folder/name are empty.
    ///
    /// # Errors
    /// Returns [`DbError::Open`] when no file path can be derived.
    pub fn db_path(&self) -> Result<PathBuf, DbError> {
        if self.in_memory {
            return Err(DbError::Open(
                "in-memory database has no file path".into(),
            ));
        }
        if self.folder.is_empty() || self.name.is_empty() {
            return Err(DbError::Open(
                "database folder and name must be non-empty".into(),
            ));
        }
        let mut path = self.root.join(&self.folder).join(&self.name);
        path.set_extension("db");
        Ok(path)
    }

    /// Timestamped destination under `<root>/<folder>/Backups/`, or `None`
    /// for an in-memory database.
    pub(crate) fn backup_path(&self) -> Option<PathBuf> {
        if self.in_memory {
            return None;
        }
        let stamp = chrono::Local::now().format("%d%m%Y-%H%M%S");
        Some(
            self.root
                .join(&self.folder)
                .join("Backups")
                .join(format!("{}-backup-{stamp}.db", self.name)),
        )
    }

    #[must_use]
    pub fn is_in_memory(&self) -> bool {
        self.in_memory
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name used in log records and worker thread names.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.in_memory { ":memory:" } else { &self.name }
    }

    #[must_use]
    pub fn busy_timeout(&self) -> u32 {
        self.busy_timeout_ms
    }

    #[must_use]
    pub fn open_mode(&self) -> OpenMode {
        self.mode
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}
