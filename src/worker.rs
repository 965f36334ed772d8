use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tokio::sync::oneshot;

use crate::config::DatabaseConfig;
use crate::connection::Connection;
use crate::error::DbError;
use crate::rows::RowSet;
use crate::types::DbValue;

/// Asynchronous handle to a database owned by a dedicated worker thread.
///
/// Every call sends one command and awaits its own oneshot completion, so
/// any number of operations may be in flight from different tasks without
/// the caller serializing them; the worker applies them in arrival order.
/// Dropping the last handle shuts the worker down.
#[derive(Clone)]
pub struct AsyncDatabase {
    worker: Arc<DbWorker>,
}

impl AsyncDatabase {
    /// Spawn a worker thread and open `config` on it.
    ///
    /// # Errors
    /// Returns [`DbError::Open`] when the database cannot be opened, or
    /// [`DbError::WorkerGone`] when the thread cannot be spawned.
    pub async fn open(config: DatabaseConfig) -> Result<Self, DbError> {
        let worker = DbWorker::spawn(config).await?;
        Ok(Self {
            worker: Arc::new(worker),
        })
    }

    /// Run one or more statements with no result set; returns the engine's
    /// modified-row count for the last of them.
    ///
    /// # Errors
    /// Propagates the same failures as [`Connection::execute`], plus
    /// [`DbError::WorkerGone`] if the worker thread is gone.
    pub async fn execute(&self, sql: impl Into<String>) -> Result<i64, DbError> {
        self.worker.execute(sql.into()).await
    }

    /// First column of the first row of `sql`.
    ///
    /// # Errors
    /// Propagates the same failures as [`Connection::fetch_one`], plus
    /// [`DbError::WorkerGone`].
    pub async fn fetch_one(&self, sql: impl Into<String>) -> Result<DbValue, DbError> {
        self.worker.fetch_one(sql.into()).await
    }

    /// Run a query with named parameters and materialize every row.
    ///
    /// # Errors
    /// Propagates prepare/bind/step failures, plus [`DbError::WorkerGone`].
    pub async fn query(
        &self,
        sql: impl Into<String>,
        params: Vec<(String, DbValue)>,
    ) -> Result<RowSet, DbError> {
        self.worker.query(sql.into(), params).await
    }

    /// Online backup to `dest`.
    ///
    /// # Errors
    /// Propagates [`DbError::Backup`], plus [`DbError::WorkerGone`].
    pub async fn backup_to(&self, dest: impl Into<PathBuf>) -> Result<(), DbError> {
        self.worker.backup_to(dest.into()).await
    }

    /// Close the underlying connection; later commands fail with
    /// [`DbError::InvalidHandle`]. Idempotent.
    ///
    /// # Errors
    /// Returns [`DbError::WorkerGone`] if the worker thread is gone.
    pub async fn close(&self) -> Result<(), DbError> {
        self.worker.close().await
    }
}

impl fmt::Debug for AsyncDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncDatabase")
            .field("db", &self.worker.name)
            .finish()
    }
}

struct DbWorker {
    sender: Sender<Command>,
    name: String,
}

impl DbWorker {
    async fn spawn(config: DatabaseConfig) -> Result<Self, DbError> {
        let (sender, receiver) = mpsc::channel::<Command>();
        let (ready_tx, ready_rx) = oneshot::channel();
        let name = config.display_name().to_owned();
        thread::Builder::new()
            .name(format!("smooth-sqlite-{name}"))
            .spawn(move || run_worker(&config, &receiver, ready_tx))
            .map_err(|err| {
                DbError::WorkerGone(format!("failed to spawn worker thread: {err}"))
            })?;
        match ready_rx.await {
            Ok(Ok(())) => Ok(Self { sender, name }),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(DbError::WorkerGone(
                "worker exited before opening the database".into(),
            )),
        }
    }

    fn send(&self, command: Command) -> Result<(), DbError> {
        self.sender
            .send(command)
            .map_err(|_| DbError::WorkerGone("worker channel closed".into()))
    }

    async fn execute(&self, sql: String) -> Result<i64, DbError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Execute {
            sql,
            respond_to: tx,
        })?;
        rx.await
            .map_err(|_| DbError::WorkerGone("worker dropped while executing".into()))?
    }

    async fn fetch_one(&self, sql: String) -> Result<DbValue, DbError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::FetchOne {
            sql,
            respond_to: tx,
        })?;
        rx.await
            .map_err(|_| DbError::WorkerGone("worker dropped while fetching".into()))?
    }

    async fn query(
        &self,
        sql: String,
        params: Vec<(String, DbValue)>,
    ) -> Result<RowSet, DbError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Query {
            sql,
            params,
            respond_to: tx,
        })?;
        rx.await
            .map_err(|_| DbError::WorkerGone("worker dropped while querying".into()))?
    }

    async fn backup_to(&self, dest: PathBuf) -> Result<(), DbError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Backup {
            dest,
            respond_to: tx,
        })?;
        rx.await
            .map_err(|_| DbError::WorkerGone("worker dropped during backup".into()))?
    }

    async fn close(&self) -> Result<(), DbError> {
        let (tx, rx) = oneshot::channel();
        self.send(Command::Close { respond_to: tx })?;
        rx.await
            .map_err(|_| DbError::WorkerGone("worker dropped while closing".into()))?
    }
}

impl Drop for DbWorker {
    fn drop(&mut self) {
        let _ = self.sender.send(Command::Shutdown);
    }
}

enum Command {
    Execute {
        sql: String,
        respond_to: oneshot::Sender<Result<i64, DbError>>,
    },
    FetchOne {
        sql: String,
        respond_to: oneshot::Sender<Result<DbValue, DbError>>,
    },
    Query {
        sql: String,
        params: Vec<(String, DbValue)>,
        respond_to: oneshot::Sender<Result<RowSet, DbError>>,
    },
    Backup {
        dest: PathBuf,
        respond_to: oneshot::Sender<Result<(), DbError>>,
    },
    Close {
        respond_to: oneshot::Sender<Result<(), DbError>>,
    },
    Shutdown,
}

fn run_worker(
    config: &DatabaseConfig,
    receiver: &Receiver<Command>,
    ready: oneshot::Sender<Result<(), DbError>>,
) {
    // The connection is created and dropped on this thread; the facade
    // types never cross threads.
    let conn = match Connection::open(config.clone()) {
        Ok(conn) => {
            let _ = ready.send(Ok(()));
            conn
        }
        Err(err) => {
            let _ = ready.send(Err(err));
            return;
        }
    };

    while let Ok(command) = receiver.recv() {
        match command {
            Command::Execute { sql, respond_to } => {
                let _ = respond_to.send(conn.execute(&sql));
            }
            Command::FetchOne { sql, respond_to } => {
                let _ = respond_to.send(conn.fetch_one(&sql));
            }
            Command::Query {
                sql,
                params,
                respond_to,
            } => {
                let _ = respond_to.send(run_query(&conn, &sql, params));
            }
            Command::Backup { dest, respond_to } => {
                let _ = respond_to.send(conn.backup_to(&dest));
            }
            Command::Close { respond_to } => {
                conn.close();
                let _ = respond_to.send(Ok(()));
            }
            Command::Shutdown => break,
        }
    }
}

fn run_query(
    conn: &Connection,
    sql: &str,
    params: Vec<(String, DbValue)>,
) -> Result<RowSet, DbError> {
    let mut stmt = conn.prepare(sql)?;
    for (name, value) in params {
        stmt.bind(&name, value)?;
    }
    stmt.fetch_all()
}
