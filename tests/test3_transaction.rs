use smooth_sqlite::{DatabaseConfig, DbError, TransactionBehavior};

fn count(conn: &smooth_sqlite::Connection) -> i64 {
    conn.fetch_one("SELECT COUNT(*) FROM t")
        .and_then(|v| v.as_int64().ok_or(DbError::NoRows))
        .unwrap()
}

#[test]
fn rollback_discards_changes() -> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    conn.execute("CREATE TABLE t(x INTEGER)")?;

    let mut tx = conn.begin_transaction(TransactionBehavior::Deferred)?;
    conn.execute("INSERT INTO t VALUES(1)")?;
    assert_eq!(count(&conn), 1);
    tx.rollback();

    assert_eq!(count(&conn), 0);
    Ok(())
}

#[test]
fn commit_persists_changes() -> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    {
        let conn = DatabaseConfig::new(dir.path(), "saves", "tx").open()?;
        conn.execute("CREATE TABLE t(x INTEGER)")?;
        let mut tx = conn.begin_transaction(TransactionBehavior::Immediate)?;
        conn.execute("INSERT INTO t VALUES(1),(2)")?;
        tx.commit()?;
        assert!(!tx.is_open());
    }
    let conn = DatabaseConfig::new(dir.path(), "saves", "tx").open()?;
    assert_eq!(count(&conn), 2);
    Ok(())
}

#[test]
fn second_begin_fails_and_leaves_the_first_committable()
-> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    conn.execute("CREATE TABLE t(x INTEGER)")?;

    let mut first = conn.begin_transaction(TransactionBehavior::Deferred)?;
    let err = conn
        .begin_transaction(TransactionBehavior::Deferred)
        .unwrap_err();
    assert!(matches!(err, DbError::TransactionAlreadyActive));

    conn.execute("INSERT INTO t VALUES(1)")?;
    first.commit()?;
    assert_eq!(count(&conn), 1);
    Ok(())
}

#[test]
fn dropping_an_uncommitted_transaction_rolls_back() -> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    conn.execute("CREATE TABLE t(x INTEGER)")?;

    {
        let _tx = conn.begin_transaction(TransactionBehavior::Deferred)?;
        conn.execute("INSERT INTO t VALUES(1)")?;
    }
    assert_eq!(count(&conn), 0);

    // The slot is free again after the implicit rollback.
    let mut tx = conn.begin_transaction(TransactionBehavior::Deferred)?;
    conn.execute("INSERT INTO t VALUES(2)")?;
    tx.commit()?;
    assert_eq!(count(&conn), 1);
    Ok(())
}

#[test]
fn rollback_is_idempotent_and_commit_after_it_fails() -> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    conn.execute("CREATE TABLE t(x INTEGER)")?;

    let mut tx = conn.begin_transaction(TransactionBehavior::Deferred)?;
    tx.rollback();
    tx.rollback();
    assert!(!tx.is_open());
    assert!(matches!(tx.commit().unwrap_err(), DbError::InvalidHandle(_)));

    // A fresh transaction can start immediately.
    let mut tx = conn.begin_transaction(TransactionBehavior::Exclusive)?;
    tx.commit()?;
    Ok(())
}

#[test]
fn closing_the_connection_rolls_back_an_active_transaction()
-> Result<(), Box<dyn std::error::Error>> {
    let dir = tempfile::tempdir()?;
    let config = DatabaseConfig::new(dir.path(), "saves", "abandoned");
    {
        let conn = config.clone().open()?;
        conn.execute("CREATE TABLE t(x INTEGER)")?;
        let mut tx = conn.begin_transaction(TransactionBehavior::Deferred)?;
        conn.execute("INSERT INTO t VALUES(1)")?;
        conn.close();

        // The held handle observes the forced rollback.
        assert!(!tx.is_open());
        assert!(matches!(tx.commit().unwrap_err(), DbError::InvalidHandle(_)));
    }
    let conn = config.open()?;
    assert_eq!(count(&conn), 0);
    Ok(())
}

#[test]
fn failed_commit_leaves_the_transaction_open_until_rollback()
-> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    conn.execute(
        "PRAGMA foreign_keys = ON;
         CREATE TABLE parent(id INTEGER PRIMARY KEY);
         CREATE TABLE child(
             pid INTEGER REFERENCES parent(id) DEFERRABLE INITIALLY DEFERRED
         );",
    )?;

    let mut tx = conn.begin_transaction(TransactionBehavior::Deferred)?;
    // Accepted now, rejected at commit: the foreign-key check is deferred.
    conn.execute("INSERT INTO child VALUES(99)")?;

    let err = tx.commit().unwrap_err();
    assert!(matches!(err, DbError::Commit(_)));
    assert!(tx.is_open());

    // Still a single transaction slot while the failed commit is unresolved.
    assert!(matches!(
        conn.begin_transaction(TransactionBehavior::Deferred)
            .unwrap_err(),
        DbError::TransactionAlreadyActive
    ));

    tx.rollback();
    assert!(!tx.is_open());
    assert_eq!(
        conn.fetch_one("SELECT COUNT(*) FROM child")?.as_int64(),
        Some(0)
    );
    let mut tx = conn.begin_transaction(TransactionBehavior::Deferred)?;
    tx.commit()?;
    Ok(())
}

#[test]
fn begin_on_a_closed_connection_fails() -> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    conn.close();
    assert!(matches!(
        conn.begin_transaction(TransactionBehavior::Deferred)
            .unwrap_err(),
        DbError::InvalidHandle(_)
    ));
    Ok(())
}
