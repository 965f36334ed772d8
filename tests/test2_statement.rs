use smooth_sqlite::{DatabaseConfig, DbError, DbValue};

#[test]
fn insert_then_select_via_named_bind() -> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    conn.execute("CREATE TABLE t(x INTEGER)")?;

    let mut insert = conn.prepare("INSERT INTO t VALUES(:x)")?;
    insert.bind("x", 42)?;
    // DML yields no rows; the first step still executes it.
    assert!(!insert.step()?);
    assert_eq!(conn.changes(), 1);

    let mut select = conn.prepare("SELECT x FROM t")?;
    assert!(select.step()?);
    assert_eq!(select.column(0).unwrap().as_int64(), Some(42));
    assert!(!select.step()?);
    assert!(select.is_done());
    Ok(())
}

#[test]
fn bind_round_trips_every_value_type() -> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    conn.execute("CREATE TABLE v(i INTEGER, big INTEGER, r REAL, s TEXT, b BLOB, n TEXT)")?;

    let blob = vec![0u8, 1, 2, 255, 128];
    let mut insert =
        conn.prepare("INSERT INTO v VALUES(:i, :big, :r, :s, :b, :n)")?;
    insert.bind(":i", 42)?;
    insert.bind("big", 3_000_000_000_i64)?;
    insert.bind("r", 1234.5678_f64)?;
    insert.bind("s", "héllo wörld")?;
    insert.bind("b", blob.clone())?;
    insert.bind("n", DbValue::Null)?;
    assert_eq!(insert.execute()?, 1);

    let mut select = conn.prepare("SELECT i, big, r, s, b, n FROM v")?;
    assert!(select.step()?);
    assert_eq!(select.column_by_name("i").unwrap().as_int32(), Some(42));
    assert_eq!(
        select.column_by_name("big").unwrap().as_int64(),
        Some(3_000_000_000)
    );
    let r = select.column_by_name("r").unwrap().as_real().unwrap();
    assert!((r - 1234.5678).abs() < 1e-9);
    assert_eq!(
        select.column_by_name("s").unwrap().as_text(),
        Some("héllo wörld")
    );
    assert_eq!(select.column_by_name("b").unwrap().as_blob(), Some(&blob[..]));
    assert!(select.column_by_name("n").unwrap().is_null());
    Ok(())
}

#[test]
fn int32_view_refuses_out_of_range_integers() -> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    let big = conn.fetch_one("SELECT 3000000000")?;
    assert_eq!(big.as_int32(), None);
    assert_eq!(big.as_int64(), Some(3_000_000_000));
    Ok(())
}

#[test]
fn reset_rewinds_without_dropping_bindings() -> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    let mut stmt = conn.prepare("SELECT :a AS v")?;
    stmt.bind("a", 5)?;

    assert!(stmt.step()?);
    assert_eq!(stmt.column(0).unwrap().as_int64(), Some(5));
    assert!(!stmt.step()?);

    stmt.reset();
    assert!(!stmt.is_done());
    assert!(stmt.step()?);
    assert_eq!(stmt.column(0).unwrap().as_int64(), Some(5));

    // Clearing bindings leaves the parameter NULL on the next run.
    stmt.reset();
    stmt.clear_bindings();
    assert!(stmt.step()?);
    assert!(stmt.column(0).unwrap().is_null());
    Ok(())
}

#[test]
fn column_access_is_bounded() -> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    conn.execute("CREATE TABLE t(x INTEGER); INSERT INTO t VALUES(1);")?;
    let mut stmt = conn.prepare("SELECT x FROM t")?;

    // Not positioned on a row yet.
    assert!(stmt.column(0).is_none());

    assert!(stmt.step()?);
    assert!(stmt.column(0).is_some());
    assert!(stmt.column(5).is_none());
    assert!(stmt.column_by_name("nope").is_none());

    // Past the last row.
    assert!(!stmt.step()?);
    assert!(stmt.column(0).is_none());
    Ok(())
}

#[test]
fn binding_an_unknown_parameter_fails_and_changes_nothing()
-> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    let mut stmt = conn.prepare("SELECT :a AS v")?;
    stmt.bind("a", 9)?;

    let err = stmt.bind("missing", 1).unwrap_err();
    assert!(matches!(err, DbError::Bind { .. }));

    // The earlier binding still applies.
    assert!(stmt.step()?);
    assert_eq!(stmt.column(0).unwrap().as_int64(), Some(9));
    Ok(())
}

#[test]
fn prepare_rejects_malformed_and_empty_sql() -> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    assert!(matches!(
        conn.prepare("SELEKT nope").unwrap_err(),
        DbError::Prepare(_)
    ));
    assert!(matches!(conn.prepare("   ").unwrap_err(), DbError::Prepare(_)));
    Ok(())
}

#[test]
fn execute_reports_affected_rows() -> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    conn.execute("CREATE TABLE t(x INTEGER); INSERT INTO t VALUES(1),(2),(3);")?;

    let mut update = conn.prepare("UPDATE t SET x = x + :delta WHERE x < :cap")?;
    update.bind("delta", 10)?;
    update.bind("cap", 3)?;
    assert_eq!(update.execute()?, 2);
    assert!(update.is_done());
    Ok(())
}

#[test]
fn step_violating_a_constraint_reports_sql_error() -> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    conn.execute("CREATE TABLE t(x INTEGER PRIMARY KEY); INSERT INTO t VALUES(1);")?;
    let mut stmt = conn.prepare("INSERT INTO t VALUES(:x)")?;
    stmt.bind("x", 1)?;
    assert!(matches!(stmt.step().unwrap_err(), DbError::Sql { .. }));
    Ok(())
}

#[test]
fn statement_iterates_all_rows_in_order() -> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    conn.execute("CREATE TABLE t(x INTEGER); INSERT INTO t VALUES(1),(2),(3);")?;
    let mut stmt = conn.prepare("SELECT x FROM t ORDER BY x")?;

    let mut seen = Vec::new();
    while stmt.step()? {
        seen.push(stmt.column(0).unwrap().as_int64().unwrap());
    }
    assert_eq!(seen, vec![1, 2, 3]);
    Ok(())
}

#[test]
fn closing_the_connection_invalidates_live_statements()
-> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    conn.execute("CREATE TABLE t(x INTEGER); INSERT INTO t VALUES(1);")?;
    let mut stmt = conn.prepare("SELECT x FROM t")?;
    assert!(stmt.is_valid());

    conn.close();

    assert!(!stmt.is_valid());
    assert!(matches!(stmt.step().unwrap_err(), DbError::InvalidHandle(_)));
    assert!(matches!(
        stmt.bind("x", 1).unwrap_err(),
        DbError::InvalidHandle(_)
    ));
    assert!(stmt.column(0).is_none());
    Ok(())
}

#[test]
fn closing_the_connection_stops_a_statement_mid_iteration()
-> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    conn.execute("CREATE TABLE t(x INTEGER); INSERT INTO t VALUES(1),(2),(3);")?;
    let mut stmt = conn.prepare("SELECT x FROM t ORDER BY x")?;
    assert!(stmt.step()?);
    assert_eq!(stmt.column(0).unwrap().as_int64(), Some(1));

    conn.close();

    // No stale buffered rows: the walk fails the moment the connection goes.
    assert!(matches!(stmt.step().unwrap_err(), DbError::InvalidHandle(_)));
    assert!(stmt.column(0).is_none());
    Ok(())
}

#[test]
fn statement_close_is_idempotent_and_terminal() -> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    conn.execute("CREATE TABLE t(x INTEGER); INSERT INTO t VALUES(1);")?;
    let mut stmt = conn.prepare("SELECT x FROM t")?;
    assert!(stmt.step()?);

    stmt.close();
    stmt.close();
    assert!(!stmt.is_valid());
    assert!(matches!(stmt.step().unwrap_err(), DbError::InvalidHandle(_)));
    Ok(())
}

#[test]
fn fetch_all_materializes_the_result() -> Result<(), Box<dyn std::error::Error>> {
    let conn = DatabaseConfig::in_memory().open()?;
    conn.execute(
        "CREATE TABLE t(id INTEGER, name TEXT);
         INSERT INTO t VALUES(1,'alice'),(2,'bob');",
    )?;
    let mut stmt = conn.prepare("SELECT id, name FROM t ORDER BY id")?;
    let rows = stmt.fetch_all()?;

    assert_eq!(rows.len(), 2);
    assert_eq!(rows.columns(), ["id", "name"]);
    assert_eq!(rows.row(0).unwrap().get_named("name").unwrap().as_text(), Some("alice"));
    assert_eq!(rows.row(1).unwrap().get(0).unwrap().as_int64(), Some(2));
    assert!(stmt.is_done());
    Ok(())
}
