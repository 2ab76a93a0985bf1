use kiyoshi_core::db::migrations::latest_version;
use kiyoshi_core::db::{open_configured_db, open_db, open_db_in_memory, DbError};
use kiyoshi_core::{
    kiyoshi_samples, normalize_kiyoshies, Action, CoreConfig, FetchKiyoshiesSaga,
    KiyoshiRepository, KiyoshiSource, RepoError, SourceError, SqliteKiyoshiRepository, Store,
    StoreConfig,
};
use rusqlite::{params, Connection};

#[test]
fn open_db_in_memory_applies_all_migrations() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), latest_version());
    assert_table_exists(&conn, "users");
    assert_table_exists(&conn, "kiyoshies");
    assert_table_exists(&conn, "kiyoshi_result");
}

#[test]
fn opening_same_database_twice_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kiyoshi.db");

    let conn_first = open_db(&path).unwrap();
    SqliteKiyoshiRepository::new(&conn_first)
        .save_normalized(&normalize_kiyoshies(kiyoshi_samples()))
        .unwrap();
    drop(conn_first);

    let conn_second = open_db(&path).unwrap();
    assert_eq!(schema_version(&conn_second), latest_version());
    assert_eq!(
        SqliteKiyoshiRepository::new(&conn_second)
            .count_kiyoshies()
            .unwrap(),
        4
    );
}

#[test]
fn opening_database_with_newer_schema_version_returns_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch("PRAGMA user_version = 999;").unwrap();
    drop(conn);

    let err = open_db(&path).unwrap_err();
    match err {
        DbError::SchemaTooNew { found, supported } => {
            assert_eq!(found, 999);
            assert_eq!(supported, latest_version());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn configured_db_uses_file_path_when_set() {
    let dir = tempfile::tempdir().unwrap();
    let config = CoreConfig {
        db_path: Some(dir.path().join("configured.db")),
        ..CoreConfig::default()
    };

    let conn = open_configured_db(&config).unwrap();
    assert_table_exists(&conn, "kiyoshies");
    assert!(dir.path().join("configured.db").exists());
}

#[test]
fn save_then_load_keeps_order_and_duplicates() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteKiyoshiRepository::new(&conn);
    let samples = kiyoshi_samples();
    let mut snapshot = normalize_kiyoshies(samples);
    snapshot.result.push(samples[0].id);

    repo.save_normalized(&snapshot).unwrap();
    let loaded = repo.load_normalized().unwrap();

    assert_eq!(loaded, snapshot);
    assert_eq!(loaded.result.len(), 5);
    assert_eq!(repo.count_kiyoshies().unwrap(), 4);
}

#[test]
fn save_replaces_previous_snapshot() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteKiyoshiRepository::new(&conn);
    let samples = kiyoshi_samples();

    repo.save_normalized(&normalize_kiyoshies(samples)).unwrap();
    let smaller = normalize_kiyoshies(&samples[..1]);
    repo.save_normalized(&smaller).unwrap();

    assert_eq!(repo.load_normalized().unwrap(), smaller);
}

#[test]
fn clear_empties_every_table() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteKiyoshiRepository::new(&conn);
    repo.save_normalized(&normalize_kiyoshies(kiyoshi_samples()))
        .unwrap();

    repo.clear().unwrap();

    assert_eq!(repo.count_kiyoshies().unwrap(), 0);
    assert!(repo.load_normalized().unwrap().is_empty());
}

#[test]
fn failed_clear_rolls_back_and_leaves_connection_usable() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteKiyoshiRepository::new(&conn);
    let snapshot = normalize_kiyoshies(kiyoshi_samples());
    repo.save_normalized(&snapshot).unwrap();
    conn.execute_batch(
        "CREATE TRIGGER keep_users BEFORE DELETE ON users
         BEGIN SELECT RAISE(ABORT, 'users are pinned'); END;",
    )
    .unwrap();

    assert!(repo.clear().is_err());

    assert!(conn.is_autocommit());
    assert_eq!(repo.count_kiyoshies().unwrap(), 4);
    assert_eq!(repo.load_normalized().unwrap(), snapshot);

    conn.execute_batch("DROP TRIGGER keep_users;").unwrap();
    repo.clear().unwrap();
    assert_eq!(repo.count_kiyoshies().unwrap(), 0);
}

#[test]
fn corrupt_rows_are_reported_as_invalid_data() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteKiyoshiRepository::new(&conn);
    repo.save_normalized(&normalize_kiyoshies(kiyoshi_samples()))
        .unwrap();

    conn.execute(
        "UPDATE kiyoshies SET said_at = ?1 WHERE id = ?2;",
        params!["yesterday", kiyoshi_samples()[1].id.to_string()],
    )
    .unwrap();

    let err = repo.load_normalized().unwrap_err();
    assert!(matches!(err, RepoError::InvalidData(_)));
    assert!(err.to_string().contains("yesterday"));
}

#[test]
fn dangling_author_fails_as_source() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteKiyoshiRepository::new(&conn);
    repo.save_normalized(&normalize_kiyoshies(kiyoshi_samples()))
        .unwrap();
    conn.execute(
        "DELETE FROM users WHERE id = ?1;",
        params![kiyoshi_samples()[2].made_by.id.to_string()],
    )
    .unwrap();

    let err = repo.fetch_raw().unwrap_err();
    assert!(matches!(err, SourceError::Denormalize(_)));
}

#[test]
fn repository_feeds_fetch_saga() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteKiyoshiRepository::new(&conn);
    let snapshot = normalize_kiyoshies(kiyoshi_samples());
    repo.save_normalized(&snapshot).unwrap();

    let fetched = FetchKiyoshiesSaga::new(SqliteKiyoshiRepository::new(&conn))
        .fetch()
        .unwrap();
    assert_eq!(fetched, snapshot);
}

#[test]
fn store_loads_snapshot_from_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("kiyoshi.db");
    {
        let conn = open_db(&path).unwrap();
        SqliteKiyoshiRepository::new(&conn)
            .save_normalized(&normalize_kiyoshies(kiyoshi_samples()))
            .unwrap();
    }

    let conn = open_db(&path).unwrap();
    let payload = SqliteKiyoshiRepository::new(&conn).fetch_raw().unwrap();
    let mut store = Store::new(StoreConfig::default());
    store
        .run_saga(Box::new(FetchKiyoshiesSaga::new(
            kiyoshi_core::StaticSource::new(payload),
        )))
        .unwrap();
    store.dispatch(Action::FetchKiyoshiesRequested).unwrap();

    assert_eq!(
        store.state().kiyoshi.kiyoshies().unwrap(),
        kiyoshi_samples().to_vec()
    );
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn assert_table_exists(conn: &Connection, table_name: &str) {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM sqlite_master
                WHERE type = 'table' AND name = ?1
            );",
            [table_name],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(exists, 1, "table {table_name} does not exist");
}
