use feedstore_core::db::schema::SCHEMA_VERSION;
use feedstore_core::db::{open_db, open_db_in_memory, DbError};
use feedstore_core::{Feed, FeedRepository, RepoError, SqliteBackend};
use rusqlite::Connection;

#[test]
fn bootstrap_creates_collections_and_lookup_indexes() {
    let conn = open_db_in_memory().unwrap();

    assert_eq!(schema_version(&conn), SCHEMA_VERSION);
    assert_eq!(
        schema_objects(&conn, "table"),
        vec!["entities", "feeds", "items", "metadata"]
    );
    assert_eq!(
        schema_objects(&conn, "index"),
        vec![
            "entities_item_id",
            "items_feed_id",
            "items_source_url",
            "metadata_item_id"
        ]
    );
}

#[test]
fn child_lookups_use_owner_indexes() {
    let conn = open_db_in_memory().unwrap();
    let plan: String = conn
        .query_row(
            "EXPLAIN QUERY PLAN SELECT id FROM metadata WHERE item_id = 'x';",
            [],
            |row| row.get(3),
        )
        .unwrap();
    assert!(plan.contains("metadata_item_id"), "plan was `{plan}`");
}

#[test]
fn newer_schema_is_rejected_before_any_write() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("future.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(&format!("PRAGMA user_version = {};", SCHEMA_VERSION + 1))
        .unwrap();
    drop(conn);

    match SqliteBackend::open(&path) {
        Err(RepoError::Transport(DbError::UnsupportedSchemaVersion {
            db_version,
            latest_supported,
        })) => {
            assert_eq!(db_version, SCHEMA_VERSION + 1);
            assert_eq!(latest_supported, SCHEMA_VERSION);
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("newer schema must not open"),
    }

    let untouched = Connection::open(&path).unwrap();
    assert!(schema_objects(&untouched, "table").is_empty());
}

#[test]
fn sqlite_file_backend_keeps_records_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feeds.db");
    let feed = Feed::new("Durable", "https://durable.example.com");

    {
        let backend = SqliteBackend::open(&path).unwrap();
        FeedRepository::new(&backend).create(&feed).unwrap();
    }

    let backend = SqliteBackend::open(&path).unwrap();
    assert_eq!(FeedRepository::new(&backend).find_by_id(feed.id).unwrap(), feed);
    assert_eq!(schema_version(&open_db(&path).unwrap()), SCHEMA_VERSION);
}

#[test]
fn reference_triggers_are_installed() {
    let conn = open_db_in_memory().unwrap();
    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'trigger';",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 6);
}

#[test]
fn references_hold_without_foreign_key_enforcement() {
    let conn = open_db_in_memory().unwrap();
    let enforced: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(enforced, 0);

    let err = conn
        .execute(
            "INSERT INTO items (id, date_published, feed_id) VALUES ('item-1', '2024-01-01T00:00:00Z', 'no-such-feed');",
            [],
        )
        .unwrap_err();
    assert!(err.to_string().contains("items.feed_id"), "{err}");
}

fn schema_version(conn: &Connection) -> u32 {
    conn.query_row("PRAGMA user_version;", [], |row| row.get(0))
        .unwrap()
}

fn schema_objects(conn: &Connection, kind: &str) -> Vec<String> {
    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master WHERE type = ?1 AND name NOT LIKE 'sqlite_%' ORDER BY name;",
        )
        .unwrap();
    stmt.query_map([kind], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}
