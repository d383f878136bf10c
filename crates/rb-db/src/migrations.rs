//! Embedded SQL migrations and runner.
//!
//! Migrations are stored as `&str` constants and executed in order. A
//! `schema_migrations` table tracks which versions have been applied.

use rb_core::{Error, Result};
use rusqlite::Connection;

/// V1: initial schema.
///
/// Stations and bindings are keyed per user; a binding is a follower-side
/// pointer at another user's station. `stations.source` holds a media
/// folder name and is NULL for stream stations, whose content lives in a
/// transient live engine instead.
const V1_INITIAL: &str = r#"
CREATE TABLE users (
    id     TEXT PRIMARY KEY,
    secret TEXT NOT NULL
);

CREATE TABLE stations (
    user_id TEXT NOT NULL REFERENCES users(id),
    id      TEXT NOT NULL,
    kind    TEXT NOT NULL,
    source  TEXT,
    PRIMARY KEY (user_id, id)
);

CREATE TABLE bindings (
    user_id      TEXT NOT NULL REFERENCES users(id),
    id           TEXT NOT NULL,
    station_user TEXT NOT NULL,
    station_id   TEXT NOT NULL,
    PRIMARY KEY (user_id, id)
);

CREATE INDEX idx_stations_source ON stations(source);
CREATE INDEX idx_bindings_station ON bindings(station_user, station_id);
"#;

/// Ordered list of (version, sql) pairs.
const MIGRATIONS: &[(i64, &str)] = &[(1, V1_INITIAL)];

/// Run all pending migrations on `conn`.
///
/// Creates the `schema_migrations` tracking table if it does not exist,
/// then applies each outstanding migration inside a transaction.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version    INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
    )
    .map_err(|e| Error::database(format!("Failed to create schema_migrations: {e}")))?;

    for &(version, sql) in MIGRATIONS {
        let already: bool = conn
            .query_row(
                "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
                [version],
                |row| row.get(0),
            )
            .map_err(|e| Error::database(e.to_string()))?;

        if already {
            continue;
        }

        let tx = conn
            .unchecked_transaction()
            .map_err(|e| Error::database(e.to_string()))?;

        tx.execute_batch(sql)
            .map_err(|e| Error::database(format!("Migration V{version} failed: {e}")))?;

        tx.execute(
            "INSERT INTO schema_migrations (version) VALUES (?1)",
            [version],
        )
        .map_err(|e| Error::database(e.to_string()))?;

        tx.commit().map_err(|e| Error::database(e.to_string()))?;
    }

    Ok(())
}
