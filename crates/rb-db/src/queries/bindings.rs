//! Binding CRUD operations.

use rb_core::{Error, Result};
use rusqlite::Connection;

use crate::models::Binding;

/// Create or replace a binding. Re-binding the same slot silently
/// overwrites the previous pointer.
pub fn upsert_binding(
    conn: &Connection,
    user_id: &str,
    id: &str,
    station_user: &str,
    station_id: &str,
) -> Result<Binding> {
    conn.execute(
        "INSERT OR REPLACE INTO bindings (user_id, id, station_user, station_id)
         VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![user_id, id, station_user, station_id],
    )
    .map_err(|e| Error::database(e.to_string()))?;

    Ok(Binding {
        user_id: user_id.to_string(),
        id: id.to_string(),
        station_user: station_user.to_string(),
        station_id: station_id.to_string(),
    })
}

/// Get a binding by its (owner, id) key.
pub fn get_binding(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Binding>> {
    let result = conn.query_row(
        "SELECT user_id, id, station_user, station_id FROM bindings
         WHERE user_id = ?1 AND id = ?2",
        [user_id, id],
        Binding::from_row,
    );
    match result {
        Ok(b) => Ok(Some(b)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List all bindings owned by a user.
pub fn list_bindings(conn: &Connection, user_id: &str) -> Result<Vec<Binding>> {
    let mut stmt = conn
        .prepare("SELECT user_id, id, station_user, station_id FROM bindings WHERE user_id = ?1")
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = stmt
        .query_map([user_id], Binding::from_row)
        .map_err(|e| Error::database(e.to_string()))?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}

/// Delete a binding. Returns true if a row was deleted.
pub fn delete_binding(conn: &Connection, user_id: &str, id: &str) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM bindings WHERE user_id = ?1 AND id = ?2",
            [user_id, id],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}

/// Delete every binding pointing at the given station, across all users.
pub fn delete_bindings_for_station(
    conn: &Connection,
    station_user: &str,
    station_id: &str,
) -> Result<usize> {
    conn.execute(
        "DELETE FROM bindings WHERE station_user = ?1 AND station_id = ?2",
        [station_user, station_id],
    )
    .map_err(|e| Error::database(e.to_string()))
}
