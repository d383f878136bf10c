//! Station CRUD operations.

use rb_core::{Error, Result};
use rusqlite::Connection;

use crate::models::{Station, StationKey, StationKind};

/// Create a station. `source` must be present for static stations and
/// absent for stream stations; the route layer enforces that.
pub fn create_station(
    conn: &Connection,
    user_id: &str,
    id: &str,
    kind: StationKind,
    source: Option<&str>,
) -> Result<Station> {
    conn.execute(
        "INSERT INTO stations (user_id, id, kind, source) VALUES (?1, ?2, ?3, ?4)",
        rusqlite::params![user_id, id, kind.to_string(), source],
    )
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            Error::Conflict(format!("Station '{id}' already exists"))
        } else {
            Error::database(e.to_string())
        }
    })?;

    Ok(Station {
        user_id: user_id.to_string(),
        id: id.to_string(),
        kind,
        source: source.map(str::to_string),
    })
}

/// Get a station by its (owner, id) key.
pub fn get_station(conn: &Connection, user_id: &str, id: &str) -> Result<Option<Station>> {
    let result = conn.query_row(
        "SELECT user_id, id, kind, source FROM stations WHERE user_id = ?1 AND id = ?2",
        [user_id, id],
        Station::from_row,
    );
    match result {
        Ok(s) => Ok(Some(s)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// List all stations owned by a user.
pub fn list_stations(conn: &Connection, user_id: &str) -> Result<Vec<Station>> {
    let mut stmt = conn
        .prepare("SELECT user_id, id, kind, source FROM stations WHERE user_id = ?1")
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = stmt
        .query_map([user_id], Station::from_row)
        .map_err(|e| Error::database(e.to_string()))?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}

/// Keys of every station whose source is the given media folder.
pub fn list_stations_with_source(conn: &Connection, source: &str) -> Result<Vec<StationKey>> {
    let mut stmt = conn
        .prepare("SELECT user_id, id FROM stations WHERE source = ?1")
        .map_err(|e| Error::database(e.to_string()))?;

    let rows = stmt
        .query_map([source], |row| {
            Ok(StationKey {
                user_id: row.get(0)?,
                station_id: row.get(1)?,
            })
        })
        .map_err(|e| Error::database(e.to_string()))?;

    rows.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| Error::database(e.to_string()))
}

/// Point an existing static station at a new source folder.
pub fn set_station_source(
    conn: &Connection,
    user_id: &str,
    id: &str,
    source: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE stations SET source = ?1 WHERE user_id = ?2 AND id = ?3",
        rusqlite::params![source, user_id, id],
    )
    .map_err(|e| Error::database(e.to_string()))?;
    Ok(())
}

/// Delete a station. Returns true if a row was deleted.
pub fn delete_station(conn: &Connection, user_id: &str, id: &str) -> Result<bool> {
    let n = conn
        .execute(
            "DELETE FROM stations WHERE user_id = ?1 AND id = ?2",
            [user_id, id],
        )
        .map_err(|e| Error::database(e.to_string()))?;
    Ok(n > 0)
}
