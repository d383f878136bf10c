//! User CRUD and credential checks.

use rb_core::{Error, Result};
use rusqlite::Connection;

use crate::models::User;

/// Create a new user with the given id and secret.
pub fn create_user(conn: &Connection, id: &str, secret: &str) -> Result<User> {
    conn.execute(
        "INSERT INTO users (id, secret) VALUES (?1, ?2)",
        rusqlite::params![id, secret],
    )
    .map_err(|e| {
        if e.to_string().contains("UNIQUE constraint failed") {
            Error::Conflict(format!("User '{id}' already exists"))
        } else {
            Error::database(e.to_string())
        }
    })?;

    Ok(User {
        id: id.to_string(),
        secret: secret.to_string(),
    })
}

/// Look up a user by id and secret. `None` when either does not match;
/// callers treat that as an authentication failure.
pub fn authenticate(conn: &Connection, id: &str, secret: &str) -> Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, secret FROM users WHERE id = ?1 AND secret = ?2",
        [id, secret],
        User::from_row,
    );
    match result {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}

/// Get a user by primary key.
pub fn get_user(conn: &Connection, id: &str) -> Result<Option<User>> {
    let result = conn.query_row(
        "SELECT id, secret FROM users WHERE id = ?1",
        [id],
        User::from_row,
    );
    match result {
        Ok(u) => Ok(Some(u)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(Error::database(e.to_string())),
    }
}
