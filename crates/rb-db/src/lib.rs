//! rb-db: SQLite persistence layer.
//!
//! Pooled rusqlite connections, embedded migrations, row models, and one
//! query module per table.

pub mod migrations;
pub mod models;
pub mod pool;
pub mod queries;
