//! Shared application context.
//!
//! [`AppContext`] is the central struct shared across all route handlers
//! via Axum state. It is cheaply cloneable because it only holds `Arc`s
//! and a pooled database handle.

use std::path::Path;
use std::sync::Arc;

use rb_core::config::Config;
use rb_db::pool::DbPool;

use crate::party::PartyStore;
use crate::streaming::EngineRegistry;

/// Application context shared by all request handlers (via Axum state).
#[derive(Clone)]
pub struct AppContext {
    /// Database connection pool.
    pub db: DbPool,
    /// Immutable application configuration.
    pub config: Arc<Config>,
    /// Live station engines, at most one per station.
    pub engines: Arc<EngineRegistry>,
    /// In-memory party membership.
    pub parties: Arc<PartyStore>,
}

impl AppContext {
    /// Root directory of all cached media folders.
    pub fn media_root(&self) -> &Path {
        &self.config.media.root
    }
}
