//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which builds a full [`AppContext`] over an
//! in-memory database and a temporary media root. The [`with_server`]
//! constructor starts Axum on a random port for HTTP-level testing.

use std::net::SocketAddr;
use std::sync::Arc;

use rb_core::config::Config;
use rb_core::folder::{MASTER_PLAYLIST, VARIANT_PLAYLIST};
use rb_db::pool::{init_memory_pool, DbPool};
use rb_server::context::AppContext;
use rb_server::party::PartyStore;
use rb_server::router::build_router;
use rb_server::streaming::EngineRegistry;
use tempfile::TempDir;

/// Test harness wrapping a fully-constructed [`AppContext`] backed by an
/// in-memory database and a throwaway media root.
pub struct TestHarness {
    pub ctx: AppContext,
    pub db: DbPool,
    pub media: TempDir,
}

impl TestHarness {
    /// Create a new harness with default configuration.
    pub fn new() -> Self {
        let media = tempfile::tempdir().expect("failed to create media tempdir");

        let mut config = Config::default();
        config.media.root = media.path().to_path_buf();

        let db = init_memory_pool().expect("failed to create in-memory pool");
        let engines = EngineRegistry::new(config.media.root.clone(), config.tools.ffmpeg.clone());

        let ctx = AppContext {
            db: db.clone(),
            config: Arc::new(config),
            engines,
            parties: Arc::new(PartyStore::default()),
        };

        Self { ctx, db, media }
    }

    /// Start an Axum server on a random port and return the harness
    /// together with the base URL.
    pub async fn with_server() -> (Self, String) {
        let harness = Self::new();
        let app = build_router(harness.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr: SocketAddr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (harness, format!("http://{addr}"))
    }

    /// Get a database connection from the pool.
    pub fn conn(&self) -> rb_db::pool::PooledConnection {
        rb_db::pool::get_conn(&self.db).expect("failed to get db connection")
    }

    /// Create a ready media folder with trivially valid playlists.
    pub fn make_ready_folder(&self, name: &str, variant: &str) {
        let dir = self.media.path().join(name);
        std::fs::create_dir(&dir).expect("failed to create media folder");
        std::fs::write(dir.join(MASTER_PLAYLIST), "#EXTM3U\nmaster\n").unwrap();
        std::fs::write(dir.join(VARIANT_PLAYLIST), variant).unwrap();
    }
}

/// Create a user over the API and return its (id, secret) pair.
pub async fn create_user(client: &reqwest::Client, base: &str) -> (String, String) {
    let resp = client
        .post(format!("{base}/users"))
        .send()
        .await
        .expect("create user request failed");
    assert_eq!(resp.status(), 200);

    let json: serde_json::Value = resp.json().await.unwrap();
    (
        json["id"].as_str().unwrap().to_string(),
        json["secret"].as_str().unwrap().to_string(),
    )
}
