//! The station engine registry.
//!
//! In-memory mapping from (user, station) and from folder name to the
//! live engine instance. The registry owns every engine and guarantees at
//! most one engine per station; external callers hold transient `Arc`s
//! and must resolve through the registry per use.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use rb_core::Result;
use rb_db::models::StationKey;
use tokio::sync::Mutex;

use super::engine::StationEngine;

/// Registry of all live engines. One per process.
#[derive(Debug)]
pub struct EngineRegistry {
    media_root: PathBuf,
    ffmpeg: PathBuf,
    engines: Mutex<Vec<Arc<StationEngine>>>,
}

impl EngineRegistry {
    pub fn new(media_root: PathBuf, ffmpeg: PathBuf) -> Arc<Self> {
        Arc::new(Self {
            media_root,
            ffmpeg,
            engines: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn media_root(&self) -> &Path {
        &self.media_root
    }

    pub(crate) fn ffmpeg(&self) -> &Path {
        &self.ffmpeg
    }

    /// Existing engine for the station, touching its activity clock.
    pub async fn get(&self, key: &StationKey) -> Option<Arc<StationEngine>> {
        let engines = self.engines.lock().await;
        let engine = engines.iter().find(|e| &e.key == key).cloned();
        if let Some(ref engine) = engine {
            engine.touch();
        }
        engine
    }

    /// Existing engine by output folder name. Does not touch.
    pub async fn get_by_folder(&self, folder: &str) -> Option<Arc<StationEngine>> {
        let engines = self.engines.lock().await;
        engines.iter().find(|e| e.folder == folder).cloned()
    }

    /// Existing engine for the station, or a freshly started one.
    ///
    /// Creation happens under the registry lock, so two concurrent calls
    /// for the same station cannot both spawn an encoder.
    pub async fn get_or_create(self: &Arc<Self>, key: &StationKey) -> Result<Arc<StationEngine>> {
        let mut engines = self.engines.lock().await;

        if let Some(engine) = engines.iter().find(|e| &e.key == key) {
            engine.touch();
            return Ok(engine.clone());
        }

        let engine = StationEngine::new(key.clone());
        engine.start(self.clone()).await?;
        engines.push(engine.clone());

        Ok(engine)
    }

    /// Remove an engine by identity. Safe to call for an engine that was
    /// already removed.
    pub async fn remove(&self, engine: &Arc<StationEngine>) {
        let mut engines = self.engines.lock().await;
        engines.retain(|e| !Arc::ptr_eq(e, engine));
    }

    /// Signal every engine to tear itself down.
    pub async fn shutdown_all(&self) {
        let engines = self.engines.lock().await;
        for engine in engines.iter() {
            engine.shutdown();
        }
    }

    pub async fn len(&self) -> usize {
        self.engines.lock().await.len()
    }

    /// Test helper: register an engine without starting an encoder.
    #[cfg(test)]
    pub(crate) async fn insert_for_test(&self, engine: Arc<StationEngine>) {
        self.engines.lock().await.push(engine);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_registry() -> (Arc<EngineRegistry>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let registry = EngineRegistry::new(dir.path().to_path_buf(), PathBuf::from("ffmpeg"));
        (registry, dir)
    }

    #[tokio::test]
    async fn lookup_by_key_and_folder() {
        let (registry, _dir) = test_registry();
        let engine = StationEngine::new(StationKey::new("u1", "s1"));
        let folder = engine.folder.clone();
        registry.insert_for_test(engine.clone()).await;

        let found = registry.get(&StationKey::new("u1", "s1")).await.unwrap();
        assert!(Arc::ptr_eq(&found, &engine));

        let found = registry.get_by_folder(&folder).await.unwrap();
        assert!(Arc::ptr_eq(&found, &engine));

        assert!(registry.get(&StationKey::new("u1", "other")).await.is_none());
        assert!(registry.get_by_folder("STR_nope").await.is_none());
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let (registry, _dir) = test_registry();
        let engine = StationEngine::new(StationKey::new("u1", "s1"));
        registry.insert_for_test(engine.clone()).await;
        assert_eq!(registry.len().await, 1);

        registry.remove(&engine).await;
        assert_eq!(registry.len().await, 0);
        registry.remove(&engine).await;
        assert_eq!(registry.len().await, 0);
    }

    #[tokio::test]
    async fn get_touches_activity() {
        let (registry, _dir) = test_registry();
        let engine = StationEngine::new(StationKey::new("u1", "s1"));
        registry.insert_for_test(engine.clone()).await;

        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        registry.get(&StationKey::new("u1", "s1")).await.unwrap();
        assert!(engine.idle_time() < std::time::Duration::from_millis(20));
    }
}
