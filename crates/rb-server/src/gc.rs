//! Disk garbage collection.
//!
//! Two jobs: a startup sweep that clears anything half-built or left over
//! from a previous process, and the purge cascade that runs whenever a
//! source folder is declared dead.

use std::path::Path;

use rb_core::{folder, Result};
use rb_db::pool::DbPool;
use rb_db::queries::{bindings, stations};

/// Remove every media folder that is not ready to serve, plus every live
/// engine folder. Live output never survives a restart; an unready folder
/// is an interrupted materialization that will be rebuilt on demand.
pub async fn startup_sweep(media_root: &Path) -> Result<()> {
    let mut entries = tokio::fs::read_dir(media_root).await?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();

        if folder::is_live(&name) || !folder::is_ready(media_root, &name) {
            tracing::info!(folder = %name, "Sweeping stale media folder");
            let _ = tokio::fs::remove_dir_all(entry.path()).await;
        }
    }

    Ok(())
}

/// Purge a source folder and everything that depends on it.
///
/// Removes the directory, then deletes every station whose source is the
/// folder, each preceded by its bindings. Best-effort: failures are
/// logged, not propagated, because the purge itself runs on failure paths.
pub async fn nuke_source(db: &DbPool, media_root: &Path, source: &str) {
    tracing::warn!(folder = %source, "Purging source folder");
    let _ = tokio::fs::remove_dir_all(media_root.join(source)).await;

    let cascade = || -> Result<()> {
        let conn = rb_db::pool::get_conn(db)?;

        for key in stations::list_stations_with_source(&conn, source)? {
            bindings::delete_bindings_for_station(&conn, &key.user_id, &key.station_id)?;
            stations::delete_station(&conn, &key.user_id, &key.station_id)?;
            tracing::info!(
                user = %key.user_id,
                station = %key.station_id,
                "Deleted station of purged source"
            );
        }

        Ok(())
    };

    if let Err(e) = cascade() {
        tracing::error!(folder = %source, "Purge cascade failed: {e}");
    }
}
