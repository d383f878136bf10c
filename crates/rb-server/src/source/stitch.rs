//! The playlist stitcher.
//!
//! Concatenates a list of already-scheduled child folders into a single
//! content-addressed `PL_` folder. The folder name is a pure function of
//! the child list, so a warm cache resolves without spawning anything.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use rb_core::audio::READY_POLL_INTERVAL;
use rb_core::folder::{self, MASTER_PLAYLIST, VARIANT_PLAYLIST};
use rb_core::Result;
use rb_db::pool::DbPool;
use tokio::process::Command;

use crate::context::AppContext;
use crate::gc;

/// Return the stitched folder for the given children, creating it and
/// starting the stitch job if it does not exist yet.
pub async fn stitched_folder(ctx: &AppContext, children: Vec<String>) -> Result<String> {
    let name = folder::playlist_folder(&children);
    let dir = ctx.media_root().join(&name);

    if tokio::fs::try_exists(&dir).await.unwrap_or(false) {
        return Ok(name);
    }

    tokio::fs::create_dir(&dir).await?;
    tokio::spawn(run_stitch(
        ctx.db.clone(),
        ctx.media_root().to_path_buf(),
        ctx.config.tools.ffmpeg.clone(),
        name.clone(),
        children,
    ));

    Ok(name)
}

/// The stitch job: wait for every child to become ready, write the concat
/// list, and run the copy-codec segmenter. Every failure path purges the
/// playlist folder through the GC cascade.
async fn run_stitch(
    db: DbPool,
    media_root: PathBuf,
    ffmpeg: PathBuf,
    name: String,
    children: Vec<String>,
) {
    // Wait until every child folder has a master playlist. A child that
    // disappears while waiting aborts the stitch.
    'wait: loop {
        for child in &children {
            let dir = media_root.join(child);
            if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
                tracing::warn!(folder = %name, child = %child, "Stitch child disappeared");
                gc::nuke_source(&db, &media_root, &name).await;
                return;
            }

            if !folder::is_ready(&media_root, child) {
                tokio::time::sleep(READY_POLL_INTERVAL).await;
                continue 'wait;
            }
        }

        break;
    }

    if let Err(e) = concat_children(&media_root, &ffmpeg, &name, &children).await {
        tracing::warn!(folder = %name, "Stitch failed: {e}");
        gc::nuke_source(&db, &media_root, &name).await;
    } else {
        tracing::info!(folder = %name, children = children.len(), "Stitch complete");
    }
}

async fn concat_children(
    media_root: &Path,
    ffmpeg: &Path,
    name: &str,
    children: &[String],
) -> Result<()> {
    let dir = media_root.join(name);

    let entries: Vec<String> = children
        .iter()
        .map(|child| format!("file '../{child}/{MASTER_PLAYLIST}'"))
        .collect();
    let list_path = dir.join("playlist.txt");
    tokio::fs::write(&list_path, entries.join("\n")).await?;

    let status = Command::new(ffmpeg)
        .args(["-f", "concat", "-safe", "0", "-i"])
        .arg(&list_path)
        .args(["-hls_playlist_type", "vod", "-hls_time", "2"])
        .args(["-hls_segment_type", "fmp4", "-hls_flags", "discont_start"])
        .args(["-c:a", "copy"])
        .args(["-master_pl_name", "master.m3u8"])
        .arg(dir.join(VARIANT_PLAYLIST))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|e| rb_core::Error::tool("ffmpeg", format!("failed to spawn: {e}")))?;

    if !status.success() {
        return Err(rb_core::Error::tool(
            "ffmpeg",
            format!("concat exited with status {status}"),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::AppContext;
    use crate::party::PartyStore;
    use crate::streaming::EngineRegistry;
    use rb_core::config::Config;
    use std::sync::Arc;

    fn test_ctx(media_root: &Path) -> AppContext {
        let mut config = Config::default();
        config.media.root = media_root.to_path_buf();

        AppContext {
            db: rb_db::pool::init_memory_pool().unwrap(),
            engines: EngineRegistry::new(
                config.media.root.clone(),
                config.tools.ffmpeg.clone(),
            ),
            parties: Arc::new(PartyStore::default()),
            config: Arc::new(config),
        }
    }

    #[tokio::test]
    async fn existing_folder_resolves_without_work() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());

        let children = vec!["YT_aaaaaaaaaaa".to_string(), "YT_bbbbbbbbbbb".to_string()];
        let expected = folder::playlist_folder(&children);

        // Pre-create the content-addressed folder: a warm cache.
        std::fs::create_dir(dir.path().join(&expected)).unwrap();
        std::fs::write(
            dir.path().join(&expected).join(MASTER_PLAYLIST),
            "#EXTM3U",
        )
        .unwrap();

        let name = stitched_folder(&ctx, children.clone()).await.unwrap();
        assert_eq!(name, expected);

        // No stitch job ran, so playlist.txt was never written.
        assert!(!dir.path().join(&expected).join("playlist.txt").exists());
    }

    #[tokio::test]
    async fn cold_folder_is_created_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());

        let children = vec!["YT_ccccccccccc".to_string()];
        let name = stitched_folder(&ctx, children).await.unwrap();

        // The (unready) folder exists as soon as the call returns; the
        // stitch job itself is still polling for the child.
        assert!(dir.path().join(&name).exists());
    }

    #[tokio::test]
    async fn vanishing_child_aborts_the_stitch() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());

        // Child folder never exists, so the job aborts on its first pass
        // and purges the playlist folder.
        let children = vec!["YT_ddddddddddd".to_string()];
        let name = stitched_folder(&ctx, children).await.unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(!dir.path().join(&name).exists());
    }
}
