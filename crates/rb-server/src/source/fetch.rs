//! Item metadata probing and fetch+transcode.
//!
//! yt-dlp supplies both the metadata probe (duration bound) and the
//! best-audio byte stream, which is piped straight into an ffmpeg HLS
//! encode without touching disk in between.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use rb_core::folder::{self, VARIANT_PLAYLIST};
use rb_core::{Error, Result};
use rb_db::pool::DbPool;
use serde::Deserialize;
use tokio::process::Command;

use crate::gc;

/// The slice of yt-dlp's JSON output we care about.
#[derive(Debug, Deserialize)]
pub struct ItemInfo {
    /// Duration in seconds; 0 (or absent) means a live stream.
    #[serde(default)]
    pub duration: f64,
}

#[derive(Debug, Deserialize)]
struct PlaylistInfo {
    #[serde(default)]
    entries: Vec<PlaylistEntry>,
}

#[derive(Debug, Deserialize)]
struct PlaylistEntry {
    id: String,
}

fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// Run a tool to completion and return its stdout, mapping failures to
/// [`Error::Tool`].
async fn capture(tool: &Path, args: &[&str]) -> Result<Vec<u8>> {
    let name = tool
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| tool.to_string_lossy().into_owned());

    let output = Command::new(tool)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| Error::tool(name.clone(), format!("failed to spawn: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::tool(
            name,
            format!("exited with status {}: {}", output.status, stderr.trim()),
        ));
    }

    Ok(output.stdout)
}

/// Probe a single item's metadata.
pub async fn probe(ytdlp: &Path, id: &str) -> Result<ItemInfo> {
    let url = watch_url(id);
    let stdout = capture(ytdlp, &["--no-playlist", "--dump-json", url.as_str()]).await?;

    serde_json::from_slice(&stdout)
        .map_err(|e| Error::tool("yt-dlp", format!("unparsable metadata: {e}")))
}

/// List the item ids of a playlist, in playlist order.
pub async fn list_playlist(ytdlp: &Path, playlist_id: &str) -> Result<Vec<String>> {
    let url = format!("https://www.youtube.com/playlist?list={playlist_id}");
    let stdout = capture(ytdlp, &["--flat-playlist", "-J", url.as_str()]).await?;

    let info: PlaylistInfo = serde_json::from_slice(&stdout)
        .map_err(|e| Error::tool("yt-dlp", format!("unparsable playlist: {e}")))?;

    Ok(info.entries.into_iter().map(|e| e.id).collect())
}

/// Materialize a single item into `media/YT_<id>`.
///
/// Runs as a detached task; the folder exists (unready) for the whole
/// duration of the transcode. Any failure purges the folder through the
/// GC cascade so the next request starts from scratch.
pub async fn materialize(
    db: DbPool,
    media_root: PathBuf,
    ffmpeg: PathBuf,
    ytdlp: PathBuf,
    id: String,
) {
    let name = folder::item_folder(&id);
    let dir = media_root.join(&name);

    // Folder creation doubles as the claim on this materialization. Losing
    // the race means another task owns the folder; back off without
    // touching it.
    if let Err(e) = tokio::fs::create_dir(&dir).await {
        tracing::warn!(folder = %name, "Skipping materialization: {e}");
        return;
    }

    if let Err(e) = fetch_and_transcode(&dir, &ffmpeg, &ytdlp, &id).await {
        tracing::warn!(folder = %name, "Materialization failed: {e}");
        gc::nuke_source(&db, &media_root, &name).await;
    } else {
        tracing::info!(folder = %name, "Materialization complete");
    }
}

async fn fetch_and_transcode(
    dir: &Path,
    ffmpeg: &Path,
    ytdlp: &Path,
    id: &str,
) -> Result<()> {
    // Highest audio sample rate first; container does not matter since
    // ffmpeg re-encodes anyway.
    let mut fetcher = Command::new(ytdlp)
        .args(["-f", "bestaudio", "-S", "asr", "-o", "-", "--quiet"])
        .arg(watch_url(id))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::tool("yt-dlp", format!("failed to spawn: {e}")))?;

    let mut encoder = Command::new(ffmpeg)
        .args(["-i", "-", "-vn"])
        .args(["-hls_playlist_type", "vod", "-hls_time", "2"])
        .args(["-hls_segment_type", "fmp4", "-hls_flags", "discont_start"])
        .args(["-c:a", "aac", "-b:a", "192k"])
        .args(["-master_pl_name", "master.m3u8"])
        .arg(dir.join(VARIANT_PLAYLIST))
        .stdin(Stdio::piped())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| Error::tool("ffmpeg", format!("failed to spawn: {e}")))?;

    let mut stream = fetcher
        .stdout
        .take()
        .ok_or_else(|| Error::tool("yt-dlp", "no stdout".to_string()))?;
    let mut sink = encoder
        .stdin
        .take()
        .ok_or_else(|| Error::tool("ffmpeg", "no stdin".to_string()))?;

    // Closing the encoder's stdin when the stream ends is what lets
    // ffmpeg finalize the playlists, so the copy owns both handles.
    let pump = tokio::spawn(async move {
        let _ = tokio::io::copy(&mut stream, &mut sink).await;
    });

    let status = encoder
        .wait()
        .await
        .map_err(|e| Error::tool("ffmpeg", e.to_string()))?;
    let _ = pump.await;
    let _ = fetcher.wait().await;

    if !status.success() {
        return Err(Error::tool(
            "ffmpeg",
            format!("encoder exited with status {status}"),
        ));
    }

    Ok(())
}
