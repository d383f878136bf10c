//! The live station engine.
//!
//! One engine per live station: it owns a child ffmpeg encoder producing
//! continuously-updated HLS into the engine's folder, and a wall-clock
//! ticker that feeds the encoder exactly one tick of PCM per tick. The
//! ticker is paced by the clock, not by encoder consumption, so the byte
//! count per tick must match the encoder's input rate exactly.

use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rb_core::audio::{
    BOOTSTRAP_SILENCE_SECONDS, BYTES_PER_SECOND, IDLE_SHUTDOWN, TICK,
};
use rb_core::folder::{self, VARIANT_PLAYLIST};
use rb_core::{Error, Result};
use rb_db::models::StationKey;
use tokio::io::AsyncWriteExt;
use tokio::process::{Child, ChildStdin, Command};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::queue::{QueueElement, StreamQueue};
use super::registry::EngineRegistry;

/// A live transcoder bound to one (user, station) pair.
#[derive(Debug)]
pub struct StationEngine {
    pub key: StationKey,
    /// Output folder name under the media root (`STR_<nonce>`).
    pub folder: String,
    created: Instant,
    /// Milliseconds since `created` of the most recent client activity.
    /// Updated without a lock; readers tolerate stale values.
    last_request_millis: AtomicU64,
    queue: StreamQueue,
    cancel: CancellationToken,
}

impl StationEngine {
    pub fn new(key: StationKey) -> Arc<Self> {
        Arc::new(Self {
            key,
            folder: folder::live_folder(),
            created: Instant::now(),
            last_request_millis: AtomicU64::new(0),
            queue: StreamQueue::default(),
            cancel: CancellationToken::new(),
        })
    }

    /// Record client activity now.
    pub fn touch(&self) {
        let millis = self.created.elapsed().as_millis() as u64;
        self.last_request_millis.store(millis, Ordering::Relaxed);
    }

    /// Time since the last recorded client activity.
    pub fn idle_time(&self) -> Duration {
        let last = Duration::from_millis(self.last_request_millis.load(Ordering::Relaxed));
        self.created.elapsed().saturating_sub(last)
    }

    /// Append a queue element for an already-scheduled media folder.
    pub fn enqueue(&self, source: impl Into<String>) {
        self.queue.push(QueueElement::new(source));
    }

    /// Ask the engine to tear itself down. Non-blocking; the ticker
    /// performs the actual cleanup.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// Spawn the encoder and the ticker.
    ///
    /// Creates the output folder, starts ffmpeg reading raw PCM on stdin,
    /// pre-feeds five seconds of silence so an initial manifest exists
    /// before any queue content, then hands off to the ticker task.
    pub(super) async fn start(self: &Arc<Self>, registry: Arc<EngineRegistry>) -> Result<()> {
        let dir = registry.media_root().join(&self.folder);
        tokio::fs::create_dir_all(&dir).await?;

        let spawned = Command::new(registry.ffmpeg())
            .args(["-f", "s16le", "-ar", "44100", "-ac", "2", "-i", "-"])
            .args(["-vn", "-hls_time", "2", "-hls_segment_type", "fmp4"])
            .args(["-hls_flags", "discont_start+delete_segments"])
            .args(["-c:a", "aac", "-b:a", "192k"])
            .args(["-master_pl_name", "master.m3u8"])
            .arg(dir.join(VARIANT_PLAYLIST))
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let mut encoder = match spawned {
            Ok(child) => child,
            Err(e) => {
                let _ = tokio::fs::remove_dir_all(&dir).await;
                return Err(Error::tool("ffmpeg", format!("failed to spawn encoder: {e}")));
            }
        };

        let Some(mut stdin) = encoder.stdin.take() else {
            let _ = encoder.kill().await;
            let _ = tokio::fs::remove_dir_all(&dir).await;
            return Err(Error::tool("ffmpeg", "encoder has no stdin".to_string()));
        };

        let silence = vec![0u8; BYTES_PER_SECOND * BOOTSTRAP_SILENCE_SECONDS];
        if let Err(e) = stdin.write_all(&silence).await {
            let _ = encoder.kill().await;
            let _ = tokio::fs::remove_dir_all(&dir).await;
            return Err(Error::tool("ffmpeg", format!("failed to bootstrap encoder: {e}")));
        }

        tokio::spawn(self.clone().run_ticker(registry, encoder, stdin));

        tracing::info!(
            user = %self.key.user_id,
            station = %self.key.station_id,
            folder = %self.folder,
            "Station engine started"
        );

        Ok(())
    }

    /// The engine's heartbeat.
    ///
    /// Every tick: pull one frame from the queue, write it to the encoder,
    /// then evaluate the idle condition. The idle check runs only after a
    /// successful write, so a dead encoder pipe always wins over an idle
    /// shutdown. On cancellation: kill the encoder, delete the output
    /// folder, unregister.
    async fn run_ticker(
        self: Arc<Self>,
        registry: Arc<EngineRegistry>,
        mut encoder: Child,
        mut stdin: ChildStdin,
    ) {
        let mut ticker = tokio::time::interval_at(Instant::now() + TICK, TICK);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let (frame, has_more) = self.queue.audio_frame(
                        registry.media_root(),
                        registry.ffmpeg(),
                        &self.cancel,
                    );

                    if stdin.write_all(&frame).await.is_err() {
                        tracing::warn!(folder = %self.folder, "Encoder pipe closed");
                        self.cancel.cancel();
                        continue;
                    }

                    if !has_more && self.idle_time() > IDLE_SHUTDOWN {
                        tracing::info!(folder = %self.folder, "Station engine idle");
                        self.cancel.cancel();
                    }
                }
                _ = self.cancel.cancelled() => {
                    let _ = encoder.kill().await;
                    let _ = tokio::fs::remove_dir_all(registry.media_root().join(&self.folder)).await;
                    registry.remove(&self).await;

                    tracing::info!(
                        user = %self.key.user_id,
                        station = %self.key.station_id,
                        folder = %self.folder,
                        "Station engine torn down"
                    );
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn idle_time_tracks_touches() {
        let engine = StationEngine::new(StationKey::new("u1", "s1"));
        assert!(engine.idle_time() < Duration::from_millis(10));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(engine.idle_time() >= Duration::from_secs(10));
        assert!(engine.idle_time() > IDLE_SHUTDOWN);

        engine.touch();
        assert!(engine.idle_time() < Duration::from_millis(10));
    }

    #[tokio::test]
    async fn enqueue_feeds_the_queue() {
        let engine = StationEngine::new(StationKey::new("u1", "s1"));
        assert!(engine.queue.is_empty());

        engine.enqueue("YT_aaaaaaaaaaa");
        engine.enqueue("YT_aaaaaaaaaaa");
        // No de-duplication: same source twice is two elements.
        assert_eq!(engine.queue.len(), 2);
    }

    #[tokio::test]
    async fn fresh_engines_get_distinct_folders() {
        let a = StationEngine::new(StationKey::new("u1", "s1"));
        let b = StationEngine::new(StationKey::new("u1", "s1"));
        assert_ne!(a.folder, b.folder);
        assert!(a.folder.starts_with("STR_"));
    }
}
