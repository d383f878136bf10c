//! The per-engine stream queue.
//!
//! An ordered sequence of queue elements, each lazily decoding a
//! materialized media folder into a PCM buffer. Elements are consumed
//! strictly in insertion order; the only concession to latency is a
//! look-ahead start of the second element's decoder so the transition
//! between tracks does not stall the ticker.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rb_core::audio::{BYTES_PER_TICK, READY_POLL_INTERVAL};
use rb_core::folder::MASTER_PLAYLIST;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

/// Buffer and completion flag of one element, guarded together.
#[derive(Debug, Default)]
struct ElementBuffer {
    data: Vec<u8>,
    done: bool,
}

/// One entry of the queue: a media folder plus the PCM decoded from it
/// so far. Owned by exactly one engine.
#[derive(Debug)]
pub struct QueueElement {
    source: String,
    started: AtomicBool,
    buffer: Mutex<ElementBuffer>,
}

impl QueueElement {
    pub fn new(source: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            source: source.into(),
            started: AtomicBool::new(false),
            buffer: Mutex::new(ElementBuffer::default()),
        })
    }

    /// Test constructor: an element with its PCM already in the buffer and
    /// the decoder considered finished, so no child process is involved.
    #[cfg(test)]
    pub fn preloaded(source: impl Into<String>, data: Vec<u8>, done: bool) -> Arc<Self> {
        Arc::new(Self {
            source: source.into(),
            started: AtomicBool::new(true),
            buffer: Mutex::new(ElementBuffer { data, done }),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Spawn the decoder task unless it is already running.
    fn ensure_started(
        self: &Arc<Self>,
        media_root: &Path,
        ffmpeg: &Path,
        cancel: &CancellationToken,
    ) {
        if self.started.swap(true, Ordering::AcqRel) {
            return;
        }
        tokio::spawn(self.clone().run_decoder(
            media_root.to_path_buf(),
            ffmpeg.to_path_buf(),
            cancel.clone(),
        ));
    }

    /// Drain up to `buf.len()` decoded bytes from the front of the buffer.
    /// The second value is true once the buffer is empty and the decoder
    /// has finished, i.e. the element is fully consumed.
    fn read(&self, buf: &mut [u8]) -> (usize, bool) {
        let mut state = self.buffer.lock();

        let n = buf.len().min(state.data.len());
        buf[..n].copy_from_slice(&state.data[..n]);
        state.data.drain(..n);

        (n, state.data.is_empty() && state.done)
    }

    /// Less than one tick of PCM buffered.
    fn is_near_end(&self) -> bool {
        self.buffer.lock().data.len() < BYTES_PER_TICK
    }

    fn mark_done(&self) {
        self.buffer.lock().done = true;
    }

    /// Decode the source folder into the buffer.
    ///
    /// Waits (1 s poll) for the folder to become ready; a folder that
    /// disappears while waiting finishes the element immediately so the
    /// queue can move on. Then streams raw PCM out of ffmpeg until EOF,
    /// or until the owning engine is torn down.
    async fn run_decoder(
        self: Arc<Self>,
        media_root: PathBuf,
        ffmpeg: PathBuf,
        cancel: CancellationToken,
    ) {
        let dir = media_root.join(&self.source);
        let master = dir.join(MASTER_PLAYLIST);

        loop {
            if !tokio::fs::try_exists(&dir).await.unwrap_or(false) {
                tracing::warn!(source = %self.source, "Queue element source disappeared");
                self.mark_done();
                return;
            }
            if tokio::fs::try_exists(&master).await.unwrap_or(false) {
                break;
            }

            tokio::select! {
                _ = tokio::time::sleep(READY_POLL_INTERVAL) => {}
                _ = cancel.cancelled() => {
                    self.mark_done();
                    return;
                }
            }
        }

        let mut child = match Command::new(&ffmpeg)
            .arg("-i")
            .arg(&master)
            .args(["-f", "s16le", "-ar", "44100", "-ac", "2", "pipe:1"])
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                tracing::warn!(source = %self.source, "Failed to spawn decoder: {e}");
                self.mark_done();
                return;
            }
        };

        let Some(mut stdout) = child.stdout.take() else {
            self.mark_done();
            return;
        };

        let mut chunk = vec![0u8; BYTES_PER_TICK];
        loop {
            tokio::select! {
                result = stdout.read(&mut chunk) => {
                    match result {
                        Ok(0) | Err(_) => break,
                        Ok(n) => {
                            self.buffer.lock().data.extend_from_slice(&chunk[..n]);
                        }
                    }
                }
                _ = cancel.cancelled() => {
                    let _ = child.kill().await;
                    break;
                }
            }
        }

        let _ = child.wait().await;
        self.mark_done();
        tracing::debug!(source = %self.source, "Queue element decoded");
    }
}

/// Ordered queue of elements, consumed one tick at a time.
#[derive(Debug, Default)]
pub struct StreamQueue {
    elements: Mutex<VecDeque<Arc<QueueElement>>>,
}

impl StreamQueue {
    /// Append an element. Re-enqueueing the same source is allowed and
    /// creates an independent element.
    pub fn push(&self, element: Arc<QueueElement>) {
        self.elements.lock().push_back(element);
    }

    pub fn len(&self) -> usize {
        self.elements.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.lock().is_empty()
    }

    /// Produce exactly one tick of PCM.
    ///
    /// Always returns [`BYTES_PER_TICK`] bytes; the flag is true whenever
    /// the queue held at least one element at call time. An empty queue
    /// yields silence. When the head runs out mid-tick the remainder is
    /// filled from the front of the second element.
    pub fn audio_frame(
        &self,
        media_root: &Path,
        ffmpeg: &Path,
        cancel: &CancellationToken,
    ) -> (Vec<u8>, bool) {
        let mut elements = self.elements.lock();
        let mut frame = vec![0u8; BYTES_PER_TICK];

        let Some(head) = elements.front().cloned() else {
            return (frame, false);
        };

        head.ensure_started(media_root, ffmpeg, cancel);
        let (read, head_finished) = head.read(&mut frame);

        if elements.len() >= 2 {
            let second = elements[1].clone();

            // Look-ahead: warm up the next decoder before the head runs dry.
            if !second.is_started() && (head_finished || head.is_near_end()) {
                second.ensure_started(media_root, ffmpeg, cancel);
            }

            if head_finished && read < BYTES_PER_TICK {
                let _ = second.read(&mut frame[read..]);
            }
        }

        if head_finished {
            elements.pop_front();
        }

        (frame, true)
    }
}
