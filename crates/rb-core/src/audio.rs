//! Fixed audio parameters of the live transcoding pipeline.
//!
//! Every PCM byte that moves between the stream queue and a station
//! encoder uses this format. The values are not configurable: the ticker
//! paces bytes into ffmpeg at wall-clock rate, so the tick byte count must
//! match the encoder's expected byte rate exactly or the generated
//! manifest timestamps drift away from real time.

use std::time::Duration;

/// PCM sample rate in Hz.
pub const SAMPLE_RATE: usize = 44_100;

/// Bytes per sample (signed 16-bit little-endian).
pub const BYTES_PER_SAMPLE: usize = 2;

/// Channel count (stereo).
pub const CHANNELS: usize = 2;

/// Length of one ticker interval in seconds.
pub const TICK_SECONDS: u64 = 2;

/// One ticker interval as a [`Duration`].
pub const TICK: Duration = Duration::from_secs(TICK_SECONDS);

/// Raw PCM bytes produced per second: 44100 * 2 * 2 = 176,400.
pub const BYTES_PER_SECOND: usize = SAMPLE_RATE * BYTES_PER_SAMPLE * CHANNELS;

/// Raw PCM bytes handed to the encoder per tick: 352,800.
pub const BYTES_PER_TICK: usize = BYTES_PER_SECOND * TICK_SECONDS as usize;

/// Seconds of silence written to a fresh encoder so it emits an initial
/// manifest before any queue content arrives.
pub const BOOTSTRAP_SILENCE_SECONDS: usize = 5;

/// How long a station engine survives with an empty queue and no client
/// requests before shutting itself down.
pub const IDLE_SHUTDOWN: Duration = Duration::from_secs(8);

/// Interval between folder-readiness checks while waiting for a
/// materialization to produce its master playlist.
pub const READY_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Longest source item accepted for materialization, in seconds.
pub const MAX_ITEM_DURATION_SECONDS: f64 = 3600.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tick_byte_count() {
        // The engine contract depends on this exact figure.
        assert_eq!(BYTES_PER_TICK, 352_800);
        assert_eq!(BYTES_PER_SECOND, 176_400);
    }
}
