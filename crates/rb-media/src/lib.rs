//! rb-media: the manifest envelope codec and HLS playlist helpers.

pub mod envelope;
pub mod hls;

pub use envelope::{ManifestEnvelope, ManifestPlaylist, PlaylistKind};
