//! The media folder namespace.
//!
//! Every cached artifact lives in a directory under the media root whose
//! name doubles as its identifier. Three prefixes partition the namespace:
//!
//! - `YT_<id>` -- a materialized single item, named by its stable platform id.
//! - `PL_<hex>` -- a stitched playlist, content-addressed by the SHA-256 of
//!   its newline-joined child folder names (same children, same order, same
//!   folder -- forever).
//! - `STR_<hex>` -- a live station engine's output, named by a random nonce.
//!   Live output is never shareable, so no content addressing.
//!
//! A folder is *ready* iff it contains a readable `master.m3u8`; anything
//! else is fair game for the garbage collector.

use std::path::Path;

use rand::Rng;
use sha2::{Digest, Sha256};

/// Prefix of single-item folders.
pub const ITEM_PREFIX: &str = "YT_";

/// Prefix of stitched-playlist folders.
pub const PLAYLIST_PREFIX: &str = "PL_";

/// Prefix of live station engine folders.
pub const LIVE_PREFIX: &str = "STR_";

/// Older spelling of the live prefix; still produced by previous releases,
/// so the startup sweep removes it alongside `STR_`.
pub const LEGACY_LIVE_PREFIX: &str = "LIVE_";

/// File name of the HLS master playlist inside a folder.
pub const MASTER_PLAYLIST: &str = "master.m3u8";

/// File name of the HLS variant playlist inside a folder.
pub const VARIANT_PLAYLIST: &str = "output.m3u8";

/// Folder name for a materialized single item.
pub fn item_folder(id: &str) -> String {
    format!("{ITEM_PREFIX}{id}")
}

/// Deterministic folder name for a stitched playlist.
///
/// `PL_` followed by the lowercase hex of the first 16 bytes of
/// SHA-256 over the newline-joined child folder names.
pub fn playlist_folder(children: &[String]) -> String {
    let digest = Sha256::digest(children.join("\n").as_bytes());
    format!("{PLAYLIST_PREFIX}{}", hex::encode(&digest[..16]))
}

/// Fresh folder name for a live station engine: `STR_` plus a 32-hex nonce.
pub fn live_folder() -> String {
    format!("{LIVE_PREFIX}{}", random_hex_id())
}

/// Random 32-character lowercase hex string (16 random bytes).
pub fn random_hex_id() -> String {
    let bytes: [u8; 16] = rand::thread_rng().gen();
    hex::encode(bytes)
}

/// Whether a folder name belongs to the live engine namespace
/// (current or legacy prefix).
pub fn is_live(name: &str) -> bool {
    name.starts_with(LIVE_PREFIX) || name.starts_with(LEGACY_LIVE_PREFIX)
}

/// Whether the folder under `media_root` is ready to serve: it exists and
/// contains a readable master playlist.
pub fn is_ready(media_root: &Path, name: &str) -> bool {
    media_root.join(name).join(MASTER_PLAYLIST).is_file()
}

/// Extract the live folder name from a media request path like
/// `/media/STR_<32 hex>/output.m3u8`, if the path points into one.
pub fn live_folder_in_path(path: &str) -> Option<&str> {
    let rest = path.strip_prefix("/media/")?;
    let folder = rest.split('/').next()?;
    let nonce = folder.strip_prefix(LIVE_PREFIX)?;
    if nonce.len() == 32 && nonce.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase()) {
        Some(folder)
    } else {
        None
    }
}
