//! The framed, compressed manifest envelope returned to clients.
//!
//! Wire format:
//!
//! ```text
//! bytes 0..4   ASCII magic "blul"
//! bytes 4..8   uncompressed payload length, big-endian u32
//! bytes 8..    zlib-deflated JSON descriptor
//! ```
//!
//! The JSON field set (names and omission rules) is part of the client
//! contract; fields at their zero value are dropped from the output except
//! `playlists` and `partysync`, which are always present.

use std::io::{Read, Write};

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use rb_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Envelope magic bytes.
pub const MAGIC: &[u8; 4] = b"blul";

fn is_false(b: &bool) -> bool {
    !*b
}

fn is_zero(n: &u64) -> bool {
    *n == 0
}

/// Whether a playlist entry is the master or a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistKind {
    Master,
    Variant,
}

/// One playlist entry of the descriptor, with the manifest text inlined.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestPlaylist {
    #[serde(rename = "type")]
    pub kind: PlaylistKind,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub language: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub duration: u64,
}

/// The manifest descriptor carried inside the envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestEnvelope {
    /// Serialized even when absent (`null`), matching the client contract.
    pub playlists: Option<Vec<ManifestPlaylist>>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub subtitles: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ucp: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub audioonly: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub aspectratio: String,
    pub partysync: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub lrcs: String,
    /// Total program duration in seconds; only set for static stations.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub duration: u64,
}

/// Encode a descriptor into the framed envelope.
pub fn encode(envelope: &ManifestEnvelope) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(envelope)
        .map_err(|e| Error::Internal(format!("Failed to serialize manifest: {e}")))?;
    encode_payload(&json)
}

/// Frame and compress an already-serialized payload.
pub fn encode_payload(payload: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(payload)?;
    let deflated = encoder.finish()?;

    let mut out = Vec::with_capacity(8 + deflated.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    out.extend_from_slice(&deflated);
    Ok(out)
}

/// Decode a framed envelope back into the descriptor.
pub fn decode(bytes: &[u8]) -> Result<ManifestEnvelope> {
    let payload = decode_payload(bytes)?;
    serde_json::from_slice(&payload)
        .map_err(|e| Error::Validation(format!("Invalid manifest payload: {e}")))
}

/// Unframe and decompress an envelope, returning the raw payload.
pub fn decode_payload(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.len() < 8 {
        return Err(Error::Validation("Envelope too short".into()));
    }
    if &bytes[..4] != MAGIC {
        return Err(Error::Validation("Bad envelope magic".into()));
    }

    let expected_len = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;

    let mut payload = Vec::with_capacity(expected_len);
    ZlibDecoder::new(&bytes[8..]).read_to_end(&mut payload)?;

    if payload.len() != expected_len {
        return Err(Error::Validation(format!(
            "Envelope length mismatch: header says {expected_len}, payload is {}",
            payload.len()
        )));
    }

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ManifestEnvelope {
        ManifestEnvelope {
            playlists: Some(vec![
                ManifestPlaylist {
                    kind: PlaylistKind::Master,
                    language: "en".into(),
                    url: "http://radio.example/media/YT_x/master.m3u8".into(),
                    data: "#EXTM3U\n".into(),
                    duration: 5,
                },
                ManifestPlaylist {
                    kind: PlaylistKind::Variant,
                    language: "en".into(),
                    url: "http://radio.example/media/YT_x/output.m3u8".into(),
                    data: "#EXTM3U\n#EXTINF:2.000,\n".into(),
                    duration: 5,
                },
            ]),
            subtitles: "{}".into(),
            ucp: "a".into(),
            audioonly: true,
            aspectratio: "0.00".into(),
            partysync: true,
            lrcs: "{}".into(),
            duration: 5,
        }
    }

    #[test]
    fn round_trip() {
        let envelope = sample();
        let encoded = encode(&envelope).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, envelope);
    }

    #[test]
    fn empty_envelope_framing() {
        // The empty descriptor serializes to exactly this payload; the frame
        // is magic, big-endian length, then the zlib stream.
        let envelope = ManifestEnvelope::default();
        let json = serde_json::to_vec(&envelope).unwrap();
        assert_eq!(json, br#"{"playlists":null,"partysync":false}"#);

        let encoded = encode(&envelope).unwrap();
        assert_eq!(&encoded[..4], &[0x62, 0x6C, 0x75, 0x6C]);
        assert_eq!(&encoded[4..8], (json.len() as u32).to_be_bytes());
        assert_eq!(decode_payload(&encoded).unwrap(), json);
    }

    #[test]
    fn zero_fields_are_omitted() {
        let envelope = ManifestEnvelope {
            playlists: Some(vec![ManifestPlaylist {
                kind: PlaylistKind::Master,
                language: String::new(),
                url: "u".into(),
                data: String::new(),
                duration: 0,
            }]),
            partysync: false,
            ..Default::default()
        };
        let json = serde_json::to_string(&envelope).unwrap();
        assert!(!json.contains("subtitles"));
        assert!(!json.contains("audioonly"));
        assert!(!json.contains("duration"));
        assert!(!json.contains("language"));
        assert!(json.contains(r#""partysync":false"#));
    }

    #[test]
    fn rejects_bad_magic() {
        let mut encoded = encode(&ManifestEnvelope::default()).unwrap();
        encoded[0] = b'x';
        assert!(matches!(decode(&encoded), Err(Error::Validation(_))));
    }

    #[test]
    fn rejects_truncated_input() {
        assert!(decode(b"blu").is_err());
    }

    #[test]
    fn rejects_length_mismatch() {
        let mut encoded = encode(&ManifestEnvelope::default()).unwrap();
        encoded[7] = encoded[7].wrapping_add(1);
        assert!(matches!(decode(&encoded), Err(Error::Validation(_))));
    }
}
