//! Manifest envelope assembly.
//!
//! Builds the compressed envelope a client receives when it asks for a
//! station's current program. Static stations read pre-rendered manifests
//! off disk; stream stations resolve to a live engine (creating one on
//! first demand) and inline its continuously-updated master playlist.

use rb_core::folder::{MASTER_PLAYLIST, VARIANT_PLAYLIST};
use rb_core::{Error, Result};
use rb_db::models::{Station, StationKey, StationKind};
use rb_media::envelope::{self, ManifestEnvelope, ManifestPlaylist, PlaylistKind};
use rb_media::hls;

use crate::context::AppContext;

/// Header carrying the public base URL clients should use to fetch
/// manifests and media. Required; there is no usable default.
pub const API_ROOT_HEADER: &str = "x-api-root";

/// Minimal percent-encoding for a URL path segment. Unreserved characters
/// pass through; everything else is hex-escaped.
fn path_escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => {
                out.push('%');
                out.push(char::from(HEX[(b >> 4) as usize]));
                out.push(char::from(HEX[(b & 0x0f) as usize]));
            }
        }
    }
    out
}

const HEX: [u8; 16] = *b"0123456789ABCDEF";

/// Build the envelope bytes for a station.
pub async fn station_manifest(
    ctx: &AppContext,
    station: &Station,
    api_root: &str,
) -> Result<Vec<u8>> {
    match station.kind {
        StationKind::Static => static_manifest(ctx, station, api_root).await,
        StationKind::Stream => stream_manifest(ctx, station, api_root).await,
    }
}

/// Envelope for a static station: master and variant playlists inlined,
/// with the summed variant duration. Static programs support party sync.
async fn static_manifest(ctx: &AppContext, station: &Station, api_root: &str) -> Result<Vec<u8>> {
    let source = station
        .source
        .as_deref()
        .ok_or_else(|| Error::Internal("static station without source".into()))?;

    let dir = ctx.media_root().join(source);
    let master = tokio::fs::read_to_string(dir.join(MASTER_PLAYLIST)).await?;
    let variant = tokio::fs::read_to_string(dir.join(VARIANT_PLAYLIST)).await?;

    let duration = hls::variant_duration_seconds(&variant)?;
    let media_base = format!("{api_root}/media/{}", path_escape(source));

    envelope::encode(&ManifestEnvelope {
        playlists: Some(vec![
            ManifestPlaylist {
                kind: PlaylistKind::Master,
                language: "en".into(),
                url: format!("{media_base}/{MASTER_PLAYLIST}"),
                data: master,
                duration,
            },
            ManifestPlaylist {
                kind: PlaylistKind::Variant,
                language: "en".into(),
                url: format!("{media_base}/{VARIANT_PLAYLIST}"),
                data: variant,
                duration,
            },
        ]),
        subtitles: "{}".into(),
        ucp: "a".into(),
        audioonly: true,
        aspectratio: "0.00".into(),
        partysync: true,
        lrcs: "{}".into(),
        duration,
    })
}

/// Envelope for a stream station: the live engine's master playlist only.
/// No duration (the program is open-ended) and no party sync.
async fn stream_manifest(ctx: &AppContext, station: &Station, api_root: &str) -> Result<Vec<u8>> {
    let engine = ctx.engines.get_or_create(&StationKey::from(station)).await?;

    let dir = ctx.media_root().join(&engine.folder);
    let master = tokio::fs::read_to_string(dir.join(MASTER_PLAYLIST)).await?;

    let media_base = format!("{api_root}/media/{}", path_escape(&engine.folder));

    envelope::encode(&ManifestEnvelope {
        playlists: Some(vec![ManifestPlaylist {
            kind: PlaylistKind::Master,
            language: String::new(),
            url: format!("{media_base}/{MASTER_PLAYLIST}"),
            data: master,
            duration: 0,
        }]),
        subtitles: "{}".into(),
        ucp: "a".into(),
        audioonly: true,
        aspectratio: "0.00".into(),
        partysync: false,
        lrcs: "{}".into(),
        duration: 0,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::party::PartyStore;
    use crate::streaming::EngineRegistry;
    use rb_core::config::Config;
    use std::sync::Arc;

    fn test_ctx(media_root: &std::path::Path) -> AppContext {
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

    fn static_station(source: &str) -> Station {
        Station {
            user_id: "u1".into(),
            id: "mix".into(),
            kind: StationKind::Static,
            source: Some(source.into()),
        }
    }

    const VARIANT: &str = "#EXTM3U\n#EXTINF:2.000,\na.m4s\n#EXTINF:2.000,\nb.m4s\n#EXTINF:1.500,\nc.m4s\n";

    #[tokio::test]
    async fn static_envelope_contents() {
        let dir = tempfile::tempdir().unwrap();
        let folder = dir.path().join("YT_aaaaaaaaaaa");
        std::fs::create_dir(&folder).unwrap();
        std::fs::write(folder.join(MASTER_PLAYLIST), "#EXTM3U\nmaster\n").unwrap();
        std::fs::write(folder.join(VARIANT_PLAYLIST), VARIANT).unwrap();

        let ctx = test_ctx(dir.path());
        let bytes = station_manifest(&ctx, &static_station("YT_aaaaaaaaaaa"), "http://radio.test")
            .await
            .unwrap();

        let decoded = envelope::decode(&bytes).unwrap();
        assert!(decoded.partysync);
        assert!(decoded.audioonly);
        assert_eq!(decoded.duration, 5);
        assert_eq!(decoded.subtitles, "{}");
        assert_eq!(decoded.aspectratio, "0.00");

        let playlists = decoded.playlists.unwrap();
        assert_eq!(playlists.len(), 2);
        assert_eq!(playlists[0].kind, PlaylistKind::Master);
        assert_eq!(
            playlists[0].url,
            "http://radio.test/media/YT_aaaaaaaaaaa/master.m3u8"
        );
        assert_eq!(playlists[0].language, "en");
        assert_eq!(playlists[0].duration, 5);
        assert_eq!(playlists[1].kind, PlaylistKind::Variant);
        assert_eq!(playlists[1].data, VARIANT);
    }

    #[test]
    fn path_escape_passes_folder_charset_through() {
        // Every generated folder name survives unchanged.
        assert_eq!(path_escape("YT_dQw4w9WgXcQ"), "YT_dQw4w9WgXcQ");
        assert_eq!(
            path_escape("STR_0123456789abcdef0123456789abcdef"),
            "STR_0123456789abcdef0123456789abcdef"
        );
    }

    #[test]
    fn path_escape_hex_escapes_the_rest() {
        assert_eq!(path_escape("a b"), "a%20b");
        assert_eq!(path_escape("a/b"), "a%2Fb");
        assert_eq!(path_escape("a%b"), "a%25b");
        assert_eq!(path_escape("naïve"), "na%C3%AFve");
    }

    #[tokio::test]
    async fn static_envelope_fails_without_manifests() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());

        let err = station_manifest(&ctx, &static_station("YT_missing0000"), "http://radio.test")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }
}
