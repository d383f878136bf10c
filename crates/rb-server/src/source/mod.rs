//! Source resolution and materialization.
//!
//! Turns a user-supplied source URL into one or more media folder names,
//! kicking off background fetch/transcode work for anything not already
//! cached. Resolution returns immediately; consumers poll folder
//! readiness.

pub mod fetch;
pub mod stitch;

use rb_core::audio::MAX_ITEM_DURATION_SECONDS;
use rb_core::{folder, Error, Result};
use url::Url;

use crate::context::AppContext;

/// A parsed source descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceDescriptor {
    /// A single item, by its 11-character platform id.
    Item(String),
    /// A playlist, by its platform playlist id.
    Playlist(String),
}

fn is_item_id(s: &str) -> bool {
    s.len() == 11
        && s.bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// Parse a source URL into a descriptor.
///
/// Accepted shapes: `youtube.com/watch?v=<id>`, `youtu.be/<id>`, and
/// `youtube.com/playlist?list=<id>`.
pub fn parse_source(input: &str) -> Result<SourceDescriptor> {
    let parsed =
        Url::parse(input).map_err(|_| Error::Validation("invalid source url".into()))?;

    let host = parsed.host_str().unwrap_or_default();

    if matches!(host, "www.youtube.com" | "youtube.com") {
        if parsed.path() == "/watch" {
            if let Some((_, v)) = parsed.query_pairs().find(|(k, _)| k == "v") {
                if is_item_id(&v) {
                    return Ok(SourceDescriptor::Item(v.into_owned()));
                }
            }
        }

        if parsed.path() == "/playlist" {
            if let Some((_, list)) = parsed.query_pairs().find(|(k, _)| k == "list") {
                if !list.is_empty() {
                    return Ok(SourceDescriptor::Playlist(list.into_owned()));
                }
            }
        }
    }

    if host == "youtu.be" {
        let v = parsed.path().trim_start_matches('/');
        if is_item_id(v) {
            return Ok(SourceDescriptor::Item(v.to_string()));
        }
    }

    Err(Error::Validation("invalid source url".into()))
}

/// Resolve a source URL to the ordered list of media folders it denotes.
///
/// Single items resolve to one folder; playlists to one folder per item,
/// skipping items that fail to resolve. Fails only when nothing resolves.
pub async fn resolve(ctx: &AppContext, input: &str) -> Result<Vec<String>> {
    match parse_source(input)? {
        SourceDescriptor::Item(id) => Ok(vec![ensure_item(ctx, &id).await?]),
        SourceDescriptor::Playlist(id) => {
            let items = fetch::list_playlist(&ctx.config.tools.ytdlp, &id).await?;

            let mut folders = Vec::new();
            for item in items {
                match ensure_item(ctx, &item).await {
                    Ok(folder) => folders.push(folder),
                    Err(e) => {
                        tracing::debug!(item = %item, "Skipping playlist item: {e}");
                    }
                }
            }

            if folders.is_empty() {
                return Err(Error::Validation("no playlist items found".into()));
            }

            Ok(folders)
        }
    }
}

/// Resolve a source URL to exactly one media folder, stitching playlists
/// into a single content-addressed folder when needed.
pub async fn resolve_single(ctx: &AppContext, input: &str) -> Result<String> {
    let mut folders = resolve(ctx, input).await?;

    if folders.len() == 1 {
        return Ok(folders.remove(0));
    }

    stitch::stitched_folder(ctx, folders).await
}

/// Ensure a single item is scheduled for materialization and return its
/// folder name. A missing folder triggers a metadata probe (enforcing the
/// duration bound) followed by a background fetch+transcode; an existing
/// folder is returned as-is, ready or not.
async fn ensure_item(ctx: &AppContext, id: &str) -> Result<String> {
    let name = folder::item_folder(id);

    if !tokio::fs::try_exists(ctx.media_root().join(&name))
        .await
        .unwrap_or(false)
    {
        let info = fetch::probe(&ctx.config.tools.ytdlp, id).await?;

        if info.duration == 0.0 {
            return Err(Error::Validation("live streams aren't supported".into()));
        }
        if info.duration > MAX_ITEM_DURATION_SECONDS {
            return Err(Error::Validation(
                "videos longer than 1 hour aren't supported".into(),
            ));
        }

        tokio::spawn(fetch::materialize(
            ctx.db.clone(),
            ctx.media_root().to_path_buf(),
            ctx.config.tools.ffmpeg.clone(),
            ctx.config.tools.ytdlp.clone(),
            id.to_string(),
        ));
    }

    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_watch_urls() {
        assert_eq!(
            parse_source("https://www.youtube.com/watch?v=dQw4w9WgXcQ").unwrap(),
            SourceDescriptor::Item("dQw4w9WgXcQ".into())
        );
        assert_eq!(
            parse_source("https://youtube.com/watch?v=dQw4w9WgXcQ&t=10").unwrap(),
            SourceDescriptor::Item("dQw4w9WgXcQ".into())
        );
    }

    #[test]
    fn parses_short_urls() {
        assert_eq!(
            parse_source("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            SourceDescriptor::Item("dQw4w9WgXcQ".into())
        );
    }

    #[test]
    fn parses_playlist_urls() {
        assert_eq!(
            parse_source("https://www.youtube.com/playlist?list=PLabc123").unwrap(),
            SourceDescriptor::Playlist("PLabc123".into())
        );
    }

    #[test]
    fn rejects_everything_else() {
        for input in [
            "not a url",
            "https://example.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=tooshort",
            "https://www.youtube.com/watch",
            "https://youtu.be/",
            "https://www.youtube.com/playlist",
        ] {
            assert!(parse_source(input).is_err(), "accepted: {input}");
        }
    }

    #[test]
    fn item_id_shape() {
        assert!(is_item_id("dQw4w9WgXcQ"));
        assert!(is_item_id("a_b-c_d-e_f"));
        assert!(!is_item_id("with space!"));
        assert!(!is_item_id("dQw4w9WgXc"));
    }
}
