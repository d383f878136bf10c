//! HLS playlist text helpers.

use rb_core::{Error, Result};

/// Sum the `#EXTINF:` segment durations of a variant playlist, truncated
/// to whole seconds.
pub fn variant_duration_seconds(manifest: &str) -> Result<u64> {
    let mut total = 0.0f64;

    for line in manifest.lines() {
        if let Some(rest) = line.strip_prefix("#EXTINF:") {
            let value = rest.split(',').next().unwrap_or(rest).trim();
            let secs: f64 = value.parse().map_err(|_| {
                Error::Validation(format!("Invalid #EXTINF duration: {value}"))
            })?;
            total += secs;
        }
    }

    Ok(total as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sums_and_truncates() {
        let manifest = "#EXTM3U\n\
                        #EXT-X-VERSION:7\n\
                        #EXTINF:2.000,\n\
                        output0.m4s\n\
                        #EXTINF:2.000,\n\
                        output1.m4s\n\
                        #EXTINF:1.500,\n\
                        output2.m4s\n\
                        #EXT-X-ENDLIST\n";
        assert_eq!(variant_duration_seconds(manifest).unwrap(), 5);
    }

    #[test]
    fn empty_manifest_is_zero() {
        assert_eq!(variant_duration_seconds("#EXTM3U\n").unwrap(), 0);
    }

    #[test]
    fn garbage_duration_errors() {
        let manifest = "#EXTINF:abc,\nseg.m4s\n";
        assert!(variant_duration_seconds(manifest).is_err());
    }
}
