use crate::catalog::{MediaAsset, Segment};

struct PlaylistEntry {
    url: String,
    duration_secs: u64,
    /// `(length, offset)` into the backing segment file
    byte_range: Option<(u64, u64)>,
}

/// Render a VOD playlist: one entry per backing segment, or byte-range
/// entries of roughly `target_secs` seconds. `base_url` must end with a slash
pub fn build_manifest(
    asset: &MediaAsset,
    base_url: &str,
    target_secs: Option<u32>,
    debug: bool,
) -> String {
    let (entries, target_duration) = match target_secs {
        Some(target) if target > 0 => (
            sub_segment_entries(asset, base_url, u64::from(target), debug),
            u64::from(target),
        ),
        _ => (
            whole_segment_entries(asset, base_url, debug),
            asset.total_duration_secs(),
        ),
    };

    // Byte-range addressing needs protocol version 4.
    let version = if entries.iter().any(|e| e.byte_range.is_some()) {
        4
    } else {
        3
    };

    let mut playlist = String::new();
    playlist.push_str("#EXTM3U\r\n");
    playlist.push_str("#EXT-X-PLAYLIST-TYPE:VOD\r\n");
    playlist.push_str(&format!("#EXT-X-TARGETDURATION:{}\r\n", target_duration));
    playlist.push_str(&format!("#EXT-X-VERSION:{}\r\n", version));
    playlist.push_str("#EXT-X-MEDIA-SEQUENCE:0\r\n");

    for entry in &entries {
        playlist.push_str(&format!("#EXTINF:{}.0,no desc\r\n", entry.duration_secs));
        if let Some((length, offset)) = entry.byte_range {
            playlist.push_str(&format!("#EXT-X-BYTERANGE:{}@{}\r\n", length, offset));
        }
        playlist.push_str(&entry.url);
        playlist.push_str("\r\n");
    }

    playlist.push_str("#EXT-X-ENDLIST\r\n");
    playlist
}

fn whole_segment_entries(asset: &MediaAsset, base_url: &str, debug: bool) -> Vec<PlaylistEntry> {
    asset
        .segments
        .iter()
        .map(|segment| PlaylistEntry {
            url: segment_url(base_url, &asset.id, segment, debug),
            duration_secs: segment.duration_secs(),
            byte_range: None,
        })
        .collect()
}

fn sub_segment_entries(
    asset: &MediaAsset,
    base_url: &str,
    target: u64,
    debug: bool,
) -> Vec<PlaylistEntry> {
    let mut entries = Vec::new();
    for segment in &asset.segments {
        let url = segment_url(base_url, &asset.id, segment, debug);
        let sub_count = segment.duration_secs() / target;
        if sub_count == 0 {
            // Shorter than one target window; emit it whole rather than
            // divide its bytes by zero.
            entries.push(PlaylistEntry {
                url,
                duration_secs: segment.duration_secs(),
                byte_range: None,
            });
            continue;
        }
        // The remainder tail past the last full window is dropped.
        let bytes_per_sub = segment.byte_len / sub_count;
        for k in 0..sub_count {
            entries.push(PlaylistEntry {
                url: url.clone(),
                duration_secs: target,
                byte_range: Some((bytes_per_sub, k * bytes_per_sub)),
            });
        }
    }
    entries
}

fn segment_url(base_url: &str, asset_id: &str, segment: &Segment, debug: bool) -> String {
    let infix = if debug { ".debug" } else { "" };
    format!(
        "{}{}/{}/{}{}.{}",
        base_url, asset_id, segment.index, segment.index, infix, segment.extension
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::MediaKind;
    use std::path::PathBuf;

    fn segment(index: usize, duration_ms: u64, byte_len: u64) -> Segment {
        Segment {
            index,
            path: PathBuf::from(format!("{}_{}.ts", index, duration_ms)),
            byte_len,
            duration_ms,
            extension: "ts".to_string(),
        }
    }

    fn asset(segments: Vec<Segment>) -> MediaAsset {
        MediaAsset {
            id: "ev1".to_string(),
            kind: MediaKind::Video,
            segments,
        }
    }

    const BASE: &str = "http://host/media/";

    #[test]
    fn test_whole_segment_playlist() {
        let asset = asset(vec![
            segment(0, 10_000, 1_000_000),
            segment(1, 9_000, 900_000),
        ]);
        let m = build_manifest(&asset, BASE, None, false);

        let lines: Vec<&str> = m.split("\r\n").collect();
        assert_eq!(lines[0], "#EXTM3U");
        assert_eq!(lines[1], "#EXT-X-PLAYLIST-TYPE:VOD");
        assert_eq!(lines[2], "#EXT-X-TARGETDURATION:19");
        assert_eq!(lines[3], "#EXT-X-VERSION:3");
        assert_eq!(lines[4], "#EXT-X-MEDIA-SEQUENCE:0");
        assert_eq!(lines[5], "#EXTINF:10.0,no desc");
        assert_eq!(lines[6], "http://host/media/ev1/0/0.ts");
        assert_eq!(lines[7], "#EXTINF:9.0,no desc");
        assert_eq!(lines[8], "http://host/media/ev1/1/1.ts");
        assert_eq!(lines[9], "#EXT-X-ENDLIST");
        assert!(!m.contains("#EXT-X-BYTERANGE"));
    }

    #[test]
    fn test_rotated_asset_urls_resolve_back_to_segments() {
        let asset = asset(vec![
            segment(1, 10_000, 1_000_000),
            segment(2, 9_000, 900_000),
        ]);
        let m = build_manifest(&asset, BASE, None, false);

        assert!(m.contains("http://host/media/ev1/1/1.ts\r\n"));
        assert!(m.contains("http://host/media/ev1/2/2.ts\r\n"));
        // Each advertised index must address the segment it was built from.
        assert_eq!(asset.segment(1).map(|s| s.byte_len), Some(1_000_000));
        assert_eq!(asset.segment(2).map(|s| s.byte_len), Some(900_000));
    }

    #[test]
    fn test_sub_segment_playlist_drops_remainder_tail() {
        let asset = asset(vec![segment(0, 25_000, 2_500_000)]);
        let m = build_manifest(&asset, BASE, Some(10), false);

        assert!(m.contains("#EXT-X-TARGETDURATION:10\r\n"));
        assert!(m.contains("#EXT-X-VERSION:4\r\n"));
        assert!(m.contains("#EXT-X-BYTERANGE:1250000@0\r\n"));
        assert!(m.contains("#EXT-X-BYTERANGE:1250000@1250000\r\n"));
        assert_eq!(m.matches("#EXTINF:10.0,no desc").count(), 2);
        assert_eq!(m.matches("http://host/media/ev1/0/0.ts").count(), 2);
        assert!(m.ends_with("#EXT-X-ENDLIST\r\n"));
    }

    #[test]
    fn test_segment_shorter_than_target_emitted_whole() {
        let asset = asset(vec![
            segment(0, 25_000, 2_500_000),
            segment(1, 5_000, 500_000),
        ]);
        let m = build_manifest(&asset, BASE, Some(10), false);

        // The short segment keeps its own duration and no byte range.
        assert!(m.contains("#EXTINF:5.0,no desc\r\nhttp://host/media/ev1/1/1.ts\r\n"));
        assert_eq!(m.matches("#EXT-X-BYTERANGE").count(), 2);
        assert!(m.contains("#EXT-X-VERSION:4\r\n"));
    }

    #[test]
    fn test_no_byte_ranges_keeps_version_3() {
        let asset = asset(vec![segment(0, 5_000, 500_000)]);
        let m = build_manifest(&asset, BASE, Some(10), false);
        assert!(m.contains("#EXT-X-VERSION:3\r\n"));
    }

    #[test]
    fn test_zero_target_behaves_as_whole_mode() {
        let asset = asset(vec![segment(0, 10_000, 1_000_000)]);
        let m = build_manifest(&asset, BASE, Some(0), false);
        assert!(m.contains("#EXTINF:10.0,no desc"));
        assert!(!m.contains("#EXT-X-BYTERANGE"));
    }

    #[test]
    fn test_debug_infix_in_urls() {
        let asset = asset(vec![segment(0, 10_000, 1_000_000)]);
        let m = build_manifest(&asset, BASE, None, true);
        assert!(m.contains("http://host/media/ev1/0/0.debug.ts\r\n"));
    }

    #[test]
    fn test_lines_end_with_crlf() {
        let asset = asset(vec![segment(0, 25_000, 2_500_000)]);
        let m = build_manifest(&asset, BASE, Some(10), false);
        assert!(!m.replace("\r\n", "").contains('\n'));
        assert!(m.ends_with("\r\n"));
    }
}
