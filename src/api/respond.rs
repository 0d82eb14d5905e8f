use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use chrono::{DateTime, Utc};

use super::range::ByteRange;
use crate::catalog::MediaKind;

const MIME_TYPES: &[(&str, &str)] = &[
    ("ts", "video/MP2T"),
    ("avi", "video/x-msvideo"),
    ("mp4", "video/mp4"),
    ("mkv", "video/x-matroska"),
    ("mov", "video/quicktime"),
    ("flv", "video/x-flv"),
    ("m3u8", "application/x-mpegURL"),
];

pub const X_CONTENT_DURATION: HeaderName = HeaderName::from_static("x-content-duration");

pub fn content_type(kind: MediaKind, extension: &str) -> &'static str {
    match kind {
        MediaKind::Audio => "audio/mpeg",
        MediaKind::Image => "image/jpeg",
        MediaKind::Video => MIME_TYPES
            .iter()
            .find(|(ext, _)| ext.eq_ignore_ascii_case(extension))
            .map(|(_, mime)| *mime)
            .unwrap_or("application/octet-stream"),
    }
}

pub struct ResponsePlan {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Bytes the copy loop aims for before it consults liveness
    pub target: u64,
}

pub fn http_date(time: DateTime<Utc>) -> String {
    time.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// A live recording has no trustworthy length; Content-Length and the
/// Content-Range total are withheld while it is still being written
pub fn plan(
    range: Option<ByteRange>,
    current_len: u64,
    live: bool,
    mime: &str,
    duration_secs: u64,
    modified: Option<DateTime<Utc>>,
) -> ResponsePlan {
    let (status, partial) = match range {
        Some(_) => (StatusCode::PARTIAL_CONTENT, true),
        None => (StatusCode::OK, false),
    };
    let span = range.unwrap_or(ByteRange {
        start: 0,
        end: current_len.saturating_sub(1),
    });
    // The degenerate empty-file interval still covers one slot on paper;
    // never promise more bytes than the file holds right now.
    let target = span
        .byte_count()
        .min(current_len.saturating_sub(span.start));

    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    insert_str(&mut headers, header::DATE, &http_date(Utc::now()));
    if let Some(modified) = modified {
        insert_str(&mut headers, header::LAST_MODIFIED, &http_date(modified));
    }
    insert_str(
        &mut headers,
        X_CONTENT_DURATION,
        &format!("{duration_secs}.0"),
    );
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );
    if !live {
        insert_str(&mut headers, header::CONTENT_LENGTH, &target.to_string());
    }
    if partial {
        let value = if live {
            format!("bytes {}-{}", span.start, span.end)
        } else {
            format!("bytes {}-{}/{}", span.start, span.end, current_len)
        };
        insert_str(&mut headers, header::CONTENT_RANGE, &value);
    }

    ResponsePlan {
        status,
        headers,
        target,
    }
}

fn insert_str(headers: &mut HeaderMap, name: HeaderName, value: &str) {
    if let Ok(value) = HeaderValue::from_str(value) {
        headers.insert(name, value);
    }
}
