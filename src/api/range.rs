/// Copy buffer size, also the width of the seek-near-end fallback window
pub const BUF_SIZE: u64 = 1024 * 1024;

/// Inclusive byte interval into a single segment's current content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn byte_count(&self) -> u64 {
        self.end.saturating_add(1).saturating_sub(self.start)
    }
}

/// Resolve a range specification against the file's current length. `None`
/// means whole asset. Total: a value that does not parse falls back to the
/// last `BUF_SIZE` bytes instead of failing
pub fn resolve(range_spec: Option<&str>, current_len: u64) -> Option<ByteRange> {
    let spec = range_spec?.trim();
    if spec.is_empty() {
        return None;
    }
    let value = match spec.find('=') {
        Some(i) => &spec[i + 1..],
        None => spec,
    };
    let last = current_len.saturating_sub(1);

    let range = if value.is_empty() {
        ByteRange { start: 0, end: last }
    } else if let Some(suffix) = value.strip_prefix('-') {
        match suffix.parse::<u64>() {
            Ok(n) => ByteRange {
                start: 0,
                end: n.min(last),
            },
            Err(_) => near_end(current_len),
        }
    } else if let Some(first) = value.strip_suffix('-') {
        match first.parse::<u64>() {
            Ok(n) => ByteRange {
                start: n,
                end: last,
            },
            Err(_) => near_end(current_len),
        }
    } else {
        match parse_pair(value) {
            Some((first, requested_last)) => ByteRange {
                start: first,
                end: requested_last.min(last),
            },
            None => near_end(current_len),
        }
    };

    Some(clamp(range, current_len))
}

fn parse_pair(value: &str) -> Option<(u64, u64)> {
    let (first, last) = value.split_once('-')?;
    Some((first.parse().ok()?, last.parse().ok()?))
}

fn clamp(mut range: ByteRange, current_len: u64) -> ByteRange {
    if range.end >= current_len {
        range.end = current_len.saturating_sub(1);
    }
    if range.start >= current_len {
        // Reposition near the end instead of failing the seek.
        range.start = current_len.saturating_sub(BUF_SIZE);
    }
    range
}

fn near_end(current_len: u64) -> ByteRange {
    ByteRange {
        start: current_len.saturating_sub(BUF_SIZE),
        end: current_len.saturating_sub(1),
    }
}
