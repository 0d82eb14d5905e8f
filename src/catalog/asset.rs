use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
    Image,
}

impl MediaKind {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "mp3" | "flac" | "m4a" | "aac" | "ogg" | "wav" => MediaKind::Audio,
            "jpg" | "jpeg" | "png" | "gif" => MediaKind::Image,
            _ => MediaKind::Video,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Segment {
    pub index: usize,
    pub path: PathBuf,
    /// Length at scan time, authoritative only once the recording has finished
    pub byte_len: u64,
    pub duration_ms: u64,
    pub extension: String,
}

impl Segment {
    pub fn duration_secs(&self) -> u64 {
        self.duration_ms / 1000
    }
}

#[derive(Debug, Clone)]
pub struct MediaAsset {
    pub id: String,
    pub kind: MediaKind,
    pub segments: Vec<Segment>,
}

impl MediaAsset {
    /// Get segment by encoded index (accounts for rotated-out segments)
    pub fn segment(&self, index: usize) -> Option<&Segment> {
        self.segments.iter().find(|s| s.index == index)
    }

    pub fn total_duration_ms(&self) -> u64 {
        self.segments.iter().map(|s| s.duration_ms).sum()
    }

    pub fn total_duration_secs(&self) -> u64 {
        self.total_duration_ms() / 1000
    }
}
