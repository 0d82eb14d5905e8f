use std::path::{Path, PathBuf};

use thiserror::Error;

use super::{MediaAsset, MediaKind, Segment};

const RECORDING_MARKER: &str = ".recording";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown asset: {0}")]
    UnknownAsset(String),
    #[error("asset has no segment files: {0}")]
    NoSegments(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Disk-backed catalog. Assets are directories of segment files named
/// `<index>_<durationMs>.<ext>`; a `.recording` marker means still live
pub struct Library {
    root: PathBuf,
}

impl Library {
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scan the asset directory fresh; a live recording grows between calls
    pub fn resolve(&self, asset_id: &str) -> Result<MediaAsset, CatalogError> {
        let dir = self.asset_dir(asset_id)?;

        let mut segments = Vec::new();
        for entry in std::fs::read_dir(&dir)?.flatten() {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let byte_len = entry.metadata().map(|m| m.len()).unwrap_or(0);
            match parse_segment(&path, byte_len) {
                Some(segment) => segments.push(segment),
                None => continue,
            }
        }

        if segments.is_empty() {
            return Err(CatalogError::NoSegments(asset_id.to_string()));
        }
        segments.sort_by_key(|s| s.index);

        let kind = MediaKind::from_extension(&segments[0].extension);
        Ok(MediaAsset {
            id: asset_id.to_string(),
            kind,
            segments,
        })
    }

    pub fn is_recording(&self, asset_id: &str) -> bool {
        if !valid_asset_id(asset_id) {
            return false;
        }
        self.root.join(asset_id).join(RECORDING_MARKER).exists()
    }

    pub fn list(&self) -> Vec<String> {
        let mut ids = Vec::new();
        let read_dir = match std::fs::read_dir(&self.root) {
            Ok(rd) => rd,
            Err(e) => {
                tracing::warn!(root = %self.root.display(), error = %e, "failed to read library root");
                return ids;
            }
        };
        for entry in read_dir.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                ids.push(name.to_string());
            }
        }
        ids.sort();
        ids
    }

    fn asset_dir(&self, asset_id: &str) -> Result<PathBuf, CatalogError> {
        // Path-shaped ids would escape the library root.
        if !valid_asset_id(asset_id) {
            return Err(CatalogError::UnknownAsset(asset_id.to_string()));
        }
        let dir = self.root.join(asset_id);
        if !dir.is_dir() {
            return Err(CatalogError::UnknownAsset(asset_id.to_string()));
        }
        Ok(dir)
    }
}

fn valid_asset_id(asset_id: &str) -> bool {
    !asset_id.is_empty()
        && asset_id != ".."
        && !asset_id.contains('/')
        && !asset_id.contains('\\')
}

fn parse_segment(path: &Path, byte_len: u64) -> Option<Segment> {
    let extension = path.extension().and_then(|e| e.to_str())?.to_string();
    let stem = path.file_stem().and_then(|s| s.to_str())?;
    let (index_str, dur_str) = stem.split_once('_')?;
    let index: usize = index_str.parse().ok()?;
    let duration_ms: u64 = dur_str.parse().ok()?;
    Some(Segment {
        index,
        path: path.to_path_buf(),
        byte_len,
        duration_ms,
        extension,
    })
}
