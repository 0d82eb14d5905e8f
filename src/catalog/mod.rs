mod asset;
mod library;

pub use asset::{MediaAsset, MediaKind, Segment};
pub use library::{CatalogError, Library};
