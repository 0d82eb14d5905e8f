use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_stream::wrappers::ReceiverStream;
use tower_http::trace::TraceLayer;

use crate::catalog::{CatalogError, Library, MediaKind};

use super::{hls, range, respond, stream};

const BODY_CHANNEL_CHUNKS: usize = 4;

#[derive(Clone)]
pub struct AppState {
    pub library: Arc<Library>,
    pub public_url: Option<String>,
}

impl AppState {
    pub fn new(library: Library, public_url: Option<String>) -> Self {
        Self {
            library: Arc::new(library),
            public_url,
        }
    }
}

#[derive(Debug, Error)]
pub enum ServeError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("no segment {index} for asset {asset}")]
    UnknownSegment { asset: String, index: usize },
    #[error("backing file missing: {}", .0.display())]
    MissingFile(PathBuf),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl IntoResponse for ServeError {
    fn into_response(self) -> Response {
        let status = match &self {
            ServeError::Catalog(CatalogError::Io(_)) | ServeError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            _ => StatusCode::NOT_FOUND,
        };
        if status == StatusCode::NOT_FOUND {
            tracing::info!(error = %self, "media not found");
        } else {
            tracing::warn!(error = %self, "request failed");
        }
        (status, self.to_string()).into_response()
    }
}

pub async fn start_server(state: AppState, port: u16) -> Result<(), std::io::Error> {
    let app = Router::new()
        .route("/assets", get(assets_handler))
        .route("/media/{asset}", get(media_handler))
        .route("/media/{asset}/playlist.m3u8", get(manifest_handler))
        .route("/media/{asset}/{segment}/{name}", get(segment_media_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

#[derive(Serialize)]
struct AssetSummary {
    id: String,
    segments: usize,
    duration_secs: u64,
    recording: bool,
}

async fn assets_handler(State(state): State<AppState>) -> impl IntoResponse {
    let mut assets = Vec::new();
    for id in state.library.list() {
        let Ok(asset) = state.library.resolve(&id) else {
            continue;
        };
        assets.push(AssetSummary {
            recording: state.library.is_recording(&asset.id),
            segments: asset.segments.len(),
            duration_secs: asset.total_duration_secs(),
            id: asset.id,
        });
    }
    axum::Json(assets)
}

#[derive(Deserialize)]
struct MediaQuery {
    #[serde(rename = "force-mime")]
    force_mime: Option<String>,
}

#[derive(Deserialize)]
struct ManifestQuery {
    /// Target sub-segment length in seconds
    segment: Option<u32>,
    debug: Option<String>,
}

async fn media_handler(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
    Query(query): Query<MediaQuery>,
    headers: HeaderMap,
) -> Result<Response, ServeError> {
    serve_media(state, asset_id, 0, false, query.force_mime, &headers).await
}

async fn segment_media_handler(
    State(state): State<AppState>,
    Path((asset_id, segment, name)): Path<(String, usize, String)>,
    Query(query): Query<MediaQuery>,
    headers: HeaderMap,
) -> Result<Response, ServeError> {
    // Manifest URLs carry a .debug. infix when verbose logging was asked for.
    let debug = name.contains(".debug.");
    serve_media(state, asset_id, segment, debug, query.force_mime, &headers).await
}

async fn serve_media(
    state: AppState,
    asset_id: String,
    segment_index: usize,
    debug: bool,
    force_mime: Option<String>,
    headers: &HeaderMap,
) -> Result<Response, ServeError> {
    let asset = state.library.resolve(&asset_id)?;
    let segment = asset
        .segment(segment_index)
        .ok_or_else(|| ServeError::UnknownSegment {
            asset: asset_id.clone(),
            index: segment_index,
        })?;

    let meta = match tokio::fs::metadata(&segment.path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(ServeError::MissingFile(segment.path.clone()));
        }
        Err(e) => return Err(ServeError::Io(e)),
    };
    let current_len = meta.len();
    let modified = meta.modified().ok().map(DateTime::<Utc>::from);
    let live = state.library.is_recording(&asset_id);
    if live {
        tracing::debug!(asset = %asset_id, "live recording, following the tail");
    }

    let range_spec = headers.get(header::RANGE).and_then(|v| v.to_str().ok());
    let resolved = range::resolve(range_spec, current_len);
    let span = resolved.unwrap_or(range::ByteRange {
        start: 0,
        end: current_len.saturating_sub(1),
    });

    let mime = effective_mime(force_mime.as_deref(), asset.kind, &segment.extension);
    let plan = respond::plan(
        resolved,
        current_len,
        live,
        &mime,
        segment.duration_secs(),
        modified,
    );
    if debug {
        for (name, value) in plan.headers.iter() {
            tracing::debug!(header = %name, value = ?value, "response header");
        }
    }

    let (tx, rx) = tokio::sync::mpsc::channel(BODY_CHANNEL_CHUNKS);
    let path = segment.path.clone();
    let probe_library = state.library.clone();
    let probe_id = asset_id.clone();
    tokio::spawn(async move {
        let mut sink = stream::ChannelSink::new(tx.clone());
        let session = stream::StreamSession::new(&path, span, live, move || {
            probe_library.is_recording(&probe_id)
        });
        match session.run(&mut sink).await {
            Ok(sent) => {
                tracing::debug!(path = %path.display(), bytes = sent, "media response complete");
            }
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
                tracing::debug!(path = %path.display(), "client disconnected");
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "stream failed");
                let _ = tx.send(Err(e)).await;
            }
        }
    });

    let body = Body::from_stream(ReceiverStream::new(rx));
    Ok((plan.status, plan.headers, body).into_response())
}

fn effective_mime(force_mime: Option<&str>, kind: MediaKind, extension: &str) -> String {
    match force_mime {
        Some(forced) if !forced.is_empty() => forced.to_string(),
        _ => respond::content_type(kind, extension).to_string(),
    }
}

async fn manifest_handler(
    State(state): State<AppState>,
    Path(asset_id): Path<String>,
    Query(query): Query<ManifestQuery>,
    headers: HeaderMap,
) -> Result<Response, ServeError> {
    let asset = state.library.resolve(&asset_id)?;
    let base = manifest_base_url(state.public_url.as_deref(), &headers);
    let manifest = hls::build_manifest(&asset, &base, query.segment, query.debug.is_some());
    tracing::debug!(asset = %asset.id, bytes = manifest.len(), "manifest built");

    Ok((
        [
            (header::CONTENT_TYPE, "application/x-mpegURL"),
            (header::ACCEPT_RANGES, "bytes"),
        ],
        manifest,
    )
        .into_response())
}

fn manifest_base_url(public_url: Option<&str>, headers: &HeaderMap) -> String {
    let origin = match public_url {
        Some(url) => url.trim_end_matches('/').to_string(),
        None => {
            let host = headers
                .get(header::HOST)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("localhost");
            format!("http://{}", host)
        }
    };
    format!("{}/media/", origin)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_force_mime_overrides_everything() {
        assert_eq!(
            effective_mime(Some("application/x-custom"), MediaKind::Video, "ts"),
            "application/x-custom"
        );
        assert_eq!(
            effective_mime(Some("application/x-custom"), MediaKind::Audio, "mp3"),
            "application/x-custom"
        );
    }

    #[test]
    fn test_empty_force_mime_is_ignored() {
        assert_eq!(effective_mime(Some(""), MediaKind::Video, "ts"), "video/MP2T");
        assert_eq!(effective_mime(None, MediaKind::Video, "ts"), "video/MP2T");
    }

    #[test]
    fn test_base_url_from_host_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "cams.local:8080".parse().unwrap());
        assert_eq!(
            manifest_base_url(None, &headers),
            "http://cams.local:8080/media/"
        );
    }

    #[test]
    fn test_base_url_prefers_configured_public_url() {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "internal:9999".parse().unwrap());
        assert_eq!(
            manifest_base_url(Some("https://cams.example.com/"), &headers),
            "https://cams.example.com/media/"
        );
    }

    #[test]
    fn test_base_url_without_host_header() {
        let headers = HeaderMap::new();
        assert_eq!(manifest_base_url(None, &headers), "http://localhost/media/");
    }
}
