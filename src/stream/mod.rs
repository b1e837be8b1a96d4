//! Stream resolution
//!
//! Turns a page reference into a playable manifest. The preview API is asked
//! first; when it names a Kaltura media entry the Kaltura playback context is
//! preferred, otherwise the preview's own manifest or media URL is used.

mod kaltura;
mod live;
mod preview;

pub use kaltura::{KalturaResolver, is_kaltura_media_id, kaltura_entry_id};
pub use live::{LiveChannel, live_channels};
pub use preview::{MediaKind, PreviewResolver, PreviewResponse};

use crate::config::Endpoints;
use crate::http::{SharedTransport, TransportError};
use crate::parsing::item_id_from_ref;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur while resolving a stream
#[derive(Debug, Error)]
pub enum StreamError {
    /// A required request failed
    #[error("Stream resolution request failed: {0}")]
    Transport(#[from] TransportError),

    /// The Kaltura API answered with something other than a list of results
    #[error("Invalid Kaltura response: {0}")]
    InvalidKalturaResponse(String),
}

/// Streaming protocol of a manifest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamFormat {
    Hls,
    Dash,
}

impl StreamFormat {
    /// Guesses the format from a manifest URL: `.m3u8` means HLS, anything
    /// else is treated as DASH.
    pub fn from_url(url: &str) -> Self {
        if url.contains(".m3u8") {
            StreamFormat::Hls
        } else {
            StreamFormat::Dash
        }
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamFormat::Hls => write!(f, "HLS"),
            StreamFormat::Dash => write!(f, "DASH"),
        }
    }
}

/// A resolved, playable stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestDescriptor {
    pub url: String,
    pub stream_format: StreamFormat,
    /// Headers the player must send when fetching the manifest
    pub http_headers: BTreeMap<String, String>,
    /// Which resolver produced the descriptor
    pub source_label: String,
}

impl ManifestDescriptor {
    pub fn new(
        url: impl Into<String>,
        stream_format: StreamFormat,
        source_label: impl Into<String>,
    ) -> Self {
        Self {
            url: url.into(),
            stream_format,
            http_headers: BTreeMap::new(),
            source_label: source_label.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.http_headers.insert(name.into(), value.into());
        self
    }

    fn from_preview(url: &str, source_label: &str) -> Self {
        Self::new(url, StreamFormat::from_url(url), source_label)
    }
}

/// Resolves page references to manifests
///
/// Runs the preview lookup, then Kaltura when applicable, and returns the
/// first usable result in the order Kaltura, preview manifest, preview media.
pub struct MediaUrlResolver {
    preview: PreviewResolver,
    kaltura: KalturaResolver,
}

impl MediaUrlResolver {
    pub fn new(transport: SharedTransport, endpoints: &Endpoints) -> Self {
        Self {
            preview: PreviewResolver::new(transport.clone(), endpoints.preview_base.clone()),
            kaltura: KalturaResolver::new(transport, endpoints.kaltura_base.clone()),
        }
    }

    /// Resolves the manifest of the item `page_ref` points at.
    ///
    /// `page_ref` may be a `yleareena://items/...` reference, a web URL or a
    /// bare item id. Returns `Ok(None)` when no stream is available.
    ///
    /// # Errors
    ///
    /// Fails when the preview API answers with an error other than 404, or
    /// when the Kaltura API fails or returns an unexpected payload.
    ///
    /// # Examples
    ///
    /// ```ignore
    /// match resolver.resolve("yleareena://items/1-787136")? {
    ///     Some(manifest) => println!("{} ({})", manifest.url, manifest.stream_format),
    ///     None => println!("Stream unavailable"),
    /// }
    /// ```
    pub fn resolve(&self, page_ref: &str) -> Result<Option<ManifestDescriptor>, StreamError> {
        debug!(page_ref, "Resolving stream URL");

        let Some(item_id) = item_id_from_ref(page_ref) else {
            warn!(page_ref, "No item id in page reference");
            return Ok(None);
        };

        let preview = self.preview.fetch(item_id)?;

        if preview.is_expired() {
            warn!(item_id, "Stream has expired");
        }
        if preview.is_pending() {
            warn!(item_id, "Stream has not been published yet");
        }

        let descriptor = self.select_manifest(&preview)?;
        match &descriptor {
            Some(manifest) => info!(
                item_id,
                url = %manifest.url,
                source = %manifest.source_label,
                "Resolved stream"
            ),
            None => info!(item_id, "No stream available"),
        }

        Ok(descriptor)
    }

    fn select_manifest(
        &self,
        preview: &PreviewResponse,
    ) -> Result<Option<ManifestDescriptor>, StreamError> {
        if let Some(media_id) = preview.media_id().filter(|id| is_kaltura_media_id(id)) {
            if let Some(manifest) = self.kaltura.manifest_url(media_id)? {
                return Ok(Some(manifest));
            }
        }

        if let Some(url) = preview.manifest_url() {
            return Ok(Some(ManifestDescriptor::from_preview(url, "Preview manifest")));
        }

        Ok(preview
            .media_url()
            .map(|url| ManifestDescriptor::from_preview(url, "Preview media")))
    }
}
