//! Areena browser - browse the Yle Areena catalog and resolve playable streams
//!
//! The library has two halves. [`CatalogClient`] turns search results, series
//! and season playlists into flat lists of [`CatalogLink`]s with pagination
//! cursors. [`MediaUrlResolver`] turns a page reference into a
//! [`ManifestDescriptor`] the player can open. [`AreenaClient`] bundles both
//! behind one configuration.

mod catalog;
mod config;
mod history;
mod http;
mod parsing;
mod stream;

use std::sync::Arc;
use thiserror::Error;

// Re-export error types
pub use catalog::CatalogError;
pub use history::HistoryError;
pub use http::TransportError;
pub use stream::StreamError;

pub use catalog::{
    CatalogClient, CatalogLink, DEFAULT_PAGE_SIZE, HtmlSeasonDiscovery, MAX_PAGE_SIZE,
    PaginationMeta, PlayableItem, SearchPageCursor, SeasonDiscovery, SeasonSet, SeriesPageCursor,
    TITLE_PLACEHOLDER,
};
pub use config::{AreenaConfig, Endpoints};
pub use history::{DEFAULT_CAPACITY as DEFAULT_HISTORY_CAPACITY, FileSearchHistory, SearchHistory};
pub use http::{HttpResponse, HttpTransport, ReqwestTransport, SharedTransport};
pub use parsing::{
    item_id_from_ref, iso_duration_as_seconds, parse_finnish_date, parse_release_label,
    plain_text,
};
pub use stream::{
    KalturaResolver, LiveChannel, ManifestDescriptor, MediaKind, MediaUrlResolver,
    PreviewResolver, PreviewResponse, StreamFormat, is_kaltura_media_id, kaltura_entry_id,
    live_channels,
};

/// Top-level error type for Areena operations
#[derive(Debug, Error)]
pub enum AreenaError {
    /// Error while setting up or using the HTTP transport
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Error during stream resolution
    #[error("Stream resolution error: {0}")]
    Stream(#[from] StreamError),

    /// Error while browsing the catalog
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Error while reading or writing the search history
    #[error("Search history error: {0}")]
    History(#[from] HistoryError),
}

/// Catalog browsing and stream resolution sharing one HTTP transport
///
/// # Examples
///
/// ```no_run
/// use areena_browser::{AreenaClient, AreenaConfig, CatalogLink, DEFAULT_PAGE_SIZE};
///
/// let client = AreenaClient::new(AreenaConfig::from_env()).unwrap();
///
/// for link in client.search("Pasila", 0, DEFAULT_PAGE_SIZE).unwrap() {
///     if let CatalogLink::Playable(item) = link {
///         println!("{}: {}", item.title, item.homepage);
///     }
/// }
///
/// match client.resolve("yleareena://items/1-787136").unwrap() {
///     Some(manifest) => println!("{}", manifest.url),
///     None => println!("Stream unavailable"),
/// }
/// ```
pub struct AreenaClient {
    catalog: CatalogClient,
    resolver: MediaUrlResolver,
}

impl AreenaClient {
    /// Creates a client that talks to the services named in `config`.
    pub fn new(config: AreenaConfig) -> Result<Self, AreenaError> {
        let transport: SharedTransport = Arc::new(ReqwestTransport::new(&config.user_agent)?);
        Ok(Self::with_transport(transport, config.endpoints))
    }

    /// Creates a client on top of an existing transport.
    pub fn with_transport(transport: SharedTransport, endpoints: Endpoints) -> Self {
        let resolver = MediaUrlResolver::new(transport.clone(), &endpoints);
        let catalog = CatalogClient::new(transport, endpoints);
        Self { catalog, resolver }
    }

    pub fn catalog(&self) -> &CatalogClient {
        &self.catalog
    }

    pub fn resolver(&self) -> &MediaUrlResolver {
        &self.resolver
    }

    /// See [`CatalogClient::search`]
    pub fn search(
        &self,
        keyword: &str,
        offset: u32,
        page_size: u32,
    ) -> Result<Vec<CatalogLink>, AreenaError> {
        Ok(self.catalog.search(keyword, offset, page_size)?)
    }

    /// See [`CatalogClient::playlist`]
    pub fn playlist(
        &self,
        series_id: &str,
        offset: u32,
        page_size: u32,
    ) -> Result<Vec<CatalogLink>, AreenaError> {
        Ok(self.catalog.playlist(series_id, offset, page_size)?)
    }

    /// See [`CatalogClient::season_playlist`]
    pub fn season_playlist(
        &self,
        season_url: &str,
        offset: u32,
        page_size: u32,
    ) -> Result<Vec<CatalogLink>, AreenaError> {
        Ok(self.catalog.season_playlist(season_url, offset, page_size)?)
    }

    /// Follows a cursor from an earlier listing
    pub fn follow(&self, cursor: &CatalogLink) -> Result<Vec<CatalogLink>, AreenaError> {
        match cursor {
            CatalogLink::SearchPage(page) => {
                self.search(&page.keyword, page.next_offset, page.page_size)
            }
            CatalogLink::SeriesPage(page) => self.season_playlist(
                &page.season_playlist_url,
                page.next_offset,
                page.page_size,
            ),
            CatalogLink::Playable(item) if item.is_container => match item.item_id() {
                Some(series_id) => self.playlist(series_id, 0, DEFAULT_PAGE_SIZE),
                None => Ok(Vec::new()),
            },
            CatalogLink::Playable(_) => Ok(Vec::new()),
        }
    }

    /// See [`MediaUrlResolver::resolve`]
    pub fn resolve(&self, page_ref: &str) -> Result<Option<ManifestDescriptor>, AreenaError> {
        Ok(self.resolver.resolve(page_ref)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::stub::StubTransport;

    #[test]
    fn test_follow_search_cursor() {
        let stub = Arc::new(StubTransport::new().route(
            "https://areena.api.yle.fi/v1/ui/search",
            200,
            r#"{"data": [], "meta": {"offset": 40, "limit": 10, "count": 45}}"#,
        ));
        let client = AreenaClient::with_transport(stub.clone(), Endpoints::default());

        let cursor = CatalogLink::SearchPage(SearchPageCursor {
            keyword: "Pasila".to_string(),
            next_offset: 40,
            page_size: 10,
        });
        assert!(client.follow(&cursor).unwrap().is_empty());

        let url = &stub.requests()[0].url;
        assert!(url.contains("query=Pasila"));
        assert!(url.contains("offset=40"));
        assert!(url.contains("limit=10"));
    }

    #[test]
    fn test_follow_playable_item_is_empty() {
        let stub = Arc::new(StubTransport::new());
        let client = AreenaClient::with_transport(stub.clone(), Endpoints::default());

        let item = CatalogLink::Playable(PlayableItem::new("yleareena://items/1-1", Some("A")));
        assert!(client.follow(&item).unwrap().is_empty());
        assert!(stub.requests().is_empty());
    }

    #[test]
    fn test_errors_convert() {
        let stub = Arc::new(StubTransport::new().route("https://player.api.yle.fi/", 500, ""));
        let client = AreenaClient::with_transport(stub, Endpoints::default());

        assert!(matches!(
            client.resolve("1-1"),
            Err(AreenaError::Stream(StreamError::Transport(_)))
        ));
    }
}
