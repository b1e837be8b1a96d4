//! Catalog browsing
//!
//! Search results, series and season playlists are turned into a flat list
//! of [`CatalogLink`]s. A list holds playable items (or series folders) and,
//! when the upstream reports more results, a single cursor at the end.
mod api_types;
mod playlist;
mod search;
mod seasons;

pub use seasons::{HtmlSeasonDiscovery, SeasonDiscovery, SeasonSet};

use crate::config::Endpoints;
use crate::http::{SharedTransport, TransportError};
use crate::parsing::item_id_from_ref;
use api_types::{ApiMeta, ImageRef};
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Page size used when the caller has no preference
pub const DEFAULT_PAGE_SIZE: u32 = 30;

/// Largest page size the playlist endpoint is known to serve. Larger values
/// have been observed to fail with 502 Bad Gateway; the client warns about
/// them but still sends the request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Title given to items that arrive without one
pub const TITLE_PLACEHOLDER: &str = "???";

const DEFAULT_IMAGE_VERSION: &str = "1624522786";

/// Errors that can occur while browsing the catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    /// A required request failed
    #[error("Catalog request failed: {0}")]
    Transport(#[from] TransportError),

    /// The series page did not describe an episode listing
    #[error("No episode listing found for series {series_id}: {reason}")]
    EpisodesNotFound { series_id: String, reason: String },

    /// The upstream data could not be interpreted
    #[error("Catalog returned invalid data: {0}")]
    InvalidData(String),
}

/// A playable item or a series folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayableItem {
    /// Page reference; its last path segment is the item id
    pub homepage: String,
    /// Display title, never empty
    pub title: String,
    pub description: Option<String>,
    pub duration_seconds: Option<u64>,
    pub published: Option<NaiveDate>,
    pub thumbnail: Option<String>,
    pub fanart: Option<String>,
    /// True for series folders, false for directly playable items
    pub is_container: bool,
}

impl PlayableItem {
    pub(crate) fn new(homepage: impl Into<String>, title: Option<&str>) -> Self {
        let title = title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(TITLE_PLACEHOLDER);

        Self {
            homepage: homepage.into(),
            title: title.to_string(),
            description: None,
            duration_seconds: None,
            published: None,
            thumbnail: None,
            fanart: None,
            is_container: false,
        }
    }

    fn with_image(mut self, image_base: &str, image: Option<&ImageRef>) -> Self {
        if let Some(id) = image.and_then(|i| i.id.as_deref()) {
            let version = image
                .and_then(|i| i.version.as_deref())
                .unwrap_or(DEFAULT_IMAGE_VERSION);
            self.thumbnail = Some(image_url(image_base, "w_320,dpr_1.0", version, id));
            self.fanart = Some(image_url(image_base, "w_auto,dpr_auto", version, id));
        }
        self
    }

    /// The catalog item id of this entry
    pub fn item_id(&self) -> Option<&str> {
        item_id_from_ref(&self.homepage)
    }
}

fn image_url(image_base: &str, sizing: &str, version: &str, id: &str) -> String {
    format!(
        "{}/{},fl_lossy,f_auto,q_auto,d_yle-elava-arkisto.jpg/v{}/{}.jpg",
        image_base, sizing, version, id
    )
}

/// Cursor to the next page of search results
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchPageCursor {
    /// Keyword as echoed back by the service
    pub keyword: String,
    pub next_offset: u32,
    pub page_size: u32,
}

/// Cursor into a season playlist
///
/// With `is_continuation == false` the cursor selects season
/// `season_number` itself; with `true` it points at more episodes of the same
/// season (and `season_number` is 0).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPageCursor {
    pub season_playlist_url: String,
    pub season_number: u32,
    pub next_offset: u32,
    pub page_size: u32,
    pub is_continuation: bool,
}

/// One entry of a catalog listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CatalogLink {
    Playable(PlayableItem),
    SearchPage(SearchPageCursor),
    SeriesPage(SeriesPageCursor),
}

impl CatalogLink {
    pub fn as_playable(&self) -> Option<&PlayableItem> {
        match self {
            CatalogLink::Playable(item) => Some(item),
            _ => None,
        }
    }

    pub fn is_cursor(&self) -> bool {
        !matches!(self, CatalogLink::Playable(_))
    }
}

/// Offset, page size and total count of a fetched page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationMeta {
    pub offset: u32,
    pub limit: u32,
    pub total_count: u32,
}

impl PaginationMeta {
    /// Offset of the following page, if there is one
    pub fn next_offset(&self) -> Option<u32> {
        let next = self.offset.checked_add(self.limit)?;
        (next < self.total_count).then_some(next)
    }

    fn from_api(meta: Option<&ApiMeta>) -> Self {
        match meta {
            Some(meta) => Self {
                offset: meta.offset.unwrap_or(0),
                limit: meta.limit.unwrap_or(DEFAULT_PAGE_SIZE),
                total_count: meta.count.unwrap_or(0),
            },
            None => Self {
                offset: 0,
                limit: DEFAULT_PAGE_SIZE,
                total_count: 0,
            },
        }
    }
}

/// Client for the Areena catalog API
///
/// Season discovery is pluggable; [`CatalogClient::new`] uses the HTML
/// scraper, tests and alternative backends can inject their own.
pub struct CatalogClient<D = HtmlSeasonDiscovery> {
    transport: SharedTransport,
    endpoints: Endpoints,
    seasons: D,
}

impl CatalogClient<HtmlSeasonDiscovery> {
    /// Creates a catalog client that discovers seasons from series pages
    pub fn new(transport: SharedTransport, endpoints: Endpoints) -> Self {
        let seasons = HtmlSeasonDiscovery::new(transport.clone(), endpoints.web_base.clone());
        Self {
            transport,
            endpoints,
            seasons,
        }
    }
}

impl<D: SeasonDiscovery> CatalogClient<D> {
    /// Creates a catalog client with a custom season discovery backend
    pub fn with_season_discovery(
        transport: SharedTransport,
        endpoints: Endpoints,
        seasons: D,
    ) -> Self {
        Self {
            transport,
            endpoints,
            seasons,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_offset() {
        let meta = PaginationMeta {
            offset: 30,
            limit: 10,
            total_count: 100,
        };
        assert_eq!(meta.next_offset(), Some(40));

        let last = PaginationMeta {
            offset: 90,
            limit: 10,
            total_count: 100,
        };
        assert_eq!(last.next_offset(), None);

        let overflow = PaginationMeta {
            offset: u32::MAX,
            limit: 1,
            total_count: u32::MAX,
        };
        assert_eq!(overflow.next_offset(), None);
    }

    #[test]
    fn test_next_offset_property() {
        for offset in 0..20 {
            for limit in 0..10 {
                for count in 0..40 {
                    let meta = PaginationMeta {
                        offset,
                        limit,
                        total_count: count,
                    };
                    let expected = (offset + limit < count).then_some(offset + limit);
                    assert_eq!(meta.next_offset(), expected);
                }
            }
        }
    }

    #[test]
    fn test_missing_meta_defaults() {
        let meta = PaginationMeta::from_api(None);
        assert_eq!(meta.offset, 0);
        assert_eq!(meta.limit, DEFAULT_PAGE_SIZE);
        assert_eq!(meta.next_offset(), None);
    }

    #[test]
    fn test_title_placeholder() {
        assert_eq!(PlayableItem::new("x/1-1", None).title, TITLE_PLACEHOLDER);
        assert_eq!(PlayableItem::new("x/1-1", Some("")).title, TITLE_PLACEHOLDER);
        assert_eq!(PlayableItem::new("x/1-1", Some("  ")).title, TITLE_PLACEHOLDER);
        assert_eq!(PlayableItem::new("x/1-1", Some("Pasila")).title, "Pasila");
    }

    #[test]
    fn test_image_urls() {
        let image = ImageRef {
            id: Some("13-1-50552121".to_string()),
            version: None,
        };
        let item = PlayableItem::new("https://areena.yle.fi/1-1", Some("A"))
            .with_image("https://images.cdn.yle.fi/image/upload", Some(&image));

        assert_eq!(
            item.thumbnail.as_deref(),
            Some(
                "https://images.cdn.yle.fi/image/upload/w_320,dpr_1.0,fl_lossy,f_auto,q_auto,d_yle-elava-arkisto.jpg/v1624522786/13-1-50552121.jpg"
            )
        );
        assert!(item.fanart.as_deref().unwrap().contains("/w_auto,dpr_auto,"));
        assert_eq!(item.item_id(), Some("1-1"));
    }
}
