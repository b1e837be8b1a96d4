/// Series and season playlists.
use super::api_types::{ApiPage, Card, LabelField};
use super::seasons::update_url_query;
use super::{
    CatalogClient, CatalogError, CatalogLink, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, PaginationMeta,
    PlayableItem, SeasonDiscovery, SeriesPageCursor,
};
use crate::parsing::{iso_duration_as_seconds, parse_release_label, plain_text};
use tracing::{debug, warn};

const PLAYLIST_APP_ID: &str = "areena-web-items";
const PLAYLIST_APP_KEY: &str = "v9No1mV0omg2BppmDkmDL6tGKw1pRFZt";

impl<D: SeasonDiscovery> CatalogClient<D> {
    /// Lists a series.
    ///
    /// Series with a single season, or a single season filter, list their
    /// episodes directly. Series with more than one season list one season
    /// selector cursor per season instead, numbered from 1 in the order the
    /// service declares them. Selector cursors start at offset 0 with
    /// [`DEFAULT_PAGE_SIZE`].
    ///
    /// A series without an episode listing yields an empty list.
    ///
    /// # Errors
    ///
    /// Fails when the series page cannot be fetched or parsed.
    pub fn playlist(
        &self,
        series_id: &str,
        offset: u32,
        page_size: u32,
    ) -> Result<Vec<CatalogLink>, CatalogError> {
        let seasons = match self.seasons.discover_seasons(series_id) {
            Ok(seasons) => seasons,
            Err(CatalogError::EpisodesNotFound { series_id, reason }) => {
                warn!(series_id = %series_id, reason = %reason, "Failed to parse the playlist");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        let mut season_urls = seasons.season_playlist_urls()?;
        if season_urls.len() == 1 {
            let (_, season_url) = season_urls.remove(0);
            return self.season_playlist(&season_url, offset, page_size);
        }

        let links = season_urls
            .into_iter()
            .map(|(season_number, season_playlist_url)| {
                CatalogLink::SeriesPage(SeriesPageCursor {
                    season_playlist_url,
                    season_number,
                    next_offset: 0,
                    page_size: DEFAULT_PAGE_SIZE,
                    is_continuation: false,
                })
            })
            .collect();

        Ok(links)
    }

    /// Lists one page of episodes of a season.
    ///
    /// Page sizes above [`MAX_PAGE_SIZE`] are sent as requested but the
    /// service is known to reject them. A page that cannot be downloaded is
    /// returned empty so the rest of the season stays reachable.
    ///
    /// # Errors
    ///
    /// Fails when `season_url` is not a valid URL or a downloaded page is not
    /// valid JSON.
    pub fn season_playlist(
        &self,
        season_url: &str,
        offset: u32,
        page_size: u32,
    ) -> Result<Vec<CatalogLink>, CatalogError> {
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            warn!(
                page_size,
                max = MAX_PAGE_SIZE,
                "Playlist page size outside the range the service accepts"
            );
        }

        let offset = offset.to_string();
        let limit = page_size.to_string();
        let page_url = update_url_query(
            season_url,
            &[
                ("offset", offset.as_str()),
                ("limit", limit.as_str()),
                ("app_id", PLAYLIST_APP_ID),
                ("app_key", PLAYLIST_APP_KEY),
            ],
        )?;

        let Some(page) = self.download_playlist_page(&page_url)? else {
            return Ok(Vec::new());
        };

        let mut links: Vec<CatalogLink> = page
            .data
            .iter()
            .filter_map(|entry| self.episode_item(entry))
            .map(CatalogLink::Playable)
            .collect();

        let meta = PaginationMeta::from_api(page.meta.as_ref());
        if let Some(next_offset) = meta.next_offset() {
            links.push(CatalogLink::SeriesPage(SeriesPageCursor {
                season_playlist_url: season_url.to_string(),
                season_number: 0,
                next_offset,
                page_size: meta.limit,
                is_continuation: true,
            }));
        }

        Ok(links)
    }

    fn download_playlist_page(
        &self,
        page_url: &str,
    ) -> Result<Option<ApiPage<Card>>, CatalogError> {
        debug!(url = page_url, "Downloading playlist page");

        let response = match self.transport.get(page_url, &[]) {
            Ok(response) if response.status < 400 => response,
            Ok(response) => {
                warn!(
                    url = page_url,
                    status = response.status,
                    "Failed to download playlist page. Some episodes may be missing!"
                );
                return Ok(None);
            }
            Err(e) => {
                warn!(
                    url = page_url,
                    error = %e,
                    "Failed to download playlist page. Some episodes may be missing!"
                );
                return Ok(None);
            }
        };

        Ok(Some(response.json()?))
    }

    fn episode_item(&self, entry: &Card) -> Option<PlayableItem> {
        let media_id = entry
            .uri()?
            .rsplit('/')
            .next()
            .filter(|id| !id.is_empty())?;

        let homepage = format!("{}/{}", self.endpoints.web_base, media_id);
        let mut item = PlayableItem::new(homepage, entry.title.as_deref())
            .with_image(&self.endpoints.image_base, entry.image.as_ref());

        item.description = entry.description.as_deref().and_then(plain_text);
        item.duration_seconds = entry
            .labels_of_type("progress", LabelField::Raw)
            .next()
            .and_then(iso_duration_as_seconds);
        item.published = entry
            .labels_of_type("generic", LabelField::Formatted)
            .find_map(parse_release_label);

        Some(item)
    }
}
