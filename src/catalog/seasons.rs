//! Season discovery
//!
//! Areena series pages embed their view model as JSON in a
//! `<script id="__NEXT_DATA__">` element. The "Jaksot" (episodes) tab of that
//! model names the playlist feed of the series and, for series with more
//! than one season, one set of query parameters per season.

use super::CatalogError;
use crate::http::SharedTransport;
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;
use url::Url;

const EPISODES_TAB_TITLE: &str = "Jaksot";

static NEXT_DATA: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[id="__NEXT_DATA__"]"#).unwrap());

/// Where the episodes of a series live
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeasonSet {
    /// Playlist feed URL of the series
    pub base_playlist_url: String,
    /// Query parameters selecting each season, in upstream order. Empty for
    /// single-season series.
    pub season_query_parameters: Vec<Vec<(String, String)>>,
}

impl SeasonSet {
    pub fn is_single_season(&self) -> bool {
        self.season_query_parameters.is_empty()
    }

    /// Season-scoped playlist URLs numbered from 1 in upstream order
    ///
    /// The upstream order may run either way by season, so the numbers are
    /// positions in the list rather than season numbers from the service.
    pub fn season_playlist_urls(&self) -> Result<Vec<(u32, String)>, CatalogError> {
        if self.is_single_season() {
            return Ok(vec![(1, self.base_playlist_url.clone())]);
        }

        self.season_query_parameters
            .iter()
            .zip(1..)
            .map(|(params, number)| {
                update_url_query(&self.base_playlist_url, params).map(|url| (number, url))
            })
            .collect()
    }
}

/// Finds out how many seasons a series has and where their episodes live.
pub trait SeasonDiscovery {
    /// Discovers the seasons of the series with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::EpisodesNotFound`] when the series has no
    /// episode listing, other variants when the page could not be fetched
    /// or understood.
    fn discover_seasons(&self, series_id: &str) -> Result<SeasonSet, CatalogError>;
}

/// [`SeasonDiscovery`] that scrapes the public series page
pub struct HtmlSeasonDiscovery {
    transport: SharedTransport,
    web_base: String,
}

impl HtmlSeasonDiscovery {
    pub fn new(transport: SharedTransport, web_base: String) -> Self {
        Self {
            transport,
            web_base,
        }
    }
}

impl SeasonDiscovery for HtmlSeasonDiscovery {
    fn discover_seasons(&self, series_id: &str) -> Result<SeasonSet, CatalogError> {
        let url = format!("{}/{}", self.web_base, series_id);
        debug!(url = %url, "Downloading series page");

        let response = self.transport.get(&url, &[])?.error_for_status()?;
        parse_season_set(&response.body, series_id)
    }
}

fn parse_season_set(html: &str, series_id: &str) -> Result<SeasonSet, CatalogError> {
    let not_found = |reason: &str| CatalogError::EpisodesNotFound {
        series_id: series_id.to_string(),
        reason: reason.to_string(),
    };

    let text = embedded_page_data(html).ok_or_else(|| not_found("no embedded page data"))?;
    let data: Value = serde_json::from_str(&text).map_err(|e| {
        CatalogError::InvalidData(format!(
            "Malformed page data for series {}: {}",
            series_id, e
        ))
    })?;

    let tabs = data
        .pointer("/props/pageProps/view/tabs")
        .and_then(Value::as_array)
        .ok_or_else(|| not_found("page has no tabs"))?;

    let episodes_tab = tabs
        .iter()
        .find(|tab| tab.get("title").and_then(Value::as_str) == Some(EPISODES_TAB_TITLE))
        .ok_or_else(|| not_found("no episodes tab"))?;

    let playlist = episodes_tab
        .get("content")
        .and_then(Value::as_array)
        .and_then(|content| content.first())
        .ok_or_else(|| not_found("episodes tab is empty"))?;

    let base_playlist_url = playlist
        .pointer("/source/uri")
        .and_then(Value::as_str)
        .filter(|uri| !uri.is_empty())
        .ok_or_else(|| not_found("episodes tab has no playlist source"))?;

    let season_query_parameters = playlist
        .get("filters")
        .and_then(Value::as_array)
        .and_then(|filters| filters.first())
        .and_then(|filter| filter.get("options"))
        .and_then(Value::as_array)
        .map(|options| {
            options
                .iter()
                .filter_map(|option| option.get("parameters").and_then(Value::as_object))
                .map(string_pairs)
                .collect()
        })
        .unwrap_or_default();

    Ok(SeasonSet {
        base_playlist_url: base_playlist_url.to_string(),
        season_query_parameters,
    })
}

fn embedded_page_data(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let script = document.select(&NEXT_DATA).next()?;
    let text: String = script.text().collect();

    if text.trim().is_empty() { None } else { Some(text) }
}

fn string_pairs(parameters: &Map<String, Value>) -> Vec<(String, String)> {
    parameters
        .iter()
        .filter_map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Null => return None,
                other => other.to_string(),
            };
            Some((key.clone(), value))
        })
        .collect()
}

/// Merges `new_params` into the query of `url`.
///
/// Existing parameters keep their position (first value wins, blank values
/// are dropped), parameters of the same name are overwritten, new ones are
/// appended. The fragment is removed.
pub(super) fn update_url_query<K, V>(
    url: &str,
    new_params: &[(K, V)],
) -> Result<String, CatalogError>
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut parsed = Url::parse(url)
        .map_err(|e| CatalogError::InvalidData(format!("Invalid playlist URL {}: {}", url, e)))?;

    let mut pairs: Vec<(String, String)> = Vec::new();
    for (key, value) in parsed.query_pairs() {
        if value.is_empty() || pairs.iter().any(|(k, _)| k.as_str() == &*key) {
            continue;
        }
        pairs.push((key.into_owned(), value.into_owned()));
    }

    for (key, value) in new_params {
        let (key, value) = (key.as_ref(), value.as_ref());
        match pairs.iter_mut().find(|entry| entry.0 == key) {
            Some(entry) => entry.1 = value.to_string(),
            None => pairs.push((key.to_string(), value.to_string())),
        }
    }

    parsed.set_fragment(None);
    if pairs.is_empty() {
        parsed.set_query(None);
    } else {
        parsed.query_pairs_mut().clear().extend_pairs(&pairs);
    }

    Ok(parsed.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::stub::StubTransport;
    use std::sync::Arc;

    fn series_page(next_data: &str) -> String {
        format!(
            r#"<!DOCTYPE html><html><head><title>Pasila</title></head>
            <body><div id="__next"></div>
            <script id="__NEXT_DATA__" type="application/json">{}</script>
            </body></html>"#,
            next_data
        )
    }

    const MULTI_SEASON: &str = r#"{"props": {"pageProps": {"view": {"tabs": [
        {"title": "Tiedot", "content": []},
        {"title": "Jaksot", "content": [{
            "source": {"uri": "https://areena.api.yle.fi/v1/ui/content/list?token=abc"},
            "filters": [{"options": [
                {"title": "Kausi 2", "parameters": {"availability": "", "season": "1-2"}},
                {"title": "Kausi 1", "parameters": {"season": "1-1"}}
            ]}]
        }]}
    ]}}}}"#;

    #[test]
    fn test_multi_season_page() {
        let seasons = parse_season_set(&series_page(MULTI_SEASON), "1-50552121").unwrap();

        assert!(!seasons.is_single_season());
        assert_eq!(seasons.season_query_parameters.len(), 2);

        let urls = seasons.season_playlist_urls().unwrap();
        assert_eq!(
            urls,
            vec![
                (
                    1,
                    "https://areena.api.yle.fi/v1/ui/content/list?token=abc&availability=&season=1-2"
                        .to_string()
                ),
                (
                    2,
                    "https://areena.api.yle.fi/v1/ui/content/list?token=abc&season=1-1"
                        .to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_single_season_page() {
        let page = series_page(
            r#"{"props": {"pageProps": {"view": {"tabs": [
                {"title": "Jaksot", "content": [{"source": {"uri": "https://a.invalid/list"}}]}
            ]}}}}"#,
        );
        let seasons = parse_season_set(&page, "1-1").unwrap();

        assert!(seasons.is_single_season());
        assert_eq!(
            seasons.season_playlist_urls().unwrap(),
            vec![(1, "https://a.invalid/list".to_string())]
        );
    }

    #[test]
    fn test_missing_episodes_tab() {
        let page =
            series_page(r#"{"props": {"pageProps": {"view": {"tabs": [{"title": "Tiedot"}]}}}}"#);
        assert!(matches!(
            parse_season_set(&page, "1-1"),
            Err(CatalogError::EpisodesNotFound { .. })
        ));

        assert!(matches!(
            parse_season_set("<html><body>nothing here</body></html>", "1-1"),
            Err(CatalogError::EpisodesNotFound { .. })
        ));
    }

    #[test]
    fn test_malformed_page_data() {
        let page = series_page("{not json");
        assert!(matches!(
            parse_season_set(&page, "1-1"),
            Err(CatalogError::InvalidData(_))
        ));
    }

    #[test]
    fn test_discovery_fetches_series_page() {
        let stub = Arc::new(StubTransport::new().route(
            "https://areena.yle.fi/1-50552121",
            200,
            series_page(MULTI_SEASON),
        ));
        let discovery = HtmlSeasonDiscovery::new(stub.clone(), "https://areena.yle.fi".to_string());

        let seasons = discovery.discover_seasons("1-50552121").unwrap();
        assert_eq!(seasons.season_query_parameters.len(), 2);
        assert_eq!(stub.requests()[0].url, "https://areena.yle.fi/1-50552121");
    }

    #[test]
    fn test_discovery_http_error_propagates() {
        let stub = Arc::new(StubTransport::new().route("https://areena.yle.fi/", 503, ""));
        let discovery = HtmlSeasonDiscovery::new(stub, "https://areena.yle.fi".to_string());

        assert!(matches!(
            discovery.discover_seasons("1-1"),
            Err(CatalogError::Transport(_))
        ));
    }

    #[test]
    fn test_update_url_query() {
        let url = update_url_query(
            "https://a.invalid/list?offset=5&token=abc&empty=&token=zzz#frag",
            &[("offset", "10"), ("limit", "30")],
        )
        .unwrap();
        assert_eq!(url, "https://a.invalid/list?offset=10&token=abc&limit=30");

        let bare = update_url_query::<&str, &str>("https://a.invalid/list?empty=", &[]).unwrap();
        assert_eq!(bare, "https://a.invalid/list");

        assert!(update_url_query("not a url", &[("a", "b")]).is_err());
    }
}
