/// Keyword search against the Areena UI search endpoint.
use super::api_types::{ApiPage, Card, LabelField};
use super::{
    CatalogClient, CatalogError, CatalogLink, PaginationMeta, PlayableItem, SearchPageCursor,
    SeasonDiscovery, TITLE_PLACEHOLDER,
};
use crate::parsing::{iso_duration_as_seconds, parse_finnish_date};
use tracing::{debug, warn};
use url::Url;

const SEARCH_APP_ID: &str = "areena-web-items";
const SEARCH_APP_KEY: &str = "wlTs5D9OjIdeS9krPzRQR4I1PYVzoazN";

/// Descriptions shorter than this that are not dates are taken to be the
/// series name and prefixed to the title.
const SERIES_NAME_MAX_CHARS: usize = 100;

impl<D: SeasonDiscovery> CatalogClient<D> {
    /// Searches the catalog for `keyword`.
    ///
    /// Returns programs, clips and series folders in upstream order, followed
    /// by a [`SearchPageCursor`] when more results exist.
    ///
    /// # Errors
    ///
    /// Fails if the request fails, the service answers with a non-success
    /// status or the response is not valid JSON.
    pub fn search(
        &self,
        keyword: &str,
        offset: u32,
        page_size: u32,
    ) -> Result<Vec<CatalogLink>, CatalogError> {
        let url = self.search_url(keyword, offset, page_size)?;
        debug!(url = %url, "Executing search");

        let response = self.transport.get(url.as_str(), &[])?.error_for_status()?;
        let page: ApiPage<Card> = response.json()?;

        Ok(parse_search_results(&page, &self.endpoints.image_base))
    }

    fn search_url(&self, keyword: &str, offset: u32, page_size: u32) -> Result<Url, CatalogError> {
        let base = format!("{}/v1/ui/search", self.endpoints.api_base);
        let params: [(&str, String); 13] = [
            ("app_id", SEARCH_APP_ID.to_string()),
            ("app_key", SEARCH_APP_KEY.to_string()),
            ("client", "yle-areena-web".to_string()),
            ("language", "fi".to_string()),
            ("v", "10".to_string()),
            ("episodes", "true".to_string()),
            ("packages", "true".to_string()),
            ("query", keyword.to_string()),
            ("service", "tv".to_string()),
            ("offset", offset.to_string()),
            ("limit", page_size.to_string()),
            ("country", "FI".to_string()),
            ("isPortabilityRegion", "true".to_string()),
        ];

        Url::parse_with_params(&base, &params)
            .map_err(|e| CatalogError::InvalidData(format!("Invalid search URL {}: {}", base, e)))
    }
}

fn parse_search_results(page: &ApiPage<Card>, image_base: &str) -> Vec<CatalogLink> {
    let mut results = Vec::new();

    for card in &page.data {
        if card.kind.as_deref() != Some("card") {
            continue;
        }
        let Some(uri) = card.uri() else {
            continue;
        };

        if card.is_upcoming_only() {
            debug!(uri, "Skipping a search result that has not aired yet");
            continue;
        }

        match card.pointer_type() {
            Some("program") | Some("clip") => {
                results.push(CatalogLink::Playable(program_item(card, uri, image_base)));
            }
            Some("series") => {
                let mut item = PlayableItem::new(uri, card.title.as_deref())
                    .with_image(image_base, card.image.as_ref());
                item.description = Some(item.title.clone());
                item.is_container = true;
                results.push(CatalogLink::Playable(item));
            }
            Some("package") => {
                debug!("Ignoring a search result of type \"package\"");
            }
            other => {
                warn!(pointer_type = ?other, uri, "Unknown pointer type in search results");
            }
        }
    }

    let meta = PaginationMeta::from_api(page.meta.as_ref());
    if let Some(next_offset) = meta.next_offset() {
        let keyword = page
            .meta
            .as_ref()
            .and_then(|m| m.search_phrase())
            .unwrap_or_default();

        results.push(CatalogLink::SearchPage(SearchPageCursor {
            keyword: keyword.to_string(),
            next_offset,
            page_size: meta.limit,
        }));
    }

    results
}

fn program_item(card: &Card, uri: &str, image_base: &str) -> PlayableItem {
    let mut title = card
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(TITLE_PLACEHOLDER)
        .to_string();

    // A non-empty description holds either the publication date or the
    // series name.
    let mut published = None;
    if let Some(description) = card.description.as_deref().filter(|d| !d.is_empty()) {
        published = parse_finnish_date(description);
        if published.is_none() && description.chars().count() < SERIES_NAME_MAX_CHARS {
            title = format!("{}: {}", description, title);
        }
    }

    let mut item =
        PlayableItem::new(uri, Some(&title)).with_image(image_base, card.image.as_ref());
    item.duration_seconds = card
        .labels_of_type("duration", LabelField::Raw)
        .next()
        .and_then(iso_duration_as_seconds);
    item.published = published;
    item.description = Some(title);
    item
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::CatalogClient;
    use crate::config::Endpoints;
    use crate::http::stub::StubTransport;
    use chrono::NaiveDate;
    use std::sync::Arc;

    const SEARCH_PAGE: &str = r#"{
        "data": [
            {
                "type": "card",
                "title": "Jakso 4",
                "description": "Pasila",
                "pointer": {"type": "program", "uri": "yleareena://items/1-4"},
                "image": {"id": "13-1-4", "version": "1600000000"},
                "labels": [
                    {"type": "generic", "raw": "x"},
                    {"type": "duration", "raw": "PT23M49.600S"}
                ]
            },
            {
                "type": "card",
                "title": "Uutiset",
                "description": "14.05.2021",
                "pointer": {"type": "clip", "uri": "yleareena://items/1-5"}
            },
            {
                "type": "card",
                "title": "Pasila",
                "pointer": {"type": "series", "uri": "yleareena://items/1-50552121"}
            },
            {
                "type": "card",
                "title": "Kokoelma",
                "pointer": {"type": "package", "uri": "yleareena://packages/30-1"}
            },
            {
                "type": "card",
                "title": "Mystery",
                "pointer": {"type": "hologram", "uri": "yleareena://items/1-6"}
            },
            {
                "type": "card",
                "title": "Tulossa",
                "pointer": {"type": "program", "uri": "yleareena://items/1-7"},
                "transmissions": [{"temporalStatus": "upcoming"}]
            },
            {
                "type": "card",
                "title": "No link",
                "pointer": {"type": "program"}
            },
            {
                "type": "banner",
                "title": "Not a card",
                "pointer": {"type": "program", "uri": "yleareena://items/1-8"}
            },
            {
                "type": "card",
                "title": "",
                "pointer": {"type": "clip", "uri": "yleareena://items/1-9"}
            }
        ],
        "meta": {
            "offset": 30,
            "limit": 10,
            "count": 120,
            "analytics": {"onReceive": {"comscore": {"yle_search_phrase": "Pasila"}}}
        }
    }"#;

    fn client(stub: StubTransport) -> (Arc<StubTransport>, CatalogClient) {
        let stub = Arc::new(stub);
        let client = CatalogClient::new(stub.clone(), Endpoints::default());
        (stub, client)
    }

    fn search_page(body: &str) -> Vec<CatalogLink> {
        let (_, client) = client(
            StubTransport::new().route("https://areena.api.yle.fi/v1/ui/search", 200, body),
        );
        client.search("Pasila", 30, 10).unwrap()
    }

    #[test]
    fn test_search_maps_cards() {
        let links = search_page(SEARCH_PAGE);
        let items: Vec<&PlayableItem> = links.iter().filter_map(CatalogLink::as_playable).collect();

        assert_eq!(items.len(), 4);

        assert_eq!(items[0].homepage, "yleareena://items/1-4");
        assert_eq!(items[0].title, "Pasila: Jakso 4");
        assert_eq!(items[0].description.as_deref(), Some("Pasila: Jakso 4"));
        assert_eq!(items[0].duration_seconds, Some(1429));
        assert_eq!(items[0].published, None);
        assert!(items[0].thumbnail.as_deref().unwrap().ends_with("/v1600000000/13-1-4.jpg"));
        assert!(!items[0].is_container);

        assert_eq!(items[1].title, "Uutiset");
        assert_eq!(items[1].published, NaiveDate::from_ymd_opt(2021, 5, 14));
        assert_eq!(items[1].thumbnail, None);

        assert_eq!(items[2].title, "Pasila");
        assert!(items[2].is_container);

        assert_eq!(items[3].title, TITLE_PLACEHOLDER);
    }

    #[test]
    fn test_search_cursor_is_last_and_echoes_keyword() {
        let links = search_page(SEARCH_PAGE);

        assert_eq!(links.iter().filter(|l| l.is_cursor()).count(), 1);
        assert_eq!(
            links.last(),
            Some(&CatalogLink::SearchPage(SearchPageCursor {
                keyword: "Pasila".to_string(),
                next_offset: 40,
                page_size: 10,
            }))
        );
    }

    #[test]
    fn test_search_last_page_has_no_cursor() {
        let links = search_page(
            r#"{"data": [], "meta": {"offset": 110, "limit": 10, "count": 120}}"#,
        );
        assert!(links.is_empty());
    }

    #[test]
    fn test_long_description_is_not_a_series_name() {
        let description = "x".repeat(100);
        let body = format!(
            r#"{{"data": [{{
                "type": "card",
                "title": "Jakso",
                "description": "{}",
                "pointer": {{"type": "program", "uri": "yleareena://items/1-1"}}
            }}]}}"#,
            description
        );

        let links = search_page(&body);
        assert_eq!(links[0].as_playable().unwrap().title, "Jakso");
    }

    #[test]
    fn test_search_request_parameters() {
        let (stub, client) = client(
            StubTransport::new().route("https://areena.api.yle.fi/", 200, r#"{"data": []}"#),
        );
        client.search("Pasila ja muut", 0, 30).unwrap();

        let requests = stub.requests();
        assert_eq!(requests.len(), 1);
        let url = Url::parse(&requests[0].url).unwrap();
        let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(query.contains(&("query".to_string(), "Pasila ja muut".to_string())));
        assert!(query.contains(&("offset".to_string(), "0".to_string())));
        assert!(query.contains(&("limit".to_string(), "30".to_string())));
        assert!(query.contains(&("app_key".to_string(), SEARCH_APP_KEY.to_string())));
    }

    #[test]
    fn test_search_http_error_propagates() {
        let (_, client) = client(
            StubTransport::new().route("https://areena.api.yle.fi/", 500, "oops"),
        );
        let result = client.search("Pasila", 0, 30);
        assert!(matches!(result, Err(CatalogError::Transport(_))));
    }

    #[test]
    fn test_search_malformed_json_propagates() {
        let (_, client) = client(
            StubTransport::new().route("https://areena.api.yle.fi/", 200, "<html></html>"),
        );
        assert!(client.search("Pasila", 0, 30).is_err());
    }
}
