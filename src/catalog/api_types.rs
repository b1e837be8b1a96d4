/// Areena JSON API response types for deserialization.
///
/// These structures mirror the parts of the search and playlist responses
/// the catalog client reads. Every field is optional because the upstream
/// payloads vary between item kinds.
use serde::{Deserialize, Deserializer};

/// The `{data, meta}` envelope shared by search and playlist responses.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub(super) struct ApiPage<T> {
    #[serde(default, deserialize_with = "nullable")]
    pub data: Vec<T>,
    pub meta: Option<ApiMeta>,
}

/// Pagination and analytics metadata of a page.
#[derive(Debug, Default, Deserialize)]
pub(super) struct ApiMeta {
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    pub count: Option<u32>,
    pub analytics: Option<Analytics>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Analytics {
    #[serde(rename = "onReceive")]
    pub on_receive: Option<OnReceive>,
}

#[derive(Debug, Deserialize)]
pub(super) struct OnReceive {
    pub comscore: Option<Comscore>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Comscore {
    /// The search phrase as normalized by the service
    pub yle_search_phrase: Option<String>,
}

impl ApiMeta {
    /// The keyword echoed back by the search endpoint
    pub fn search_phrase(&self) -> Option<&str> {
        self.analytics
            .as_ref()?
            .on_receive
            .as_ref()?
            .comscore
            .as_ref()?
            .yle_search_phrase
            .as_deref()
    }
}

/// A single entry of a search or playlist page.
#[derive(Debug, Deserialize)]
pub(super) struct Card {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub pointer: Option<Pointer>,
    pub image: Option<ImageRef>,
    #[serde(default, deserialize_with = "nullable")]
    pub labels: Vec<Label>,
    #[serde(default, deserialize_with = "nullable")]
    pub transmissions: Vec<Transmission>,
}

impl Card {
    /// The pointer URI, if present and non-empty
    pub fn uri(&self) -> Option<&str> {
        self.pointer
            .as_ref()?
            .uri
            .as_deref()
            .filter(|uri| !uri.is_empty())
    }

    pub fn pointer_type(&self) -> Option<&str> {
        self.pointer.as_ref()?.kind.as_deref()
    }

    /// Values of `field` from every label of the given type, in order
    pub fn labels_of_type<'a>(
        &'a self,
        label_type: &'a str,
        field: LabelField,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.labels
            .iter()
            .filter(move |label| label.kind.as_deref() == Some(label_type))
            .filter_map(move |label| match field {
                LabelField::Raw => label.raw.as_deref(),
                LabelField::Formatted => label.formatted.as_deref(),
            })
    }

    /// True when the card lists transmissions and none has aired yet
    pub fn is_upcoming_only(&self) -> bool {
        !self.transmissions.is_empty()
            && self
                .transmissions
                .iter()
                .all(|t| t.temporal_status.as_deref() == Some("upcoming"))
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct Pointer {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub uri: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct ImageRef {
    pub id: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub version: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Label {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub raw: Option<String>,
    pub formatted: Option<String>,
}

#[derive(Debug, Clone, Copy)]
pub(super) enum LabelField {
    Raw,
    Formatted,
}

#[derive(Debug, Deserialize)]
pub(super) struct Transmission {
    #[serde(rename = "temporalStatus")]
    pub temporal_status: Option<String>,
}

/// Treats an explicit `null` like a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Image versions show up both as strings and as numbers.
fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::String(s)) => Some(s),
        Some(serde_json::Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}
