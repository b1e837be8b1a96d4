/// Yle player preview API.
use crate::http::{SharedTransport, TransportError};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

const PREVIEW_QUERY: &str = "language=fin&ssl=true&countryCode=FI&host=areenaylefi\
                             &app_id=player_static_prod&app_key=8930d72170e48303cf5f3867780d549b";

const PREVIEW_HEADERS: [(&str, &str); 2] = [
    ("Referer", "https://areena.yle.fi/tv"),
    ("Origin", "https://areena.yle.fi"),
];

/// Kind of media behind a preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Audio,
    Video,
    /// The preview payload was empty
    Unknown,
}

/// A preview API payload
///
/// The payload is kept as loose JSON; the accessors read the handful of
/// fields the resolver needs from the `data` object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewResponse {
    payload: Map<String, Value>,
}

impl PreviewResponse {
    pub fn from_payload(payload: Value) -> Self {
        match payload {
            Value::Object(payload) => Self { payload },
            _ => Self::default(),
        }
    }

    /// The stream is a live channel broadcast
    pub fn is_live(&self) -> bool {
        self.has_data("ongoing_channel")
    }

    /// The stream has not been published yet
    pub fn is_pending(&self) -> bool {
        self.has_content("pending_event") || self.has_content("pending_ondemand")
    }

    /// The stream is no longer available
    pub fn is_expired(&self) -> bool {
        self.has_data("gone")
    }

    pub fn media_kind(&self) -> MediaKind {
        if self.payload.is_empty() {
            MediaKind::Unknown
        } else if self.ongoing_str("content_type") == Some("AudioObject") {
            MediaKind::Audio
        } else {
            MediaKind::Video
        }
    }

    /// The object describing the current or upcoming publication, if any
    pub fn ongoing(&self) -> Option<&Map<String, Value>> {
        let data = self.data()?;
        ["ongoing_ondemand", "ongoing_event", "ongoing_channel", "pending_event"]
            .iter()
            .filter_map(|key| data.get(*key).and_then(Value::as_object))
            .find(|object| !object.is_empty())
    }

    pub fn manifest_url(&self) -> Option<&str> {
        self.ongoing_str("manifest_url")
    }

    pub fn media_url(&self) -> Option<&str> {
        self.ongoing_str("media_url")
    }

    pub fn media_id(&self) -> Option<&str> {
        self.ongoing_str("media_id")
    }

    fn data(&self) -> Option<&Map<String, Value>> {
        self.payload.get("data")?.as_object()
    }

    fn has_data(&self, key: &str) -> bool {
        self.data()
            .and_then(|data| data.get(key))
            .is_some_and(|value| !value.is_null())
    }

    /// Like `has_data`, but empty objects, arrays and strings and `false`
    /// count as absent
    fn has_content(&self, key: &str) -> bool {
        self.data()
            .and_then(|data| data.get(key))
            .is_some_and(|value| match value {
                Value::Null => false,
                Value::Bool(flag) => *flag,
                Value::String(s) => !s.is_empty(),
                Value::Array(items) => !items.is_empty(),
                Value::Object(fields) => !fields.is_empty(),
                Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
            })
    }

    fn ongoing_str(&self, key: &str) -> Option<&str> {
        self.ongoing()?
            .get(key)?
            .as_str()
            .filter(|value| !value.is_empty())
    }
}

/// Fetches preview payloads for item ids
pub struct PreviewResolver {
    transport: SharedTransport,
    base_url: String,
}

impl PreviewResolver {
    pub fn new(transport: SharedTransport, base_url: String) -> Self {
        Self {
            transport,
            base_url,
        }
    }

    /// Fetches the preview of `item_id`.
    ///
    /// A 404 answer yields an empty [`PreviewResponse`].
    ///
    /// # Errors
    ///
    /// Any other non-success status, a failed request or a body that is not
    /// JSON.
    pub fn fetch(&self, item_id: &str) -> Result<PreviewResponse, TransportError> {
        let url = self.preview_url(item_id);
        debug!(url = %url, "Fetching preview");

        let response = self.transport.get(&url, &PREVIEW_HEADERS)?;
        if response.status == 404 {
            warn!(url = %url, "Preview API result not found");
            return Ok(PreviewResponse::default());
        }

        let payload: Value = response.error_for_status()?.json()?;
        Ok(PreviewResponse::from_payload(payload))
    }

    fn preview_url(&self, item_id: &str) -> String {
        format!("{}/{}.json?{}", self.base_url, item_id, PREVIEW_QUERY)
    }
}
