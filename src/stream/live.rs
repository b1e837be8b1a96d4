/// Yle live TV channels.
use super::{ManifestDescriptor, StreamFormat};
use serde::Serialize;

const SOURCE_LABEL: &str = "Live channel";

/// A linear TV channel streamed over HLS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LiveChannel {
    pub name: &'static str,
    pub stream_id: &'static str,
    pub stream_name: &'static str,
}

impl LiveChannel {
    pub fn manifest_url(&self) -> String {
        format!(
            "https://yletv.akamaized.net/hls/live/{}/{}/index.m3u8",
            self.stream_id, self.stream_name
        )
    }

    pub fn manifest(&self) -> ManifestDescriptor {
        ManifestDescriptor::new(self.manifest_url(), StreamFormat::Hls, SOURCE_LABEL)
    }
}

const CHANNELS: [LiveChannel; 3] = [
    LiveChannel {
        name: "Yle TV1",
        stream_id: "622365",
        stream_name: "yletv1fin",
    },
    LiveChannel {
        name: "Yle TV2",
        stream_id: "622366",
        stream_name: "yletv2fin",
    },
    LiveChannel {
        name: "Yle Teema & Fem",
        stream_id: "622367",
        stream_name: "yletvteemafemfin",
    },
];

/// The live channels, in menu order
pub fn live_channels() -> &'static [LiveChannel] {
    &CHANNELS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_channels() {
        let channels = live_channels();
        assert_eq!(channels.len(), 3);
        assert_eq!(channels[0].name, "Yle TV1");

        let manifest = channels[2].manifest();
        assert_eq!(
            manifest.url,
            "https://yletv.akamaized.net/hls/live/622367/yletvteemafemfin/index.m3u8"
        );
        assert_eq!(manifest.stream_format, StreamFormat::Hls);
        assert_eq!(manifest.source_label, "Live channel");
        assert!(manifest.http_headers.is_empty());
    }
}
