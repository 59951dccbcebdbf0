use regex::Regex;
use tracing::trace;

use crate::browser::LogEntry;
use crate::config::ManifestSection;

use super::error::{DiscoveryError, DiscoveryResult};
use super::model::ManifestCandidate;

/// Pulls manifest URLs out of drained network-performance log entries.
#[derive(Debug, Clone)]
pub struct NetworkLogSampler {
    pattern: Regex,
}

impl NetworkLogSampler {
    pub fn new(config: &ManifestSection) -> DiscoveryResult<Self> {
        let pattern = Regex::new(&config.url_pattern).map_err(|err| {
            DiscoveryError::Configuration(format!("invalid manifest url pattern: {err}"))
        })?;
        Ok(Self { pattern })
    }

    pub fn extract(&self, entries: &[LogEntry]) -> Vec<ManifestCandidate> {
        let mut candidates = Vec::new();
        for entry in entries {
            let message = entry.message.as_str();
            if !(message.contains("Network") && message.contains("m3u8")) {
                continue;
            }
            for found in self.pattern.find_iter(message) {
                let url = percent_decode(found.as_str());
                trace!(url = %url, "manifest candidate");
                candidates.push(ManifestCandidate { url });
            }
        }
        candidates
    }
}

/// Bitrate markers are matched against the decoded form. Invalid UTF-8 after
/// decoding is replaced rather than rejected.
pub fn percent_decode(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => String::from_utf8_lossy(&urlencoding::decode_binary(raw.as_bytes())).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sampler() -> NetworkLogSampler {
        NetworkLogSampler::new(&ManifestSection::default()).unwrap()
    }

    fn network_entry(url: &str) -> LogEntry {
        LogEntry::new(format!(
            r#"{{"message":{{"method":"Network.requestWillBeSent","params":{{"request":{{"url":"{url}"}}}}}}}}"#
        ))
    }

    #[test]
    fn extracts_manifest_urls_from_network_events() {
        let entries = vec![
            network_entry("https://sprt-vod.akamaized.net/hls/VIDEO_1_6596000_vod.m3u8"),
            network_entry("https://cdn.example.com/app.js"),
        ];
        let found = sampler().extract(&entries);
        assert_eq!(
            found,
            vec![ManifestCandidate {
                url: "https://sprt-vod.akamaized.net/hls/VIDEO_1_6596000_vod.m3u8".into()
            }]
        );
    }

    #[test]
    fn ignores_entries_without_network_marker() {
        let entries = vec![LogEntry::new(
            r#"{"message":{"method":"Page.frameNavigated","url":"https://sprt.x/VIDEO_1_6596000_vod.m3u8"}}"#,
        )];
        assert!(sampler().extract(&entries).is_empty());
    }

    #[test]
    fn finds_every_match_in_one_message() {
        let message = r#"{"message":{"method":"Network.responseReceived","params":{"a":"https://sprt.one/VIDEO_0_4596000_vod.m3u8","b":"https://sprt.two/VIDEO_2_6596000_vod.m3u8"}}}"#;
        let found = sampler().extract(&[LogEntry::new(message)]);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].url, "https://sprt.one/VIDEO_0_4596000_vod.m3u8");
        assert_eq!(found[1].url, "https://sprt.two/VIDEO_2_6596000_vod.m3u8");
    }

    #[test]
    fn percent_escapes_are_decoded_before_classification() {
        let encoded = "https://sprt.example.com/hls%2Fasset%3D6596000%26x/VIDEO_1_6596000_vod.m3u8";
        let found = sampler().extract(&[network_entry(encoded)]);
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].url,
            "https://sprt.example.com/hls/asset=6596000&x/VIDEO_1_6596000_vod.m3u8"
        );
        assert!(found[0].url.contains("6596000"));
    }

    #[test]
    fn decode_tolerates_invalid_utf8() {
        assert_eq!(percent_decode("a%FFb"), "a\u{FFFD}b");
        assert_eq!(percent_decode("plain"), "plain");
    }
}
