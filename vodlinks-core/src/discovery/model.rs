use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use super::error::DiscoveryError;

/// A VOD page to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub url: String,
}

impl WorkItem {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub provider: String,
}

impl Credentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        provider: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            provider: provider.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("provider", &self.provider)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionTarget {
    Single(String),
    All,
}

impl ResolutionTarget {
    pub fn single(label: impl Into<String>) -> Self {
        ResolutionTarget::Single(label.into())
    }
}

impl Default for ResolutionTarget {
    fn default() -> Self {
        ResolutionTarget::Single("1080p".to_string())
    }
}

impl fmt::Display for ResolutionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionTarget::Single(label) => f.write_str(label),
            ResolutionTarget::All => f.write_str("all"),
        }
    }
}

impl FromStr for ResolutionTarget {
    type Err = DiscoveryError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        if value.is_empty() {
            return Err(DiscoveryError::Configuration(
                "resolution target must not be empty".into(),
            ));
        }
        if value.eq_ignore_ascii_case("all") {
            Ok(ResolutionTarget::All)
        } else {
            Ok(ResolutionTarget::Single(value.to_string()))
        }
    }
}

/// A manifest URL pulled out of a network log entry, already percent-decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestCandidate {
    pub url: String,
}

/// Resolution label to manifest URL for one work item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredManifest {
    entries: BTreeMap<String, String>,
}

impl DiscoveredManifest {
    /// Records `url` for `resolution`, replacing an earlier URL for the same tier.
    pub fn record(&mut self, resolution: &str, url: &str) -> bool {
        self.entries
            .insert(resolution.to_string(), url.to_string())
            .is_none()
    }

    pub fn get(&self, resolution: &str) -> Option<&str> {
        self.entries.get(resolution).map(String::as_str)
    }

    pub fn contains(&self, resolution: &str) -> bool {
        self.entries.contains_key(resolution)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(label, url)| (label.as_str(), url.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputRecord {
    pub title: String,
    pub resolution: String,
    pub manifest_url: String,
}

impl OutputRecord {
    pub fn file_name(&self) -> String {
        format!("{} [{}].mp4", self.title, self.resolution)
    }
}

/// Page titles end up in shell-quoted file names; colons become " -".
pub fn sanitize_title(raw: &str) -> String {
    raw.trim().replace(':', " -")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colon_titles_are_rewritten() {
        assert_eq!(sanitize_title("Finals: Men's 100m"), "Finals - Men's 100m");
        assert_eq!(sanitize_title("  Heat 3 "), "Heat 3");
    }

    #[test]
    fn resolution_target_parses_all_and_labels() {
        assert_eq!("all".parse::<ResolutionTarget>().unwrap(), ResolutionTarget::All);
        assert_eq!(
            "720p".parse::<ResolutionTarget>().unwrap(),
            ResolutionTarget::single("720p")
        );
        assert_eq!(ResolutionTarget::default().to_string(), "1080p");
        assert!("".parse::<ResolutionTarget>().is_err());
    }

    #[test]
    fn later_record_replaces_earlier_url() {
        let mut discovered = DiscoveredManifest::default();
        assert!(discovered.record("720p", "https://a"));
        assert!(!discovered.record("720p", "https://b"));
        assert_eq!(discovered.get("720p"), Some("https://b"));
        assert_eq!(discovered.len(), 1);
    }

    #[test]
    fn credentials_debug_hides_password() {
        let creds = Credentials::new("fan", "hunter2", "dtv");
        let rendered = format!("{creds:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("dtv"));
    }

    #[test]
    fn record_file_name() {
        let record = OutputRecord {
            title: "Finals - Men's 100m".into(),
            resolution: "1080p".into(),
            manifest_url: "https://sprt/x".into(),
        };
        assert_eq!(record.file_name(), "Finals - Men's 100m [1080p].mp4");
    }
}
