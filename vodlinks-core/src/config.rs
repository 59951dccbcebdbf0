use std::path::Path;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::catalog;
use crate::error::{ConfigError, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ScraperConfig {
    pub site: SiteSection,
    pub chromium: ChromiumSection,
    pub selectors: SelectorSection,
    pub login: LoginSection,
    pub manifest: ManifestSection,
    pub timing: TimingSection,
}

impl ScraperConfig {
    pub fn validate(&self) -> Result<()> {
        Regex::new(&self.manifest.url_pattern).map_err(|err| {
            ConfigError::Invalid(format!("manifest.url_pattern does not compile: {err}"))
        })?;
        Regex::new(&self.selectors.provider_logo_pattern).map_err(|err| {
            ConfigError::Invalid(format!(
                "selectors.provider_logo_pattern does not compile: {err}"
            ))
        })?;
        if self.manifest.resolutions.is_empty() {
            return Err(ConfigError::Invalid(
                "manifest.resolutions must list at least one tier".into(),
            ));
        }
        if self.manifest.max_polls == 0 {
            return Err(ConfigError::Invalid("manifest.max_polls must be > 0".into()));
        }
        if self.login.attempt_limit == 0 {
            return Err(ConfigError::Invalid("login.attempt_limit must be > 0".into()));
        }
        if self.login.matchers.is_empty() {
            return Err(ConfigError::Invalid("login.matchers must not be empty".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    pub listing_base_url: String,
}

impl Default for SiteSection {
    fn default() -> Self {
        Self {
            listing_base_url: catalog::LISTING_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ChromiumSection {
    pub executable_path: Option<String>,
    pub headless: bool,
    pub sandbox: bool,
    pub user_agent: String,
    pub window_size: [u32; 2],
    pub request_timeout_seconds: Option<u64>,
    /// Interval between DOM probes while waiting for an element to become clickable.
    pub wait_probe_ms: u64,
}

impl Default for ChromiumSection {
    fn default() -> Self {
        Self {
            executable_path: None,
            headless: false,
            sandbox: true,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/68.0.3440.84 Safari/537.36".to_string(),
            window_size: [1366, 768],
            request_timeout_seconds: Some(30),
            wait_probe_ms: 100,
        }
    }
}

/// CSS selectors unless the field name says otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorSection {
    pub listing_entry: String,
    pub cookie_button: String,
    pub load_more: String,
    pub play_button: String,
    pub title: String,
    pub temp_pass: String,
    pub provider_search: String,
    pub provider_logo: String,
    /// Capture group 1 yields the provider identifier from a logo `src`.
    pub provider_logo_pattern: String,
    pub credential_form_xpath: String,
}

impl Default for SelectorSection {
    fn default() -> Self {
        Self {
            listing_entry: ".post-card__link".into(),
            cookie_button: ".cookie-content__button".into(),
            load_more: ".cta-button__wrapper".into(),
            play_button: ".click-to-play-button".into(),
            title: ".side-bar-content-info-title".into(),
            temp_pass: ".temp-pass-mobile-login".into(),
            provider_search: "#access-enabler-provider-search".into(),
            provider_logo: ".mvpd-logo".into(),
            provider_logo_pattern: r".*/assets/page/mvpds/picker/(.*)\.png".into(),
            credential_form_xpath: "//button[@type='submit']".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FieldMatcher {
    pub tag: String,
    pub attribute: String,
}

impl FieldMatcher {
    pub fn new(tag: &str, attribute: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attribute: attribute.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoginFieldSynonyms {
    pub username: Vec<String>,
    pub password: Vec<String>,
    pub submit: Vec<String>,
}

impl Default for LoginFieldSynonyms {
    fn default() -> Self {
        let owned = |values: &[&str]| values.iter().map(|v| v.to_string()).collect();
        Self {
            username: owned(&["username", "user"]),
            password: owned(&["password", "pass", "passwd"]),
            submit: owned(&["submit", "sign_in"]),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoginSection {
    pub attempt_limit: usize,
    /// Tried in order for every synonym; first match wins.
    pub matchers: Vec<FieldMatcher>,
    pub fields: LoginFieldSynonyms,
}

impl Default for LoginSection {
    fn default() -> Self {
        Self {
            attempt_limit: 5,
            matchers: vec![
                FieldMatcher::new("input", "id"),
                FieldMatcher::new("input", "type"),
                FieldMatcher::new("button", "id"),
                FieldMatcher::new("button", "type"),
            ],
            fields: LoginFieldSynonyms::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResolutionMarker {
    pub label: String,
    pub marker: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ManifestSection {
    pub url_pattern: String,
    pub ad_domains: Vec<String>,
    pub resolutions: Vec<ResolutionMarker>,
    pub max_polls: usize,
}

impl Default for ManifestSection {
    fn default() -> Self {
        Self {
            url_pattern: catalog::MANIFEST_URL_PATTERN.to_string(),
            ad_domains: catalog::AD_DOMAINS.iter().map(|d| d.to_string()).collect(),
            resolutions: catalog::RESOLUTION_MARKERS
                .iter()
                .map(|(label, marker)| ResolutionMarker {
                    label: label.to_string(),
                    marker: marker.to_string(),
                })
                .collect(),
            max_polls: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimingSection {
    pub listing_timeout_ms: u64,
    pub element_timeout_ms: u64,
    pub settle_ms: [u64; 2],
    pub keystroke_pause_ms: [u64; 2],
    pub poll_interval_ms: u64,
    pub login_retry_delay_ms: u64,
    pub item_delay_ms: [u64; 2],
    /// Upper bound on "load more" activations for a single listing page.
    pub max_listing_expansions: usize,
}

impl Default for TimingSection {
    fn default() -> Self {
        Self {
            listing_timeout_ms: 5_000,
            element_timeout_ms: 5_000,
            settle_ms: [1_000, 1_000],
            keystroke_pause_ms: [1_000, 1_000],
            poll_interval_ms: 1_000,
            login_retry_delay_ms: 1_000,
            item_delay_ms: [5_000, 5_000],
            max_listing_expansions: 500,
        }
    }
}

pub fn load_scraper_config<P: AsRef<Path>>(path: P) -> Result<ScraperConfig> {
    let config: ScraperConfig = load_toml(path)?;
    config.validate()?;
    Ok(config)
}

fn load_toml<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        source,
        path: path.to_path_buf(),
    })?;
    toml::from_str(&content).map_err(|source| ConfigError::Parse {
        source,
        path: path.to_path_buf(),
    })
}
