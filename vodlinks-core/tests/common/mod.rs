#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;

use vodlinks_core::browser::{
    BrowserError, BrowserResult, BrowserSession, ElementRef, LogEntry, Selector,
};
use vodlinks_core::config::{ScraperConfig, TimingSection};
use vodlinks_core::discovery::{OutputRecord, RecordSink};

pub type ClickHook = Box<dyn FnMut(&mut MockPage)>;

#[derive(Debug, Clone, Default)]
pub struct MockElement {
    pub name: String,
    pub attributes: HashMap<String, String>,
    pub text: String,
    pub clickable: bool,
}

impl MockElement {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            clickable: true,
            ..Default::default()
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }
}

#[derive(Default)]
pub struct MockPage {
    next_id: u64,
    selectors: Vec<(Selector, ElementRef)>,
    elements: HashMap<ElementRef, MockElement>,
    hooks: HashMap<ElementRef, ClickHook>,
    log_batches: VecDeque<Vec<LogEntry>>,
}

impl MockPage {
    pub fn add(&mut self, selector: Selector, element: MockElement) -> ElementRef {
        self.next_id += 1;
        let handle = ElementRef::new(self.next_id);
        self.selectors.push((selector, handle));
        self.elements.insert(handle, element);
        handle
    }

    pub fn add_css(&mut self, css: &str, element: MockElement) -> ElementRef {
        self.add(Selector::css(css), element)
    }

    pub fn remove(&mut self, element: ElementRef) {
        self.selectors.retain(|(_, handle)| *handle != element);
    }

    pub fn remove_selector(&mut self, selector: &Selector) {
        self.selectors.retain(|(candidate, _)| candidate != selector);
    }

    pub fn on_click(&mut self, element: ElementRef, hook: impl FnMut(&mut MockPage) + 'static) {
        self.hooks.insert(element, Box::new(hook));
    }

    pub fn push_log_batch(&mut self, entries: Vec<LogEntry>) {
        self.log_batches.push_back(entries);
    }

    fn matching(&self, selector: &Selector) -> Vec<ElementRef> {
        self.selectors
            .iter()
            .filter(|(candidate, _)| candidate == selector)
            .map(|(_, handle)| *handle)
            .collect()
    }

    fn element(&self, element: ElementRef) -> BrowserResult<&MockElement> {
        self.elements
            .get(&element)
            .ok_or(BrowserError::StaleElement(element.id()))
    }
}

/// In-memory browser: each URL maps to a page factory rebuilt on navigation.
/// Undrained log entries survive navigation as one batch, like the network
/// buffer of a real session.
#[derive(Default)]
pub struct ScriptedSession {
    pages: HashMap<String, Box<dyn Fn() -> MockPage>>,
    current: MockPage,
    pub navigations: Vec<String>,
    pub clicks: Vec<String>,
    pub typed: Vec<(String, String)>,
    pub waits: Vec<Selector>,
    pub drains: usize,
}

impl ScriptedSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn page(&mut self, url: &str, factory: impl Fn() -> MockPage + 'static) {
        self.pages.insert(url.to_string(), Box::new(factory));
    }

    pub fn clicks_on(&self, name: &str) -> usize {
        self.clicks.iter().filter(|clicked| *clicked == name).count()
    }
}

#[async_trait(?Send)]
impl BrowserSession for ScriptedSession {
    async fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        self.navigations.push(url.to_string());
        let leftover: Vec<LogEntry> = self.current.log_batches.drain(..).flatten().collect();
        self.current = self
            .pages
            .get(url)
            .map(|factory| factory())
            .unwrap_or_default();
        if !leftover.is_empty() {
            self.current.log_batches.push_front(leftover);
        }
        Ok(())
    }

    async fn wait_for_clickable(
        &mut self,
        selector: &Selector,
        _timeout: Duration,
    ) -> BrowserResult<ElementRef> {
        self.waits.push(selector.clone());
        self.current
            .matching(selector)
            .into_iter()
            .find(|handle| {
                self.current
                    .elements
                    .get(handle)
                    .map(|element| element.clickable)
                    .unwrap_or(false)
            })
            .ok_or_else(|| BrowserError::Timeout(selector.to_string()))
    }

    async fn find_element(&mut self, selector: &Selector) -> BrowserResult<ElementRef> {
        self.current
            .matching(selector)
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::ElementNotFound(selector.to_string()))
    }

    async fn find_elements(&mut self, selector: &Selector) -> BrowserResult<Vec<ElementRef>> {
        Ok(self.current.matching(selector))
    }

    async fn click(&mut self, element: ElementRef) -> BrowserResult<()> {
        let name = self.current.element(element)?.name.clone();
        self.clicks.push(name);
        if let Some(mut hook) = self.current.hooks.remove(&element) {
            hook(&mut self.current);
            self.current.hooks.insert(element, hook);
        }
        Ok(())
    }

    async fn type_text(&mut self, element: ElementRef, text: &str) -> BrowserResult<()> {
        let name = self.current.element(element)?.name.clone();
        self.typed.push((name, text.to_string()));
        Ok(())
    }

    async fn attribute(
        &mut self,
        element: ElementRef,
        name: &str,
    ) -> BrowserResult<Option<String>> {
        Ok(self.current.element(element)?.attributes.get(name).cloned())
    }

    async fn text(&mut self, element: ElementRef) -> BrowserResult<String> {
        Ok(self.current.element(element)?.text.clone())
    }

    async fn drain_performance_log(&mut self) -> BrowserResult<Vec<LogEntry>> {
        self.drains += 1;
        Ok(self.current.log_batches.pop_front().unwrap_or_default())
    }
}

#[derive(Debug, Default)]
pub struct CollectingSink {
    pub began: bool,
    pub finished: bool,
    pub records: Vec<OutputRecord>,
}

impl RecordSink for CollectingSink {
    fn begin(&mut self) -> std::io::Result<()> {
        self.began = true;
        Ok(())
    }

    fn emit(&mut self, record: &OutputRecord) -> std::io::Result<()> {
        self.records.push(record.clone());
        Ok(())
    }

    fn finish(&mut self) -> std::io::Result<()> {
        self.finished = true;
        Ok(())
    }
}

pub const PLAY: &str = ".click-to-play-button";
pub const TITLE: &str = ".side-bar-content-info-title";
pub const HD_MANIFEST: &str = "https://sprt-vod.akamaized.net/hls/VIDEO_1_6596000_vod.m3u8";
pub const SD_MANIFEST: &str = "https://sprt-vod.akamaized.net/hls/VIDEO_0_4596000_vod.m3u8";
pub const AD_MANIFEST: &str = "https://sprt-ads.fwmrm.net/preroll/VIDEO_1_6596000_vod.m3u8";

pub fn manifest_entry(url: &str) -> LogEntry {
    LogEntry::new(format!(
        r#"{{"message":{{"method":"Network.requestWillBeSent","params":{{"request":{{"url":"{url}","method":"GET"}}}}}}}}"#
    ))
}

pub fn noise_entry() -> LogEntry {
    LogEntry::new(
        r#"{"message":{"method":"Network.requestWillBeSent","params":{"request":{"url":"https://cdn.example.com/app.js"}}}}"#,
    )
}

pub fn test_config() -> ScraperConfig {
    let mut config = ScraperConfig::default();
    config.timing = TimingSection {
        listing_timeout_ms: 10,
        element_timeout_ms: 10,
        settle_ms: [0, 0],
        keystroke_pause_ms: [0, 0],
        poll_interval_ms: 0,
        login_retry_delay_ms: 0,
        item_delay_ms: [0, 0],
        max_listing_expansions: 50,
    };
    config.manifest.max_polls = 10;
    config
}

/// VOD page whose play button, once clicked, queues `batches` for successive polls.
pub fn vod_page(title: &str, batches: Vec<Vec<LogEntry>>) -> MockPage {
    let mut page = MockPage::default();
    let play = page.add_css(PLAY, MockElement::named("play"));
    page.add_css(TITLE, MockElement::named("title").with_text(title));
    page.on_click(play, move |page| {
        for batch in batches.clone() {
            page.push_log_batch(batch);
        }
    });
    page
}
