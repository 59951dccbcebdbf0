use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use super::error::BrowserResult;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    Css(String),
    XPath(String),
}

impl Selector {
    pub fn css(value: impl Into<String>) -> Self {
        Selector::Css(value.into())
    }

    pub fn xpath(value: impl Into<String>) -> Self {
        Selector::XPath(value.into())
    }

    /// `//{tag}[@{attribute}='{value}']`
    pub fn tag_with_attribute(tag: &str, attribute: &str, value: &str) -> Self {
        Selector::XPath(format!("//{tag}[@{attribute}='{value}']"))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Css(css) => write!(f, "css:{css}"),
            Selector::XPath(xpath) => write!(f, "xpath:{xpath}"),
        }
    }
}

/// Handle to an element resolved by a [`BrowserSession`]. Only meaningful for
/// the session that produced it, and only until the next navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementRef(u64);

impl ElementRef {
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// One network-performance event. `message` holds the JSON wrapper
/// `{"message":{"method":"Network.*","params":{..}}}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub message: String,
}

impl LogEntry {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Capability set the discovery engine drives. `wait_for_clickable` reports an
/// elapsed wait as `BrowserError::Timeout`; lookups report absence as
/// `BrowserError::ElementNotFound`.
#[async_trait(?Send)]
pub trait BrowserSession {
    async fn navigate(&mut self, url: &str) -> BrowserResult<()>;
    async fn wait_for_clickable(
        &mut self,
        selector: &Selector,
        timeout: Duration,
    ) -> BrowserResult<ElementRef>;
    async fn find_element(&mut self, selector: &Selector) -> BrowserResult<ElementRef>;
    async fn find_elements(&mut self, selector: &Selector) -> BrowserResult<Vec<ElementRef>>;
    async fn click(&mut self, element: ElementRef) -> BrowserResult<()>;
    async fn type_text(&mut self, element: ElementRef, text: &str) -> BrowserResult<()>;
    async fn attribute(&mut self, element: ElementRef, name: &str)
        -> BrowserResult<Option<String>>;
    async fn text(&mut self, element: ElementRef) -> BrowserResult<String>;
    async fn drain_performance_log(&mut self) -> BrowserResult<Vec<LogEntry>>;
}
