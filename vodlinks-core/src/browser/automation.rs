use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig as ChromiumConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EventRequestWillBeSent, EventResponseReceived,
};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::cdp::browser_protocol::target::CreateTargetParams;
use chromiumoxide::element::Element;
use chromiumoxide::handler::viewport::Viewport as ChromiumViewport;
use chromiumoxide::page::Page;
use futures::StreamExt;
use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::config::ChromiumSection;

use super::error::{BrowserError, BrowserResult};
use super::session::{BrowserSession, ElementRef, LogEntry, Selector};

const XPATH_MARKER: &str = "data-vodlinks-xpath";

const CLICKABLE_PROBE: &str = r#"function() {
    const rect = this.getBoundingClientRect();
    const style = window.getComputedStyle(this);
    return rect.width > 0 && rect.height > 0
        && style.visibility !== 'hidden'
        && style.display !== 'none'
        && !this.disabled;
}"#;

type LogBuffer = Arc<Mutex<Vec<LogEntry>>>;

#[derive(Debug, Clone)]
pub struct BrowserLauncher {
    config: ChromiumSection,
}

impl BrowserLauncher {
    pub fn new(config: ChromiumSection) -> Self {
        Self { config }
    }

    pub async fn launch(&self) -> BrowserResult<ChromiumSession> {
        let chromium_config = self.build_chromium_config()?;
        info!(
            ua = %self.config.user_agent,
            width = self.config.window_size[0],
            height = self.config.window_size[1],
            headless = self.config.headless,
            "Launching Chromium instance"
        );

        let (browser, mut handler) = Browser::launch(chromium_config)
            .await
            .map_err(|err| BrowserError::Launch(err.to_string()))?;

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    debug!(error = %err, "Chromium handler reported error");
                }
            }
        });

        let page = browser
            .new_page(CreateTargetParams::new("about:blank"))
            .await?;
        let log = LogBuffer::default();
        let listener_tasks = spawn_network_listeners(&page, &log).await?;

        Ok(ChromiumSession {
            browser,
            page,
            handler_task: Some(handler_task),
            listener_tasks,
            log,
            elements: HashMap::new(),
            next_element: 0,
            next_marker: 0,
            probe_interval: Duration::from_millis(self.config.wait_probe_ms.max(10)),
        })
    }

    fn build_chromium_config(&self) -> BrowserResult<ChromiumConfig> {
        let [width, height] = self.config.window_size;
        let mut builder = ChromiumConfig::builder().viewport(ChromiumViewport {
            width,
            height,
            device_scale_factor: None,
            emulating_mobile: false,
            is_landscape: width >= height,
            has_touch: false,
        });

        if let Some(path) = &self.config.executable_path {
            builder = builder.chrome_executable(path);
        }
        if !self.config.headless {
            builder = builder.with_head();
        }
        if !self.config.sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(timeout) = self.config.request_timeout_seconds {
            builder = builder.request_timeout(Duration::from_secs(timeout));
        }

        let args = vec![
            format!("--user-agent={}", self.config.user_agent),
            format!("--window-size={width},{height}"),
            "--autoplay-policy=no-user-gesture-required".to_string(),
            "--no-first-run".to_string(),
            "--password-store=basic".to_string(),
        ];
        builder = builder.args(args);

        builder.build().map_err(BrowserError::Configuration)
    }
}

async fn spawn_network_listeners(
    page: &Page,
    log: &LogBuffer,
) -> BrowserResult<Vec<JoinHandle<()>>> {
    let mut requests = page.event_listener::<EventRequestWillBeSent>().await?;
    let mut responses = page.event_listener::<EventResponseReceived>().await?;

    let request_log = Arc::clone(log);
    let request_task = tokio::spawn(async move {
        while let Some(event) = requests.next().await {
            record_event(&request_log, "Network.requestWillBeSent", &*event);
        }
    });

    let response_log = Arc::clone(log);
    let response_task = tokio::spawn(async move {
        while let Some(event) = responses.next().await {
            record_event(&response_log, "Network.responseReceived", &*event);
        }
    });

    Ok(vec![request_task, response_task])
}

fn record_event<T: Serialize>(log: &LogBuffer, method: &str, params: &T) {
    let params = match serde_json::to_value(params) {
        Ok(value) => value,
        Err(err) => {
            debug!(method, error = %err, "failed to serialize network event");
            return;
        }
    };
    let message = serde_json::json!({ "message": { "method": method, "params": params } });
    let mut guard = log.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.push(LogEntry::new(message.to_string()));
}

/// A single Chromium window driven over CDP. Network activity of the page is
/// buffered from launch until drained.
#[derive(Debug)]
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    handler_task: Option<JoinHandle<()>>,
    listener_tasks: Vec<JoinHandle<()>>,
    log: LogBuffer,
    elements: HashMap<u64, Element>,
    next_element: u64,
    next_marker: u64,
    probe_interval: Duration,
}

impl ChromiumSession {
    pub async fn shutdown(mut self) -> BrowserResult<()> {
        info!("Shutting down Chromium instance");
        for task in self.listener_tasks.drain(..) {
            task.abort();
        }
        if let Err(err) = self.browser.close().await {
            warn!(error = %err, "Failed to close browser gracefully");
        }
        if let Some(handle) = self.handler_task.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "Browser handler join error");
            }
        }
        Ok(())
    }

    fn register(&mut self, element: Element) -> ElementRef {
        self.next_element += 1;
        self.elements.insert(self.next_element, element);
        ElementRef::new(self.next_element)
    }

    fn element(&self, element: ElementRef) -> BrowserResult<&Element> {
        self.elements
            .get(&element.id())
            .ok_or(BrowserError::StaleElement(element.id()))
    }

    async fn resolve(&mut self, selector: &Selector) -> BrowserResult<Vec<Element>> {
        match selector {
            Selector::Css(css) => self
                .page
                .find_elements(css.as_str())
                .await
                .or_else(|err| {
                    debug!(selector = %selector, error = %err, "css lookup failed");
                    Ok::<_, BrowserError>(Vec::new())
                }),
            Selector::XPath(xpath) => self.resolve_xpath(xpath).await,
        }
    }

    /// Tags every XPath match with a one-off marker attribute, then re-finds the
    /// tagged nodes through CSS so they come back as CDP element handles.
    async fn resolve_xpath(&mut self, xpath: &str) -> BrowserResult<Vec<Element>> {
        self.next_marker += 1;
        let token = self.next_marker;
        let literal = serde_json::to_string(xpath)
            .map_err(|err| BrowserError::Unexpected(format!("invalid xpath literal: {err}")))?;
        let script = format!(
            "(() => {{
        const snapshot = document.evaluate({literal}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
        let tagged = 0;
        for (let idx = 0; idx < snapshot.snapshotLength; idx += 1) {{
            const node = snapshot.snapshotItem(idx);
            if (node && node.setAttribute) {{
                node.setAttribute('{XPATH_MARKER}', '{token}');
                tagged += 1;
            }}
        }}
        return tagged;
    }})()"
        );
        let tagged: u64 = self
            .page
            .evaluate(script.as_str())
            .await
            .map_err(|err| BrowserError::Unexpected(format!("failed to evaluate xpath: {err}")))?
            .into_value()
            .map_err(|err| {
                BrowserError::Unexpected(format!("failed to decode xpath result: {err}"))
            })?;
        if tagged == 0 {
            return Ok(Vec::new());
        }
        let css = format!("[{XPATH_MARKER}='{token}']");
        Ok(self.page.find_elements(css.as_str()).await?)
    }

    async fn is_clickable(element: &Element) -> bool {
        match element.call_js_fn(CLICKABLE_PROBE, false).await {
            Ok(returns) => returns
                .result
                .value
                .and_then(|value| value.as_bool())
                .unwrap_or(false),
            Err(err) => {
                debug!(error = %err, "clickable probe failed");
                false
            }
        }
    }
}

#[async_trait(?Send)]
impl BrowserSession for ChromiumSession {
    async fn navigate(&mut self, url: &str) -> BrowserResult<()> {
        self.elements.clear();
        let params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(BrowserError::Configuration)?;
        self.page.goto(params).await?;
        self.page.wait_for_navigation().await?;
        Ok(())
    }

    async fn wait_for_clickable(
        &mut self,
        selector: &Selector,
        timeout: Duration,
    ) -> BrowserResult<ElementRef> {
        let deadline = Instant::now() + timeout;
        loop {
            for element in self.resolve(selector).await? {
                if Self::is_clickable(&element).await {
                    return Ok(self.register(element));
                }
            }
            if Instant::now() >= deadline {
                return Err(BrowserError::Timeout(selector.to_string()));
            }
            sleep(self.probe_interval).await;
        }
    }

    async fn find_element(&mut self, selector: &Selector) -> BrowserResult<ElementRef> {
        let element = self
            .resolve(selector)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| BrowserError::ElementNotFound(selector.to_string()))?;
        Ok(self.register(element))
    }

    async fn find_elements(&mut self, selector: &Selector) -> BrowserResult<Vec<ElementRef>> {
        let elements = self.resolve(selector).await?;
        Ok(elements
            .into_iter()
            .map(|element| self.register(element))
            .collect())
    }

    async fn click(&mut self, element: ElementRef) -> BrowserResult<()> {
        self.element(element)?
            .click()
            .await
            .map_err(|err| BrowserError::Unexpected(format!("failed to click element: {err}")))?;
        Ok(())
    }

    async fn type_text(&mut self, element: ElementRef, text: &str) -> BrowserResult<()> {
        let element = self.element(element)?;
        element.click().await.map_err(|err| {
            BrowserError::Unexpected(format!("failed to focus element before typing: {err}"))
        })?;
        element
            .type_str(text)
            .await
            .map_err(|err| BrowserError::Unexpected(format!("failed to type text: {err}")))?;
        Ok(())
    }

    async fn attribute(
        &mut self,
        element: ElementRef,
        name: &str,
    ) -> BrowserResult<Option<String>> {
        Ok(self.element(element)?.attribute(name).await?)
    }

    async fn text(&mut self, element: ElementRef) -> BrowserResult<String> {
        Ok(self
            .element(element)?
            .inner_text()
            .await?
            .unwrap_or_default())
    }

    async fn drain_performance_log(&mut self) -> BrowserResult<Vec<LogEntry>> {
        let mut guard = self
            .log
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        Ok(std::mem::take(&mut *guard))
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if let Some(handle) = &self.handler_task {
            if !handle.is_finished() {
                warn!("ChromiumSession dropped without explicit shutdown");
            }
        }
    }
}
