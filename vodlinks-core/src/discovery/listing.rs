use tracing::{debug, info, warn};
use url::Url;

use crate::browser::{BrowserSession, Pacing, Selector};
use crate::catalog;
use crate::config::{SelectorSection, SiteSection};

use super::error::{DiscoveryError, DiscoveryResult};
use super::model::WorkItem;

/// Expands a category listing page and collects its VOD links in page order.
#[derive(Debug, Clone)]
pub struct CatalogListingLoader {
    site: SiteSection,
    selectors: SelectorSection,
    max_expansions: usize,
}

impl CatalogListingLoader {
    pub fn new(site: SiteSection, selectors: SelectorSection, max_expansions: usize) -> Self {
        Self {
            site,
            selectors,
            max_expansions,
        }
    }

    pub fn listing_url(&self, category: &str) -> String {
        catalog::listing_url(&self.site.listing_base_url, category)
    }

    pub async fn load(
        &self,
        session: &mut dyn BrowserSession,
        category: &str,
        pacing: &mut Pacing,
    ) -> DiscoveryResult<Vec<WorkItem>> {
        let url = self.listing_url(category);
        info!(category, url = %url, "loading listing page");
        session.navigate(&url).await?;

        let entry = Selector::css(self.selectors.listing_entry.as_str());
        match session
            .wait_for_clickable(&entry, pacing.listing_timeout())
            .await
        {
            Ok(_) => {}
            Err(err) if err.is_timeout() => {
                return Err(DiscoveryError::PageLoadTimeout { url });
            }
            Err(err) => return Err(err.into()),
        }

        self.dismiss_cookie_prompt(session).await?;
        let expansions = self.expand(session, pacing).await?;

        let base = Url::parse(&url).ok();
        let mut items = Vec::new();
        for element in session.find_elements(&entry).await? {
            let Some(href) = session.attribute(element, "href").await? else {
                continue;
            };
            let href = href.trim();
            if href.is_empty() {
                continue;
            }
            items.push(WorkItem::new(absolutize(base.as_ref(), href)));
        }
        info!(category, items = items.len(), expansions, "listing loaded");
        Ok(items)
    }

    async fn dismiss_cookie_prompt(&self, session: &mut dyn BrowserSession) -> DiscoveryResult<()> {
        let cookie = Selector::css(self.selectors.cookie_button.as_str());
        match session.find_element(&cookie).await {
            Ok(button) => {
                debug!("dismissing cookie prompt");
                session.click(button).await?;
                Ok(())
            }
            Err(err) if err.is_not_found() => {
                debug!("no cookie prompt");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Clicks "load more" until it is gone; returns the number of clicks.
    async fn expand(
        &self,
        session: &mut dyn BrowserSession,
        pacing: &mut Pacing,
    ) -> DiscoveryResult<usize> {
        let load_more = Selector::css(self.selectors.load_more.as_str());
        let mut expansions = 0usize;
        loop {
            match session.find_element(&load_more).await {
                Ok(button) => {
                    if expansions >= self.max_expansions {
                        warn!(expansions, "load more still present, stopping expansion");
                        return Ok(expansions);
                    }
                    session.click(button).await?;
                    expansions += 1;
                    pacing.settle().await;
                }
                Err(err) if err.is_not_found() => return Ok(expansions),
                Err(err) => return Err(err.into()),
            }
        }
    }
}

fn absolutize(base: Option<&Url>, href: &str) -> String {
    match base.map(|base| base.join(href)) {
        Some(Ok(joined)) => joined.to_string(),
        _ => href.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_links_resolve_against_listing_page() {
        let base = Url::parse("https://www.nbcolympics.com/replays/sport/swimming").unwrap();
        assert_eq!(
            absolutize(Some(&base), "/video/finals-mens-100m"),
            "https://www.nbcolympics.com/video/finals-mens-100m"
        );
        assert_eq!(
            absolutize(Some(&base), "https://other.example/v/1"),
            "https://other.example/v/1"
        );
        assert_eq!(absolutize(None, "/video/x"), "/video/x");
    }
}
