use std::time::Instant;

use tracing::{debug, info, warn};

use crate::browser::{BrowserSession, ElementRef, Pacing, Selector};
use crate::config::{ScraperConfig, SelectorSection};

use super::classifier::ManifestClassifier;
use super::error::{DiscoveryError, DiscoveryResult};
use super::login::LoginStateMachine;
use super::model::{
    sanitize_title, Credentials, DiscoveredManifest, OutputRecord, ResolutionTarget, WorkItem,
};
use super::output::RecordSink;
use super::sampler::NetworkLogSampler;

#[derive(Debug, Clone, Default)]
pub struct RunStats {
    pub target: String,
    pub items_total: usize,
    pub items_processed: usize,
    pub records_emitted: usize,
    pub login_rounds: usize,
    pub polls: usize,
    pub total_wait_ms: u64,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub title: String,
    pub records: Vec<OutputRecord>,
    pub login_rounds: usize,
    pub polls: usize,
}

/// Runs each work item through load, login, play, manifest polling and
/// title extraction, one item at a time.
#[derive(Debug, Clone)]
pub struct DiscoveryController {
    selectors: SelectorSection,
    sampler: NetworkLogSampler,
    classifier: ManifestClassifier,
    login: LoginStateMachine,
    credentials: Option<Credentials>,
    max_polls: usize,
}

impl DiscoveryController {
    pub fn new(
        config: &ScraperConfig,
        target: ResolutionTarget,
        credentials: Option<Credentials>,
    ) -> DiscoveryResult<Self> {
        Ok(Self {
            selectors: config.selectors.clone(),
            sampler: NetworkLogSampler::new(&config.manifest)?,
            classifier: ManifestClassifier::new(&config.manifest, target)?,
            login: LoginStateMachine::new(config.selectors.clone(), config.login.clone())?,
            credentials,
            max_polls: config.manifest.max_polls.max(1),
        })
    }

    pub fn target(&self) -> &ResolutionTarget {
        self.classifier.target()
    }

    /// Processes `worklist` in order, streaming records into `sink`. The first
    /// fatal error aborts the run; the sink is finished either way.
    pub async fn run(
        &self,
        session: &mut dyn BrowserSession,
        worklist: &[WorkItem],
        sink: &mut dyn RecordSink,
        pacing: &mut Pacing,
    ) -> DiscoveryResult<RunStats> {
        let start = Instant::now();
        let mut stats = RunStats {
            target: self.target().to_string(),
            items_total: worklist.len(),
            ..Default::default()
        };

        sink.begin()?;
        let outcome = self
            .run_items(session, worklist, sink, pacing, &mut stats)
            .await;
        let finished = sink.finish();
        stats.duration_secs = start.elapsed().as_secs();
        outcome?;
        finished?;

        info!(
            target = %stats.target,
            items = stats.items_processed,
            records = stats.records_emitted,
            login_rounds = stats.login_rounds,
            polls = stats.polls,
            duration = stats.duration_secs,
            "discovery run finished"
        );
        Ok(stats)
    }

    async fn run_items(
        &self,
        session: &mut dyn BrowserSession,
        worklist: &[WorkItem],
        sink: &mut dyn RecordSink,
        pacing: &mut Pacing,
        stats: &mut RunStats,
    ) -> DiscoveryResult<()> {
        for (index, item) in worklist.iter().enumerate() {
            if index > 0 {
                let waited = pacing.item_delay().await;
                stats.total_wait_ms += waited;
                debug!(delay_ms = waited, url = %item.url, "rate limiting before work item");
            }

            let outcome = self
                .process(session, item, pacing)
                .await
                .map_err(|err| err.for_work_item(&item.url))?;

            for record in &outcome.records {
                sink.emit(record)?;
                stats.records_emitted += 1;
            }
            stats.items_processed += 1;
            stats.login_rounds += outcome.login_rounds;
            stats.polls += outcome.polls;
            info!(
                item = index + 1,
                of = worklist.len(),
                url = %item.url,
                title = %outcome.title,
                records = outcome.records.len(),
                "work item finalized"
            );
        }
        Ok(())
    }

    pub async fn process(
        &self,
        session: &mut dyn BrowserSession,
        item: &WorkItem,
        pacing: &mut Pacing,
    ) -> DiscoveryResult<ItemOutcome> {
        let stale = session.drain_performance_log().await?;
        if !stale.is_empty() {
            debug!(entries = stale.len(), "discarding network log of the previous page");
        }
        session.navigate(&item.url).await?;

        let (play_button, login_rounds) = match &self.credentials {
            Some(credentials) => {
                let login = self.login.run(session, credentials, pacing).await?;
                (login.play_button, login.rounds)
            }
            None => (self.wait_for_play(session, pacing).await?, 0),
        };
        session.click(play_button).await?;

        let (discovered, polls) = self.poll_manifests(session, pacing).await?;
        let title = self.extract_title(session, item).await?;
        let records = discovered
            .iter()
            .map(|(resolution, url)| OutputRecord {
                title: title.clone(),
                resolution: resolution.to_string(),
                manifest_url: url.to_string(),
            })
            .collect();

        Ok(ItemOutcome {
            title,
            records,
            login_rounds,
            polls,
        })
    }

    async fn wait_for_play(
        &self,
        session: &mut dyn BrowserSession,
        pacing: &Pacing,
    ) -> DiscoveryResult<ElementRef> {
        let play = Selector::css(self.selectors.play_button.as_str());
        Ok(session
            .wait_for_clickable(&play, pacing.element_timeout())
            .await?)
    }

    /// Drains the network log until the target is satisfied or the poll budget
    /// runs out.
    async fn poll_manifests(
        &self,
        session: &mut dyn BrowserSession,
        pacing: &mut Pacing,
    ) -> DiscoveryResult<(DiscoveredManifest, usize)> {
        let mut discovered = DiscoveredManifest::default();
        for poll in 1..=self.max_polls {
            let entries = session.drain_performance_log().await?;
            let candidates = self.sampler.extract(&entries);
            for candidate in &candidates {
                if self.classifier.is_advertisement(&candidate.url) {
                    debug!(url = %candidate.url, "skipping advertisement manifest");
                    continue;
                }
                if self.classifier.accept(candidate, &mut discovered) > 0 {
                    debug!(url = %candidate.url, poll, "manifest discovered");
                }
            }
            if self.classifier.is_satisfied(&discovered) {
                return Ok((discovered, poll));
            }
            pacing.poll_interval().await;
        }
        Err(DiscoveryError::ManifestPollTimeout {
            polls: self.max_polls,
            target: self.target().to_string(),
        })
    }

    async fn extract_title(
        &self,
        session: &mut dyn BrowserSession,
        item: &WorkItem,
    ) -> DiscoveryResult<String> {
        let selector = Selector::css(self.selectors.title.as_str());
        let raw = match session.find_element(&selector).await {
            Ok(element) => session.text(element).await?,
            Err(err) if err.is_not_found() => String::new(),
            Err(err) => return Err(err.into()),
        };
        let title = sanitize_title(&raw);
        if title.is_empty() {
            let fallback = fallback_title(&item.url);
            warn!(url = %item.url, fallback = %fallback, "page title missing, using url slug");
            return Ok(fallback);
        }
        Ok(title)
    }
}

fn fallback_title(url: &str) -> String {
    let slug = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(url);
    sanitize_title(slug)
}
