use std::io;

use thiserror::Error;

use crate::browser::BrowserError;

pub type DiscoveryResult<T> = Result<T, DiscoveryError>;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Browser(#[from] BrowserError),
    #[error("listing page {url} never showed an interactive entry")]
    PageLoadTimeout { url: String },
    #[error("provider {provider} not available (picker offers: {})", .available.join(", "))]
    ProviderNotSupported {
        provider: String,
        available: Vec<String>,
    },
    #[error("login field {field} not found with any known matcher")]
    LoginFieldNotFound { field: String },
    #[error("invalid login transition: {0}")]
    LoginTransition(String),
    #[error("{attempts} login attempts have failed, aborting")]
    LoginAttemptsExhausted { attempts: usize },
    #[error("no {target} manifest discovered after {polls} polls")]
    ManifestPollTimeout { polls: usize, target: String },
    #[error("output error: {0}")]
    Output(#[from] io::Error),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("work item {url} failed: {source}")]
    WorkItem {
        url: String,
        #[source]
        source: Box<DiscoveryError>,
    },
}

impl DiscoveryError {
    pub fn for_work_item(self, url: &str) -> Self {
        match self {
            wrapped @ DiscoveryError::WorkItem { .. } => wrapped,
            other => DiscoveryError::WorkItem {
                url: url.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// The innermost error, looking through work item wrappers.
    pub fn root(&self) -> &DiscoveryError {
        match self {
            DiscoveryError::WorkItem { source, .. } => source.root(),
            other => other,
        }
    }
}
