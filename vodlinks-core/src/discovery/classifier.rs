use crate::config::{ManifestSection, ResolutionMarker};

use super::error::{DiscoveryError, DiscoveryResult};
use super::model::{DiscoveredManifest, ManifestCandidate, ResolutionTarget};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Advertisement,
    Unclassified,
    Resolutions(Vec<String>),
}

/// Maps candidates to resolution tiers by bitrate-marker containment and keeps
/// ad-server traffic out of the result.
#[derive(Debug, Clone)]
pub struct ManifestClassifier {
    target: ResolutionTarget,
    markers: Vec<ResolutionMarker>,
    ad_domains: Vec<String>,
}

impl ManifestClassifier {
    pub fn new(config: &ManifestSection, target: ResolutionTarget) -> DiscoveryResult<Self> {
        if let ResolutionTarget::Single(label) = &target {
            if !config.resolutions.iter().any(|entry| &entry.label == label) {
                let known = config
                    .resolutions
                    .iter()
                    .map(|entry| entry.label.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                return Err(DiscoveryError::Configuration(format!(
                    "unknown resolution {label} (known: {known}, all)"
                )));
            }
        }
        Ok(Self {
            target,
            markers: config.resolutions.clone(),
            ad_domains: config.ad_domains.clone(),
        })
    }

    pub fn target(&self) -> &ResolutionTarget {
        &self.target
    }

    pub fn is_advertisement(&self, url: &str) -> bool {
        self.ad_domains.iter().any(|domain| url.contains(domain.as_str()))
    }

    pub fn classify(&self, candidate: &ManifestCandidate) -> Classification {
        if self.is_advertisement(&candidate.url) {
            return Classification::Advertisement;
        }
        let labels = self
            .markers
            .iter()
            .filter(|entry| match &self.target {
                ResolutionTarget::All => true,
                ResolutionTarget::Single(label) => &entry.label == label,
            })
            .filter(|entry| candidate.url.contains(entry.marker.as_str()))
            .map(|entry| entry.label.clone())
            .collect::<Vec<_>>();
        if labels.is_empty() {
            Classification::Unclassified
        } else {
            Classification::Resolutions(labels)
        }
    }

    /// Records every tier the candidate matches; returns how many were new.
    pub fn accept(&self, candidate: &ManifestCandidate, discovered: &mut DiscoveredManifest) -> usize {
        match self.classify(candidate) {
            Classification::Resolutions(labels) => labels
                .iter()
                .filter(|label| discovered.record(label, &candidate.url))
                .count(),
            Classification::Advertisement | Classification::Unclassified => 0,
        }
    }

    /// A single target needs its own tier; `All` needs every tier in the table.
    pub fn is_satisfied(&self, discovered: &DiscoveredManifest) -> bool {
        match &self.target {
            ResolutionTarget::Single(label) => discovered.contains(label),
            ResolutionTarget::All => self
                .markers
                .iter()
                .all(|entry| discovered.contains(&entry.label)),
        }
    }
}
