mod classifier;
mod controller;
mod error;
mod listing;
mod login;
mod model;
mod output;
mod sampler;

pub use classifier::{Classification, ManifestClassifier};
pub use controller::{DiscoveryController, ItemOutcome, RunStats};
pub use error::{DiscoveryError, DiscoveryResult};
pub use listing::CatalogListingLoader;
pub use login::{LoginEvent, LoginFlow, LoginOutcome, LoginState, LoginStateMachine};
pub use model::{
    sanitize_title, Credentials, DiscoveredManifest, ManifestCandidate, OutputRecord,
    ResolutionTarget, WorkItem,
};
pub use output::{OutputFormat, RecordSink, WriterSink};
pub use sampler::{percent_decode, NetworkLogSampler};
