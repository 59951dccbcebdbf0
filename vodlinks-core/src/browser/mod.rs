mod automation;
mod error;
mod pacing;
mod session;

pub use automation::{BrowserLauncher, ChromiumSession};
pub use error::{BrowserError, BrowserResult};
pub use pacing::Pacing;
pub use session::{BrowserSession, ElementRef, LogEntry, Selector};
