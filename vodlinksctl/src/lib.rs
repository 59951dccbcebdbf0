use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use thiserror::Error;
use tracing::{info, warn};
use vodlinks_core::browser::{BrowserError, BrowserLauncher, Pacing};
use vodlinks_core::catalog;
use vodlinks_core::discovery::{
    CatalogListingLoader, Credentials, DiscoveryController, DiscoveryError, OutputFormat,
    ResolutionTarget, RunStats, WriterSink,
};
use vodlinks_core::{load_scraper_config, ConfigError, ScraperConfig};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("usage error: {0}")]
    Usage(String),
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Collects replay HLS manifest URLs for one sport and prints youtube-dl commands",
    long_about = None
)]
pub struct Cli {
    /// Sport whose replay listing is crawled
    #[arg(short, long, value_parser = parse_sport)]
    pub sport: String,
    /// TV provider used for the login picker
    #[arg(short, long, value_parser = parse_provider)]
    pub cable_provider: Option<String>,
    /// Provider account username
    #[arg(short, long, env = "VODLINKS_USERNAME")]
    pub username: Option<String>,
    /// Provider account password
    #[arg(short, long, env = "VODLINKS_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
    /// Resolution tier to collect (a configured label or `all`)
    #[arg(short, long, default_value = "1080p")]
    pub resolution: String,
    /// Seconds to wait between subsequent replays
    #[arg(short, long)]
    pub delay: Option<u64>,
    /// Append output to this file instead of stdout
    #[arg(short, long)]
    pub filename: Option<PathBuf>,
    /// Shape of the emitted lines
    #[arg(short = 't', long, value_enum, default_value_t = FileFormat::BashCommands)]
    pub file_format: FileFormat,
    /// Scraper configuration (defaults apply when omitted)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Run Chromium without a window
    #[arg(long)]
    pub headless: bool,
    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FileFormat {
    #[value(name = "bash_commands")]
    BashCommands,
    #[value(name = "bash_array")]
    BashArray,
}

impl From<FileFormat> for OutputFormat {
    fn from(format: FileFormat) -> Self {
        match format {
            FileFormat::BashCommands => OutputFormat::BashCommands,
            FileFormat::BashArray => OutputFormat::BashArray,
        }
    }
}

fn parse_sport(value: &str) -> std::result::Result<String, String> {
    if catalog::is_known_sport(value) {
        Ok(value.to_string())
    } else {
        Err(format!("unknown sport (expected one of: {})", catalog::SPORTS.join(", ")))
    }
}

fn parse_provider(value: &str) -> std::result::Result<String, String> {
    if catalog::is_known_provider(value) {
        Ok(value.to_string())
    } else {
        Err(format!(
            "unknown provider (expected one of: {})",
            catalog::CABLE_PROVIDERS.join(", ")
        ))
    }
}

/// Logs go to stderr; stdout is reserved for output records.
pub fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub fn resolve_config(cli: &Cli) -> Result<ScraperConfig> {
    let mut config = match &cli.config {
        Some(path) => load_scraper_config(path)?,
        None => ScraperConfig::default(),
    };
    if cli.headless {
        config.chromium.headless = true;
    }
    if let Some(delay) = cli.delay {
        let millis = delay.saturating_mul(1_000);
        config.timing.item_delay_ms = [millis, millis];
    }
    Ok(config)
}

pub fn resolve_credentials(cli: &Cli) -> Result<Option<Credentials>> {
    let Some(provider) = &cli.cable_provider else {
        if cli.username.is_some() || cli.password.is_some() {
            warn!("credentials given without a cable provider, skipping login");
        }
        return Ok(None);
    };
    match (&cli.username, &cli.password) {
        (Some(username), Some(password)) => Ok(Some(Credentials::new(
            username.as_str(),
            password.as_str(),
            provider.as_str(),
        ))),
        _ => Err(AppError::Usage(format!(
            "--cable-provider {provider} requires --username and --password (or VODLINKS_USERNAME / VODLINKS_PASSWORD)"
        ))),
    }
}

pub async fn run(cli: Cli) -> Result<RunStats> {
    let config = resolve_config(&cli)?;
    let credentials = resolve_credentials(&cli)?;
    let target: ResolutionTarget = cli.resolution.parse()?;
    if target == ResolutionTarget::default() && credentials.is_none() {
        warn!("1080p streams may not be available without a cable provider login");
    }

    let controller = DiscoveryController::new(&config, target, credentials)?;
    let loader = CatalogListingLoader::new(
        config.site.clone(),
        config.selectors.clone(),
        config.timing.max_listing_expansions,
    );
    let mut sink = WriterSink::open(cli.filename.as_deref(), cli.file_format.into())?;
    let mut pacing = Pacing::new(config.timing.clone());

    let mut session = BrowserLauncher::new(config.chromium.clone()).launch().await?;
    let outcome = async {
        let worklist = loader.load(&mut session, &cli.sport, &mut pacing).await?;
        if worklist.is_empty() {
            warn!(sport = %cli.sport, "listing page has no replays");
        }
        controller
            .run(&mut session, &worklist, &mut sink, &mut pacing)
            .await
    }
    .await;

    if let Err(err) = session.shutdown().await {
        warn!(error = %err, "browser did not shut down cleanly");
    }
    let stats = outcome?;
    info!(
        sport = %cli.sport,
        records = stats.records_emitted,
        output = %cli
            .filename
            .as_ref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "stdout".into()),
        "links written"
    );
    Ok(stats)
}
