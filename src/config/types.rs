use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Sumi-Harvest
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub fetcher: FetcherConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Pipeline sizing and retry behavior
#[derive(Debug, Clone, Deserialize)]
pub struct HarvestConfig {
    /// Maximum number of URLs in flight (fetch + save) at once
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Number of worker tasks; defaults to `concurrency`
    #[serde(default)]
    pub workers: Option<usize>,

    /// Capacity of the feeder queue; defaults to `concurrency`
    #[serde(rename = "queue-capacity", default)]
    pub queue_capacity: Option<usize>,

    /// Additional save attempts after the first failure
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay between save attempts (milliseconds)
    #[serde(rename = "retry-delay-ms", default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    /// How the retry delay grows between attempts
    #[serde(default)]
    pub backoff: BackoffKind,

    /// Growth factor for exponential backoff
    #[serde(rename = "backoff-multiplier", default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// What to do when the existence check itself fails
    #[serde(rename = "on-exists-error", default)]
    pub on_exists_error: ExistsErrorPolicy,
}

impl HarvestConfig {
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or(self.concurrency)
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity.unwrap_or(self.concurrency)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            workers: None,
            queue_capacity: None,
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            backoff: BackoffKind::default(),
            backoff_multiplier: default_backoff_multiplier(),
            on_exists_error: ExistsErrorPolicy::default(),
        }
    }
}

/// Shape of the delay between retry attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackoffKind {
    #[default]
    Fixed,
    Exponential,
}

/// Policy applied when the store cannot answer an existence query
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExistsErrorPolicy {
    /// Treat the URL as not stored and fetch it anyway
    #[default]
    Proceed,
    /// Leave the URL for a later run
    Skip,
}

/// HTTP client configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Name sent in the User-Agent header
    #[serde(rename = "user-agent-name", default = "default_agent_name")]
    pub user_agent_name: String,

    /// Version sent in the User-Agent header
    #[serde(rename = "user-agent-version", default = "default_agent_version")]
    pub user_agent_version: String,

    /// URL with information about the fetcher
    #[serde(rename = "contact-url", default)]
    pub contact_url: Option<String>,

    /// Whole-request timeout in seconds; no timeout when absent
    #[serde(rename = "request-timeout-secs", default)]
    pub request_timeout_secs: Option<u64>,

    /// Connection establishment timeout in seconds
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Reject non-2xx responses instead of storing their bodies
    #[serde(rename = "require-success-status", default)]
    pub require_success_status: bool,

    /// Maximum redirect hops followed per request
    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,
}

impl FetcherConfig {
    /// Formats the User-Agent header value
    ///
    /// Format: `Name/Version (+ContactURL)`, or `Name/Version` without a contact URL.
    pub fn user_agent(&self) -> String {
        match &self.contact_url {
            Some(contact) => format!(
                "{}/{} (+{})",
                self.user_agent_name, self.user_agent_version, contact
            ),
            None => format!("{}/{}", self.user_agent_name, self.user_agent_version),
        }
    }
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            user_agent_name: default_agent_name(),
            user_agent_version: default_agent_version(),
            contact_url: None,
            request_timeout_secs: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            require_success_status: false,
            max_redirects: default_max_redirects(),
        }
    }
}

/// Input configuration
#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Path to the line-delimited URL list
    #[serde(rename = "urls-path", default = "default_urls_path")]
    pub urls_path: String,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            urls_path: default_urls_path(),
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path", default = "default_database_path")]
    pub database_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// Twice the available parallelism, since workers mostly wait on I/O
pub fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get() * 2)
        .unwrap_or(8)
}

fn default_max_retries() -> u32 {
    10
}

fn default_retry_delay_ms() -> u64 {
    100
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_agent_name() -> String {
    "SumiHarvest".to_string()
}

fn default_agent_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_max_redirects() -> usize {
    10
}

fn default_urls_path() -> String {
    "urls.txt".to_string()
}

fn default_database_path() -> String {
    "urls.db".to_string()
}
