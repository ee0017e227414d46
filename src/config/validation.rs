use crate::config::types::{Config, FetcherConfig, HarvestConfig, InputConfig, OutputConfig};
use crate::ConfigError;
use url::Url;

const MAX_CONCURRENCY: usize = 1024;
const MAX_RETRY_DELAY_MS: u64 = 60 * 60 * 1000;

/// Validates the entire configuration
///
/// Called after loading a file and again after CLI overrides are applied.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_harvest_config(&config.harvest)?;
    validate_fetcher_config(&config.fetcher)?;
    validate_input_config(&config.input)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates pipeline sizing and retry settings
fn validate_harvest_config(config: &HarvestConfig) -> Result<(), ConfigError> {
    if config.concurrency < 1 || config.concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.concurrency
        )));
    }

    if config.worker_count() < 1 {
        return Err(ConfigError::Validation(
            "workers must be >= 1".to_string(),
        ));
    }

    if config.queue_capacity() < 1 {
        return Err(ConfigError::Validation(
            "queue-capacity must be >= 1".to_string(),
        ));
    }

    if config.retry_delay_ms > MAX_RETRY_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "retry-delay-ms must be <= {}ms, got {}ms",
            MAX_RETRY_DELAY_MS, config.retry_delay_ms
        )));
    }

    if !config.backoff_multiplier.is_finite() || config.backoff_multiplier < 1.0 {
        return Err(ConfigError::Validation(format!(
            "backoff-multiplier must be a finite value >= 1.0, got {}",
            config.backoff_multiplier
        )));
    }

    Ok(())
}

/// Validates HTTP client settings
fn validate_fetcher_config(config: &FetcherConfig) -> Result<(), ConfigError> {
    if config.user_agent_name.is_empty() {
        return Err(ConfigError::Validation(
            "user-agent-name cannot be empty".to_string(),
        ));
    }

    if !config
        .user_agent_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "user-agent-name must contain only alphanumeric characters and hyphens, got '{}'",
            config.user_agent_name
        )));
    }

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact-url: {}", e)))?;
    }

    if config.request_timeout_secs == Some(0) {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1 when set".to_string(),
        ));
    }

    if config.connect_timeout_secs == 0 {
        return Err(ConfigError::Validation(
            "connect-timeout-secs must be >= 1".to_string(),
        ));
    }

    Ok(())
}

fn validate_input_config(config: &InputConfig) -> Result<(), ConfigError> {
    if config.urls_path.is_empty() {
        return Err(ConfigError::Validation(
            "urls-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database-path cannot be empty".to_string(),
        ));
    }
    Ok(())
}
