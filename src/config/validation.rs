use crate::config::types::{Config, CrawlerConfig, RuleSetConfig, UserAgentConfig};
use crate::{ConfigError, ConfigResult};
use std::collections::HashSet;
use url::Url;

/// Upper bound for the concurrency limit
pub const MAX_CONCURRENCY: usize = 256;

/// Validates the entire configuration
///
/// Rules are only checked when the file carries any, since they may come from
/// a separate rules file. Seeds are checked for syntax but may be empty here;
/// an empty seed list is rejected when the run starts.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    if config.rules.item.is_some() || !config.rules.rules.is_empty() {
        validate_rules(&config.rules)?;
    }
    for seed in &config.seeds {
        validate_seed(seed)?;
    }
    Ok(())
}

/// Validates crawler configuration
pub fn validate_crawler_config(config: &CrawlerConfig) -> ConfigResult<()> {
    validate_concurrency(config.concurrency)?;

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be >= 1s, got {}s",
            config.request_timeout_secs
        )));
    }

    if config.sink_buffer < 1 {
        return Err(ConfigError::Validation(
            "sink_buffer must be >= 1".to_string(),
        ));
    }

    if let Some(proxy) = &config.proxy {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    for domain in &config.allowed_domains {
        validate_domain_string(domain)?;
    }

    Ok(())
}

/// Validates the concurrency limit
pub fn validate_concurrency(value: usize) -> ConfigResult<()> {
    if value < 1 || value > MAX_CONCURRENCY {
        return Err(ConfigError::InvalidConcurrency {
            value,
            max: MAX_CONCURRENCY,
        });
    }
    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> ConfigResult<()> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.crawler_name
        )));
    }

    if let Some(contact) = &config.contact_url {
        Url::parse(contact)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;
    }

    Ok(())
}

/// Validates the shape of a rule set
///
/// Selector syntax is checked when the rules are compiled by the extractor.
pub fn validate_rules(rules: &RuleSetConfig) -> ConfigResult<()> {
    if rules.rules.is_empty() {
        return Err(ConfigError::Validation(
            "rule set must contain at least one rule".to_string(),
        ));
    }

    if let Some(item) = &rules.item {
        if item.trim().is_empty() {
            return Err(ConfigError::Validation(
                "item selector cannot be empty".to_string(),
            ));
        }
    }

    let mut names = HashSet::new();
    for rule in &rules.rules {
        if rule.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "rule name cannot be empty".to_string(),
            ));
        }
        if !names.insert(rule.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate rule name '{}'",
                rule.name
            )));
        }
        if rule.selector.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "rule '{}' has an empty selector",
                rule.name
            )));
        }
    }

    Ok(())
}

/// Validates a seed list: non-empty, every entry an absolute http(s) URL
pub fn validate_seeds(seeds: &[String]) -> ConfigResult<()> {
    if seeds.is_empty() {
        return Err(ConfigError::NoSeeds);
    }
    for seed in seeds {
        validate_seed(seed)?;
    }
    Ok(())
}

fn validate_seed(seed: &str) -> ConfigResult<()> {
    let url = Url::parse(seed)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid seed URL '{}': {}", seed, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "Seed URL '{}' must use http or https",
            seed
        )));
    }

    Ok(())
}

/// Validates a domain string used in `allowed-domains`
fn validate_domain_string(domain: &str) -> ConfigResult<()> {
    if domain.is_empty() {
        return Err(ConfigError::Validation(
            "Domain cannot be empty".to_string(),
        ));
    }

    if !domain
        .chars()
        .all(|c| c.is_alphanumeric() || c == '.' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' contains invalid characters",
            domain
        )));
    }

    if domain.starts_with('.')
        || domain.ends_with('.')
        || domain.starts_with('-')
        || domain.ends_with('-')
    {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' cannot start or end with '.' or '-'",
            domain
        )));
    }

    if domain.contains("..") {
        return Err(ConfigError::Validation(format!(
            "Domain '{}' cannot contain consecutive dots",
            domain
        )));
    }

    Ok(())
}
