use crate::config::types::{Config, RuleSetConfig};
use crate::config::validation::{validate, validate_rules};
use crate::{ConfigError, ConfigResult};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
/// use harvest::config::load_config;
///
/// let config = load_config(Path::new("crawl.toml")).unwrap();
/// println!("Concurrency: {}", config.crawler.concurrency);
/// ```
pub fn load_config(path: &Path) -> ConfigResult<Config> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    validate(&config)?;
    Ok(config)
}

/// Loads a standalone rules file (`item = ...` plus `[[rule]]` tables)
pub fn load_rules(path: &Path) -> ConfigResult<RuleSetConfig> {
    let content = std::fs::read_to_string(path)?;
    let rules: RuleSetConfig = toml::from_str(&content)?;
    validate_rules(&rules)?;
    Ok(rules)
}

/// Resolves `--seed` arguments into seed URLs
///
/// Each argument is either a URL (anything containing `://`) or the path of a
/// file listing one URL per line. Blank lines and lines starting with `#` are
/// skipped. Order is preserved.
pub fn load_seeds(args: &[String]) -> ConfigResult<Vec<String>> {
    let mut seeds = Vec::new();

    for arg in args {
        if arg.contains("://") {
            seeds.push(arg.clone());
            continue;
        }

        let content = std::fs::read_to_string(arg)?;
        seeds.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }

    Ok(seeds)
}

/// Computes a SHA-256 fingerprint of a rule set
///
/// Two runs with the same fingerprint extracted with identical rules.
pub fn compute_rules_hash(rules: &RuleSetConfig) -> String {
    let mut hasher = Sha256::new();
    if let Some(item) = &rules.item {
        hasher.update(b"item\0");
        hasher.update(item.as_bytes());
    }
    for rule in &rules.rules {
        hasher.update(b"\0rule\0");
        hasher.update(rule.name.as_bytes());
        hasher.update(b"\0");
        hasher.update(rule.selector.as_bytes());
        hasher.update(format!("\0{:?}\0{}", rule.multiplicity, rule.is_link).as_bytes());
    }
    hex::encode(hasher.finalize())
}
