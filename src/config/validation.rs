use crate::config::builder::CrawlConfigBuilder;
use crate::config::types::{EntryPoints, NamespaceSelection, NetworkPolicy};
use crate::ConfigError;
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

static WIKIMEDIA_PROJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)(wikipedia|wikisource|wiktionary|wikibooks|wikiversity|wikimedia|wikispecies|wikiquote|wikinews|wikidata|wikivoyage)\.org",
    )
    .expect("hardcoded regex pattern is valid")
});

/// Validates a dump request before any network or disk activity
pub fn validate_request(builder: &CrawlConfigBuilder) -> Result<(), ConfigError> {
    validate_wiki_url(builder.wiki())?;
    validate_entry_points(builder.operator_entry_points())?;
    validate_network_policy(builder.network_policy())?;

    let content = builder.content_selection();
    if content.is_empty() {
        return Err(ConfigError::Validation(
            "Use at least one of --pages or --images".to_string(),
        ));
    }
    if content.current_only && !content.pages {
        return Err(ConfigError::Validation(
            "--curonly requires --pages".to_string(),
        ));
    }

    Ok(())
}

/// Validates that a URL is absolute and uses HTTP or HTTPS
pub fn validate_wiki_url(url: &str) -> Result<(), ConfigError> {
    if url.is_empty() {
        return Err(ConfigError::InvalidUrl(
            "Provide a URL to a wiki".to_string(),
        ));
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::InvalidUrl(format!(
            "URLs must start with http:// or https://, got '{}'",
            url
        )));
    }
    Url::parse(url).map_err(|e| ConfigError::InvalidUrl(format!("'{}': {}", url, e)))?;
    Ok(())
}

fn validate_entry_points(entry_points: &EntryPoints) -> Result<(), ConfigError> {
    for url in [&entry_points.api, &entry_points.browse].into_iter().flatten() {
        validate_wiki_url(url)?;
    }
    Ok(())
}

fn validate_network_policy(policy: &NetworkPolicy) -> Result<(), ConfigError> {
    if !policy.delay_secs.is_finite() || policy.delay_secs < 0.0 {
        return Err(ConfigError::Validation(format!(
            "delay must be a non-negative number of seconds, got {}",
            policy.delay_secs
        )));
    }
    Ok(())
}

/// Parses the `--namespaces` value: `all` or comma-separated integers
pub fn parse_namespaces(value: &str) -> Result<NamespaceSelection, ConfigError> {
    let compact: String = value.chars().filter(|c| *c != ' ').collect();
    if compact.eq_ignore_ascii_case("all") {
        return Ok(NamespaceSelection::All);
    }
    Ok(NamespaceSelection::Only(parse_namespace_ids(value, &compact)?))
}

/// Parses the `--exnamespaces` value; excluding `all` is rejected
pub fn parse_excluded_namespaces(value: &str) -> Result<Vec<i32>, ConfigError> {
    let compact: String = value.chars().filter(|c| *c != ' ').collect();
    if compact.eq_ignore_ascii_case("all") {
        return Err(ConfigError::Validation(
            "You cannot exclude all namespaces".to_string(),
        ));
    }
    parse_namespace_ids(value, &compact)
}

fn parse_namespace_ids(original: &str, compact: &str) -> Result<Vec<i32>, ConfigError> {
    if compact.is_empty()
        || !compact
            .chars()
            .all(|c| c.is_ascii_digit() || c == ',' || c == '-')
    {
        return Err(ConfigError::InvalidNamespaces(original.to_string()));
    }

    compact
        .split(',')
        .map(|id| {
            id.parse::<i32>()
                .map_err(|_| ConfigError::InvalidNamespaces(original.to_string()))
        })
        .collect()
}

/// Returns true for Wikimedia Foundation projects, which publish their own dumps
pub fn is_wikimedia_project(url: &str) -> bool {
    WIKIMEDIA_PROJECT.is_match(url)
}
