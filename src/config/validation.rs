use crate::config::types::{
    Config, CrawlerConfig, OutputConfig, RendererKind, SelectorConfig, SiteConfig,
};
use crate::output::OutputFormat;
use crate::schedule::IndexUrlTemplate;
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;

/// Upper bound on `years-back`; keeps the day range within chrono's calendar
const MAX_YEARS_BACK: u32 = 100;

/// Upper bound on `worker-count`
const MAX_WORKERS: u32 = 32;

/// Upper bound on `delay-seconds`
const MAX_DELAY_SECONDS: f64 = 3600.0;

/// Upper bound on `retry-base-delay-ms`
const MAX_RETRY_BASE_DELAY_MS: u64 = 60_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_site_config(&config.site)?;
    validate_selector_config(&config.selectors)?;
    validate_output_config(&config.output)?;

    if config.user_agent.value.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent value cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.years_back > MAX_YEARS_BACK {
        return Err(ConfigError::Validation(format!(
            "years-back must be at most {}, got {}",
            MAX_YEARS_BACK, config.years_back
        )));
    }

    if config.worker_count < 1 || config.worker_count > MAX_WORKERS {
        return Err(ConfigError::Validation(format!(
            "worker-count must be between 1 and {}, got {}",
            MAX_WORKERS, config.worker_count
        )));
    }

    if !(0.0..=MAX_DELAY_SECONDS).contains(&config.delay_seconds) {
        return Err(ConfigError::Validation(format!(
            "delay-seconds must be between 0 and {}, got {}",
            MAX_DELAY_SECONDS, config.delay_seconds
        )));
    }

    if config.retry_base_delay_ms == 0 || config.retry_base_delay_ms > MAX_RETRY_BASE_DELAY_MS {
        return Err(ConfigError::Validation(format!(
            "retry-base-delay-ms must be between 1 and {}, got {}",
            MAX_RETRY_BASE_DELAY_MS, config.retry_base_delay_ms
        )));
    }

    if config.request_timeout_secs < 1 {
        return Err(ConfigError::Validation(
            "request-timeout-secs must be >= 1".to_string(),
        ));
    }

    if config.renderer == RendererKind::Chrome && !cfg!(feature = "browser") {
        return Err(ConfigError::Validation(
            "renderer \"chrome\" requires a build with the `browser` feature".to_string(),
        ));
    }

    Ok(())
}

/// Validates site layout: base URL, index template, link patterns
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    // Builds the template once, which checks both the base URL and the path
    IndexUrlTemplate::new(&config.base_url, &config.index_path)?;

    if config.article_patterns.is_empty() {
        return Err(ConfigError::Validation(
            "article-patterns must contain at least one pattern".to_string(),
        ));
    }

    for pattern in &config.article_patterns {
        Regex::new(pattern)
            .map_err(|e| ConfigError::InvalidPattern(format!("'{}': {}", pattern, e)))?;
    }

    validate_selector("ready-selector", &config.ready_selector)?;

    Ok(())
}

/// Validates every configured extraction selector
fn validate_selector_config(config: &SelectorConfig) -> Result<(), ConfigError> {
    let groups = [
        ("title", &config.title),
        ("content", &config.content),
        ("author", &config.author),
        ("date", &config.date),
        ("category", &config.category),
        ("tags", &config.tags),
    ];

    for (field, selectors) in groups {
        for selector in selectors {
            validate_selector(field, selector)?;
        }
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if config.file_prefix.is_empty() {
        return Err(ConfigError::Validation(
            "file-prefix cannot be empty".to_string(),
        ));
    }

    for format in &config.formats {
        if OutputFormat::parse(format).is_none() {
            return Err(ConfigError::Validation(format!(
                "Unknown output format '{}', expected one of json, jsonl, csv, xlsx, sqlite",
                format
            )));
        }
    }

    if let Some(path) = &config.summary_path {
        if path.is_empty() {
            return Err(ConfigError::Validation(
                "summary-path cannot be empty when set".to_string(),
            ));
        }
    }

    Ok(())
}

fn validate_selector(field: &str, selector: &str) -> Result<(), ConfigError> {
    Selector::parse(selector)
        .map(|_| ())
        .map_err(|e| ConfigError::InvalidSelector(format!("{} '{}': {:?}", field, selector, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn test_validate_crawler_ranges() {
        let mut config = Config::default();
        config.crawler.years_back = 101;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        let mut config = Config::default();
        config.crawler.worker_count = 0;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.crawler.delay_seconds = -0.1;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.crawler.delay_seconds = f64::NAN;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.crawler.years_back = 0;
        config.crawler.delay_seconds = 0.0;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_rejects_huge_delay() {
        for delay in [1e300, f64::INFINITY, MAX_DELAY_SECONDS + 1.0] {
            let mut config = Config::default();
            config.crawler.delay_seconds = delay;
            assert!(
                matches!(validate(&config), Err(ConfigError::Validation(_))),
                "delay {} accepted",
                delay
            );
        }

        let mut config = Config::default();
        config.crawler.delay_seconds = MAX_DELAY_SECONDS;
        assert!(validate(&config).is_ok());
    }

    #[test]
    fn test_validate_retry_base_delay() {
        let mut config = Config::default();
        config.crawler.retry_base_delay_ms = 0;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));

        let mut config = Config::default();
        config.crawler.retry_base_delay_ms = MAX_RETRY_BASE_DELAY_MS + 1;
        assert!(validate(&config).is_err());

        let mut config = Config::default();
        config.crawler.retry_base_delay_ms = 1;
        assert!(validate(&config).is_ok());
    }

    #[cfg(not(feature = "browser"))]
    #[test]
    fn test_chrome_renderer_needs_browser_feature() {
        let mut config = Config::default();
        config.crawler.renderer = RendererKind::Chrome;
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_site() {
        let mut config = Config::default();
        config.site.base_url = "ftp://example.com".to_string();
        assert!(matches!(validate(&config), Err(ConfigError::InvalidUrl(_))));

        let mut config = Config::default();
        config.site.index_path = "{year}/{week}/".to_string();
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidTemplate(_))
        ));

        let mut config = Config::default();
        config.site.article_patterns = vec!["(unclosed".to_string()];
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidPattern(_))
        ));
    }

    #[test]
    fn test_validate_selectors() {
        let mut config = Config::default();
        config.selectors.author.push("div[[".to_string());
        assert!(matches!(
            validate(&config),
            Err(ConfigError::InvalidSelector(_))
        ));
    }

    #[test]
    fn test_validate_output_formats() {
        let mut config = Config::default();
        config.output.formats = vec!["pdf".to_string()];
        assert!(matches!(validate(&config), Err(ConfigError::Validation(_))));
    }
}
