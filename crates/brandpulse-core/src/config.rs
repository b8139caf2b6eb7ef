use std::path::PathBuf;

use crate::app_config::{PipelineConfig, RedditCredentials};
use crate::records::DateGranularity;
use crate::ConfigError;

/// Load pipeline configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid, or if live mode is selected
/// without any content-source credentials.
pub fn load_pipeline_config() -> Result<PipelineConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_pipeline_config_from_env()
}

/// Load pipeline configuration from environment variables already in the process.
///
/// Unlike [`load_pipeline_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid or validation fails.
pub fn load_pipeline_config_from_env() -> Result<PipelineConfig, ConfigError> {
    build_pipeline_config(|key| std::env::var(key))
}

/// Build pipeline configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid or validation fails.
pub fn build_pipeline_config<F>(lookup: F) -> Result<PipelineConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .trim()
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .trim()
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be at least 1".to_string()));
        }
        Ok(value)
    };

    let database_url = or_default("BRANDPULSE_DATABASE_URL", "sqlite://data/brandpulse.db");
    let demo_mode = parse_bool(&or_default("BRANDPULSE_DEMO_MODE", "false"))
        .map_err(|reason| invalid("BRANDPULSE_DEMO_MODE", reason))?;
    let batch_size = parse_positive_usize("BRANDPULSE_BATCH_SIZE", "16")?;
    let date_granularity = or_default("BRANDPULSE_DATE_GRANULARITY", "week")
        .parse::<DateGranularity>()
        .map_err(|reason| invalid("BRANDPULSE_DATE_GRANULARITY", reason))?;
    let brands_path = PathBuf::from(or_default("BRANDPULSE_BRANDS_PATH", "./config/brands.yaml"));
    let extra_brand_keywords = optional("BRANDPULSE_BRAND_KEYWORDS")
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ToString::to_string)
                .collect()
        })
        .unwrap_or_default();

    let retry_count = parse_u32("BRANDPULSE_RETRY_COUNT", "3")?;
    let retry_backoff_base_ms = parse_u64("BRANDPULSE_RETRY_BACKOFF_BASE_MS", "500")?;
    let rate_limit_concurrency = parse_positive_usize("BRANDPULSE_RATE_LIMIT_CONCURRENCY", "2")?;
    let fetch_limit = parse_u32("BRANDPULSE_FETCH_LIMIT", "50")?;
    if fetch_limit == 0 {
        return Err(invalid("BRANDPULSE_FETCH_LIMIT", "must be at least 1".to_string()));
    }
    let request_timeout_secs = parse_u64("BRANDPULSE_REQUEST_TIMEOUT_SECS", "30")?;

    let classifier_url = optional("BRANDPULSE_CLASSIFIER_URL");
    let classifier_token = optional("BRANDPULSE_CLASSIFIER_TOKEN");
    let max_input_chars = parse_positive_usize("BRANDPULSE_MAX_INPUT_CHARS", "512")?;
    let neutral_threshold = or_default("BRANDPULSE_NEUTRAL_THRESHOLD", "0.6")
        .trim()
        .parse::<f64>()
        .map_err(|e| invalid("BRANDPULSE_NEUTRAL_THRESHOLD", e.to_string()))?;
    if !(0.0..=1.0).contains(&neutral_threshold) {
        return Err(invalid(
            "BRANDPULSE_NEUTRAL_THRESHOLD",
            format!("{neutral_threshold} is outside [0, 1]"),
        ));
    }

    let log_level = or_default("BRANDPULSE_LOG_LEVEL", "info");

    let reddit = match (
        optional("REDDIT_CLIENT_ID"),
        optional("REDDIT_CLIENT_SECRET"),
    ) {
        (Some(client_id), Some(client_secret)) => Some(RedditCredentials {
            client_id,
            client_secret,
            user_agent: or_default("REDDIT_USER_AGENT", "brandpulse/0.1 (marketing-analytics)"),
        }),
        (Some(_), None) => return Err(ConfigError::MissingEnvVar("REDDIT_CLIENT_SECRET".into())),
        (None, Some(_)) => return Err(ConfigError::MissingEnvVar("REDDIT_CLIENT_ID".into())),
        (None, None) => None,
    };
    let youtube_api_key = optional("YOUTUBE_API_KEY");

    if !demo_mode && reddit.is_none() && youtube_api_key.is_none() {
        return Err(ConfigError::Validation(
            "no content-source credentials configured (set REDDIT_CLIENT_ID/REDDIT_CLIENT_SECRET \
             or YOUTUBE_API_KEY, or enable BRANDPULSE_DEMO_MODE)"
                .to_string(),
        ));
    }

    Ok(PipelineConfig {
        database_url,
        demo_mode,
        batch_size,
        date_granularity,
        brands_path,
        extra_brand_keywords,
        retry_count,
        retry_backoff_base_ms,
        rate_limit_concurrency,
        fetch_limit,
        request_timeout_secs,
        classifier_url,
        classifier_token,
        max_input_chars,
        neutral_threshold,
        log_level,
        reddit,
        youtube_api_key,
    })
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(format!("expected a boolean, got '{other}'")),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
