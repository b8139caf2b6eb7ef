use std::collections::HashMap;
use std::env::VarError;

use super::*;

fn lookup_from_map<'a>(
    map: &'a HashMap<&'a str, &'a str>,
) -> impl Fn(&str) -> Result<String, VarError> + 'a {
    move |key| {
        map.get(key)
            .map(|v| (*v).to_string())
            .ok_or(VarError::NotPresent)
    }
}

fn demo_env<'a>() -> HashMap<&'a str, &'a str> {
    let mut m = HashMap::new();
    m.insert("BRANDPULSE_DEMO_MODE", "true");
    m
}

#[test]
fn demo_mode_needs_no_credentials_and_uses_defaults() {
    let map = demo_env();
    let cfg = build_pipeline_config(lookup_from_map(&map)).unwrap();
    assert!(cfg.demo_mode);
    assert_eq!(cfg.database_url, "sqlite://data/brandpulse.db");
    assert_eq!(cfg.batch_size, 16);
    assert_eq!(cfg.date_granularity, DateGranularity::Week);
    assert_eq!(cfg.retry_count, 3);
    assert_eq!(cfg.retry_backoff_base_ms, 500);
    assert_eq!(cfg.rate_limit_concurrency, 2);
    assert_eq!(cfg.fetch_limit, 50);
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.max_input_chars, 512);
    assert!((cfg.neutral_threshold - 0.6).abs() < f64::EPSILON);
    assert!(cfg.reddit.is_none());
    assert!(cfg.youtube_api_key.is_none());
    assert!(cfg.classifier_url.is_none());
}

#[test]
fn live_mode_without_credentials_is_a_validation_error() {
    let map: HashMap<&str, &str> = HashMap::new();
    let result = build_pipeline_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::Validation(_))),
        "expected Validation error, got: {result:?}"
    );
}

#[test]
fn live_mode_with_youtube_key_succeeds() {
    let mut map = HashMap::new();
    map.insert("YOUTUBE_API_KEY", "yt-key");
    let cfg = build_pipeline_config(lookup_from_map(&map)).unwrap();
    assert!(!cfg.demo_mode);
    assert_eq!(cfg.youtube_api_key.as_deref(), Some("yt-key"));
}

#[test]
fn reddit_id_without_secret_is_missing_env_var() {
    let mut map = HashMap::new();
    map.insert("REDDIT_CLIENT_ID", "id");
    let result = build_pipeline_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::MissingEnvVar(ref v)) if v == "REDDIT_CLIENT_SECRET"),
        "expected MissingEnvVar(REDDIT_CLIENT_SECRET), got: {result:?}"
    );
}

#[test]
fn reddit_credentials_default_user_agent() {
    let mut map = HashMap::new();
    map.insert("REDDIT_CLIENT_ID", "id");
    map.insert("REDDIT_CLIENT_SECRET", "secret");
    let cfg = build_pipeline_config(lookup_from_map(&map)).unwrap();
    let reddit = cfg.reddit.unwrap();
    assert_eq!(reddit.user_agent, "brandpulse/0.1 (marketing-analytics)");
}

#[test]
fn zero_batch_size_is_invalid() {
    let mut map = demo_env();
    map.insert("BRANDPULSE_BATCH_SIZE", "0");
    let result = build_pipeline_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "BRANDPULSE_BATCH_SIZE"),
        "expected InvalidEnvVar(BRANDPULSE_BATCH_SIZE), got: {result:?}"
    );
}

#[test]
fn non_numeric_retry_count_is_invalid() {
    let mut map = demo_env();
    map.insert("BRANDPULSE_RETRY_COUNT", "lots");
    let result = build_pipeline_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "BRANDPULSE_RETRY_COUNT"),
        "expected InvalidEnvVar(BRANDPULSE_RETRY_COUNT), got: {result:?}"
    );
}

#[test]
fn granularity_override() {
    let mut map = demo_env();
    map.insert("BRANDPULSE_DATE_GRANULARITY", "month");
    let cfg = build_pipeline_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.date_granularity, DateGranularity::Month);
}

#[test]
fn unknown_granularity_is_invalid() {
    let mut map = demo_env();
    map.insert("BRANDPULSE_DATE_GRANULARITY", "quarter");
    let result = build_pipeline_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "BRANDPULSE_DATE_GRANULARITY")
    );
}

#[test]
fn neutral_threshold_out_of_range_is_invalid() {
    let mut map = demo_env();
    map.insert("BRANDPULSE_NEUTRAL_THRESHOLD", "1.5");
    let result = build_pipeline_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "BRANDPULSE_NEUTRAL_THRESHOLD")
    );
}

#[test]
fn brand_keywords_are_split_and_trimmed() {
    let mut map = demo_env();
    map.insert("BRANDPULSE_BRAND_KEYWORDS", " ROG , , Call of Duty ");
    let cfg = build_pipeline_config(lookup_from_map(&map)).unwrap();
    assert_eq!(cfg.extra_brand_keywords, vec!["ROG", "Call of Duty"]);
}

#[test]
fn invalid_demo_flag_is_rejected() {
    let mut map = HashMap::new();
    map.insert("BRANDPULSE_DEMO_MODE", "maybe");
    let result = build_pipeline_config(lookup_from_map(&map));
    assert!(
        matches!(result, Err(ConfigError::InvalidEnvVar { ref var, .. }) if var == "BRANDPULSE_DEMO_MODE")
    );
}

#[test]
fn debug_output_redacts_secrets() {
    let mut map = HashMap::new();
    map.insert("YOUTUBE_API_KEY", "super-secret-key");
    map.insert("BRANDPULSE_CLASSIFIER_TOKEN", "hf_token_value");
    let cfg = build_pipeline_config(lookup_from_map(&map)).unwrap();
    let debug = format!("{cfg:?}");
    assert!(!debug.contains("super-secret-key"));
    assert!(!debug.contains("hf_token_value"));
    assert!(debug.contains("[redacted]"));
}
