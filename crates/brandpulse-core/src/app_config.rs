use std::path::PathBuf;

use crate::records::DateGranularity;

/// Reddit client-credentials triple.
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

/// Every setting the pipeline stages consume. Built once by the driver and
/// passed by reference into each stage.
#[derive(Clone)]
pub struct PipelineConfig {
    pub database_url: String,
    pub demo_mode: bool,
    pub batch_size: usize,
    pub date_granularity: DateGranularity,
    pub brands_path: PathBuf,
    /// Extra keywords appended to those from the brands file.
    pub extra_brand_keywords: Vec<String>,
    pub retry_count: u32,
    pub retry_backoff_base_ms: u64,
    pub rate_limit_concurrency: usize,
    pub fetch_limit: u32,
    pub request_timeout_secs: u64,
    pub classifier_url: Option<String>,
    pub classifier_token: Option<String>,
    pub max_input_chars: usize,
    pub neutral_threshold: f64,
    pub log_level: String,
    pub reddit: Option<RedditCredentials>,
    pub youtube_api_key: Option<String>,
}

impl std::fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("database_url", &self.database_url)
            .field("demo_mode", &self.demo_mode)
            .field("batch_size", &self.batch_size)
            .field("date_granularity", &self.date_granularity)
            .field("brands_path", &self.brands_path)
            .field("extra_brand_keywords", &self.extra_brand_keywords)
            .field("retry_count", &self.retry_count)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("rate_limit_concurrency", &self.rate_limit_concurrency)
            .field("fetch_limit", &self.fetch_limit)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("classifier_url", &self.classifier_url)
            .field(
                "classifier_token",
                &self.classifier_token.as_ref().map(|_| "[redacted]"),
            )
            .field("max_input_chars", &self.max_input_chars)
            .field("neutral_threshold", &self.neutral_threshold)
            .field("log_level", &self.log_level)
            .field("reddit", &self.reddit)
            .field(
                "youtube_api_key",
                &self.youtube_api_key.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

impl PipelineConfig {
    /// Retry settings shared by every external call.
    #[must_use]
    pub fn retry_policy(&self) -> crate::retry::RetryPolicy {
        crate::retry::RetryPolicy {
            max_retries: self.retry_count,
            backoff_base_ms: self.retry_backoff_base_ms,
        }
    }
}
