//! Content source abstractions.

mod demo;
mod reddit;
mod reddit_helpers;
mod youtube;

use std::future::Future;
use std::time::Duration;

use brandpulse_core::{retry_with_backoff, RawRecord, RetryPolicy, SourcePlatform};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::ExtractError;

pub use demo::{DemoSource, DEMO_MAX_LIMIT};
pub use reddit::{RedditClient, REDDIT_MAX_LIMIT};
pub use youtube::{YouTubeClient, YOUTUBE_MAX_LIMIT};

/// Longest error body kept in [`ExtractError::Api`] messages.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// A platform that can be searched for items about a topic.
pub trait ContentSource: Send + Sync {
    fn platform(&self) -> SourcePlatform;

    /// Largest `limit` accepted by [`ContentSource::fetch`].
    fn max_limit(&self) -> u32;

    /// Fetch up to `limit` items about `topic`, newest pages first.
    fn fetch(
        &self,
        topic: &str,
        limit: u32,
        since: Option<DateTime<Utc>>,
    ) -> impl Future<Output = Result<Vec<RawRecord>, ExtractError>> + Send;
}

/// Shared HTTP client settings for the live sources.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl HttpSettings {
    pub(crate) fn build_client(&self) -> Result<reqwest::Client, ExtractError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(&self.user_agent)
            .build()?;
        Ok(client)
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<ApiErrorDetail>,
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    errors: Vec<ApiErrorItem>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorItem {
    reason: Option<String>,
}

/// First `reason` in a Google-style error body
/// (`{"error": {"errors": [{"reason": ...}]}}`, or the bare `errors` list).
pub(crate) fn api_error_reason(body: &str) -> Option<String> {
    let parsed: ApiErrorBody = serde_json::from_str(body).ok()?;
    parsed
        .error
        .map(|e| e.errors)
        .unwrap_or_default()
        .into_iter()
        .chain(parsed.errors)
        .find_map(|item| item.reason)
}

/// Send a request built by `build`, retrying transient failures, and decode the
/// JSON body into `T`.
///
/// The request is rebuilt for every attempt.
pub(crate) async fn send_json<T, B>(
    policy: RetryPolicy,
    platform: SourcePlatform,
    context: &str,
    build: B,
) -> Result<T, ExtractError>
where
    T: DeserializeOwned,
    B: Fn() -> reqwest::RequestBuilder,
{
    retry_with_backoff(policy, context, ExtractError::is_retriable, || {
        let request = build();
        async move {
            let response = request.send().await?;
            let status = response.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .unwrap_or(60);
                return Err(ExtractError::RateLimited {
                    platform,
                    retry_after_secs,
                });
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ExtractError::Api {
                    platform,
                    status: status.as_u16(),
                    reason: api_error_reason(&body),
                    message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
                });
            }

            let body = response.text().await?;
            serde_json::from_str::<T>(&body).map_err(|source| ExtractError::Deserialize {
                context: context.to_string(),
                source,
            })
        }
    })
    .await
    .map_err(|e| e.exhausted(platform))
}
