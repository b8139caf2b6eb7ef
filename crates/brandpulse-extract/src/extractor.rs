//! Source dispatch, fetch-level invariants and bounded topic fan-out.

use std::collections::HashSet;

use brandpulse_core::{PipelineConfig, RawRecord, SourcePlatform};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};

use crate::error::ExtractError;
use crate::sources::{ContentSource, DemoSource, HttpSettings, RedditClient, YouTubeClient};

/// One configured platform.
pub enum Source {
    Reddit(RedditClient),
    YouTube(YouTubeClient),
    Demo(DemoSource),
    /// Platform with no credentials; every fetch fails with
    /// [`ExtractError::SourceUnavailable`].
    Unconfigured {
        platform: SourcePlatform,
        reason: String,
    },
}

impl ContentSource for Source {
    fn platform(&self) -> SourcePlatform {
        match self {
            Source::Reddit(s) => s.platform(),
            Source::YouTube(s) => s.platform(),
            Source::Demo(s) => s.platform(),
            Source::Unconfigured { platform, .. } => *platform,
        }
    }

    fn max_limit(&self) -> u32 {
        match self {
            Source::Reddit(s) => s.max_limit(),
            Source::YouTube(s) => s.max_limit(),
            Source::Demo(s) => s.max_limit(),
            Source::Unconfigured { .. } => u32::MAX,
        }
    }

    async fn fetch(
        &self,
        topic: &str,
        limit: u32,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawRecord>, ExtractError> {
        match self {
            Source::Reddit(s) => s.fetch(topic, limit, since).await,
            Source::YouTube(s) => s.fetch(topic, limit, since).await,
            Source::Demo(s) => s.fetch(topic, limit, since).await,
            Source::Unconfigured { platform, reason } => Err(ExtractError::SourceUnavailable {
                platform: *platform,
                reason: reason.clone(),
            }),
        }
    }
}

/// A `(topic, platform)` pair to fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRequest {
    pub topic: String,
    pub platform: SourcePlatform,
}

/// Outcome of one [`TopicRequest`].
#[derive(Debug)]
pub struct TopicFetch {
    pub request: TopicRequest,
    pub result: Result<Vec<RawRecord>, ExtractError>,
}

pub struct Extractor {
    sources: Vec<Source>,
    concurrency: usize,
}

impl Extractor {
    #[must_use]
    pub fn new(sources: Vec<Source>, concurrency: usize) -> Self {
        Self {
            sources,
            concurrency: concurrency.max(1),
        }
    }

    /// Build the sources the configuration enables.
    ///
    /// In demo mode every platform is a [`DemoSource`]. Otherwise a platform
    /// without credentials becomes [`Source::Unconfigured`].
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Http`] if an HTTP client cannot be built.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ExtractError> {
        if config.demo_mode {
            return Ok(Self::new(
                vec![
                    Source::Demo(DemoSource::new(SourcePlatform::Reddit)),
                    Source::Demo(DemoSource::new(SourcePlatform::YouTube)),
                ],
                config.rate_limit_concurrency,
            ));
        }

        let settings = HttpSettings {
            timeout_secs: config.request_timeout_secs,
            user_agent: format!("brandpulse/{}", env!("CARGO_PKG_VERSION")),
            retry: config.retry_policy(),
        };

        let reddit = match &config.reddit {
            Some(credentials) => {
                Source::Reddit(RedditClient::new(credentials.clone(), settings.clone())?)
            }
            None => Source::Unconfigured {
                platform: SourcePlatform::Reddit,
                reason: "REDDIT_CLIENT_ID / REDDIT_CLIENT_SECRET not set".to_string(),
            },
        };

        let youtube = match &config.youtube_api_key {
            Some(key) => Source::YouTube(YouTubeClient::new(key.clone(), settings)?),
            None => Source::Unconfigured {
                platform: SourcePlatform::YouTube,
                reason: "YOUTUBE_API_KEY not set".to_string(),
            },
        };

        Ok(Self::new(vec![reddit, youtube], config.rate_limit_concurrency))
    }

    /// Fetch up to `limit` records about `topic` from `platform`.
    ///
    /// Records older than `since` are dropped and duplicate `source_id`s are
    /// collapsed (first occurrence wins), whatever the source returns.
    ///
    /// # Errors
    ///
    /// - [`ExtractError::InvalidLimit`] when `limit` is outside `1..=max`.
    /// - [`ExtractError::SourceUnavailable`] when the platform is not
    ///   configured or unreachable.
    pub async fn fetch(
        &self,
        platform: SourcePlatform,
        topic: &str,
        limit: u32,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawRecord>, ExtractError> {
        let source = self
            .sources
            .iter()
            .find(|s| s.platform() == platform)
            .ok_or_else(|| ExtractError::SourceUnavailable {
                platform,
                reason: "no source configured".to_string(),
            })?;

        let max = source.max_limit();
        if limit == 0 || limit > max {
            return Err(ExtractError::InvalidLimit {
                platform,
                limit,
                max,
            });
        }

        let fetched = source.fetch(topic, limit, since).await?;
        let records = enforce_fetch_invariants(fetched, limit, since);

        tracing::info!(
            platform = %platform,
            topic,
            records = records.len(),
            "extracted records"
        );
        Ok(records)
    }

    /// Run every request concurrently, at most `concurrency` at a time.
    ///
    /// Failures are reported per request; completion order is unspecified.
    pub async fn extract_topics(
        &self,
        requests: Vec<TopicRequest>,
        limit: u32,
        since: Option<DateTime<Utc>>,
    ) -> Vec<TopicFetch> {
        stream::iter(requests)
            .map(|request| async move {
                let result = self
                    .fetch(request.platform, &request.topic, limit, since)
                    .await;
                TopicFetch { request, result }
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await
    }
}

fn enforce_fetch_invariants(
    records: Vec<RawRecord>,
    limit: u32,
    since: Option<DateTime<Utc>>,
) -> Vec<RawRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| since.is_none_or(|s| r.created_at >= s))
        .filter(|r| seen.insert(r.source_id.clone()))
        .take(limit as usize)
        .collect()
}
