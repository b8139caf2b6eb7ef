//! Reddit search client (client-credentials OAuth).
//!
//! Each matching post is followed by up to [`COMMENTS_PER_POST`] of its top
//! comments; posts and comments both count towards the fetch limit.

use std::collections::HashSet;

use brandpulse_core::{RawRecord, RedditCredentials, SourcePlatform};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::OnceCell;

use super::reddit_helpers::{comment_to_record, to_record};
use super::{send_json, ContentSource, HttpSettings};
use crate::error::ExtractError;

/// Reddit listings return at most 100 children per page.
pub const REDDIT_MAX_LIMIT: u32 = 100;

/// Upper bound on pages walked per fetch; guards against cycling cursors.
const MAX_PAGES: usize = 20;

/// Top-level comments collected per post.
const COMMENTS_PER_POST: usize = 5;

const DEFAULT_AUTH_BASE: &str = "https://www.reddit.com";
const DEFAULT_API_BASE: &str = "https://oauth.reddit.com";

/// Reddit OAuth token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Reddit search listing wrapper.
#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    children: Vec<Post>,
    after: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(super) struct Post {
    pub(super) data: PostData,
}

#[derive(Debug, Deserialize)]
pub(super) struct PostData {
    pub(super) id: Option<String>,
    /// Fullname, e.g. `t3_abc123`.
    pub(super) name: Option<String>,
    pub(super) title: Option<String>,
    pub(super) selftext: Option<String>,
    pub(super) author: Option<String>,
    pub(super) created_utc: Option<f64>,
    pub(super) score: Option<i64>,
    pub(super) num_comments: Option<i64>,
    pub(super) subreddit: Option<String>,
    pub(super) permalink: Option<String>,
}

/// One listing of a `/comments/{id}` response; the second holds the comments.
#[derive(Debug, Deserialize)]
struct CommentListing {
    data: CommentListingData,
}

#[derive(Debug, Deserialize)]
struct CommentListingData {
    #[serde(default)]
    children: Vec<CommentThing>,
}

#[derive(Debug, Deserialize)]
struct CommentThing {
    kind: String,
    data: CommentData,
}

#[derive(Debug, Deserialize)]
pub(super) struct CommentData {
    pub(super) id: Option<String>,
    /// Fullname, e.g. `t1_def456`.
    pub(super) name: Option<String>,
    pub(super) body: Option<String>,
    pub(super) author: Option<String>,
    pub(super) created_utc: Option<f64>,
    pub(super) score: Option<i64>,
    pub(super) subreddit: Option<String>,
    pub(super) permalink: Option<String>,
}

/// Reddit API client. The access token is exchanged lazily on first fetch
/// and reused for the life of the client.
pub struct RedditClient {
    client: reqwest::Client,
    credentials: RedditCredentials,
    settings: HttpSettings,
    auth_base: String,
    api_base: String,
    token: OnceCell<String>,
}

impl RedditClient {
    /// # Errors
    ///
    /// Returns [`ExtractError::Http`] if the HTTP client cannot be built.
    pub fn new(credentials: RedditCredentials, settings: HttpSettings) -> Result<Self, ExtractError> {
        Self::with_base_urls(credentials, settings, DEFAULT_AUTH_BASE, DEFAULT_API_BASE)
    }

    /// Point the client at alternate token and API hosts.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Http`] if the HTTP client cannot be built.
    pub fn with_base_urls(
        credentials: RedditCredentials,
        settings: HttpSettings,
        auth_base: &str,
        api_base: &str,
    ) -> Result<Self, ExtractError> {
        let settings = HttpSettings {
            user_agent: credentials.user_agent.clone(),
            ..settings
        };
        Ok(Self {
            client: settings.build_client()?,
            credentials,
            settings,
            auth_base: auth_base.trim_end_matches('/').to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            token: OnceCell::new(),
        })
    }

    async fn token(&self) -> Result<&str, ExtractError> {
        let token = self
            .token
            .get_or_try_init(|| self.fetch_token())
            .await?;
        Ok(token.as_str())
    }

    async fn fetch_token(&self) -> Result<String, ExtractError> {
        let url = format!("{}/api/v1/access_token", self.auth_base);
        let token: TokenResponse = send_json(
            self.settings.retry,
            SourcePlatform::Reddit,
            "Reddit token exchange",
            || {
                self.client
                    .post(&url)
                    .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
                    .form(&[("grant_type", "client_credentials")])
            },
        )
        .await
        .map_err(|e| match e {
            ExtractError::Api {
                status, message, ..
            } => ExtractError::SourceUnavailable {
                platform: SourcePlatform::Reddit,
                reason: format!("token exchange failed with status {status}: {message}"),
            },
            other => other,
        })?;

        tracing::debug!("obtained Reddit access token");
        Ok(token.access_token)
    }

    async fn search_page(
        &self,
        token: &str,
        topic: &str,
        page_limit: u32,
        after: Option<&str>,
    ) -> Result<Listing, ExtractError> {
        let endpoint = format!("{}/search", self.api_base);
        let mut params: Vec<(&str, String)> = vec![
            ("q", topic.to_string()),
            ("sort", "new".to_string()),
            ("type", "link".to_string()),
            ("limit", page_limit.to_string()),
            ("raw_json", "1".to_string()),
        ];
        if let Some(cursor) = after {
            params.push(("after", cursor.to_string()));
        }

        send_json(
            self.settings.retry,
            SourcePlatform::Reddit,
            "Reddit search listing",
            || {
                self.client
                    .get(&endpoint)
                    .bearer_auth(token)
                    .query(&params)
            },
        )
        .await
    }

    /// Top-level comments of post `post_id` (bare id, no `t3_` prefix),
    /// best first.
    ///
    /// Posts that are gone or hidden (HTTP 403/404) yield no comments.
    async fn top_comments(
        &self,
        token: &str,
        post_id: &str,
    ) -> Result<Vec<CommentData>, ExtractError> {
        let endpoint = format!("{}/comments/{post_id}", self.api_base);
        let params: [(&str, String); 4] = [
            ("sort", "top".to_string()),
            ("limit", COMMENTS_PER_POST.to_string()),
            ("depth", "1".to_string()),
            ("raw_json", "1".to_string()),
        ];

        let listings: Vec<CommentListing> = match send_json(
            self.settings.retry,
            SourcePlatform::Reddit,
            "Reddit comment listing",
            || {
                self.client
                    .get(&endpoint)
                    .bearer_auth(token)
                    .query(&params)
            },
        )
        .await
        {
            Ok(listings) => listings,
            Err(ExtractError::Api {
                status: 403 | 404,
                ..
            }) => {
                tracing::debug!(post_id, "comments unavailable, skipping post");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        Ok(listings
            .into_iter()
            .nth(1)
            .map(|listing| listing.data.children)
            .unwrap_or_default()
            .into_iter()
            .filter(|thing| thing.kind == "t1")
            .map(|thing| thing.data)
            .take(COMMENTS_PER_POST)
            .collect())
    }
}

impl ContentSource for RedditClient {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::Reddit
    }

    fn max_limit(&self) -> u32 {
        REDDIT_MAX_LIMIT
    }

    async fn fetch(
        &self,
        topic: &str,
        limit: u32,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawRecord>, ExtractError> {
        let token = self.token().await?;
        let fetched_at = Utc::now();
        let target = limit as usize;

        let mut records = Vec::new();
        let mut seen = HashSet::new();
        let mut after: Option<String> = None;

        'pages: for _ in 0..MAX_PAGES {
            #[allow(clippy::cast_possible_truncation)]
            let remaining = (target - records.len()) as u32;
            let listing = self
                .search_page(token, topic, remaining.min(REDDIT_MAX_LIMIT), after.as_deref())
                .await?;

            let page_len = listing.data.children.len();
            let mut older_than_since = 0usize;

            for post in &listing.data.children {
                let Some(record) = to_record(post, topic, fetched_at) else {
                    continue;
                };
                if since.is_some_and(|s| record.created_at < s) {
                    older_than_since += 1;
                    continue;
                }
                if !seen.insert(record.source_id.clone()) {
                    continue;
                }
                let post_id = record
                    .source_id
                    .strip_prefix("t3_")
                    .unwrap_or(record.source_id.as_str())
                    .to_string();
                records.push(record);
                if records.len() >= target {
                    break 'pages;
                }

                for comment in self.top_comments(token, &post_id).await? {
                    let Some(record) = comment_to_record(&comment, topic, fetched_at) else {
                        continue;
                    };
                    if since.is_some_and(|s| record.created_at < s) {
                        continue;
                    }
                    if seen.insert(record.source_id.clone()) {
                        records.push(record);
                    }
                    if records.len() >= target {
                        break 'pages;
                    }
                }
            }

            // Results are sorted newest first: a page entirely older than
            // `since` means every later page is too.
            if page_len > 0 && older_than_since == page_len {
                break;
            }

            after = listing.data.after;
            if after.is_none() || page_len == 0 {
                break;
            }
        }

        tracing::debug!(
            topic,
            records = records.len(),
            "collected Reddit posts and comments"
        );

        Ok(records)
    }
}
