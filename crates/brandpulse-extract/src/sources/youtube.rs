//! `YouTube` Data API v3 comment collector.
//!
//! Searches for videos matching a topic, then walks each video's comment
//! threads until the requested number of comments is collected.

use std::collections::HashSet;

use brandpulse_core::{Engagement, RawRecord, SourcePlatform};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;

use super::{send_json, ContentSource, HttpSettings};
use crate::error::ExtractError;

/// `commentThreads.list` returns at most 100 items per page.
pub const YOUTUBE_MAX_LIMIT: u32 = 100;

/// Videos searched per topic.
const VIDEOS_PER_TOPIC: u32 = 5;

/// Upper bound on comment pages walked per video.
const MAX_PAGES_PER_VIDEO: usize = 10;

const DEFAULT_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// 403 reason for videos whose comments are turned off.
const COMMENTS_DISABLED: &str = "commentsDisabled";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    id: SearchItemId,
    snippet: Option<VideoSnippet>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItemId {
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    channel_title: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadsResponse {
    #[serde(default)]
    items: Vec<CommentThread>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CommentThread {
    id: String,
    snippet: CommentThreadSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentThreadSnippet {
    top_level_comment: TopLevelComment,
    total_reply_count: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct TopLevelComment {
    snippet: CommentSnippet,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CommentSnippet {
    #[serde(default)]
    text_display: String,
    author_display_name: Option<String>,
    like_count: Option<i64>,
    published_at: DateTime<Utc>,
}

struct Video {
    id: String,
    channel: Option<String>,
}

pub struct YouTubeClient {
    client: reqwest::Client,
    api_key: String,
    settings: HttpSettings,
    api_base: String,
}

impl YouTubeClient {
    /// # Errors
    ///
    /// Returns [`ExtractError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: String, settings: HttpSettings) -> Result<Self, ExtractError> {
        Self::with_base_url(api_key, settings, DEFAULT_API_BASE)
    }

    /// # Errors
    ///
    /// Returns [`ExtractError::Http`] if the HTTP client cannot be built.
    pub fn with_base_url(
        api_key: String,
        settings: HttpSettings,
        api_base: &str,
    ) -> Result<Self, ExtractError> {
        Ok(Self {
            client: settings.build_client()?,
            api_key,
            settings,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    async fn search_videos(
        &self,
        topic: &str,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<Video>, ExtractError> {
        let endpoint = format!("{}/search", self.api_base);
        let mut params: Vec<(&str, String)> = vec![
            ("part", "snippet".to_string()),
            ("q", topic.to_string()),
            ("type", "video".to_string()),
            ("order", "relevance".to_string()),
            ("maxResults", VIDEOS_PER_TOPIC.to_string()),
            ("relevanceLanguage", "en".to_string()),
            ("key", self.api_key.clone()),
        ];
        if let Some(since) = since {
            params.push((
                "publishedAfter",
                since.to_rfc3339_opts(SecondsFormat::Secs, true),
            ));
        }

        let response: SearchResponse = send_json(
            self.settings.retry,
            SourcePlatform::YouTube,
            "YouTube video search",
            || self.client.get(&endpoint).query(&params),
        )
        .await?;

        Ok(response
            .items
            .into_iter()
            .filter_map(|item| {
                Some(Video {
                    id: item.id.video_id?,
                    channel: item.snippet.and_then(|s| s.channel_title),
                })
            })
            .collect())
    }

    async fn comment_page(
        &self,
        video_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<CommentThreadsResponse, ExtractError> {
        let endpoint = format!("{}/commentThreads", self.api_base);
        let mut params: Vec<(&str, String)> = vec![
            ("part", "snippet".to_string()),
            ("videoId", video_id.to_string()),
            ("maxResults", page_size.to_string()),
            ("textFormat", "plainText".to_string()),
            ("order", "relevance".to_string()),
            ("key", self.api_key.clone()),
        ];
        if let Some(token) = page_token {
            params.push(("pageToken", token.to_string()));
        }

        send_json(
            self.settings.retry,
            SourcePlatform::YouTube,
            "YouTube comment threads",
            || self.client.get(&endpoint).query(&params),
        )
        .await
    }
}

fn to_record(
    thread: CommentThread,
    video: &Video,
    topic: &str,
    fetched_at: DateTime<Utc>,
) -> RawRecord {
    let comment = thread.snippet.top_level_comment.snippet;
    RawRecord {
        url: Some(format!(
            "https://www.youtube.com/watch?v={}&lc={}",
            video.id, thread.id
        )),
        source_id: thread.id,
        source_platform: SourcePlatform::YouTube,
        topic: topic.to_string(),
        text: comment.text_display,
        author: comment
            .author_display_name
            .unwrap_or_else(|| "[unknown]".to_string()),
        created_at: comment.published_at,
        engagement: Engagement {
            likes: comment.like_count,
            replies: thread.snippet.total_reply_count,
        },
        channel: video.channel.clone(),
        fetched_at,
    }
}

impl ContentSource for YouTubeClient {
    fn platform(&self) -> SourcePlatform {
        SourcePlatform::YouTube
    }

    fn max_limit(&self) -> u32 {
        YOUTUBE_MAX_LIMIT
    }

    async fn fetch(
        &self,
        topic: &str,
        limit: u32,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawRecord>, ExtractError> {
        let target = limit as usize;
        let fetched_at = Utc::now();
        let videos = self.search_videos(topic, since).await?;

        let mut records = Vec::new();
        let mut seen = HashSet::new();

        'videos: for video in &videos {
            let mut page_token: Option<String> = None;

            for _ in 0..MAX_PAGES_PER_VIDEO {
                #[allow(clippy::cast_possible_truncation)]
                let remaining = (target - records.len()) as u32;
                let page = match self
                    .comment_page(&video.id, remaining.min(YOUTUBE_MAX_LIMIT), page_token.as_deref())
                    .await
                {
                    Ok(page) => page,
                    Err(ExtractError::Api {
                        status: 403,
                        reason: Some(reason),
                        ..
                    }) if reason == COMMENTS_DISABLED => {
                        tracing::debug!(video_id = %video.id, "comments disabled, skipping video");
                        break;
                    }
                    // Quota and permission failures hit every later call too.
                    Err(ExtractError::Api {
                        status: 403,
                        reason,
                        message,
                        ..
                    }) => {
                        return Err(ExtractError::SourceUnavailable {
                            platform: SourcePlatform::YouTube,
                            reason: format!(
                                "comment threads forbidden ({}): {message}",
                                reason.as_deref().unwrap_or("no reason given")
                            ),
                        });
                    }
                    Err(e) => return Err(e),
                };

                for thread in page.items {
                    let record = to_record(thread, video, topic, fetched_at);
                    if since.is_some_and(|s| record.created_at < s) {
                        continue;
                    }
                    if seen.insert(record.source_id.clone()) {
                        records.push(record);
                    }
                    if records.len() >= target {
                        break 'videos;
                    }
                }

                page_token = page.next_page_token;
                if page_token.is_none() {
                    break;
                }
            }
        }

        tracing::debug!(
            topic,
            videos = videos.len(),
            records = records.len(),
            "collected YouTube comments"
        );

        Ok(records)
    }
}
