//! Reddit listing conversion helpers.

use brandpulse_core::{Engagement, RawRecord, SourcePlatform};
use chrono::{DateTime, Utc};

use super::reddit::{CommentData, Post};

/// Longest self-text kept per post.
const MAX_SELFTEXT_CHARS: usize = 2_000;

fn is_removed(body: &str) -> bool {
    body == "[deleted]" || body == "[removed]"
}

/// Title plus self-text, skipping deleted and removed bodies.
pub(super) fn post_text(title: Option<&str>, selftext: Option<&str>) -> String {
    let title = title.map(str::trim).unwrap_or_default();
    match selftext.map(str::trim) {
        Some(body) if !body.is_empty() && !is_removed(body) => {
            let snippet: String = body.chars().take(MAX_SELFTEXT_CHARS).collect();
            if title.is_empty() {
                snippet
            } else {
                format!("{title}\n\n{snippet}")
            }
        }
        _ => title.to_string(),
    }
}

/// Convert a listing child into a [`RawRecord`].
///
/// Returns `None` when the post has no id or an unrepresentable timestamp.
pub(super) fn to_record(post: &Post, topic: &str, fetched_at: DateTime<Utc>) -> Option<RawRecord> {
    let data = &post.data;
    let source_id = data
        .name
        .clone()
        .or_else(|| data.id.as_ref().map(|id| format!("t3_{id}")))?;

    #[allow(clippy::cast_possible_truncation)]
    let created_at = DateTime::from_timestamp(data.created_utc? as i64, 0)?;

    Some(RawRecord {
        source_id,
        source_platform: SourcePlatform::Reddit,
        topic: topic.to_string(),
        text: post_text(data.title.as_deref(), data.selftext.as_deref()),
        author: data
            .author
            .clone()
            .unwrap_or_else(|| "[deleted]".to_string()),
        created_at,
        engagement: Engagement {
            likes: data.score,
            replies: data.num_comments,
        },
        url: data
            .permalink
            .as_ref()
            .map(|p| format!("https://reddit.com{p}")),
        channel: data.subreddit.clone(),
        fetched_at,
    })
}

/// Convert a top-level comment into a [`RawRecord`] keyed `t1_<id>`.
///
/// Returns `None` for comments without an id or timestamp, and for empty,
/// deleted or removed bodies.
pub(super) fn comment_to_record(
    comment: &CommentData,
    topic: &str,
    fetched_at: DateTime<Utc>,
) -> Option<RawRecord> {
    let source_id = comment
        .name
        .clone()
        .or_else(|| comment.id.as_ref().map(|id| format!("t1_{id}")))?;

    let body = comment.body.as_deref().map(str::trim)?;
    if body.is_empty() || is_removed(body) {
        return None;
    }

    #[allow(clippy::cast_possible_truncation)]
    let created_at = DateTime::from_timestamp(comment.created_utc? as i64, 0)?;

    Some(RawRecord {
        source_id,
        source_platform: SourcePlatform::Reddit,
        topic: topic.to_string(),
        text: body.chars().take(MAX_SELFTEXT_CHARS).collect(),
        author: comment
            .author
            .clone()
            .unwrap_or_else(|| "[deleted]".to_string()),
        created_at,
        engagement: Engagement {
            likes: comment.score,
            replies: None,
        },
        url: comment
            .permalink
            .as_ref()
            .map(|p| format!("https://reddit.com{p}")),
        channel: comment.subreddit.clone(),
        fetched_at,
    })
}
