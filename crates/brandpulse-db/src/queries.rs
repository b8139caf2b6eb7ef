//! Read queries over the warehouse, used by the `status` and `report`
//! commands and by the dashboard.

use std::collections::BTreeSet;

use brandpulse_core::kpis::{
    METRIC_MEAN_ENGAGEMENT, METRIC_MEAN_SENTIMENT, METRIC_NEGATIVE_COUNT, METRIC_NEUTRAL_COUNT,
    METRIC_POSITIVE_COUNT, METRIC_RECORD_COUNT,
};
use brandpulse_core::{
    Engagement, KpiRow, ProcessedRecord, RawRecord, ScoredRecord, SentimentAggregate,
    SentimentLabel, SourcePlatform, TopicLabel,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::DbError;

/// Filters for [`list_scored_records`]. `None` fields are not applied.
#[derive(Debug, Clone, Default)]
pub struct ScoredFilter {
    /// Inclusive lower bound on `created_at`.
    pub since: Option<DateTime<Utc>>,
    /// Exclusive upper bound on `created_at`.
    pub until: Option<DateTime<Utc>>,
    pub platform: Option<SourcePlatform>,
    /// A configured brand keyword that must appear in `brand_mentions`,
    /// compared case-insensitively.
    pub brand: Option<String>,
    pub label: Option<SentimentLabel>,
    pub limit: Option<i64>,
}

/// Filters for [`list_kpis`]. Bucket bounds are inclusive string comparisons.
#[derive(Debug, Clone, Default)]
pub struct KpiFilter {
    pub from_bucket: Option<String>,
    pub to_bucket: Option<String>,
    pub channel: Option<String>,
    pub metric_name: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ScoredRecordRow {
    source_id: String,
    source_platform: String,
    topic: String,
    author: String,
    created_at: DateTime<Utc>,
    fetched_at: DateTime<Utc>,
    url: Option<String>,
    channel: Option<String>,
    raw_text: String,
    clean_text: String,
    display_text: String,
    brand_mentions: String,
    date_bucket: String,
    likes: Option<i64>,
    replies: Option<i64>,
    engagement_score: f64,
    sentiment_label: String,
    sentiment_score: f64,
    topic_label: String,
    hour: i64,
    day_of_week: i64,
}

fn corrupt(reason: String) -> DbError {
    DbError::CorruptRow {
        table: "scored_records",
        reason,
    }
}

impl TryFrom<ScoredRecordRow> for ScoredRecord {
    type Error = DbError;

    fn try_from(row: ScoredRecordRow) -> Result<Self, Self::Error> {
        let source_platform: SourcePlatform = row.source_platform.parse().map_err(corrupt)?;
        let sentiment_label: SentimentLabel = row.sentiment_label.parse().map_err(corrupt)?;
        let brand_mentions: BTreeSet<String> = serde_json::from_str(&row.brand_mentions)?;
        let topic_label: TopicLabel = row.topic_label.parse().map_err(corrupt)?;
        let hour = u32::try_from(row.hour).map_err(|e| corrupt(format!("hour: {e}")))?;
        let day_of_week =
            u32::try_from(row.day_of_week).map_err(|e| corrupt(format!("day_of_week: {e}")))?;

        Ok(ScoredRecord {
            processed: ProcessedRecord {
                raw: RawRecord {
                    source_id: row.source_id,
                    source_platform,
                    topic: row.topic,
                    text: row.raw_text,
                    author: row.author,
                    created_at: row.created_at,
                    engagement: Engagement {
                        likes: row.likes,
                        replies: row.replies,
                    },
                    url: row.url,
                    channel: row.channel,
                    fetched_at: row.fetched_at,
                },
                clean_text: row.clean_text,
                display_text: row.display_text,
                brand_mentions,
                date_bucket: row.date_bucket,
                engagement_score: row.engagement_score,
                topic_label,
                hour,
                day_of_week,
            },
            sentiment_label,
            sentiment_score: row.sentiment_score,
        })
    }
}

/// List scored records matching `filter`, newest first.
///
/// # Errors
///
/// Returns [`DbError`] on query failure or if a stored row cannot be decoded.
pub async fn list_scored_records(
    pool: &SqlitePool,
    filter: &ScoredFilter,
) -> Result<Vec<ScoredRecord>, DbError> {
    let rows = sqlx::query_as::<_, ScoredRecordRow>(
        "SELECT source_id, source_platform, topic, author, created_at, fetched_at, url, channel, \
                raw_text, clean_text, display_text, brand_mentions, date_bucket, \
                likes, replies, engagement_score, sentiment_label, sentiment_score, \
                topic_label, hour, day_of_week \
         FROM scored_records \
         WHERE (?1 IS NULL OR created_at >= ?1) \
           AND (?2 IS NULL OR created_at < ?2) \
           AND (?3 IS NULL OR source_platform = ?3) \
           AND (?4 IS NULL OR EXISTS ( \
                 SELECT 1 FROM json_each(scored_records.brand_mentions) \
                 WHERE lower(value) = lower(?4))) \
           AND (?5 IS NULL OR sentiment_label = ?5) \
         ORDER BY created_at DESC, source_id \
         LIMIT COALESCE(?6, 9223372036854775807)",
    )
    .bind(filter.since)
    .bind(filter.until)
    .bind(filter.platform.map(SourcePlatform::as_str))
    .bind(filter.brand.as_deref())
    .bind(filter.label.map(SentimentLabel::as_str))
    .bind(filter.limit)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(ScoredRecord::try_from).collect()
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct KpiRowRecord {
    date_bucket: String,
    channel: String,
    metric_name: String,
    metric_value: f64,
    metric_unit: Option<String>,
}

impl From<KpiRowRecord> for KpiRow {
    fn from(row: KpiRowRecord) -> Self {
        KpiRow {
            date_bucket: row.date_bucket,
            channel: row.channel,
            metric_name: row.metric_name,
            metric_value: row.metric_value,
            metric_unit: row.metric_unit,
        }
    }
}

/// List KPI rows matching `filter`, ordered by bucket, channel, metric.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn list_kpis(pool: &SqlitePool, filter: &KpiFilter) -> Result<Vec<KpiRow>, DbError> {
    let rows = sqlx::query_as::<_, KpiRowRecord>(
        "SELECT date_bucket, channel, metric_name, metric_value, metric_unit \
         FROM kpi_aggregates \
         WHERE (?1 IS NULL OR date_bucket >= ?1) \
           AND (?2 IS NULL OR date_bucket <= ?2) \
           AND (?3 IS NULL OR channel = ?3) \
           AND (?4 IS NULL OR metric_name = ?4) \
         ORDER BY date_bucket, channel, metric_name",
    )
    .bind(filter.from_bucket.as_deref())
    .bind(filter.to_bucket.as_deref())
    .bind(filter.channel.as_deref())
    .bind(filter.metric_name.as_deref())
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(KpiRow::from).collect())
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct AggregateRow {
    date_bucket: String,
    channel: String,
    record_count: Option<f64>,
    mean_score: Option<f64>,
    positive_count: Option<f64>,
    negative_count: Option<f64>,
    neutral_count: Option<f64>,
    mean_engagement: Option<f64>,
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn as_count(value: Option<f64>) -> u64 {
    value.unwrap_or(0.0).max(0.0).round() as u64
}

/// Sentiment aggregates pivoted back from the long-form KPI table, sorted by
/// bucket then platform.
///
/// # Errors
///
/// Returns [`DbError`] on query failure or an unrecognised platform channel.
pub async fn sentiment_aggregates(pool: &SqlitePool) -> Result<Vec<SentimentAggregate>, DbError> {
    let rows = sqlx::query_as::<_, AggregateRow>(
        "SELECT date_bucket, channel, \
                MAX(CASE WHEN metric_name = ?1 THEN metric_value END) AS record_count, \
                MAX(CASE WHEN metric_name = ?2 THEN metric_value END) AS mean_score, \
                MAX(CASE WHEN metric_name = ?3 THEN metric_value END) AS positive_count, \
                MAX(CASE WHEN metric_name = ?4 THEN metric_value END) AS negative_count, \
                MAX(CASE WHEN metric_name = ?5 THEN metric_value END) AS neutral_count, \
                MAX(CASE WHEN metric_name = ?6 THEN metric_value END) AS mean_engagement \
         FROM kpi_aggregates \
         WHERE channel IN ('reddit', 'youtube') \
         GROUP BY date_bucket, channel \
         ORDER BY date_bucket, channel",
    )
    .bind(METRIC_RECORD_COUNT)
    .bind(METRIC_MEAN_SENTIMENT)
    .bind(METRIC_POSITIVE_COUNT)
    .bind(METRIC_NEGATIVE_COUNT)
    .bind(METRIC_NEUTRAL_COUNT)
    .bind(METRIC_MEAN_ENGAGEMENT)
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            let source_platform = row.channel.parse().map_err(|reason| DbError::CorruptRow {
                table: "kpi_aggregates",
                reason,
            })?;
            Ok(SentimentAggregate {
                date_bucket: row.date_bucket,
                source_platform,
                count: as_count(row.record_count),
                mean_score: row.mean_score.unwrap_or(0.0),
                positive_count: as_count(row.positive_count),
                negative_count: as_count(row.negative_count),
                neutral_count: as_count(row.neutral_count),
                mean_engagement: row.mean_engagement.unwrap_or(0.0),
            })
        })
        .collect()
}

/// Scored record count for one topic label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TopicCount {
    pub topic_label: TopicLabel,
    pub count: u64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct TopicCountRow {
    topic_label: String,
    count: i64,
}

/// Scored records per topic label, most discussed first.
///
/// # Errors
///
/// Returns [`DbError`] on query failure or an unrecognised stored label.
pub async fn topic_distribution(
    pool: &SqlitePool,
    platform: Option<SourcePlatform>,
) -> Result<Vec<TopicCount>, DbError> {
    let rows = sqlx::query_as::<_, TopicCountRow>(
        "SELECT topic_label, COUNT(*) AS count \
         FROM scored_records \
         WHERE (?1 IS NULL OR source_platform = ?1) \
         GROUP BY topic_label \
         ORDER BY count DESC, topic_label",
    )
    .bind(platform.map(SourcePlatform::as_str))
    .fetch_all(pool)
    .await?;

    rows.into_iter()
        .map(|row| {
            Ok(TopicCount {
                topic_label: row.topic_label.parse().map_err(corrupt)?,
                count: u64::try_from(row.count).unwrap_or(0),
            })
        })
        .collect()
}

/// Number of rows in the raw record store.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn count_raw_records(pool: &SqlitePool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM raw_records")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

/// Number of rows currently in the warehouse's scored table.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure.
pub async fn count_scored_records(pool: &SqlitePool) -> Result<i64, DbError> {
    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM scored_records")
        .fetch_one(pool)
        .await?;
    Ok(count)
}
