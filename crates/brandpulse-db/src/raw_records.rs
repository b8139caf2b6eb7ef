//! Append-only raw record store.

use brandpulse_core::{Engagement, RawRecord};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::DbError;

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct RawRecordRow {
    pub source_id: String,
    pub source_platform: String,
    pub topic: String,
    pub text: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub likes: Option<i64>,
    pub replies: Option<i64>,
    pub url: Option<String>,
    pub channel: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

impl TryFrom<RawRecordRow> for RawRecord {
    type Error = DbError;

    fn try_from(row: RawRecordRow) -> Result<Self, Self::Error> {
        let source_platform = row
            .source_platform
            .parse()
            .map_err(|reason| DbError::CorruptRow {
                table: "raw_records",
                reason,
            })?;
        Ok(RawRecord {
            source_id: row.source_id,
            source_platform,
            topic: row.topic,
            text: row.text,
            author: row.author,
            created_at: row.created_at,
            engagement: Engagement {
                likes: row.likes,
                replies: row.replies,
            },
            url: row.url,
            channel: row.channel,
            fetched_at: row.fetched_at,
        })
    }
}

/// Append records to the raw store inside one transaction.
///
/// A `source_id` that is already stored keeps its first-written row.
/// Returns the number of newly inserted rows.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if any insert fails; nothing is written then.
pub async fn append_raw_records(pool: &SqlitePool, records: &[RawRecord]) -> Result<u64, DbError> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut tx = pool.begin().await?;
    let mut inserted = 0u64;
    for record in records {
        let result = sqlx::query(
            "INSERT INTO raw_records \
                 (source_id, source_platform, topic, text, author, created_at, \
                  likes, replies, url, channel, fetched_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11) \
             ON CONFLICT (source_id) DO NOTHING",
        )
        .bind(&record.source_id)
        .bind(record.source_platform.as_str())
        .bind(&record.topic)
        .bind(&record.text)
        .bind(&record.author)
        .bind(record.created_at)
        .bind(record.engagement.likes)
        .bind(record.engagement.replies)
        .bind(record.url.as_deref())
        .bind(record.channel.as_deref())
        .bind(record.fetched_at)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }
    tx.commit().await?;

    tracing::debug!(
        offered = records.len(),
        inserted,
        "appended raw records"
    );
    Ok(inserted)
}

/// List stored raw records ordered by creation time, optionally restricted
/// to one topic.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] on query failure or [`DbError::CorruptRow`] if a
/// stored platform value is unrecognised.
pub async fn list_raw_records(
    pool: &SqlitePool,
    topic: Option<&str>,
) -> Result<Vec<RawRecord>, DbError> {
    let rows = sqlx::query_as::<_, RawRecordRow>(
        "SELECT source_id, source_platform, topic, text, author, created_at, \
                likes, replies, url, channel, fetched_at \
         FROM raw_records \
         WHERE (?1 IS NULL OR topic = ?1) \
         ORDER BY created_at, source_id",
    )
    .bind(topic)
    .fetch_all(pool)
    .await?;

    rows.into_iter().map(RawRecord::try_from).collect()
}
