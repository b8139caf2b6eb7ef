//! Warehouse loader: atomic replace of `scored_records` and `kpi_aggregates`.

use std::collections::HashMap;

use brandpulse_core::{sentiment_kpi_rows, KpiRow, ScoredRecord};
use serde::Serialize;
use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::DbError;

/// Outcome of one warehouse load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub rows_written: u64,
    pub kpi_rows_written: u64,
    /// Scored inputs that shared a `source_id` with another input.
    pub duplicates_collapsed: u64,
}

/// Collapse inputs by `source_id`. The newest `fetched_at` wins; on a tie the
/// earlier input wins. First-occurrence order is kept.
fn collapse_by_source_id(scored: &[ScoredRecord]) -> Vec<&ScoredRecord> {
    let mut positions: HashMap<&str, usize> = HashMap::with_capacity(scored.len());
    let mut kept: Vec<&ScoredRecord> = Vec::with_capacity(scored.len());

    for record in scored {
        match positions.get(record.source_id()) {
            Some(&idx) => {
                if record.raw().fetched_at > kept[idx].raw().fetched_at {
                    kept[idx] = record;
                }
            }
            None => {
                positions.insert(record.source_id(), kept.len());
                kept.push(record);
            }
        }
    }
    kept
}

/// Replace the warehouse contents with `scored` and its recomputed sentiment
/// aggregates, plus any `extra_kpis` (demo marketing KPIs).
///
/// Everything happens in one transaction: readers see either the previous
/// complete state or the new one.
///
/// # Errors
///
/// Returns [`DbError`] if any statement fails; the transaction is rolled back
/// and the previous warehouse state is untouched.
pub async fn load(
    pool: &SqlitePool,
    scored: &[ScoredRecord],
    extra_kpis: &[KpiRow],
) -> Result<LoadSummary, DbError> {
    let collapsed = collapse_by_source_id(scored);
    let duplicates_collapsed = (scored.len() - collapsed.len()) as u64;

    let owned: Vec<ScoredRecord> = collapsed.into_iter().cloned().collect();
    let mut kpis = sentiment_kpi_rows(&owned);
    kpis.extend_from_slice(extra_kpis);

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM scored_records")
        .execute(&mut *tx)
        .await?;
    sqlx::query("DELETE FROM kpi_aggregates")
        .execute(&mut *tx)
        .await?;

    let mut rows_written = 0u64;
    for record in &owned {
        rows_written += upsert_scored(&mut tx, record).await?;
    }

    let mut kpi_rows_written = 0u64;
    for kpi in &kpis {
        kpi_rows_written += upsert_kpi(&mut tx, kpi).await?;
    }

    // Dropping `tx` without commit rolls back on any `?` above.
    tx.commit().await?;

    let summary = LoadSummary {
        rows_written,
        kpi_rows_written,
        duplicates_collapsed,
    };
    tracing::info!(
        rows_written,
        kpi_rows_written,
        duplicates_collapsed,
        "warehouse load committed"
    );
    Ok(summary)
}

async fn upsert_scored(
    tx: &mut Transaction<'_, Sqlite>,
    record: &ScoredRecord,
) -> Result<u64, DbError> {
    let processed = &record.processed;
    let raw = &processed.raw;
    let mentions = serde_json::to_string(&processed.brand_mentions)?;

    let result = sqlx::query(
        "INSERT INTO scored_records \
             (source_id, source_platform, topic, author, created_at, fetched_at, url, channel, \
              raw_text, clean_text, display_text, brand_mentions, date_bucket, \
              likes, replies, engagement_score, sentiment_label, sentiment_score, \
              topic_label, hour, day_of_week) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, \
                 ?19, ?20, ?21) \
         ON CONFLICT (source_id) DO UPDATE SET \
             source_platform = excluded.source_platform, \
             topic = excluded.topic, \
             author = excluded.author, \
             created_at = excluded.created_at, \
             fetched_at = excluded.fetched_at, \
             url = excluded.url, \
             channel = excluded.channel, \
             raw_text = excluded.raw_text, \
             clean_text = excluded.clean_text, \
             display_text = excluded.display_text, \
             brand_mentions = excluded.brand_mentions, \
             date_bucket = excluded.date_bucket, \
             likes = excluded.likes, \
             replies = excluded.replies, \
             engagement_score = excluded.engagement_score, \
             sentiment_label = excluded.sentiment_label, \
             sentiment_score = excluded.sentiment_score, \
             topic_label = excluded.topic_label, \
             hour = excluded.hour, \
             day_of_week = excluded.day_of_week \
         WHERE excluded.fetched_at > scored_records.fetched_at",
    )
    .bind(&raw.source_id)
    .bind(raw.source_platform.as_str())
    .bind(&raw.topic)
    .bind(&raw.author)
    .bind(raw.created_at)
    .bind(raw.fetched_at)
    .bind(raw.url.as_deref())
    .bind(raw.channel.as_deref())
    .bind(&raw.text)
    .bind(&processed.clean_text)
    .bind(&processed.display_text)
    .bind(mentions)
    .bind(&processed.date_bucket)
    .bind(raw.engagement.likes)
    .bind(raw.engagement.replies)
    .bind(processed.engagement_score)
    .bind(record.sentiment_label.as_str())
    .bind(record.sentiment_score)
    .bind(processed.topic_label.as_str())
    .bind(i64::from(processed.hour))
    .bind(i64::from(processed.day_of_week))
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

async fn upsert_kpi(tx: &mut Transaction<'_, Sqlite>, kpi: &KpiRow) -> Result<u64, DbError> {
    let result = sqlx::query(
        "INSERT INTO kpi_aggregates (date_bucket, channel, metric_name, metric_value, metric_unit) \
         VALUES (?1, ?2, ?3, ?4, ?5) \
         ON CONFLICT (date_bucket, channel, metric_name) DO UPDATE SET \
             metric_value = excluded.metric_value, \
             metric_unit = excluded.metric_unit",
    )
    .bind(&kpi.date_bucket)
    .bind(&kpi.channel)
    .bind(&kpi.metric_name)
    .bind(kpi.metric_value)
    .bind(kpi.metric_unit.as_deref())
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use brandpulse_core::{
        Engagement, ProcessedRecord, RawRecord, SentimentLabel, SourcePlatform, TopicLabel,
    };
    use chrono::{TimeZone, Utc};

    use super::*;

    fn scored(id: &str, fetched_hour: u32, label: SentimentLabel) -> ScoredRecord {
        let created = Utc.with_ymd_and_hms(2024, 1, 2, 8, 0, 0).unwrap();
        let fetched = Utc.with_ymd_and_hms(2024, 1, 3, fetched_hour, 0, 0).unwrap();
        ScoredRecord {
            processed: ProcessedRecord {
                raw: RawRecord {
                    source_id: id.to_string(),
                    source_platform: SourcePlatform::Reddit,
                    topic: "ASUS".to_string(),
                    text: format!("text {fetched_hour}"),
                    author: "a".to_string(),
                    created_at: created,
                    engagement: Engagement::default(),
                    url: None,
                    channel: None,
                    fetched_at: fetched,
                },
                clean_text: String::new(),
                display_text: String::new(),
                brand_mentions: BTreeSet::new(),
                date_bucket: "2024-W01".to_string(),
                engagement_score: 0.0,
                topic_label: TopicLabel::GeneralDiscussion,
                hour: 8,
                day_of_week: 1,
            },
            sentiment_label: label,
            sentiment_score: 0.9,
        }
    }

    #[test]
    fn collapse_keeps_newest_fetch() {
        let input = vec![
            scored("a", 1, SentimentLabel::Negative),
            scored("b", 1, SentimentLabel::Neutral),
            scored("a", 5, SentimentLabel::Positive),
        ];
        let kept = collapse_by_source_id(&input);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].source_id(), "a");
        assert_eq!(kept[0].sentiment_label, SentimentLabel::Positive);
        assert_eq!(kept[1].source_id(), "b");
    }

    #[test]
    fn collapse_tie_keeps_first_input() {
        let input = vec![
            scored("a", 4, SentimentLabel::Negative),
            scored("a", 4, SentimentLabel::Positive),
        ];
        let kept = collapse_by_source_id(&input);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].sentiment_label, SentimentLabel::Negative);
    }
}
