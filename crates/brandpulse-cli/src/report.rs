//! Read-only `status` and `report` handlers.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use brandpulse_core::{aggregate_sentiment, ScoredRecord, SentimentAggregate, SourcePlatform};
use brandpulse_db::{ScoredFilter, TopicCount};
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

const REPORT_TEXT_CHARS: usize = 80;

/// Print warehouse row counts, stored aggregates and the latest runs.
///
/// # Errors
///
/// Returns an error if a database query fails.
pub(crate) async fn run_status(pool: &SqlitePool) -> anyhow::Result<()> {
    let raw = brandpulse_db::count_raw_records(pool).await?;
    let scored = brandpulse_db::count_scored_records(pool).await?;
    let aggregates = brandpulse_db::sentiment_aggregates(pool).await?;
    let topics = brandpulse_db::topic_distribution(pool, None).await?;
    let runs = brandpulse_db::list_recent_pipeline_runs(pool, 5).await?;

    println!("raw records:    {raw}");
    println!("scored records: {scored}");
    println!();

    if aggregates.is_empty() {
        println!("no sentiment aggregates found; run `brandpulse run` first");
    } else {
        println!(
            "{:<12}{:<10}{:>8}{:>8}{:>8}{:>8}{:>8}",
            "BUCKET", "PLATFORM", "COUNT", "MEAN", "POS", "NEG", "NEU"
        );
        for agg in &aggregates {
            println!(
                "{:<12}{:<10}{:>8}{:>8.3}{:>8}{:>8}{:>8}",
                agg.date_bucket,
                agg.source_platform,
                agg.count,
                agg.mean_score,
                agg.positive_count,
                agg.negative_count,
                agg.neutral_count
            );
        }
    }

    if !topics.is_empty() {
        println!();
        println!("{:<24}{:>8}", "TOPIC", "COUNT");
        for topic in &topics {
            println!("{:<24}{:>8}", topic.topic_label.display_name(), topic.count);
        }
    }

    if !runs.is_empty() {
        println!();
        println!("{:<38}{:<11}{:<18}{:>10}{:>8}", "RUN", "STATUS", "STARTED", "EXTRACTED", "SCORED");
        for run in &runs {
            println!(
                "{:<38}{:<11}{:<18}{:>10}{:>8}",
                run.public_id,
                run.status,
                run.started_at.format("%Y-%m-%d %H:%M"),
                run.records_extracted,
                run.records_scored
            );
            if let Some(message) = &run.error_message {
                let stage = run.failed_stage.as_deref().unwrap_or("unknown");
                println!("  {stage}: {message}");
            }
        }
    }

    Ok(())
}

/// Print a markdown report of sentiment aggregates and recent mentions.
///
/// With a brand filter, aggregates are recomputed from that brand's scored
/// records; otherwise the stored aggregates are used.
///
/// # Errors
///
/// Returns an error if a database query fails.
pub(crate) async fn run_report(
    pool: &SqlitePool,
    brand: Option<&str>,
    platform: Option<SourcePlatform>,
    limit: usize,
) -> anyhow::Result<()> {
    let records = brandpulse_db::list_scored_records(
        pool,
        &ScoredFilter {
            platform,
            brand: brand.map(ToString::to_string),
            ..ScoredFilter::default()
        },
    )
    .await?;

    if records.is_empty() {
        println!("no scored records to report; run `brandpulse run` first");
        return Ok(());
    }

    let aggregates = if brand.is_some() {
        aggregate_sentiment(&records)
    } else {
        brandpulse_db::sentiment_aggregates(pool)
            .await?
            .into_iter()
            .filter(|a| platform.is_none_or(|p| a.source_platform == p))
            .collect()
    };

    let topics = count_topics(&records);
    let recent = &records[..records.len().min(limit)];
    print!(
        "{}",
        render_report(Utc::now(), brand, platform, &aggregates, &topics, recent)
    );
    Ok(())
}

/// Records per topic label, most discussed first.
fn count_topics(records: &[ScoredRecord]) -> Vec<TopicCount> {
    let mut counts: BTreeMap<_, u64> = BTreeMap::new();
    for record in records {
        *counts.entry(record.processed.topic_label).or_default() += 1;
    }
    let mut topics: Vec<TopicCount> = counts
        .into_iter()
        .map(|(topic_label, count)| TopicCount { topic_label, count })
        .collect();
    topics.sort_by(|a, b| b.count.cmp(&a.count));
    topics
}

fn table_text(text: &str) -> String {
    let mut out: String = text.chars().take(REPORT_TEXT_CHARS).collect();
    if text.chars().count() > REPORT_TEXT_CHARS {
        out.push_str("...");
    }
    out.replace('|', "\\|").replace('\n', " ")
}

/// Render the markdown report body.
pub(crate) fn render_report(
    generated_at: DateTime<Utc>,
    brand: Option<&str>,
    platform: Option<SourcePlatform>,
    aggregates: &[SentimentAggregate],
    topics: &[TopicCount],
    recent: &[ScoredRecord],
) -> String {
    let mut out = String::new();
    let filter_label = match (brand, platform) {
        (Some(b), Some(p)) => format!("{b} on {p}"),
        (Some(b), None) => b.to_string(),
        (None, Some(p)) => format!("All brands on {p}"),
        (None, None) => "All brands".to_string(),
    };

    // Writing to a String cannot fail.
    let _ = writeln!(out, "# Brand Sentiment Report");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "**Generated**: {}",
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );
    let _ = writeln!(out, "**Filter**: {filter_label}");
    let _ = writeln!(out);
    let _ = writeln!(out, "## Sentiment by period");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "| Period | Platform | Records | Mean score | Positive | Negative | Neutral | Mean engagement |"
    );
    let _ = writeln!(
        out,
        "|--------|----------|---------|------------|----------|----------|---------|-----------------|"
    );
    for agg in aggregates {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {:.3} | {} | {} | {} | {:.1} |",
            agg.date_bucket,
            agg.source_platform,
            agg.count,
            agg.mean_score,
            agg.positive_count,
            agg.negative_count,
            agg.neutral_count,
            agg.mean_engagement
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "## Discussion topics");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Topic | Records |");
    let _ = writeln!(out, "|-------|---------|");
    for topic in topics {
        let _ = writeln!(out, "| {} | {} |", topic.topic_label, topic.count);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "## Recent mentions");
    let _ = writeln!(out);
    let _ = writeln!(out, "| Created | Platform | Topic | Label | Score | Text |");
    let _ = writeln!(out, "|---------|----------|-------|-------|-------|------|");
    for record in recent {
        let raw = record.raw();
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {:.2} | {} |",
            raw.created_at.format("%Y-%m-%d %H:%M"),
            raw.source_platform,
            raw.topic,
            record.sentiment_label,
            record.sentiment_score,
            table_text(&record.processed.display_text)
        );
    }

    out
}
