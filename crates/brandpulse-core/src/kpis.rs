//! KPI aggregation over scored records, plus the synthetic marketing KPIs
//! written in demo mode.

use std::collections::BTreeMap;

use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::records::{KpiRow, ScoredRecord, SentimentLabel, SourcePlatform};

pub const METRIC_RECORD_COUNT: &str = "record_count";
pub const METRIC_MEAN_SENTIMENT: &str = "mean_sentiment_score";
pub const METRIC_POSITIVE_COUNT: &str = "positive_count";
pub const METRIC_NEGATIVE_COUNT: &str = "negative_count";
pub const METRIC_NEUTRAL_COUNT: &str = "neutral_count";
pub const METRIC_MEAN_ENGAGEMENT: &str = "mean_engagement_score";

/// Sentiment summary for one `(date_bucket, source_platform)` group.
#[derive(Debug, Clone, PartialEq)]
pub struct SentimentAggregate {
    pub date_bucket: String,
    pub source_platform: SourcePlatform,
    pub count: u64,
    pub mean_score: f64,
    pub positive_count: u64,
    pub negative_count: u64,
    pub neutral_count: u64,
    pub mean_engagement: f64,
}

impl SentimentAggregate {
    /// Flatten into long-form warehouse rows, one per metric.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_kpi_rows(&self) -> Vec<KpiRow> {
        let row = |metric: &str, value: f64| KpiRow {
            date_bucket: self.date_bucket.clone(),
            channel: self.source_platform.as_str().to_string(),
            metric_name: metric.to_string(),
            metric_value: value,
            metric_unit: None,
        };

        vec![
            row(METRIC_RECORD_COUNT, self.count as f64),
            row(METRIC_MEAN_SENTIMENT, self.mean_score),
            row(METRIC_POSITIVE_COUNT, self.positive_count as f64),
            row(METRIC_NEGATIVE_COUNT, self.negative_count as f64),
            row(METRIC_NEUTRAL_COUNT, self.neutral_count as f64),
            row(METRIC_MEAN_ENGAGEMENT, self.mean_engagement),
        ]
    }
}

#[derive(Default)]
struct Accumulator {
    count: u64,
    score_sum: f64,
    engagement_sum: f64,
    positive: u64,
    negative: u64,
    neutral: u64,
}

/// Group scored records by `(date_bucket, source_platform)` and compute
/// count, mean sentiment score, mean engagement and per-label counts.
///
/// Output is sorted by bucket then platform.
#[must_use]
pub fn aggregate_sentiment(scored: &[ScoredRecord]) -> Vec<SentimentAggregate> {
    let mut groups: BTreeMap<(String, SourcePlatform), Accumulator> = BTreeMap::new();

    for record in scored {
        let key = (
            record.processed.date_bucket.clone(),
            record.raw().source_platform,
        );
        let acc = groups.entry(key).or_default();
        acc.count += 1;
        acc.score_sum += record.sentiment_score;
        acc.engagement_sum += record.processed.engagement_score;
        match record.sentiment_label {
            SentimentLabel::Positive => acc.positive += 1,
            SentimentLabel::Negative => acc.negative += 1,
            SentimentLabel::Neutral => acc.neutral += 1,
        }
    }

    groups
        .into_iter()
        .map(|((date_bucket, source_platform), acc)| {
            #[allow(clippy::cast_precision_loss)]
            let denom = acc.count.max(1) as f64;
            SentimentAggregate {
                date_bucket,
                source_platform,
                count: acc.count,
                mean_score: acc.score_sum / denom,
                positive_count: acc.positive,
                negative_count: acc.negative,
                neutral_count: acc.neutral,
                mean_engagement: acc.engagement_sum / denom,
            }
        })
        .collect()
}

/// Aggregate and flatten in one step.
#[must_use]
pub fn sentiment_kpi_rows(scored: &[ScoredRecord]) -> Vec<KpiRow> {
    aggregate_sentiment(scored)
        .iter()
        .flat_map(SentimentAggregate::to_kpi_rows)
        .collect()
}

/// Headline marketing KPIs: `(metric, value, unit, change, change_unit)`.
const DEMO_HEADLINE_KPIS: &[(&str, f64, &str, f64, &str)] = &[
    ("spend", 36.0, "M", 491.79, "K"),
    ("cpm", 405.0, "K", 1.28, "K"),
    ("ctr", 10.5, "%", 0.08, "%"),
    ("cpc", 4.0, "K", -18.34, ""),
    ("video_views", 93.0, "K", 993.0, ""),
    ("impressions", 89.0, "K", 937.0, ""),
    ("conversions", 791.0, "", 36.0, ""),
    ("conversion_rate", 9.8, "%", 0.27, "%"),
];

/// Channel performance: `(channel, impressions, ctr, spend_pct)`.
const DEMO_CHANNELS: &[(&str, f64, f64, f64)] = &[
    ("Programmatic", 54.7, 10.44, 4.2),
    ("Paid Search", 31.4, 10.57, 30.7),
    ("Paid Social", 2.9, 10.28, -25.6),
    ("Organic", 11.5, 10.6, -0.6),
];

/// Data source performance base values:
/// `(source, impressions, spend_pct, ctr, conversions_pct)`.
const DEMO_DATA_SOURCES: &[(&str, f64, Option<f64>, f64, Option<f64>)] = &[
    ("Amazon Ad Server (Sizmek)", 5.8, Some(-30.0), 10.17, Some(-10.0)),
    ("StackAdapt", 4.8, None, 68.7, Some(-7.3)),
    ("LinkedIn Ads", 9.8, None, 10.0, None),
    ("Facebook", 5.7, Some(39.0), 10.82, Some(14.3)),
    ("Google Display & Video 360", 4.7, Some(69.2), 10.28, Some(-0.8)),
    ("Bing Ads (Microsoft Advertising)", 4.8, Some(3.7), 10.0, Some(-1.8)),
    ("Google Search Ads 360", 5.8, Some(-23.6), 10.57, Some(11.0)),
];

/// Campaign performance base values: `(campaign, impressions, ctr)`.
const DEMO_CAMPAIGNS: &[(&str, f64, f64)] = &[
    ("Business-focused zero tolerance architecture", 931.0, 10.42),
    ("Persistent 24/7 attitude", 914.0, 9.71),
    ("Integrated dedicated contingency", 950.0, 9.98),
    ("Profound intangible policy", 978.0, 8.69),
    ("Centralized modular throughput", 955.0, 9.42),
    ("Automated uniform software", 952.0, 10.19),
    ("Cross-platform static hierarchy", 946.0, 9.5),
    ("Networked value-added time-frame", 953.0, 11.54),
];

/// Monthly impressions per channel, in thousands.
const DEMO_TIME_SERIES: &[(&str, [f64; DEMO_MONTHS])] = &[
    (
        "Programmatic",
        [7.0, 5.5, 8.0, 10.0, 7.5, 6.0, 5.5, 7.5, 12.5, 6.0, 8.0, 7.0],
    ),
    (
        "Paid Search",
        [6.0, 5.0, 7.5, 9.5, 6.5, 5.5, 4.5, 6.5, 11.5, 5.0, 7.5, 6.5],
    ),
    (
        "Paid Social",
        [3.0, 2.5, 3.5, 4.0, 3.5, 3.0, 2.5, 3.5, 5.0, 2.5, 3.0, 2.5],
    ),
    (
        "Organic",
        [4.0, 3.5, 4.5, 5.0, 4.0, 3.5, 3.0, 4.0, 6.0, 3.5, 4.5, 4.0],
    ),
];

/// Length of the monthly demo series.
const DEMO_MONTHS: usize = 12;

/// Spacing between points of the monthly demo series.
const DEMO_MONTH_STEP_DAYS: u64 = 30;

/// Fixed seed for impression jitter, so repeated demo runs write identical rows.
const DEMO_KPI_SEED: u64 = 0x6b70_6973;

fn demo_row(date: &str, channel: &str, metric: &str, value: f64, unit: &str) -> KpiRow {
    KpiRow {
        date_bucket: date.to_string(),
        channel: channel.to_string(),
        metric_name: metric.to_string(),
        metric_value: value,
        metric_unit: (!unit.is_empty()).then(|| unit.to_string()),
    }
}

/// Dates of the monthly demo series: 2023-01-01 then every 30 days.
fn demo_month_buckets() -> Vec<String> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default();
    (0..DEMO_MONTHS as u64)
        .map(|i| {
            (start + Days::new(i * DEMO_MONTH_STEP_DAYS))
                .format("%Y-%m-%d")
                .to_string()
        })
        .collect()
}

/// Synthetic marketing KPIs for the dashboard's demo mode.
///
/// Headline metrics (and their `<metric>_change` deltas) are reported under
/// channel `all` and per-channel metrics under the channel name, both dated
/// `date`. The monthly data-source, campaign and time-series rows cover
/// 2023 and use `source_*`, `campaign_*` and `series_impressions` metrics.
#[must_use]
pub fn demo_marketing_kpis(date: NaiveDate) -> Vec<KpiRow> {
    let bucket = date.format("%Y-%m-%d").to_string();
    let mut rows = Vec::new();

    for &(metric, value, unit, change, change_unit) in DEMO_HEADLINE_KPIS {
        rows.push(demo_row(&bucket, "all", metric, value, unit));
        rows.push(demo_row(
            &bucket,
            "all",
            &format!("{metric}_change"),
            change,
            change_unit,
        ));
    }

    for &(channel, impressions, ctr, spend_pct) in DEMO_CHANNELS {
        rows.push(demo_row(&bucket, channel, "impressions", impressions, "K"));
        rows.push(demo_row(&bucket, channel, "ctr", ctr, "%"));
        rows.push(demo_row(&bucket, channel, "spend_pct", spend_pct, "%"));
    }

    let months = demo_month_buckets();
    let mut rng = StdRng::seed_from_u64(DEMO_KPI_SEED);

    for month in &months {
        for &(source, impressions, spend_pct, ctr, conversions_pct) in DEMO_DATA_SOURCES {
            let jittered = impressions * rng.random_range(0.8..1.2);
            rows.push(demo_row(month, source, "source_impressions", jittered, "M"));
            rows.push(demo_row(month, source, "source_ctr", ctr, "%"));
            if let Some(pct) = spend_pct {
                rows.push(demo_row(month, source, "source_spend_pct", pct, "%"));
            }
            if let Some(pct) = conversions_pct {
                rows.push(demo_row(month, source, "source_conversions_pct", pct, "%"));
            }
        }

        for &(campaign, impressions, ctr) in DEMO_CAMPAIGNS {
            let jittered = (impressions * rng.random_range(0.9..1.1)).trunc();
            rows.push(demo_row(month, campaign, "campaign_impressions", jittered, ""));
            rows.push(demo_row(month, campaign, "campaign_ctr", ctr, "%"));
        }
    }

    for &(channel, series) in DEMO_TIME_SERIES {
        for (month, value) in months.iter().zip(series) {
            rows.push(demo_row(month, channel, "series_impressions", value, "K"));
        }
    }

    rows
}
