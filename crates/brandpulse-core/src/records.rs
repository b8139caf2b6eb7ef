//! Fixed-shape records that flow between pipeline stages.
//!
//! Each stage owns exactly one of these types: the extractor produces
//! [`RawRecord`], the normalizer [`ProcessedRecord`], the classifier
//! [`ScoredRecord`], and the loader derives [`KpiRow`]s from scored records.

use std::collections::BTreeSet;
use std::str::FromStr;

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

/// Social platform an item was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourcePlatform {
    Reddit,
    YouTube,
}

impl SourcePlatform {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourcePlatform::Reddit => "reddit",
            SourcePlatform::YouTube => "youtube",
        }
    }
}

impl std::fmt::Display for SourcePlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourcePlatform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reddit" => Ok(SourcePlatform::Reddit),
            "youtube" => Ok(SourcePlatform::YouTube),
            other => Err(format!("unknown source platform '{other}'")),
        }
    }
}

/// Closed three-value sentiment label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

impl SentimentLabel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SentimentLabel::Positive => "positive",
            SentimentLabel::Negative => "negative",
            SentimentLabel::Neutral => "neutral",
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positive" => Ok(SentimentLabel::Positive),
            "negative" => Ok(SentimentLabel::Negative),
            "neutral" => Ok(SentimentLabel::Neutral),
            other => Err(format!("unknown sentiment label '{other}'")),
        }
    }
}

/// Coarse discussion topic assigned to a processed record by keyword
/// heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicLabel {
    PricingBudget,
    FeaturesTools,
    IntegrationData,
    CompetitiveAnalysis,
    AnalyticsRoi,
    GeneralDiscussion,
}

impl TopicLabel {
    pub const ALL: [TopicLabel; 6] = [
        TopicLabel::PricingBudget,
        TopicLabel::FeaturesTools,
        TopicLabel::IntegrationData,
        TopicLabel::CompetitiveAnalysis,
        TopicLabel::AnalyticsRoi,
        TopicLabel::GeneralDiscussion,
    ];

    /// Storage key.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TopicLabel::PricingBudget => "pricing_budget",
            TopicLabel::FeaturesTools => "features_tools",
            TopicLabel::IntegrationData => "integration_data",
            TopicLabel::CompetitiveAnalysis => "competitive_analysis",
            TopicLabel::AnalyticsRoi => "analytics_roi",
            TopicLabel::GeneralDiscussion => "general_discussion",
        }
    }

    /// Human-readable name for reports.
    #[must_use]
    pub fn display_name(self) -> &'static str {
        match self {
            TopicLabel::PricingBudget => "Pricing & Budget",
            TopicLabel::FeaturesTools => "Features & Tools",
            TopicLabel::IntegrationData => "Integration & Data",
            TopicLabel::CompetitiveAnalysis => "Competitive Analysis",
            TopicLabel::AnalyticsRoi => "Analytics & ROI",
            TopicLabel::GeneralDiscussion => "General Discussion",
        }
    }
}

impl std::fmt::Display for TopicLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for TopicLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        TopicLabel::ALL
            .into_iter()
            .find(|label| label.as_str() == key)
            .ok_or_else(|| format!("unknown topic label '{key}'"))
    }
}

/// Period used to derive `date_bucket` keys. Buckets are always computed in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateGranularity {
    Day,
    Week,
    Month,
}

impl DateGranularity {
    /// Derive the bucket key for a timestamp.
    ///
    /// - `Day` → `2024-01-02`
    /// - `Week` → ISO week, `2024-W01`
    /// - `Month` → `2024-01`
    #[must_use]
    pub fn bucket(self, at: &DateTime<Utc>) -> String {
        match self {
            DateGranularity::Day => at.format("%Y-%m-%d").to_string(),
            DateGranularity::Week => {
                let week = at.iso_week();
                format!("{}-W{:02}", week.year(), week.week())
            }
            DateGranularity::Month => at.format("%Y-%m").to_string(),
        }
    }
}

impl FromStr for DateGranularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "day" => Ok(DateGranularity::Day),
            "week" => Ok(DateGranularity::Week),
            "month" => Ok(DateGranularity::Month),
            other => Err(format!("expected day, week or month, got '{other}'")),
        }
    }
}

/// Platform-dependent engagement counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engagement {
    /// Reddit score or YouTube like count.
    pub likes: Option<i64>,
    /// Reddit comment count or YouTube reply count.
    pub replies: Option<i64>,
}

/// One fetched social item, as landed in the raw record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Platform-native id; the dedup key.
    pub source_id: String,
    pub source_platform: SourcePlatform,
    /// Brand or topic the item was fetched for.
    pub topic: String,
    pub text: String,
    pub author: String,
    pub created_at: DateTime<Utc>,
    pub engagement: Engagement,
    pub url: Option<String>,
    /// Subreddit or YouTube channel title.
    pub channel: Option<String>,
    pub fetched_at: DateTime<Utc>,
}

/// A cleaned record ready for classification. One-to-one with a [`RawRecord`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedRecord {
    pub raw: RawRecord,
    /// Lowercased cleaned text. Never null; empty input gives an empty string.
    pub clean_text: String,
    /// Cleaned text with the original casing.
    pub display_text: String,
    pub brand_mentions: BTreeSet<String>,
    pub date_bucket: String,
    pub engagement_score: f64,
    pub topic_label: TopicLabel,
    /// Hour of day of `created_at` in UTC, `0..=23`.
    pub hour: u32,
    /// Weekday of `created_at` in UTC, Monday = 0.
    pub day_of_week: u32,
}

impl ProcessedRecord {
    #[must_use]
    pub fn source_id(&self) -> &str {
        &self.raw.source_id
    }
}

/// A processed record plus its sentiment classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRecord {
    pub processed: ProcessedRecord,
    pub sentiment_label: SentimentLabel,
    /// Confidence in `[0.0, 1.0]`.
    pub sentiment_score: f64,
}

impl ScoredRecord {
    #[must_use]
    pub fn source_id(&self) -> &str {
        self.processed.source_id()
    }

    #[must_use]
    pub fn raw(&self) -> &RawRecord {
        &self.processed.raw
    }
}

/// One warehouse KPI value keyed by `(date_bucket, channel, metric_name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiRow {
    pub date_bucket: String,
    pub channel: String,
    pub metric_name: String,
    pub metric_value: f64,
    pub metric_unit: Option<String>,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn week_bucket_uses_iso_week() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
        assert_eq!(DateGranularity::Week.bucket(&at), "2024-W01");
    }

    #[test]
    fn week_bucket_rolls_into_previous_iso_year() {
        // 2021-01-01 is a Friday and belongs to 2020-W53.
        let at = Utc.with_ymd_and_hms(2021, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(DateGranularity::Week.bucket(&at), "2020-W53");
    }

    #[test]
    fn day_and_month_buckets() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 59).unwrap();
        assert_eq!(DateGranularity::Day.bucket(&at), "2024-03-09");
        assert_eq!(DateGranularity::Month.bucket(&at), "2024-03");
    }

    #[test]
    fn granularity_parses_case_insensitively() {
        assert_eq!("WEEK".parse::<DateGranularity>(), Ok(DateGranularity::Week));
        assert!("fortnight".parse::<DateGranularity>().is_err());
    }

    #[test]
    fn platform_serializes_lowercase() {
        let json = serde_json::to_string(&SourcePlatform::YouTube).unwrap();
        assert_eq!(json, "\"youtube\"");
        assert_eq!("YouTube".parse::<SourcePlatform>(), Ok(SourcePlatform::YouTube));
    }

    #[test]
    fn label_round_trips_through_str() {
        for label in [
            SentimentLabel::Positive,
            SentimentLabel::Negative,
            SentimentLabel::Neutral,
        ] {
            assert_eq!(label.as_str().parse::<SentimentLabel>(), Ok(label));
        }
    }

    #[test]
    fn topic_label_round_trips_through_str() {
        for label in TopicLabel::ALL {
            assert_eq!(label.as_str().parse::<TopicLabel>(), Ok(label));
        }
        assert_eq!(TopicLabel::AnalyticsRoi.to_string(), "Analytics & ROI");
        assert!("memes".parse::<TopicLabel>().is_err());
    }
}
