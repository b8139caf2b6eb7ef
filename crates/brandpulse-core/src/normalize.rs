//! Raw → processed record normalization.
//!
//! Pure and deterministic: the same input slice always yields the same output,
//! and no input is ever dropped or rejected. Malformed text degrades to a
//! best-effort cleaned string (possibly empty).

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::{Datelike, Timelike};
use regex::Regex;

use crate::app_config::PipelineConfig;
use crate::brands::BrandsFile;
use crate::records::{
    DateGranularity, Engagement, ProcessedRecord, RawRecord, SourcePlatform, TopicLabel,
};

static MARKDOWN_LINK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[[^\]]*\]\([^)]*\)").expect("valid markdown link regex"));
static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:https?://|www\.)\S+").expect("valid url regex"));
/// Keyword rules checked in order; the first rule with a hit wins.
const TOPIC_RULES: &[(TopicLabel, &[&str])] = &[
    (TopicLabel::PricingBudget, &["price", "cost", "budget", "pricing"]),
    (TopicLabel::FeaturesTools, &["feature", "tool", "platform", "software"]),
    (TopicLabel::IntegrationData, &["integration", "api", "connect", "data"]),
    (TopicLabel::CompetitiveAnalysis, &["competitor", "alternative", "vs", "comparison"]),
    (TopicLabel::AnalyticsRoi, &["roi", "analytics", "metrics", "performance"]),
];

static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\w+").expect("valid mention regex"));

/// Text cleaning rules. Every rule is optional; the allow-list always applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleaningRules {
    pub strip_markdown_links: bool,
    pub strip_urls: bool,
    pub strip_mentions: bool,
    /// Punctuation kept in addition to alphanumerics and whitespace.
    pub allowed_punctuation: String,
}

impl Default for CleaningRules {
    fn default() -> Self {
        Self {
            strip_markdown_links: true,
            strip_urls: true,
            strip_mentions: true,
            allowed_punctuation: ".,!?'-".to_string(),
        }
    }
}

/// Everything the normalizer needs; built once per run.
#[derive(Debug, Clone)]
pub struct NormalizeConfig {
    pub rules: CleaningRules,
    pub brand_keywords: BTreeSet<String>,
    pub granularity: DateGranularity,
}

impl NormalizeConfig {
    #[must_use]
    pub fn from_pipeline(config: &PipelineConfig, brands: &BrandsFile) -> Self {
        Self {
            rules: CleaningRules::default(),
            brand_keywords: brands.keywords(&config.extra_brand_keywords),
            granularity: config.date_granularity,
        }
    }
}

/// Normalize a batch of raw records, preserving order and length.
#[must_use]
pub fn normalize(raw: &[RawRecord], config: &NormalizeConfig) -> Vec<ProcessedRecord> {
    let processed: Vec<ProcessedRecord> = raw
        .iter()
        .map(|record| normalize_record(record, config))
        .collect();

    let empty = processed.iter().filter(|p| p.clean_text.is_empty()).count();
    tracing::debug!(
        records = processed.len(),
        empty_text = empty,
        "normalized raw records"
    );

    processed
}

/// Normalize a single raw record.
#[must_use]
pub fn normalize_record(raw: &RawRecord, config: &NormalizeConfig) -> ProcessedRecord {
    let display_text = clean_text(&raw.text, &config.rules);
    let clean_text = display_text.to_lowercase();

    ProcessedRecord {
        brand_mentions: find_brand_mentions(&raw.text, &config.brand_keywords),
        date_bucket: config.granularity.bucket(&raw.created_at),
        engagement_score: engagement_score(raw.source_platform, raw.engagement),
        topic_label: topic_label(&clean_text),
        hour: raw.created_at.hour(),
        day_of_week: raw.created_at.weekday().num_days_from_monday(),
        clean_text,
        display_text,
        raw: raw.clone(),
    }
}

/// Apply the cleaning rules, keeping the original casing.
#[must_use]
pub fn clean_text(text: &str, rules: &CleaningRules) -> String {
    let mut text = text.to_string();

    if rules.strip_markdown_links {
        text = MARKDOWN_LINK_RE.replace_all(&text, " ").into_owned();
    }
    if rules.strip_urls {
        text = URL_RE.replace_all(&text, " ").into_owned();
    }
    if rules.strip_mentions {
        text = MENTION_RE.replace_all(&text, " ").into_owned();
    }

    let filtered: String = text
        .chars()
        .filter_map(|c| {
            if c.is_whitespace() {
                Some(' ')
            } else if c.is_control() {
                None
            } else if c.is_alphanumeric() || rules.allowed_punctuation.contains(c) {
                Some(c)
            } else {
                None
            }
        })
        .collect();

    filtered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-insensitive substring match of every keyword against `text`.
///
/// Returns the matching keywords in their configured spelling.
#[must_use]
pub fn find_brand_mentions(text: &str, keywords: &BTreeSet<String>) -> BTreeSet<String> {
    let haystack = text.to_lowercase();
    keywords
        .iter()
        .filter(|k| {
            let needle = k.trim().to_lowercase();
            !needle.is_empty() && haystack.contains(&needle)
        })
        .cloned()
        .collect()
}

/// Assign a [`TopicLabel`] from whole words of lowercased `text`.
///
/// A word matches a keyword exactly or as its plural with a trailing `s`.
/// Text with no keyword hit is [`TopicLabel::GeneralDiscussion`].
#[must_use]
pub fn topic_label(text: &str) -> TopicLabel {
    let words: Vec<&str> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();

    TOPIC_RULES
        .iter()
        .find(|(_, keywords)| {
            words.iter().any(|word| {
                keywords
                    .iter()
                    .any(|k| *word == *k || word.strip_suffix('s') == Some(*k))
            })
        })
        .map_or(TopicLabel::GeneralDiscussion, |(label, _)| *label)
}

/// Platform-weighted engagement. Missing counts count as zero.
///
/// Reddit: `0.7 × score + 0.3 × comments`. YouTube: `likes + 2 × replies`.
#[must_use]
pub fn engagement_score(platform: SourcePlatform, engagement: Engagement) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let likes = engagement.likes.unwrap_or(0) as f64;
    #[allow(clippy::cast_precision_loss)]
    let replies = engagement.replies.unwrap_or(0) as f64;

    match platform {
        SourcePlatform::Reddit => likes * 0.7 + replies * 0.3,
        SourcePlatform::YouTube => likes + replies * 2.0,
    }
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
