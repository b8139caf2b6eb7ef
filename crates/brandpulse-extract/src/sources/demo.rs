//! Offline synthetic source used in demo mode.
//!
//! Records are seeded from a SHA-256 digest of the platform and topic, so
//! repeated runs produce the same ids, text and relative timestamps.

use brandpulse_core::{Engagement, RawRecord, SourcePlatform};
use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};

use super::ContentSource;
use crate::error::ExtractError;

pub const DEMO_MAX_LIMIT: u32 = 500;

/// Demo items are spread over this many hours before the anchor.
const SPREAD_HOURS: i64 = 24 * 28;

const POSITIVE: &[&str] = &[
    "I love my new {topic} setup, the performance is amazing!",
    "Honestly {topic} nailed it this time. Great value for money.",
    "The latest {topic} campaign is brilliant, best ad I've seen all year.",
    "Super happy with {topic} support, they fixed my issue in a day.",
];

const NEGATIVE: &[&str] = &[
    "{topic} servers are down again, this is terrible.",
    "Really disappointed with {topic}. Broke after two weeks.",
    "Why is {topic} so expensive now? Awful pricing.",
    "Worst update from {topic} yet, everything is buggy and slow.",
];

const NEUTRAL: &[&str] = &[
    "Has anyone tried the new {topic} release yet?",
    "{topic} announced their quarterly results today.",
    "Comparing {topic} with the competition, any thoughts?",
    "Saw a {topic} ad during the stream earlier.",
];

const CHANNELS: &[(SourcePlatform, &[&str])] = &[
    (
        SourcePlatform::Reddit,
        &["gaming", "technology", "marketing", "pcmasterrace"],
    ),
    (
        SourcePlatform::YouTube,
        &["Linus Tech Tips", "GameSpot", "Dave2D", "IGN"],
    ),
];

const AUTHORS: &[&str] = &[
    "pixel_pusher",
    "ad_watcher",
    "frame_rate_fan",
    "brand_curious",
    "quiet_lurker",
    "patch_notes",
];

#[derive(Debug, Clone)]
pub struct DemoSource {
    platform: SourcePlatform,
    anchor: Option<DateTime<Utc>>,
}

impl DemoSource {
    /// A demo source whose timestamps are relative to the time of each fetch.
    #[must_use]
    pub fn new(platform: SourcePlatform) -> Self {
        Self {
            platform,
            anchor: None,
        }
    }

    /// A demo source with timestamps relative to a fixed instant.
    #[must_use]
    pub fn with_anchor(platform: SourcePlatform, anchor: DateTime<Utc>) -> Self {
        Self {
            platform,
            anchor: Some(anchor),
        }
    }

    fn seed(&self, topic: &str) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update(self.platform.as_str().as_bytes());
        hasher.update(b":");
        hasher.update(topic.to_lowercase().as_bytes());
        hasher.finalize().into()
    }

    /// Generate exactly `limit` records for `topic`, before any filtering.
    #[must_use]
    pub fn generate(&self, topic: &str, limit: u32) -> Vec<RawRecord> {
        let seed = self.seed(topic);
        let tag: String = seed[..4].iter().map(|b| format!("{b:02x}")).collect();
        let mut rng = StdRng::from_seed(seed);
        let now = Utc::now();
        let anchor = self.anchor.unwrap_or(now);
        let channels = CHANNELS
            .iter()
            .find(|(p, _)| *p == self.platform)
            .map_or(&[][..], |(_, c)| *c);

        (0..limit)
            .map(|i| {
                let templates = match rng.random_range(0..10) {
                    0..=4 => POSITIVE,
                    5..=7 => NEUTRAL,
                    _ => NEGATIVE,
                };
                let text = templates[rng.random_range(0..templates.len())].replace("{topic}", topic);
                let author = AUTHORS[rng.random_range(0..AUTHORS.len())];
                let channel = (!channels.is_empty())
                    .then(|| channels[rng.random_range(0..channels.len())].to_string());
                let age = Duration::hours(rng.random_range(0..SPREAD_HOURS));
                let likes = rng.random_range(0..500_i64);
                let replies = rng.random_range(0..60_i64);
                let source_id = format!("demo-{}-{tag}-{i:04}", self.platform.as_str());

                RawRecord {
                    url: Some(format!("https://example.invalid/{source_id}")),
                    source_id,
                    source_platform: self.platform,
                    topic: topic.to_string(),
                    text,
                    author: author.to_string(),
                    created_at: anchor - age,
                    engagement: Engagement {
                        likes: Some(likes),
                        replies: Some(replies),
                    },
                    channel,
                    fetched_at: now,
                }
            })
            .collect()
    }
}

impl ContentSource for DemoSource {
    fn platform(&self) -> SourcePlatform {
        self.platform
    }

    fn max_limit(&self) -> u32 {
        DEMO_MAX_LIMIT
    }

    async fn fetch(
        &self,
        topic: &str,
        limit: u32,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<RawRecord>, ExtractError> {
        let mut records = self.generate(topic, limit);
        if let Some(since) = since {
            records.retain(|r| r.created_at >= since);
        }
        tracing::debug!(
            platform = %self.platform,
            topic,
            records = records.len(),
            "generated demo records"
        );
        Ok(records)
    }
}
