//! Shared types, configuration and pure transformations for the brandpulse
//! pipeline.

pub mod app_config;
pub mod brands;
pub mod config;
pub mod error;
pub mod kpis;
pub mod normalize;
pub mod records;
pub mod retry;

pub use app_config::{PipelineConfig, RedditCredentials};
pub use brands::{load_brands, parse_brands, BrandConfig, BrandsFile};
pub use config::{build_pipeline_config, load_pipeline_config, load_pipeline_config_from_env};
pub use error::{ConfigError, ErrorKind, Stage};
pub use kpis::{aggregate_sentiment, demo_marketing_kpis, sentiment_kpi_rows, SentimentAggregate};
pub use normalize::{normalize, topic_label, CleaningRules, NormalizeConfig};
pub use records::{
    DateGranularity, Engagement, KpiRow, ProcessedRecord, RawRecord, ScoredRecord,
    SentimentLabel, SourcePlatform, TopicLabel,
};
pub use retry::{retry_with_backoff, RetryPolicy};
