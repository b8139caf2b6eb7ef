//! Social content extraction: Reddit search, `YouTube` comment threads and
//! an offline demo source behind one [`ContentSource`] trait.

pub mod error;
pub mod extractor;
pub mod sources;

pub use error::ExtractError;
pub use extractor::{Extractor, Source, TopicFetch, TopicRequest};
pub use sources::{
    ContentSource, DemoSource, HttpSettings, RedditClient, YouTubeClient, DEMO_MAX_LIMIT,
    REDDIT_MAX_LIMIT, YOUTUBE_MAX_LIMIT,
};
