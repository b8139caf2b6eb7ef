//! Sentiment classification of processed records.
//!
//! The [`Classifier`] batches texts through a [`SentimentBackend`] (an HTTP
//! inference endpoint, or an offline lexicon in demo mode) and maps native
//! labels onto the three-valued [`brandpulse_core::SentimentLabel`].

pub mod backend;
pub mod classifier;
pub mod error;
pub mod labels;
pub mod lexicon;

pub use backend::{Backend, HttpBackend, Prediction, SentimentBackend};
pub use classifier::{Classifier, ClassifierConfig};
pub use error::ClassifierError;
pub use labels::LabelMap;
pub use lexicon::{lexicon_score, LexiconBackend};
