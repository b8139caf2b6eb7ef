use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use brandpulse_core::{Engagement, RawRecord, SourcePlatform, TopicLabel};
use chrono::{TimeZone, Utc};

use super::*;
use crate::backend::Prediction;
use crate::lexicon::LexiconBackend;

/// Answers POSITIVE 0.9 for texts containing "love", NEGATIVE 0.8 otherwise,
/// and records every batch it receives.
#[derive(Default)]
struct RecordingBackend {
    batches: Mutex<Vec<Vec<String>>>,
}

impl RecordingBackend {
    fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Vec::len).collect()
    }

    fn seen_texts(&self) -> Vec<String> {
        self.batches.lock().unwrap().concat()
    }
}

impl SentimentBackend for RecordingBackend {
    async fn predict_batch(&self, texts: &[&str]) -> Result<Vec<Prediction>, ClassifierError> {
        self.batches
            .lock()
            .unwrap()
            .push(texts.iter().map(ToString::to_string).collect());
        Ok(texts
            .iter()
            .map(|t| {
                if t.contains("love") {
                    Prediction {
                        label: "POSITIVE".to_string(),
                        score: 0.9,
                    }
                } else {
                    Prediction {
                        label: "NEGATIVE".to_string(),
                        score: 0.8,
                    }
                }
            })
            .collect())
    }
}

/// Fails every call.
#[derive(Default)]
struct DownBackend {
    calls: AtomicUsize,
}

impl SentimentBackend for DownBackend {
    async fn predict_batch(&self, _texts: &[&str]) -> Result<Vec<Prediction>, ClassifierError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ClassifierError::Unavailable("connection refused".to_string()))
    }
}

/// Drops the last prediction of every batch.
struct ShortBackend;

impl SentimentBackend for ShortBackend {
    async fn predict_batch(&self, texts: &[&str]) -> Result<Vec<Prediction>, ClassifierError> {
        Ok(texts
            .iter()
            .skip(1)
            .map(|_| Prediction {
                label: "NEUTRAL".to_string(),
                score: 0.7,
            })
            .collect())
    }
}

/// Answers with a label outside the table.
struct OddLabelBackend;

impl SentimentBackend for OddLabelBackend {
    async fn predict_batch(&self, texts: &[&str]) -> Result<Vec<Prediction>, ClassifierError> {
        Ok(texts
            .iter()
            .map(|_| Prediction {
                label: "SARCASM".to_string(),
                score: 0.99,
            })
            .collect())
    }
}

fn processed(id: &str, clean_text: &str) -> ProcessedRecord {
    let at = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
    ProcessedRecord {
        raw: RawRecord {
            source_id: id.to_string(),
            source_platform: SourcePlatform::Reddit,
            topic: "ASUS".to_string(),
            text: clean_text.to_string(),
            author: "a".to_string(),
            created_at: at,
            engagement: Engagement::default(),
            url: None,
            channel: None,
            fetched_at: at,
        },
        clean_text: clean_text.to_string(),
        display_text: clean_text.to_string(),
        brand_mentions: BTreeSet::new(),
        date_bucket: "2024-W01".to_string(),
        engagement_score: 0.0,
        topic_label: TopicLabel::GeneralDiscussion,
        hour: 12,
        day_of_week: 1,
    }
}

fn config(batch_size: usize) -> ClassifierConfig {
    ClassifierConfig {
        batch_size,
        ..ClassifierConfig::default()
    }
}

fn sample() -> Vec<ProcessedRecord> {
    vec![
        processed("a", "i love this campaign!"),
        processed("b", "servers are down"),
        processed("c", ""),
        processed("d", "love the new laptop"),
        processed("e", "   "),
        processed("f", "meh pricing"),
        processed("g", "love love love"),
    ]
}

#[tokio::test]
async fn output_matches_input_length_and_order() {
    let classifier = Classifier::new(RecordingBackend::default(), config(2)).unwrap();
    let input = sample();
    let scored = classifier.classify(&input).await.unwrap();

    assert_eq!(scored.len(), input.len());
    for (s, p) in scored.iter().zip(&input) {
        assert_eq!(s.source_id(), p.source_id());
        assert!((0.0..=1.0).contains(&s.sentiment_score));
    }
    assert_eq!(scored[0].sentiment_label, SentimentLabel::Positive);
    assert_eq!(scored[1].sentiment_label, SentimentLabel::Negative);
}

#[tokio::test]
async fn empty_text_is_neutral_zero_without_backend_call() {
    let backend = RecordingBackend::default();
    let classifier = Classifier::new(backend, config(16)).unwrap();
    let scored = classifier.classify(&sample()).await.unwrap();

    for idx in [2, 4] {
        assert_eq!(scored[idx].sentiment_label, SentimentLabel::Neutral);
        assert!(scored[idx].sentiment_score.abs() < f64::EPSILON);
    }
    let seen = classifier.backend().seen_texts();
    assert_eq!(seen.len(), 5, "blank texts never reach the backend");
    assert!(seen.iter().all(|t| !t.trim().is_empty()));
}

#[tokio::test]
async fn all_empty_input_never_calls_backend() {
    let classifier = Classifier::new(DownBackend::default(), config(4)).unwrap();
    let scored = classifier
        .classify(&[processed("a", ""), processed("b", " ")])
        .await
        .unwrap();
    assert_eq!(scored.len(), 2);
    assert_eq!(classifier.backend().calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn results_do_not_depend_on_batch_boundaries() {
    let input = sample();
    let small = Classifier::new(RecordingBackend::default(), config(1)).unwrap();
    let large = Classifier::new(RecordingBackend::default(), config(64)).unwrap();

    let a = small.classify(&input).await.unwrap();
    let b = large.classify(&input).await.unwrap();
    assert_eq!(a, b);
    assert_eq!(small.backend().batch_sizes(), vec![1, 1, 1, 1, 1]);
    assert_eq!(large.backend().batch_sizes(), vec![5]);
}

#[tokio::test]
async fn batches_are_chunked_by_batch_size() {
    let classifier = Classifier::new(RecordingBackend::default(), config(2)).unwrap();
    classifier.classify(&sample()).await.unwrap();
    assert_eq!(classifier.backend().batch_sizes(), vec![2, 2, 1]);
}

#[tokio::test]
async fn long_texts_are_truncated_to_max_input_chars() {
    let classifier = Classifier::new(
        RecordingBackend::default(),
        ClassifierConfig {
            max_input_chars: 5,
            ..ClassifierConfig::default()
        },
    )
    .unwrap();
    classifier
        .classify(&[processed("a", "héllo wörld, this is long")])
        .await
        .unwrap();
    assert_eq!(classifier.backend().seen_texts(), vec!["héllo".to_string()]);
}

#[tokio::test]
async fn unavailable_backend_fails_whole_call() {
    let classifier = Classifier::new(DownBackend::default(), config(2)).unwrap();
    let result = classifier.classify(&sample()).await;
    assert!(
        matches!(result, Err(ClassifierError::Unavailable(_))),
        "expected Unavailable, got: {result:?}"
    );
    assert_eq!(classifier.backend().calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn wrong_prediction_count_is_a_contract_violation() {
    let classifier = Classifier::new(ShortBackend, config(3)).unwrap();
    let result = classifier.classify(&sample()).await;
    assert!(matches!(
        result,
        Err(ClassifierError::PredictionCountMismatch {
            expected: 3,
            actual: 2
        })
    ));
}

#[tokio::test]
async fn unmapped_labels_fail_the_call() {
    let classifier = Classifier::new(OddLabelBackend, config(3)).unwrap();
    let result = classifier.classify(&sample()).await;
    assert!(matches!(result, Err(ClassifierError::UnmappedLabel(_))));
}

#[test]
fn zero_batch_size_is_rejected() {
    let result = Classifier::new(LexiconBackend, config(0));
    assert!(matches!(result, Err(ClassifierError::InvalidBatchSize(0))));
}

#[tokio::test]
async fn lexicon_backend_scores_end_to_end_example_positive() {
    let classifier = Classifier::new(LexiconBackend, ClassifierConfig::default()).unwrap();
    let scored = classifier
        .classify(&[processed("e2e", "i love this campaign!")])
        .await
        .unwrap();
    assert_eq!(scored[0].sentiment_label, SentimentLabel::Positive);
    assert!(scored[0].sentiment_score >= 0.5);
}

#[test]
fn truncation_respects_char_boundaries() {
    assert_eq!(truncate_chars("abc", 10), "abc");
    assert_eq!(truncate_chars("ñandú", 2), "ña");
    assert_eq!(truncate_chars("", 3), "");
}
