//! Batched, order-preserving classification of processed records.

use brandpulse_core::{PipelineConfig, ProcessedRecord, ScoredRecord, SentimentLabel};

use crate::backend::SentimentBackend;
use crate::error::ClassifierError;
use crate::labels::LabelMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierConfig {
    pub batch_size: usize,
    /// Texts longer than this many characters are truncated before inference.
    pub max_input_chars: usize,
    pub label_map: LabelMap,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            batch_size: 16,
            max_input_chars: 512,
            label_map: LabelMap::default(),
        }
    }
}

impl ClassifierConfig {
    #[must_use]
    pub fn from_pipeline(config: &PipelineConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            max_input_chars: config.max_input_chars,
            label_map: LabelMap::new(config.neutral_threshold),
        }
    }
}

pub struct Classifier<B> {
    backend: B,
    config: ClassifierConfig,
}

impl<B: SentimentBackend> Classifier<B> {
    /// # Errors
    ///
    /// Returns [`ClassifierError::InvalidBatchSize`] if `batch_size` is zero.
    pub fn new(backend: B, config: ClassifierConfig) -> Result<Self, ClassifierError> {
        if config.batch_size == 0 {
            return Err(ClassifierError::InvalidBatchSize(0));
        }
        Ok(Self { backend, config })
    }

    #[must_use]
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Classify every record, returning one [`ScoredRecord`] per input in
    /// input order.
    ///
    /// Records whose `clean_text` is blank are scored `Neutral` / `0.0`
    /// without consulting the backend. The remaining texts are sent in
    /// chunks of `batch_size`.
    ///
    /// # Errors
    ///
    /// Any failing batch fails the whole call; no partial output is returned.
    /// - [`ClassifierError::Unavailable`] / [`ClassifierError::Http`] when the
    ///   backend cannot be reached.
    /// - [`ClassifierError::PredictionCountMismatch`] when a batch answer has
    ///   the wrong length.
    /// - [`ClassifierError::UnmappedLabel`] for labels outside the label map.
    pub async fn classify(
        &self,
        records: &[ProcessedRecord],
    ) -> Result<Vec<ScoredRecord>, ClassifierError> {
        let mut results: Vec<Option<(SentimentLabel, f64)>> = vec![None; records.len()];
        let mut pending: Vec<(usize, &str)> = Vec::new();

        for (idx, record) in records.iter().enumerate() {
            if record.clean_text.trim().is_empty() {
                results[idx] = Some((SentimentLabel::Neutral, 0.0));
            } else {
                pending.push((idx, truncate_chars(&record.clean_text, self.config.max_input_chars)));
            }
        }

        for chunk in pending.chunks(self.config.batch_size) {
            let texts: Vec<&str> = chunk.iter().map(|&(_, text)| text).collect();
            let predictions = self.backend.predict_batch(&texts).await?;

            if predictions.len() != texts.len() {
                return Err(ClassifierError::PredictionCountMismatch {
                    expected: texts.len(),
                    actual: predictions.len(),
                });
            }

            for (&(idx, _), prediction) in chunk.iter().zip(&predictions) {
                results[idx] = Some(self.config.label_map.map(prediction)?);
            }
        }

        let scored: Vec<ScoredRecord> = records
            .iter()
            .zip(results)
            .map(|(record, result)| {
                let (sentiment_label, sentiment_score) =
                    result.unwrap_or((SentimentLabel::Neutral, 0.0));
                ScoredRecord {
                    processed: record.clone(),
                    sentiment_label,
                    sentiment_score,
                }
            })
            .collect();

        log_summary(&scored, records.len() - pending.len());
        Ok(scored)
    }
}

/// Prefix of `text` holding at most `max_chars` characters.
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    text.char_indices()
        .nth(max_chars)
        .map_or(text, |(byte_idx, _)| &text[..byte_idx])
}

fn log_summary(scored: &[ScoredRecord], skipped_empty: usize) {
    let count = |label: SentimentLabel| {
        scored
            .iter()
            .filter(|s| s.sentiment_label == label)
            .count()
    };
    #[allow(clippy::cast_precision_loss)]
    let mean_confidence = if scored.is_empty() {
        0.0
    } else {
        scored.iter().map(|s| s.sentiment_score).sum::<f64>() / scored.len() as f64
    };

    tracing::info!(
        records = scored.len(),
        positive = count(SentimentLabel::Positive),
        negative = count(SentimentLabel::Negative),
        neutral = count(SentimentLabel::Neutral),
        skipped_empty,
        mean_confidence,
        "sentiment classification complete"
    );
}

#[cfg(test)]
#[path = "classifier_test.rs"]
mod tests;
