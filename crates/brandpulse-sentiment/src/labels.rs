//! Native backend labels → [`SentimentLabel`].

use brandpulse_core::SentimentLabel;

use crate::backend::Prediction;
use crate::error::ClassifierError;

/// Fixed native-label table. Matching is case-insensitive.
///
/// | Native                          | Label    |
/// |---------------------------------|----------|
/// | `POSITIVE`, `POS`, `LABEL_2`    | Positive |
/// | `NEGATIVE`, `NEG`, `LABEL_0`    | Negative |
/// | `NEUTRAL`, `NEU`, `LABEL_1`     | Neutral  |
const NATIVE_LABELS: &[(&str, SentimentLabel)] = &[
    ("POSITIVE", SentimentLabel::Positive),
    ("POS", SentimentLabel::Positive),
    ("LABEL_2", SentimentLabel::Positive),
    ("NEGATIVE", SentimentLabel::Negative),
    ("NEG", SentimentLabel::Negative),
    ("LABEL_0", SentimentLabel::Negative),
    ("NEUTRAL", SentimentLabel::Neutral),
    ("NEU", SentimentLabel::Neutral),
    ("LABEL_1", SentimentLabel::Neutral),
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelMap {
    /// Polar predictions below this confidence become Neutral.
    pub neutral_threshold: f64,
}

impl Default for LabelMap {
    fn default() -> Self {
        Self {
            neutral_threshold: 0.6,
        }
    }
}

impl LabelMap {
    #[must_use]
    pub fn new(neutral_threshold: f64) -> Self {
        Self { neutral_threshold }
    }

    /// Look up a native label.
    #[must_use]
    pub fn native(label: &str) -> Option<SentimentLabel> {
        let label = label.trim();
        NATIVE_LABELS
            .iter()
            .find(|(native, _)| native.eq_ignore_ascii_case(label))
            .map(|&(_, mapped)| mapped)
    }

    /// Map a backend prediction to a label and a score in `[0, 1]`.
    ///
    /// NaN scores give `Neutral` with score `0.0`. Low-confidence polar
    /// labels keep their score but become `Neutral`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::UnmappedLabel`] for labels outside the table.
    pub fn map(&self, prediction: &Prediction) -> Result<(SentimentLabel, f64), ClassifierError> {
        let label = Self::native(&prediction.label)
            .ok_or_else(|| ClassifierError::UnmappedLabel(prediction.label.clone()))?;

        if prediction.score.is_nan() {
            return Ok((SentimentLabel::Neutral, 0.0));
        }
        let score = prediction.score.clamp(0.0, 1.0);

        let label = match label {
            SentimentLabel::Positive | SentimentLabel::Negative
                if score < self.neutral_threshold =>
            {
                SentimentLabel::Neutral
            }
            other => other,
        };
        Ok((label, score))
    }
}
