//! Offline marketing lexicon backend used in demo mode.

use crate::backend::{Prediction, SentimentBackend};
use crate::error::ClassifierError;

/// Marketing and consumer-tech word weights.
///
/// Keys are lowercase single words. Values in `(0.0, 1.0]` are positive,
/// in `[-1.0, 0.0)` are negative. The summed score is clamped to `[-1.0, 1.0]`.
pub(crate) const LEXICON: &[(&str, f64)] = &[
    // Positive signals
    ("love", 0.5),
    ("loved", 0.5),
    ("amazing", 0.5),
    ("awesome", 0.5),
    ("best", 0.5),
    ("brilliant", 0.5),
    ("excellent", 0.5),
    ("great", 0.4),
    ("happy", 0.4),
    ("recommend", 0.4),
    ("impressive", 0.4),
    ("nailed", 0.4),
    ("fast", 0.3),
    ("good", 0.3),
    ("smooth", 0.3),
    ("quality", 0.3),
    ("value", 0.2),
    ("fixed", 0.2),
    // Negative signals
    ("worst", -0.6),
    ("terrible", -0.6),
    ("awful", -0.6),
    ("hate", -0.6),
    ("scam", -0.7),
    ("broken", -0.5),
    ("broke", -0.5),
    ("disappointed", -0.5),
    ("disappointing", -0.5),
    ("refund", -0.4),
    ("buggy", -0.4),
    ("down", -0.3),
    ("expensive", -0.3),
    ("overpriced", -0.4),
    ("slow", -0.3),
    ("bad", -0.4),
    ("lag", -0.3),
    ("crash", -0.4),
];

/// Sum the lexicon weights of every word in `text`, clamped to `[-1.0, 1.0]`.
/// Returns `0.0` for empty or unknown text.
#[must_use]
pub fn lexicon_score(text: &str) -> f64 {
    let mut score = 0.0_f64;
    for word in text.split_whitespace() {
        let w = word
            .trim_matches(|c: char| !c.is_alphabetic())
            .to_lowercase();
        if let Some(&(_, weight)) = LEXICON.iter().find(|(lex_word, _)| *lex_word == w) {
            score += weight;
        }
    }
    score.clamp(-1.0, 1.0)
}

/// Deterministic lexicon classifier.
///
/// A positive sum answers `POSITIVE`, a negative sum `NEGATIVE`, zero
/// `NEUTRAL`. Confidence is `0.5 + |sum| / 2`, so a single strong word such
/// as "love" yields `0.75`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconBackend;

impl LexiconBackend {
    #[must_use]
    pub fn predict(text: &str) -> Prediction {
        let sum = lexicon_score(text);
        let label = if sum > 0.0 {
            "POSITIVE"
        } else if sum < 0.0 {
            "NEGATIVE"
        } else {
            "NEUTRAL"
        };
        Prediction {
            label: label.to_string(),
            score: 0.5 + sum.abs() / 2.0,
        }
    }
}

impl SentimentBackend for LexiconBackend {
    async fn predict_batch(&self, texts: &[&str]) -> Result<Vec<Prediction>, ClassifierError> {
        Ok(texts.iter().map(|t| Self::predict(t)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_returns_zero() {
        assert!(lexicon_score("").abs() < f64::EPSILON);
    }

    #[test]
    fn punctuation_is_trimmed_before_lookup() {
        assert!((lexicon_score("I love this campaign!") - 0.5).abs() < 1e-9);
    }

    #[test]
    fn score_is_clamped() {
        let score = lexicon_score("worst terrible awful scam hate");
        assert!((score + 1.0).abs() < 1e-9);
    }

    #[test]
    fn predicts_positive_with_confidence() {
        let p = LexiconBackend::predict("i love this campaign!");
        assert_eq!(p.label, "POSITIVE");
        assert!((p.score - 0.75).abs() < 1e-9);
    }

    #[test]
    fn mixed_and_unknown_text() {
        let p = LexiconBackend::predict("great phone but slow charger, bad box");
        // 0.4 - 0.3 - 0.4
        assert_eq!(p.label, "NEGATIVE");
        let p = LexiconBackend::predict("has anyone tried it yet?");
        assert_eq!(p.label, "NEUTRAL");
        assert!((p.score - 0.5).abs() < 1e-9);
    }
}
