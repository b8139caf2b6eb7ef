//! Classification backends.
//!
//! A backend answers in its own label space; [`crate::labels::LabelMap`]
//! translates to [`brandpulse_core::SentimentLabel`].

use std::future::Future;
use std::time::Duration;

use brandpulse_core::{retry_with_backoff, PipelineConfig, RetryPolicy};
use serde::{Deserialize, Serialize};

use crate::error::ClassifierError;
use crate::lexicon::LexiconBackend;

/// Longest error body kept in [`ClassifierError::Api`] messages.
const MAX_ERROR_BODY_CHARS: usize = 200;

/// One prediction in the backend's native label space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub score: f64,
}

pub trait SentimentBackend: Send + Sync {
    /// Predict one label per input text, in input order.
    fn predict_batch(
        &self,
        texts: &[&str],
    ) -> impl Future<Output = Result<Vec<Prediction>, ClassifierError>> + Send;
}

#[derive(Debug, Serialize)]
struct InferenceRequest<'a> {
    inputs: &'a [&'a str],
}

/// Inference endpoints answer either one prediction per input or, when all
/// scores are requested, a ranked list per input.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceItem {
    Single(Prediction),
    Ranked(Vec<Prediction>),
}

impl InferenceItem {
    fn best(self) -> Result<Prediction, ClassifierError> {
        match self {
            InferenceItem::Single(p) => Ok(p),
            InferenceItem::Ranked(candidates) => candidates
                .into_iter()
                .max_by(|a, b| a.score.total_cmp(&b.score))
                .ok_or_else(|| {
                    ClassifierError::Unavailable("backend returned an empty candidate list".into())
                }),
        }
    }
}

/// Hugging Face inference-style text classification over HTTP.
///
/// `POST {url}` with `{"inputs": [...]}` and an optional bearer token.
pub struct HttpBackend {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
    retry: RetryPolicy,
}

impl HttpBackend {
    /// # Errors
    ///
    /// Returns [`ClassifierError::Http`] if the HTTP client cannot be built.
    pub fn new(
        url: &str,
        token: Option<String>,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Result<Self, ClassifierError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(format!("brandpulse/{}", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
            token,
            retry,
        })
    }

    async fn post_once(&self, texts: &[&str]) -> Result<Vec<Prediction>, ClassifierError> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&InferenceRequest { inputs: texts });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClassifierError::Api {
                status: status.as_u16(),
                message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let body = response.text().await?;
        let items: Vec<InferenceItem> =
            serde_json::from_str(&body).map_err(|source| ClassifierError::Deserialize {
                context: "inference response".to_string(),
                source,
            })?;
        items.into_iter().map(InferenceItem::best).collect()
    }
}

impl SentimentBackend for HttpBackend {
    async fn predict_batch(&self, texts: &[&str]) -> Result<Vec<Prediction>, ClassifierError> {
        retry_with_backoff(
            self.retry,
            "sentiment inference",
            ClassifierError::is_retriable,
            || self.post_once(texts),
        )
        .await
        .map_err(ClassifierError::exhausted)
    }
}

/// The backend selected by configuration.
pub enum Backend {
    Http(HttpBackend),
    Lexicon(LexiconBackend),
}

impl Backend {
    /// Demo mode uses the offline lexicon; live mode requires an endpoint.
    ///
    /// # Errors
    ///
    /// Returns [`ClassifierError::NotConfigured`] when live mode has no
    /// endpoint configured, or [`ClassifierError::Http`] if the HTTP client
    /// cannot be built.
    pub fn from_config(config: &PipelineConfig) -> Result<Self, ClassifierError> {
        if config.demo_mode {
            return Ok(Backend::Lexicon(LexiconBackend));
        }
        let url = config.classifier_url.as_deref().ok_or_else(|| {
            ClassifierError::NotConfigured("BRANDPULSE_CLASSIFIER_URL is not set".to_string())
        })?;
        Ok(Backend::Http(HttpBackend::new(
            url,
            config.classifier_token.clone(),
            config.request_timeout_secs,
            config.retry_policy(),
        )?))
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Backend::Http(_) => "http",
            Backend::Lexicon(_) => "lexicon",
        }
    }
}

impl SentimentBackend for Backend {
    async fn predict_batch(&self, texts: &[&str]) -> Result<Vec<Prediction>, ClassifierError> {
        match self {
            Backend::Http(b) => b.predict_batch(texts).await,
            Backend::Lexicon(b) => b.predict_batch(texts).await,
        }
    }
}
