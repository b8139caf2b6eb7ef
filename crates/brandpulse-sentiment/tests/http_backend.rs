//! Integration tests for `HttpBackend` against a local `wiremock` server.

use brandpulse_core::{RetryPolicy, SentimentLabel};
use brandpulse_sentiment::{
    Classifier, ClassifierConfig, ClassifierError, HttpBackend, SentimentBackend,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer, token: Option<&str>, max_retries: u32) -> HttpBackend {
    HttpBackend::new(
        &format!("{}/models/sentiment", server.uri()),
        token.map(ToString::to_string),
        5,
        RetryPolicy::immediate(max_retries),
    )
    .expect("failed to build test HttpBackend")
}

#[tokio::test]
async fn posts_inputs_with_bearer_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/sentiment"))
        .and(header("authorization", "Bearer hf_test"))
        .and(body_json(json!({"inputs": ["great ad", "awful ad"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"label": "POSITIVE", "score": 0.98},
            {"label": "NEGATIVE", "score": 0.91}
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let predictions = backend(&server, Some("hf_test"), 0)
        .predict_batch(&["great ad", "awful ad"])
        .await
        .expect("predict should succeed");

    assert_eq!(predictions.len(), 2);
    assert_eq!(predictions[0].label, "POSITIVE");
    assert_eq!(predictions[1].label, "NEGATIVE");
}

#[tokio::test]
async fn ranked_candidates_pick_the_highest_score() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/sentiment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            [
                {"label": "LABEL_0", "score": 0.05},
                {"label": "LABEL_1", "score": 0.15},
                {"label": "LABEL_2", "score": 0.80}
            ]
        ])))
        .mount(&server)
        .await;

    let predictions = backend(&server, None, 0)
        .predict_batch(&["love it"])
        .await
        .unwrap();
    assert_eq!(predictions[0].label, "LABEL_2");
    assert!((predictions[0].score - 0.80).abs() < 1e-9);
}

#[tokio::test]
async fn model_loading_503_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/sentiment"))
        .respond_with(ResponseTemplate::new(503).set_body_json(json!({"error": "loading"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/models/sentiment"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([{"label": "NEU", "score": 0.7}])),
        )
        .mount(&server)
        .await;

    let predictions = backend(&server, None, 1).predict_batch(&["ok"]).await;
    assert!(predictions.is_ok(), "expected Ok after retry, got: {predictions:?}");
}

#[tokio::test]
async fn exhausted_retries_surface_unavailable() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/sentiment"))
        .respond_with(ResponseTemplate::new(502))
        .expect(3)
        .mount(&server)
        .await;

    let result = backend(&server, None, 2).predict_batch(&["ok"]).await;
    assert!(
        matches!(result, Err(ClassifierError::Unavailable(_))),
        "expected Unavailable, got: {result:?}"
    );
}

#[tokio::test]
async fn unreachable_endpoint_surfaces_unavailable() {
    let backend = HttpBackend::new(
        "http://127.0.0.1:1/models/sentiment",
        None,
        2,
        RetryPolicy::immediate(0),
    )
    .unwrap();
    let result = backend.predict_batch(&["ok"]).await;
    assert!(
        matches!(result, Err(ClassifierError::Unavailable(_))),
        "expected Unavailable, got: {result:?}"
    );
}

#[tokio::test]
async fn classifier_maps_http_predictions_and_threshold() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/sentiment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"label": "POSITIVE", "score": 0.97},
            {"label": "NEGATIVE", "score": 0.52}
        ])))
        .mount(&server)
        .await;

    let classifier =
        Classifier::new(backend(&server, None, 0), ClassifierConfig::default()).unwrap();

    let records = vec![
        processed("a", "i love this campaign!"),
        processed("b", "not sure about this"),
    ];
    let scored = classifier.classify(&records).await.unwrap();

    assert_eq!(scored[0].sentiment_label, SentimentLabel::Positive);
    assert_eq!(scored[1].sentiment_label, SentimentLabel::Neutral);
    assert!((scored[1].sentiment_score - 0.52).abs() < 1e-9);
}

fn processed(id: &str, text: &str) -> brandpulse_core::ProcessedRecord {
    use chrono::{TimeZone, Utc};

    let at = Utc.with_ymd_and_hms(2024, 1, 2, 12, 0, 0).unwrap();
    brandpulse_core::ProcessedRecord {
        raw: brandpulse_core::RawRecord {
            source_id: id.to_string(),
            source_platform: brandpulse_core::SourcePlatform::YouTube,
            topic: "ASUS".to_string(),
            text: text.to_string(),
            author: "a".to_string(),
            created_at: at,
            engagement: brandpulse_core::Engagement::default(),
            url: None,
            channel: None,
            fetched_at: at,
        },
        clean_text: text.to_string(),
        display_text: text.to_string(),
        brand_mentions: std::collections::BTreeSet::new(),
        date_bucket: "2024-W01".to_string(),
        engagement_score: 0.0,
        topic_label: brandpulse_core::TopicLabel::GeneralDiscussion,
        hour: 12,
        day_of_week: 1,
    }
}
