use chrono::{TimeZone, Utc};

use super::*;

fn raw(source_id: &str, text: &str) -> RawRecord {
    RawRecord {
        source_id: source_id.to_string(),
        source_platform: SourcePlatform::Reddit,
        topic: "ASUS".to_string(),
        text: text.to_string(),
        author: "someone".to_string(),
        created_at: Utc.with_ymd_and_hms(2024, 1, 2, 15, 30, 0).unwrap(),
        engagement: Engagement {
            likes: Some(10),
            replies: Some(4),
        },
        url: None,
        channel: Some("gaming".to_string()),
        fetched_at: Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(),
    }
}

fn config() -> NormalizeConfig {
    NormalizeConfig {
        rules: CleaningRules::default(),
        brand_keywords: ["ASUS", "ROG", "Activision"]
            .into_iter()
            .map(ToString::to_string)
            .collect(),
        granularity: DateGranularity::Week,
    }
}

// -----------------------------------------------------------------------
// clean_text
// -----------------------------------------------------------------------

#[test]
fn lowercases_for_matching_and_keeps_display_case() {
    let processed = normalize_record(&raw("r1", "I love this campaign!"), &config());
    assert_eq!(processed.clean_text, "i love this campaign!");
    assert_eq!(processed.display_text, "I love this campaign!");
}

#[test]
fn strips_urls_and_markdown_links() {
    let rules = CleaningRules::default();
    let cleaned = clean_text(
        "Check [the review](https://example.com/r) at https://asus.com/rog or www.asus.com now",
        &rules,
    );
    assert_eq!(cleaned, "Check at or now");
}

#[test]
fn strips_mentions_and_symbols() {
    let rules = CleaningRules::default();
    assert_eq!(
        clean_text("@gamer42 this laptop is 🔥🔥 #best", &rules),
        "this laptop is best"
    );
}

#[test]
fn removes_control_characters_and_collapses_whitespace() {
    let rules = CleaningRules::default();
    assert_eq!(
        clean_text("  great\u{0}\u{7}  value\n\n\tfor money\u{200B} ", &rules),
        "great value for money"
    );
}

#[test]
fn keeps_allowed_punctuation_only() {
    let rules = CleaningRules::default();
    assert_eq!(clean_text("Wow!!! Isn't it $999?", &rules), "Wow!!! Isn't it 999?");
}

#[test]
fn rules_can_be_disabled() {
    let rules = CleaningRules {
        strip_markdown_links: false,
        strip_urls: false,
        strip_mentions: false,
        allowed_punctuation: ".:/@".to_string(),
    };
    assert_eq!(
        clean_text("@team see https://asus.com", &rules),
        "@team see https://asus.com"
    );
}

#[test]
fn non_latin_letters_survive_cleaning() {
    let rules = CleaningRules::default();
    assert_eq!(clean_text("Très bien, ASUS!", &rules), "Très bien, ASUS!");
}

// -----------------------------------------------------------------------
// normalize
// -----------------------------------------------------------------------

#[test]
fn empty_text_maps_to_empty_clean_text() {
    let processed = normalize(&[raw("r1", ""), raw("r2", "   \u{1}  ")], &config());
    assert_eq!(processed.len(), 2);
    assert_eq!(processed[0].clean_text, "");
    assert_eq!(processed[1].clean_text, "");
}

#[test]
fn preserves_order_and_length() {
    let input = vec![raw("a", "one"), raw("b", ""), raw("c", "three")];
    let processed = normalize(&input, &config());
    let ids: Vec<&str> = processed.iter().map(ProcessedRecord::source_id).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn normalize_is_deterministic() {
    let input = vec![
        raw("a", "ASUS ROG is [great](http://x.y) @fan"),
        raw("b", "meh"),
        raw("c", "Activision   servers are DOWN again!!"),
    ];
    let cfg = config();
    assert_eq!(normalize(&input, &cfg), normalize(&input, &cfg));
}

#[test]
fn brand_mentions_are_case_insensitive_substrings() {
    let processed = normalize_record(&raw("r1", "my new asus rog strix rocks"), &config());
    let mentions: Vec<&str> = processed.brand_mentions.iter().map(String::as_str).collect();
    assert_eq!(mentions, vec!["ASUS", "ROG"]);
}

#[test]
fn brand_mentions_may_be_empty() {
    let processed = normalize_record(&raw("r1", "nothing relevant here"), &config());
    assert!(processed.brand_mentions.is_empty());
}

#[test]
fn date_bucket_follows_configured_granularity() {
    let mut cfg = config();
    assert_eq!(normalize_record(&raw("r1", "x"), &cfg).date_bucket, "2024-W01");
    cfg.granularity = DateGranularity::Day;
    assert_eq!(normalize_record(&raw("r1", "x"), &cfg).date_bucket, "2024-01-02");
    cfg.granularity = DateGranularity::Month;
    assert_eq!(normalize_record(&raw("r1", "x"), &cfg).date_bucket, "2024-01");
}

// -----------------------------------------------------------------------
// engagement_score
// -----------------------------------------------------------------------

#[test]
fn engagement_is_platform_weighted() {
    let engagement = Engagement {
        likes: Some(10),
        replies: Some(4),
    };
    let reddit = engagement_score(SourcePlatform::Reddit, engagement);
    let youtube = engagement_score(SourcePlatform::YouTube, engagement);
    assert!((reddit - 8.2).abs() < 1e-9, "got {reddit}");
    assert!((youtube - 18.0).abs() < 1e-9, "got {youtube}");
}

#[test]
fn missing_engagement_counts_as_zero() {
    let score = engagement_score(SourcePlatform::YouTube, Engagement::default());
    assert!(score.abs() < f64::EPSILON);
}

// -----------------------------------------------------------------------
// topic_label and temporal features
// -----------------------------------------------------------------------

#[test]
fn topic_rules_apply_in_order() {
    assert_eq!(topic_label("the price went up again"), TopicLabel::PricingBudget);
    assert_eq!(topic_label("new editing tools look great"), TopicLabel::FeaturesTools);
    assert_eq!(topic_label("their api keeps timing out"), TopicLabel::IntegrationData);
    assert_eq!(topic_label("rog ally vs steam deck"), TopicLabel::CompetitiveAnalysis);
    assert_eq!(topic_label("performance is much better"), TopicLabel::AnalyticsRoi);
    // Pricing is checked before features.
    assert_eq!(
        topic_label("software costs keep rising"),
        TopicLabel::PricingBudget
    );
}

#[test]
fn topic_keywords_match_whole_words_only() {
    assert_eq!(topic_label("a rapid heroic capital"), TopicLabel::GeneralDiscussion);
    assert_eq!(topic_label(""), TopicLabel::GeneralDiscussion);
    assert_eq!(topic_label("prices, prices!"), TopicLabel::PricingBudget);
}

#[test]
fn normalized_record_carries_topic_and_time_of_day() {
    let processed = normalize_record(&raw("r1", "Is the Zenbook PRICE worth it?"), &config());
    assert_eq!(processed.topic_label, TopicLabel::PricingBudget);
    // 2024-01-02 15:30 UTC was a Tuesday.
    assert_eq!(processed.hour, 15);
    assert_eq!(processed.day_of_week, 1);
}
