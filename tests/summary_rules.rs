// tests/summary_rules.rs
// Analyzer summary path: lazily generated, cached in the store, reproducible
// rule-based output, capability fallback.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use ai_news_aggregator::analyze::ai_adapter::{
    AiSummaryPayload, AiSummaryRequest, DisabledClient, SummaryClient,
};
use ai_news_aggregator::error::EngineError;
use ai_news_aggregator::model::{Impact, Sentiment};
use ai_news_aggregator::{
    Aggregator, Analyzer, Article, ArticleFetcher, EngineResult, Source, SourceKind,
    SourceRegistry, SqliteStore,
};
use async_trait::async_trait;
use chrono::Utc;

struct NoopFetcher;

#[async_trait]
impl ArticleFetcher for NoopFetcher {
    async fn fetch(&self, _source: &Source) -> EngineResult<Vec<Article>> {
        Ok(Vec::new())
    }
}

/// Counts summarize calls so tests can prove the store cache short-circuits.
struct CountingClient {
    calls: AtomicUsize,
}

#[async_trait]
impl SummaryClient for CountingClient {
    async fn summarize(&self, _req: &AiSummaryRequest<'_>) -> Option<AiSummaryPayload> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(AiSummaryPayload {
            summary: "External summary.".into(),
            key_points: vec!["External point".into()],
            sentiment: "positive".into(),
            impact: "high".into(),
            related_topics: vec!["ai".into()],
        })
    }
    fn is_enabled(&self) -> bool {
        true
    }
    fn provider_name(&self) -> &'static str {
        "counting"
    }
}

/// Enabled but always failing, to exercise the degraded-analysis fallback.
struct FlakyClient;

#[async_trait]
impl SummaryClient for FlakyClient {
    async fn summarize(&self, _req: &AiSummaryRequest<'_>) -> Option<AiSummaryPayload> {
        None
    }
    fn is_enabled(&self) -> bool {
        true
    }
    fn provider_name(&self) -> &'static str {
        "flaky"
    }
}

fn mk_analyzer(store: &SqliteStore, ai: Arc<dyn SummaryClient>) -> Analyzer {
    let registry = Arc::new(SourceRegistry::new(store.clone()));
    let aggregator = Arc::new(Aggregator::new(
        store.clone(),
        registry,
        Arc::new(NoopFetcher),
    ));
    Analyzer::new(store.clone(), aggregator, ai)
}

fn seed(store: &SqliteStore) {
    store
        .save_articles(&[Article {
            id: "a1".into(),
            title: "OpenAI announces major GPT release".into(),
            description: "A breakthrough in machine learning. Benchmarks improve. More soon."
                .into(),
            content: None,
            url: "https://example.com/a1".into(),
            source_name: "Wire".into(),
            published_at: Utc::now(),
            category: "general".into(),
            tags: vec![
                "gpt".into(),
                "openai".into(),
                "llm".into(),
                "ai".into(),
                "ml".into(),
                "overflow".into(),
            ],
            image_url: None,
            author: None,
        }])
        .unwrap();
}

#[tokio::test]
async fn rule_based_summary_matches_the_fixed_algorithm() {
    let store = SqliteStore::in_memory().unwrap();
    seed(&store);
    let analyzer = mk_analyzer(&store, Arc::new(DisabledClient));

    let summary = analyzer.get_summary("a1", true).await.unwrap();
    assert_eq!(
        summary.summary_text,
        "A breakthrough in machine learning. Benchmarks improve."
    );
    assert!(summary
        .key_points
        .contains(&"Covers gpt technology".to_string()));
    assert!(summary
        .key_points
        .contains(&"News involving openai".to_string()));
    assert!(summary
        .key_points
        .contains(&"New product release".to_string()));
    assert_eq!(summary.sentiment, Sentiment::Positive);
    assert_eq!(summary.impact, Impact::High);
    // related topics cap at the first five tags
    assert_eq!(summary.related_topics.len(), 5);
    assert!(!summary.related_topics.contains(&"overflow".to_string()));
}

#[tokio::test]
async fn summary_is_cached_after_first_generation() {
    let store = SqliteStore::in_memory().unwrap();
    seed(&store);
    let client = Arc::new(CountingClient {
        calls: AtomicUsize::new(0),
    });
    let analyzer = mk_analyzer(&store, client.clone());

    let first = analyzer.get_summary("a1", true).await.unwrap();
    let second = analyzer.get_summary("a1", true).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(client.calls.load(Ordering::SeqCst), 1, "cache must short-circuit");
}

#[tokio::test]
async fn failing_capability_degrades_to_rules_silently() {
    let store = SqliteStore::in_memory().unwrap();
    seed(&store);
    let analyzer = mk_analyzer(&store, Arc::new(FlakyClient));

    let summary = analyzer.get_summary("a1", true).await.unwrap();
    // rule-based output, not an error
    assert_eq!(
        summary.summary_text,
        "A breakthrough in machine learning. Benchmarks improve."
    );
}

#[tokio::test]
async fn unknown_article_surfaces_not_found() {
    let store = SqliteStore::in_memory().unwrap();
    let analyzer = mk_analyzer(&store, Arc::new(DisabledClient));
    let err = analyzer.get_summary("ghost", true).await.unwrap_err();
    assert!(matches!(err, EngineError::ArticleNotFound(_)));
}
