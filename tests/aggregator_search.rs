// tests/aggregator_search.rs
// Scored search ranking over a persisted corpus: monotonicity of the title
// bonus, date-range cutoffs, filters, and the empty-result contract.

use std::sync::Arc;

use ai_news_aggregator::{
    Aggregator, Article, ArticleFetcher, EngineResult, SearchFilters, Source, SourceKind,
    SourceRegistry, SqliteStore, Timeframe,
};
use async_trait::async_trait;
use chrono::{Duration, Utc};

struct NoopFetcher;

#[async_trait]
impl ArticleFetcher for NoopFetcher {
    async fn fetch(&self, _source: &Source) -> EngineResult<Vec<Article>> {
        Ok(Vec::new())
    }
}

fn mk(url: &str, title: &str, description: &str, tags: &[&str], days_ago: i64) -> Article {
    Article {
        id: url.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        content: None,
        url: url.to_string(),
        source_name: "Wire".into(),
        published_at: Utc::now() - Duration::days(days_ago),
        category: "general".into(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        image_url: None,
        author: None,
    }
}

fn mk_aggregator(store: &SqliteStore) -> Aggregator {
    store
        .upsert_source_by_name(&Source {
            id: "wire".into(),
            name: "Wire".into(),
            url: "https://example.com/feed".into(),
            kind: SourceKind::Feed,
            category: "general".into(),
            language: "en".into(),
            is_active: true,
            last_update: None,
        })
        .unwrap();
    let registry = Arc::new(SourceRegistry::new(store.clone()));
    Aggregator::new(store.clone(), registry, Arc::new(NoopFetcher))
}

#[tokio::test]
async fn title_hit_ranks_above_description_hit() {
    let store = SqliteStore::in_memory().unwrap();
    store
        .save_articles(&[
            mk(
                "https://e.com/body",
                "Weekly roundup",
                "ChatGPT reached a new milestone.",
                &[],
                1,
            ),
            mk(
                "https://e.com/title",
                "ChatGPT milestone announced",
                "Details inside.",
                &[],
                2,
            ),
        ])
        .unwrap();
    let aggregator = mk_aggregator(&store);

    let results = aggregator
        .search_news("ChatGPT", 10, Timeframe::Week, None)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].url, "https://e.com/title");
    assert_eq!(results[1].url, "https://e.com/body");
}

#[tokio::test]
async fn no_matches_in_window_returns_empty_not_error() {
    let store = SqliteStore::in_memory().unwrap();
    // Only an old matching article and a recent non-matching one.
    store
        .save_articles(&[
            mk(
                "https://e.com/old",
                "ChatGPT retrospective",
                "x",
                &[],
                30,
            ),
            mk("https://e.com/recent", "Robotics funding", "y", &[], 1),
        ])
        .unwrap();
    let aggregator = mk_aggregator(&store);

    let results = aggregator
        .search_news("ChatGPT", 2, Timeframe::Week, None)
        .await
        .unwrap();
    assert!(results.is_empty());
}

#[tokio::test]
async fn month_window_includes_what_week_excludes() {
    let store = SqliteStore::in_memory().unwrap();
    store
        .save_articles(&[mk(
            "https://e.com/tendays",
            "ChatGPT enterprise tier",
            "x",
            &[],
            10,
        )])
        .unwrap();
    let aggregator = mk_aggregator(&store);

    let week = aggregator
        .search_news("chatgpt", 10, Timeframe::Week, None)
        .await
        .unwrap();
    assert!(week.is_empty());

    let month = aggregator
        .search_news("chatgpt", 10, Timeframe::Month, None)
        .await
        .unwrap();
    assert_eq!(month.len(), 1);
}

#[tokio::test]
async fn search_matching_is_case_insensitive() {
    let store = SqliteStore::in_memory().unwrap();
    store
        .save_articles(&[mk(
            "https://e.com/caps",
            "OPENAI SHIPS NEW MODEL",
            "x",
            &[],
            1,
        )])
        .unwrap();
    let aggregator = mk_aggregator(&store);

    let results = aggregator
        .search_news("openai", 10, Timeframe::Week, None)
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
}

#[tokio::test]
async fn tag_only_match_is_found_and_limit_truncates() {
    let store = SqliteStore::in_memory().unwrap();
    store
        .save_articles(&[
            mk("https://e.com/t1", "Story one", "x", &["llm"], 1),
            mk("https://e.com/t2", "Story two", "y", &["llm"], 2),
            mk("https://e.com/t3", "Story three", "z", &["llm"], 3),
        ])
        .unwrap();
    let aggregator = mk_aggregator(&store);

    let results = aggregator
        .search_news("llm", 2, Timeframe::Week, None)
        .await
        .unwrap();
    assert_eq!(results.len(), 2);
    // equal scores keep newest-first candidate order
    assert_eq!(results[0].url, "https://e.com/t1");
}

#[tokio::test]
async fn filters_narrow_by_source_and_category() {
    let store = SqliteStore::in_memory().unwrap();
    let mut research = mk("https://e.com/r", "GPT in research", "x", &[], 1);
    research.category = "research".into();
    store
        .save_articles(&[research, mk("https://e.com/g", "GPT general", "x", &[], 1)])
        .unwrap();
    let aggregator = mk_aggregator(&store);

    let filters = SearchFilters {
        category: Some("research".into()),
        ..Default::default()
    };
    let results = aggregator
        .search_news("gpt", 10, Timeframe::Week, Some(&filters))
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].category, "research");
}

#[tokio::test]
async fn trending_topics_count_tags_in_window() {
    let store = SqliteStore::in_memory().unwrap();
    store
        .save_articles(&[
            mk("https://e.com/1", "a", "x", &["agents", "llm"], 1),
            mk("https://e.com/2", "b", "y", &["agents"], 2),
            mk("https://e.com/3", "c", "z", &["agents", "robotics"], 40),
        ])
        .unwrap();
    let aggregator = mk_aggregator(&store);

    let topics = aggregator
        .get_trending_topics(Timeframe::Week)
        .await
        .unwrap();
    assert_eq!(topics[0], "agents");
    assert!(topics.contains(&"llm".to_string()));
    assert!(!topics.contains(&"robotics".to_string()));
}
