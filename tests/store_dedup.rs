// tests/store_dedup.rs
// Dedup idempotence and retention cleanup against a real (in-memory) store.

use ai_news_aggregator::{Article, SqliteStore};
use chrono::{Duration, Utc};

fn mk(url: &str, days_ago: i64) -> Article {
    Article {
        id: format!("id-{}", url.rsplit('/').next().unwrap()),
        title: format!("Title {url}"),
        description: "Body text.".into(),
        content: None,
        url: url.to_string(),
        source_name: "TechCrunch AI".into(),
        published_at: Utc::now() - Duration::days(days_ago),
        category: "general".into(),
        tags: vec!["ai".into()],
        image_url: None,
        author: None,
    }
}

#[test]
fn same_url_saved_twice_yields_one_row() {
    let store = SqliteStore::in_memory().unwrap();
    let article = mk("https://example.com/story", 0);

    store.save_articles(std::slice::from_ref(&article)).unwrap();
    let outcome = store.save_articles(&[article]).unwrap();

    assert_eq!(outcome.inserted, 0);
    assert_eq!(outcome.skipped, 1);
    assert_eq!(store.count_articles().unwrap(), 1);
}

#[test]
fn five_items_three_distinct_urls_yields_three_rows() {
    let store = SqliteStore::in_memory().unwrap();
    let items = vec![
        mk("https://example.com/a", 0),
        mk("https://example.com/b", 0),
        mk("https://example.com/a", 1),
        mk("https://example.com/c", 2),
        mk("https://example.com/b", 3),
    ];
    let outcome = store.save_articles(&items).unwrap();
    assert_eq!(outcome.inserted, 3);
    assert_eq!(outcome.skipped, 2);
    assert_eq!(store.count_articles().unwrap(), 3);
}

#[test]
fn first_write_wins_on_url_conflict() {
    let store = SqliteStore::in_memory().unwrap();
    let original = mk("https://example.com/story", 0);
    let mut rewrite = mk("https://example.com/story", 0);
    rewrite.title = "Rewritten title".into();

    store.save_articles(&[original.clone()]).unwrap();
    store.save_articles(&[rewrite]).unwrap();

    let latest = store.get_latest(10, None).unwrap();
    assert_eq!(latest[0].title, original.title);
}

#[test]
fn cleanup_one_day_deletes_exactly_the_stale_article() {
    let store = SqliteStore::in_memory().unwrap();
    store
        .save_articles(&[
            mk("https://example.com/fresh", 0),
            mk("https://example.com/stale", 2),
        ])
        .unwrap();

    let deleted = store.cleanup_older_than(1).unwrap();
    assert_eq!(deleted, 1);

    let remaining = store.get_latest(10, None).unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].url, "https://example.com/fresh");
}

#[test]
fn category_and_source_reads_filter_correctly() {
    let store = SqliteStore::in_memory().unwrap();
    let mut research = mk("https://example.com/r", 0);
    research.category = "research".into();
    let mut other_source = mk("https://example.com/v", 0);
    other_source.source_name = "The Verge AI".into();
    store
        .save_articles(&[mk("https://example.com/g", 0), research, other_source])
        .unwrap();

    assert_eq!(store.get_by_category("research", 10).unwrap().len(), 1);
    assert_eq!(store.get_by_source("The Verge AI", 10).unwrap().len(), 1);
    assert_eq!(store.get_by_source("TechCrunch AI", 10).unwrap().len(), 2);
}
