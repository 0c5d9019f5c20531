//! Aggregation core: layered cache → store → live-fetch read path, scored
//! full-text search ranking, and trending-topic frequency counts.
//!
//! All state (the TTL result cache) is owned by the instance and injected via
//! the constructor so tests can run several independent aggregators.

use metrics::counter;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::Deserialize;

use crate::error::{EngineError, EngineResult};
use crate::fetch::ArticleFetcher;
use crate::model::{Article, Timeframe};
use crate::sources::SourceRegistry;
use crate::store::SqliteStore;

/// Result-cache TTL. Mirrors the upstream 5-minute window.
const CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Candidate-pool size used when search and trend queries widen a read before
/// filtering and ranking in memory.
const SEARCH_POOL: usize = 1000;

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SearchFilters {
    pub category: Option<String>,
    pub source: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl SearchFilters {
    fn is_empty(&self) -> bool {
        self.category.is_none() && self.source.is_none() && self.tags.is_empty()
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct CacheKey {
    category: Option<String>,
    limit: usize,
}

struct CacheEntry {
    at: Instant,
    data: Vec<Article>,
}

pub struct Aggregator {
    store: SqliteStore,
    registry: Arc<SourceRegistry>,
    fetcher: Arc<dyn ArticleFetcher>,
    cache: Mutex<HashMap<CacheKey, CacheEntry>>,
    cache_ttl: Duration,
}

impl Aggregator {
    pub fn new(
        store: SqliteStore,
        registry: Arc<SourceRegistry>,
        fetcher: Arc<dyn ArticleFetcher>,
    ) -> Self {
        Self::with_cache_ttl(store, registry, fetcher, CACHE_TTL)
    }

    pub fn with_cache_ttl(
        store: SqliteStore,
        registry: Arc<SourceRegistry>,
        fetcher: Arc<dyn ArticleFetcher>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            store,
            registry,
            fetcher,
            cache: Mutex::new(HashMap::new()),
            cache_ttl,
        }
    }

    /// Layered read path: fresh cache entry → store → live fan-out when the
    /// store comes up short. Fetched articles are written through to the store
    /// before the merged result is returned, and every successful resolution
    /// refreshes the cache entry.
    pub async fn get_latest(
        &self,
        limit: usize,
        category: Option<&str>,
    ) -> EngineResult<Vec<Article>> {
        let key = CacheKey {
            category: category.map(str::to_string),
            limit,
        };

        if let Some(hit) = self.cache_lookup(&key) {
            counter!("aggregator_cache_hits_total").increment(1);
            return Ok(hit);
        }
        counter!("aggregator_cache_misses_total").increment(1);

        let stored = self.store.get_latest(limit, category)?;
        let result = if stored.len() >= limit {
            stored
        } else {
            let fetched = self.fan_out_fetch().await?;
            // Write-through: persist the live results before answering so the
            // escalation also repairs a thin store.
            self.store.save_articles(&fetched)?;
            merge_latest(stored, fetched, limit, category)
        };

        self.cache_insert(key, result.clone());
        Ok(result)
    }

    /// Scored full-text search. Candidates come from the same layered read
    /// path as `get_latest` (so a thin store escalates to a live fetch), then
    /// date/category/source/tag filters apply before ranking.
    pub async fn search_news(
        &self,
        query: &str,
        limit: usize,
        date_range: Timeframe,
        filters: Option<&SearchFilters>,
    ) -> EngineResult<Vec<Article>> {
        let pool = self.get_latest(SEARCH_POOL, None).await?;

        let cutoff = date_range.cutoff(chrono::Utc::now());
        let mut candidates: Vec<Article> = pool
            .into_iter()
            .filter(|a| a.published_at >= cutoff)
            .collect();
        if let Some(f) = filters.filter(|f| !f.is_empty()) {
            candidates.retain(|a| matches_filters(a, f));
        }

        let mut ranked = rank_articles(candidates, query);
        ranked.truncate(limit);
        Ok(ranked)
    }

    /// Top 10 tags by frequency over the date-filtered candidate set.
    pub async fn get_trending_topics(&self, timeframe: Timeframe) -> EngineResult<Vec<String>> {
        let pool = self.get_latest(SEARCH_POOL, None).await?;
        let cutoff = timeframe.cutoff(chrono::Utc::now());

        let mut counts: HashMap<&str, usize> = HashMap::new();
        for article in pool.iter().filter(|a| a.published_at >= cutoff) {
            for tag in &article.tags {
                *counts.entry(tag.as_str()).or_insert(0) += 1;
            }
        }

        let mut tally: Vec<(&str, usize)> = counts.into_iter().collect();
        // Count descending, then alphabetical so equal counts order
        // deterministically.
        tally.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        Ok(tally
            .into_iter()
            .take(10)
            .map(|(tag, _)| tag.to_string())
            .collect())
    }

    /// Live articles from one named source. An unknown name is a request
    /// error; a fetch failure degrades to whatever the store holds for that
    /// source.
    pub async fn get_news_by_source(
        &self,
        source_name: &str,
        limit: usize,
    ) -> EngineResult<Vec<Article>> {
        let source = self
            .registry
            .get_by_name(source_name)?
            .ok_or_else(|| EngineError::SourceNotFound(source_name.to_string()))?;

        match self.fetcher.fetch(&source).await {
            Ok(mut items) => {
                self.store.save_articles(&items)?;
                items.truncate(limit);
                Ok(items)
            }
            Err(e) => {
                tracing::warn!(source = %source.name, error = %e, "live fetch failed, serving store");
                self.store.get_by_source(source_name, limit)
            }
        }
    }

    /// Fetch every active source once and persist the results. The result
    /// cache is dropped afterwards so subsequent reads see the refresh.
    pub async fn refresh_news(&self) -> EngineResult<usize> {
        let fetched = self.fan_out_fetch().await?;
        let outcome = self.store.save_articles(&fetched)?;
        tracing::info!(
            fetched = fetched.len(),
            inserted = outcome.inserted,
            skipped = outcome.skipped,
            "bulk refresh complete"
        );
        self.clear_cache();
        Ok(outcome.inserted)
    }

    pub fn clear_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.clear();
        }
    }

    /// Entry count and keys, for diagnostics.
    pub fn cache_stats(&self) -> (usize, Vec<String>) {
        match self.cache.lock() {
            Ok(cache) => {
                let keys = cache
                    .keys()
                    .map(|k| {
                        format!(
                            "latest_{}_{}",
                            k.category.as_deref().unwrap_or("all"),
                            k.limit
                        )
                    })
                    .collect();
                (cache.len(), keys)
            }
            Err(_) => (0, Vec::new()),
        }
    }

    /// Parallel fetch across all active sources. Per-source failures are
    /// contained here: a failing source is logged and contributes nothing,
    /// the batch never fails.
    async fn fan_out_fetch(&self) -> EngineResult<Vec<Article>> {
        let sources = self.registry.active_sources().await?;
        let fetches = sources.iter().map(|s| self.fetcher.fetch(s));
        let results = futures::future::join_all(fetches).await;

        let mut merged = Vec::new();
        for (source, result) in sources.iter().zip(results) {
            match result {
                Ok(mut items) => merged.append(&mut items),
                Err(e) => {
                    counter!("aggregator_fetch_errors_total").increment(1);
                    tracing::warn!(source = %source.name, error = %e, "source fetch failed");
                }
            }
        }
        Ok(merged)
    }

    fn cache_lookup(&self, key: &CacheKey) -> Option<Vec<Article>> {
        let cache = self.cache.lock().ok()?;
        let entry = cache.get(key)?;
        if entry.at.elapsed() < self.cache_ttl {
            Some(entry.data.clone())
        } else {
            None
        }
    }

    fn cache_insert(&self, key: CacheKey, data: Vec<Article>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(
                key,
                CacheEntry {
                    at: Instant::now(),
                    data,
                },
            );
        }
    }
}

/// Merge store results with a live fetch: store rows win on URL collision,
/// the union is category-filtered, sorted by `published_at` descending, and
/// truncated to `limit`.
fn merge_latest(
    stored: Vec<Article>,
    fetched: Vec<Article>,
    limit: usize,
    category: Option<&str>,
) -> Vec<Article> {
    let mut seen: HashSet<String> = stored.iter().map(|a| a.url.clone()).collect();
    let mut merged = stored;
    for article in fetched {
        if seen.insert(article.url.clone()) {
            merged.push(article);
        }
    }
    if let Some(cat) = category {
        merged.retain(|a| a.category == cat);
    }
    merged.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    merged.truncate(limit);
    merged
}

fn matches_filters(article: &Article, filters: &SearchFilters) -> bool {
    if let Some(cat) = &filters.category {
        if &article.category != cat {
            return false;
        }
    }
    if let Some(src) = &filters.source {
        if &article.source_name != src {
            return false;
        }
    }
    if !filters.tags.is_empty() && !filters.tags.iter().any(|t| article.tags.contains(t)) {
        return false;
    }
    true
}

/// Per-article relevance score for a tokenized query. Case-insensitive
/// substring policy throughout: each term contributes 1 when it appears
/// anywhere in title+description+tags, plus 2 for a title hit, plus 1 for a
/// tag hit.
pub fn score_article(article: &Article, terms: &[String]) -> u32 {
    let title = article.title.to_lowercase();
    let searchable = format!(
        "{} {} {}",
        title,
        article.description.to_lowercase(),
        article.tags.join(" ").to_lowercase()
    );

    let mut score = 0;
    for term in terms {
        if searchable.contains(term.as_str()) {
            score += 1;
            if title.contains(term.as_str()) {
                score += 2;
            }
            if article
                .tags
                .iter()
                .any(|tag| tag.to_lowercase().contains(term.as_str()))
            {
                score += 1;
            }
        }
    }
    score
}

/// Rank candidates by descending score, dropping zero-score articles. The
/// sort is stable, so equal scores keep the candidate order (newest first
/// from the upstream filter).
pub fn rank_articles(candidates: Vec<Article>, query: &str) -> Vec<Article> {
    let terms: Vec<String> = query
        .to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let mut scored: Vec<(u32, Article)> = candidates
        .into_iter()
        .map(|a| (score_article(&a, &terms), a))
        .filter(|(score, _)| *score > 0)
        .collect();
    scored.sort_by(|a, b| b.0.cmp(&a.0));
    scored.into_iter().map(|(_, a)| a).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn mk(url: &str, title: &str, description: &str, tags: &[&str]) -> Article {
        Article {
            id: url.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            content: None,
            url: url.to_string(),
            source_name: "Wire".into(),
            published_at: Utc::now(),
            category: "general".into(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            image_url: None,
            author: None,
        }
    }

    #[test]
    fn title_match_outranks_body_match() {
        let in_title = mk("u1", "ChatGPT update lands", "Something else.", &[]);
        let in_body = mk("u2", "Model news", "A ChatGPT update landed.", &[]);
        let ranked = rank_articles(vec![in_body.clone(), in_title.clone()], "chatgpt");
        assert_eq!(ranked[0].url, in_title.url);
        assert_eq!(ranked[1].url, in_body.url);
    }

    #[test]
    fn tag_hits_add_one() {
        let tagged = mk("u1", "x", "y", &["chatgpt"]);
        let terms = vec!["chatgpt".to_string()];
        // any-field (tags are part of searchable) + tag bonus
        assert_eq!(score_article(&tagged, &terms), 2);
    }

    #[test]
    fn zero_score_articles_are_dropped() {
        let ranked = rank_articles(vec![mk("u1", "nothing", "relevant", &[])], "quantum");
        assert!(ranked.is_empty());
    }

    #[test]
    fn equal_scores_keep_candidate_order() {
        let a = mk("u1", "gpt story one", "", &[]);
        let b = mk("u2", "gpt story two", "", &[]);
        let ranked = rank_articles(vec![a.clone(), b.clone()], "gpt");
        assert_eq!(ranked[0].url, a.url);
        assert_eq!(ranked[1].url, b.url);
    }

    #[test]
    fn multi_term_queries_accumulate() {
        let both = mk("u1", "OpenAI GPT release", "", &[]);
        let one = mk("u2", "OpenAI platform", "", &[]);
        let terms: Vec<String> = vec!["openai".into(), "gpt".into()];
        assert!(score_article(&both, &terms) > score_article(&one, &terms));
    }

    #[test]
    fn merge_prefers_stored_rows_and_sorts_desc() {
        let now = Utc::now();
        let mut stored = mk("https://e.com/a", "stored", "", &[]);
        stored.published_at = now - chrono::Duration::hours(2);
        let mut dup = mk("https://e.com/a", "fetched dup", "", &[]);
        dup.published_at = now;
        let mut fresh = mk("https://e.com/b", "fetched fresh", "", &[]);
        fresh.published_at = now - chrono::Duration::hours(1);

        let merged = merge_latest(vec![stored.clone()], vec![dup, fresh.clone()], 10, None);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged[0].url, fresh.url);
        assert_eq!(merged[1].title, "stored");
    }
}
