//! Source registry: the persisted list of news sources, a built-in seed used
//! when the registry is empty, and best-effort liveness probing.

use futures::future::join_all;
use std::time::Duration;

use crate::error::EngineResult;
use crate::model::{Source, SourceKind};
use crate::store::SqliteStore;

/// Probe timeout per source.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct SourceRegistry {
    store: SqliteStore,
    http: reqwest::Client,
}

impl SourceRegistry {
    pub fn new(store: SqliteStore) -> Self {
        let http = reqwest::Client::builder()
            .user_agent("ai-news-aggregator/0.1 (+github.com/lumlich/ai-news-aggregator)")
            .connect_timeout(PROBE_TIMEOUT)
            .timeout(PROBE_TIMEOUT)
            .build()
            .expect("reqwest client");
        Self { store, http }
    }

    /// Built-in seed list, persisted on first use when the registry is empty.
    pub fn seed_sources() -> Vec<Source> {
        let mk = |id: &str, name: &str, url: &str, category: &str| Source {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            kind: SourceKind::Feed,
            category: category.into(),
            language: "en".into(),
            is_active: true,
            last_update: None,
        };
        vec![
            mk(
                "techcrunch-ai",
                "TechCrunch AI",
                "https://techcrunch.com/tag/artificial-intelligence/feed/",
                "general",
            ),
            mk(
                "venturebeat-ai",
                "VentureBeat AI",
                "https://venturebeat.com/category/ai/feed/",
                "business",
            ),
            mk(
                "mit-tech-review",
                "MIT Technology Review",
                "https://www.technologyreview.com/topic/artificial-intelligence/feed",
                "research",
            ),
            mk(
                "ai-news",
                "AI News",
                "https://artificialintelligence-news.com/feed/",
                "general",
            ),
            mk(
                "the-verge-ai",
                "The Verge AI",
                "https://www.theverge.com/ai-artificial-intelligence/rss/index.xml",
                "products",
            ),
        ]
    }

    /// List all sources. When the registry is empty the seed list is persisted
    /// (idempotent upsert by name) and returned. With `include_live_status`,
    /// every source gets a HEAD probe; a probe failure only degrades that
    /// item's `is_active`, it never raises.
    pub async fn list_sources(&self, include_live_status: bool) -> EngineResult<Vec<Source>> {
        let sources = self.ensure_seeded()?;
        if !include_live_status {
            return Ok(sources);
        }

        let now = chrono::Utc::now();
        let probes = sources.iter().map(|s| self.probe(s));
        let alive = join_all(probes).await;

        Ok(sources
            .into_iter()
            .zip(alive)
            .map(|(mut s, ok)| {
                s.is_active = ok;
                s.last_update = Some(now);
                s
            })
            .collect())
    }

    /// Sources eligible for the fetch fan-out: persisted flag only, probes are
    /// a status view and do not gate fetching.
    pub async fn active_sources(&self) -> EngineResult<Vec<Source>> {
        Ok(self
            .ensure_seeded()?
            .into_iter()
            .filter(|s| s.is_active)
            .collect())
    }

    pub fn get_by_name(&self, name: &str) -> EngineResult<Option<Source>> {
        self.store.get_source_by_name(name)
    }

    fn ensure_seeded(&self) -> EngineResult<Vec<Source>> {
        let sources = self.store.list_sources()?;
        if !sources.is_empty() {
            return Ok(sources);
        }
        tracing::info!("source registry empty, persisting built-in seed list");
        for source in Self::seed_sources() {
            self.store.upsert_source_by_name(&source)?;
        }
        self.store.list_sources()
    }

    async fn probe(&self, source: &Source) -> bool {
        match self.http.head(&source.url).send().await {
            Ok(resp) => resp.status().is_success(),
            Err(e) => {
                tracing::debug!(source = %source.name, error = %e, "liveness probe failed");
                false
            }
        }
    }
}
