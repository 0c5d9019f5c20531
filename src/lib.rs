// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod aggregator;
pub mod analyze;
pub mod api;
pub mod config;
pub mod error;
pub mod fetch;
pub mod metrics;
pub mod model;
pub mod sources;
pub mod store;
pub mod sync;

// ---- Re-exports for stable public API ----
pub use crate::aggregator::{Aggregator, SearchFilters};
pub use crate::analyze::ai_adapter;
pub use crate::analyze::Analyzer;
pub use crate::api::{create_router, AppState};
pub use crate::error::{EngineError, EngineResult};
pub use crate::fetch::{ArticleFetcher, HttpFetcher};
pub use crate::model::{Article, Source, SourceKind, Summary, Timeframe, TrendReport};
pub use crate::sources::SourceRegistry;
pub use crate::store::SqliteStore;
pub use crate::sync::{SyncOptions, SyncResult, SyncService};

use std::sync::Arc;

/// Wire the full application state on top of a store. The summarization
/// capability is resolved from the environment; tests usually build their own
/// `AppState` with stub fetchers instead.
pub fn build_state(store: SqliteStore) -> AppState {
    let registry = Arc::new(SourceRegistry::new(store.clone()));
    let fetcher: Arc<dyn ArticleFetcher> = Arc::new(HttpFetcher::new());
    let aggregator = Arc::new(Aggregator::new(
        store.clone(),
        registry.clone(),
        fetcher.clone(),
    ));
    let analyzer = Arc::new(Analyzer::new(
        store.clone(),
        aggregator.clone(),
        ai_adapter::build_client_from_env(),
    ));
    let sync = Arc::new(SyncService::new(store.clone(), registry.clone(), fetcher));
    AppState {
        aggregator,
        analyzer,
        sync,
        registry,
        store,
    }
}
