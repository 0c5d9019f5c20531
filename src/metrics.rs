use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Initialize the Prometheus recorder and register series descriptions so
    /// they show up on /metrics before first increment.
    pub fn init() -> Self {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .expect("prometheus: install recorder");
        describe_all();
        Self { handle }
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}

fn describe_all() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("fetch_articles_total", "Articles parsed from sources.");
        describe_counter!("fetch_errors_total", "Per-source fetch failures.");
        describe_counter!(
            "aggregator_cache_hits_total",
            "Layered read path served from the in-memory cache."
        );
        describe_counter!(
            "aggregator_cache_misses_total",
            "Layered read path that had to consult the store."
        );
        describe_counter!(
            "aggregator_fetch_errors_total",
            "Fan-out fetches contained by the aggregator."
        );
        describe_counter!("sync_runs_total", "Completed sync passes.");
        describe_counter!(
            "sync_source_errors_total",
            "Per-source sync failures isolated into errors[]."
        );
        describe_gauge!("sync_last_run_ts", "Unix ts of the last sync pass.");
    });
}
