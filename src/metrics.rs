use anyhow::{Context, Result};
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the process-wide Prometheus recorder. Call once, at startup.
    pub fn init() -> Result<Self> {
        // Use default buckets to avoid API differences across crate versions.
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;

        describe_counter!("haiku_generated_total", "Haikus that passed 5-7-5 validation.");
        describe_counter!(
            "haiku_rejected_total",
            "Generated texts discarded for the wrong shape."
        );
        describe_counter!(
            "haiku_rate_limit_waits_total",
            "Generation calls that had to wait for the next window."
        );
        describe_counter!("translation_cache_hits_total", "Translations served from cache.");
        describe_counter!(
            "translation_cache_misses_total",
            "Translations that needed a generation call."
        );
        describe_gauge!("haiku_store_size", "Haikus currently held in memory.");
        describe_gauge!("haiku_live_connections", "Open live update connections.");

        Ok(Self { handle })
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
