use std::time::{Duration, Instant};

use metrics::counter;
use tracing::{Level, debug, info, span};

use crate::models::{Anomaly, PageExtraction};

/// Install the fmt subscriber on stderr. Verbose mode logs debug output for
/// this crate; otherwise only errors unless `RUST_LOG` says otherwise.
pub fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "serp_scraper=debug,serp_scraper_core=debug"
    } else {
        "error"
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .try_init();
}

/// Serve Prometheus metrics on `port`.
pub fn init_metrics_exporter(port: u16) -> anyhow::Result<()> {
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(([0, 0, 0, 0], port))
        .install()?;
    info!("Metrics endpoint available at http://localhost:{}/metrics", port);
    Ok(())
}

/// Count one processed page and its results, labelled by engine.
pub fn record_extraction(page: &PageExtraction) {
    let engine = page.engine.clone();
    counter!("serp_scraper_pages_total", "engine" => engine.clone()).increment(1);
    counter!("serp_scraper_results_total", "engine" => engine.clone())
        .increment(page.records.len() as u64);
    if page.no_results {
        counter!("serp_scraper_no_results_total", "engine" => engine.clone()).increment(1);
    }
    for anomaly in &page.anomalies {
        counter!(
            "serp_scraper_anomalies_total",
            "engine" => engine.clone(),
            "kind" => anomaly_kind(anomaly)
        )
        .increment(1);
    }
    debug!(
        engine = %page.engine,
        records = page.records.len(),
        anomalies = page.anomalies.len(),
        "Extraction recorded"
    );
}

fn anomaly_kind(anomaly: &Anomaly) -> &'static str {
    match anomaly {
        Anomaly::MissingLink { .. } => "missing_link",
        Anomaly::InvalidLink { .. } => "invalid_link",
        Anomaly::CountMismatch { .. } => "count_mismatch",
        Anomaly::Blocked => "blocked",
    }
}

/// A timer for measuring operation duration
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    pub fn start(name: &'static str) -> Self {
        let _span = span!(Level::DEBUG, "timer", name);
        let _enter = _span.enter();
        debug!("Starting timer: {}", name);

        Self {
            name,
            start: Instant::now(),
        }
    }

    pub fn finish(self) -> Duration {
        let duration = self.start.elapsed();
        debug!(
            timer = self.name,
            duration_ms = duration.as_millis() as u64,
            "Timer finished"
        );
        duration
    }
}
