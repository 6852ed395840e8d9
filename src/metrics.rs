//! Process-wide Prometheus metrics.
//!
//! The recorder is installed once at startup through [`init`]; afterwards only
//! the counters and histograms it owns change.

use metrics::{Unit, counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::OnceLock;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub const UPLOADS_TOTAL: &str = "gateway_uploads_total";
pub const UPLOAD_FAILURES_TOTAL: &str = "gateway_upload_failures_total";
pub const UPLOAD_DURATION_SECONDS: &str = "gateway_upload_duration_seconds";
pub const HTTP_REQUESTS_TOTAL: &str = "gateway_http_requests_total";

/// Matches the exporter's own upkeep period.
pub const UPKEEP_INTERVAL: Duration = Duration::from_secs(5);

static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Installs the global Prometheus recorder, or returns the handle of the one
/// already installed.
pub fn init() -> anyhow::Result<PrometheusHandle> {
    if let Some(handle) = HANDLE.get() {
        return Ok(handle.clone());
    }

    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            describe();
            Ok(HANDLE.get_or_init(|| handle).clone())
        }
        // Lost an install race: keep the handle that won.
        Err(e) => HANDLE.get().cloned().ok_or_else(|| e.into()),
    }
}

/// Drains buffered histogram samples on a fixed interval so they do not pile up
/// between scrapes.
pub fn spawn_upkeep(handle: PrometheusHandle, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            handle.run_upkeep();
        }
    })
}

fn describe() {
    describe_counter!(UPLOADS_TOTAL, "Objects written to the storage backend");
    describe_counter!(
        UPLOAD_FAILURES_TOTAL,
        "Uploads that failed after reaching the storage backend stage"
    );
    describe_histogram!(
        UPLOAD_DURATION_SECONDS,
        Unit::Seconds,
        "Duration of the storage backend write"
    );
    describe_counter!(HTTP_REQUESTS_TOTAL, "HTTP requests handled");
}

pub fn record_upload(bucket: &str, region: &str, elapsed: Duration) {
    let labels = [
        ("bucket", bucket.to_string()),
        ("region", region.to_string()),
    ];
    counter!(UPLOADS_TOTAL, &labels).increment(1);
    histogram!(UPLOAD_DURATION_SECONDS, &labels).record(elapsed.as_secs_f64());
}

pub fn record_upload_failure(bucket: &str, region: &str) {
    let labels = [
        ("bucket", bucket.to_string()),
        ("region", region.to_string()),
    ];
    counter!(UPLOAD_FAILURES_TOTAL, &labels).increment(1);
}

pub fn record_http_request(method: &str, status: u16) {
    counter!(
        HTTP_REQUESTS_TOTAL,
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Finds the sample value of the first line starting with `prefix` in a
/// Prometheus text rendering.
#[cfg(test)]
pub(crate) fn sample_value(rendered: &str, prefix: &str) -> Option<f64> {
    rendered
        .lines()
        .find(|line| line.starts_with(prefix))
        .and_then(|line| line.rsplit(' ').next())
        .and_then(|value| value.parse().ok())
}
