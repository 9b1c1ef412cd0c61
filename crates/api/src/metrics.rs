//! Prometheus metrics for the API server.
//!
//! Requests are labelled by route template (`asn/{key}`), never by the
//! concrete path, so ids in URLs don't blow up label cardinality.

use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use traffic_ops_core::{types::ApiMethod, Error, Result};

const REQUEST_DURATION: &str = "traffic_ops_request_duration_seconds";

/// Latency buckets for API calls, in seconds.
const DURATION_BUCKETS: &[f64] = &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5];

/// Initialize the Prometheus recorder and return the handle `/metrics` renders.
pub fn setup_metrics_recorder() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .set_buckets_for_metric(Matcher::Full(REQUEST_DURATION.to_string()), DURATION_BUCKETS)
        .map_err(|e| Error::internal(format!("Invalid histogram buckets: {}", e)))?
        .install_recorder()
        .map_err(|e| Error::internal(format!("Failed to install Prometheus recorder: {}", e)))?;

    tracing::info!("Prometheus metrics recorder initialized");
    Ok(handle)
}

/// How a request ended, as seen in the response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// OPTIONS answered with the allowed methods.
    Preflight,
    /// Envelope carried a payload and an info alert.
    Success,
    /// Envelope carried an error alert caused by the caller.
    Rejected,
    /// Envelope carried an error alert caused by the server.
    Failed,
}

impl RequestOutcome {
    pub fn classify(method: Option<ApiMethod>, status: u16) -> Self {
        match (method, status) {
            (Some(ApiMethod::Options), 200) => Self::Preflight,
            (_, 200..=299) => Self::Success,
            (_, 500..=599) => Self::Failed,
            _ => Self::Rejected,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Preflight => "preflight",
            Self::Success => "success",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

/// Resource a route template belongs to: `asn/{key}` -> `asn`.
fn resource_of(template: &str) -> &str {
    template.split('/').next().unwrap_or(template)
}

/// Record one dispatched API request.
pub fn track_request(method: &str, template: &str, status: u16, latency_sec: f64) {
    let outcome = RequestOutcome::classify(method.parse().ok(), status);

    metrics::counter!(
        "traffic_ops_requests_total",
        "method" => method.to_string(),
        "route" => template.to_string(),
        "outcome" => outcome.as_str()
    )
    .increment(1);

    metrics::histogram!(
        REQUEST_DURATION,
        "resource" => resource_of(template).to_string(),
        "method" => method.to_string()
    )
    .record(latency_sec);

    if outcome == RequestOutcome::Failed {
        tracing::warn!(method = method, route = template, status = status, "API request failed");
    }
}

/// Count a login attempt by kind (`password` or `token`) and outcome.
pub fn track_login(kind: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!("traffic_ops_logins_total", "kind" => kind, "outcome" => outcome).increment(1);
}
