//! Prometheus metrics definitions and HTTP server

use hyper::body::Incoming;
use hyper::{Method, Request, Response, StatusCode};
use prometheus::{
    register_counter_vec, register_gauge_vec, register_histogram_vec, CounterVec, Encoder,
    GaugeVec, HistogramVec, TextEncoder,
};
use tracing::error;

use crate::http::{self, Body};

lazy_static::lazy_static! {
    /// Total number of reconciliations
    pub static ref RECONCILIATIONS: CounterVec = register_counter_vec!(
        "builder_examples_reconciliations_total",
        "Total number of reconciliations",
        &["kind"]
    ).unwrap();

    /// Total number of reconciliation errors
    pub static ref RECONCILIATION_ERRORS: CounterVec = register_counter_vec!(
        "builder_examples_reconciliation_errors_total",
        "Total number of reconciliation errors",
        &["kind"]
    ).unwrap();

    /// Reconciliation duration histogram
    pub static ref RECONCILE_DURATION: HistogramVec = register_histogram_vec!(
        "builder_examples_reconcile_duration_seconds",
        "Duration of reconciliations in seconds",
        &["kind"],
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    ).unwrap();

    /// Last pod count written per ReplicaSet
    pub static ref POD_COUNT: GaugeVec = register_gauge_vec!(
        "builder_examples_replicaset_pod_count",
        "Pods matching each ReplicaSet's template labels",
        &["namespace", "name"]
    ).unwrap();

    /// Admission requests by webhook path and outcome
    pub static ref ADMISSION_REQUESTS: CounterVec = register_counter_vec!(
        "builder_examples_admission_requests_total",
        "Total number of admission requests",
        &["path", "outcome"]
    ).unwrap();
}

/// Start the metrics HTTP server
pub async fn serve(port: u16) -> anyhow::Result<()> {
    http::serve("Metrics", port, |req: Request<Incoming>| async move {
        route(req.method(), req.uri().path())
    })
    .await
}

/// Route a metrics or probe request
pub fn route(method: &Method, path: &str) -> Response<Body> {
    if method != Method::GET {
        return http::text(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed");
    }
    match path {
        "/metrics" => metrics_response(),
        "/healthz" | "/health" | "/readyz" | "/ready" => http::text(StatusCode::OK, "ok"),
        _ => http::text(StatusCode::NOT_FOUND, "Not Found"),
    }
}

fn metrics_response() -> Response<Body> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
        return http::text(StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics");
    }

    http::response(StatusCode::OK, Some(prometheus::TEXT_FORMAT), buffer)
}
