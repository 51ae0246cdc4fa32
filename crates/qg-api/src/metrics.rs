//! Prometheus metrics for request traffic and quiz activity.

use std::{sync::LazyLock, time::Instant};

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use qg_core::{Completion, InputMode};
use regex::Regex;

static UUID_SEGMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .expect("static regex is valid")
});
static NUMBER_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/\d+").expect("static regex is valid"));

/// Install the Prometheus recorder
pub fn init_metrics() -> anyhow::Result<PrometheusHandle> {
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )?
        // Generation calls take seconds, not milliseconds
        .set_buckets_for_metric(
            Matcher::Full("quiz_generation_duration_seconds".to_string()),
            &[0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0, 120.0],
        )?;

    Ok(builder.install_recorder()?)
}

/// Record count and duration of every HTTP request
pub async fn track_metrics(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let path = normalize_path(req.uri().path());

    gauge!("http_requests_in_flight").increment(1.0);
    let response = next.run(req).await;
    gauge!("http_requests_in_flight").decrement(1.0);

    let status = response.status().as_u16().to_string();
    counter!(
        "http_requests_total",
        "method" => method.clone(),
        "path" => path.clone(),
        "status" => status.clone()
    )
    .increment(1);
    histogram!(
        "http_request_duration_seconds",
        "method" => method,
        "path" => path,
        "status" => status
    )
    .record(start.elapsed().as_secs_f64());

    response
}

/// Replace ids in a path with `:id` to keep label cardinality low
fn normalize_path(path: &str) -> String {
    let normalized = UUID_SEGMENT.replace_all(path, ":id");
    NUMBER_SEGMENT.replace_all(&normalized, "/:id").into_owned()
}

pub async fn metrics_handler(State(handle): State<PrometheusHandle>) -> impl IntoResponse {
    (StatusCode::OK, handle.render())
}

/// Record the outcome of one generation attempt
pub fn record_generation(mode: InputMode, outcome: &'static str, duration_secs: f64) {
    counter!(
        "quiz_generations_total",
        "mode" => mode.as_str(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("quiz_generation_duration_seconds", "mode" => mode.as_str()).record(duration_secs);
}

/// Label for a [`Completion`]
pub const fn completion_outcome(completion: Completion) -> &'static str {
    match completion {
        Completion::Ready => "success",
        Completion::Failed => "failure",
        Completion::Stale => "stale",
    }
}

pub fn record_challenge_decode(success: bool) {
    let outcome = if success { "success" } else { "invalid" };
    counter!("challenge_decodes_total", "outcome" => outcome).increment(1);
}

pub fn set_active_sessions(count: usize) {
    gauge!("quiz_sessions_active").set(count as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(
            normalize_path("/sessions/550e8400-e29b-41d4-a716-446655440000"),
            "/sessions/:id"
        );
        assert_eq!(
            normalize_path("/sessions/550e8400-e29b-41d4-a716-446655440000/files/2"),
            "/sessions/:id/files/:id"
        );
        assert_eq!(normalize_path("/topics/en"), "/topics/en");
        assert_eq!(normalize_path("/health"), "/health");
    }

    #[test]
    fn test_completion_outcome_labels() {
        assert_eq!(completion_outcome(Completion::Ready), "success");
        assert_eq!(completion_outcome(Completion::Failed), "failure");
        assert_eq!(completion_outcome(Completion::Stale), "stale");
    }
}
