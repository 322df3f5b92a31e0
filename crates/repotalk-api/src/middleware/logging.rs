use axum::{
    extract::{MatchedPath, Request},
    http::{Method, StatusCode},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::Instrument;

/// How a finished request is reported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Outcome {
    Preflight,
    Served,
    Rejected,
    Failed,
}

impl Outcome {
    pub(crate) fn classify(method: &Method, status: StatusCode) -> Self {
        if status.is_server_error() {
            Outcome::Failed
        } else if status.is_client_error() {
            Outcome::Rejected
        } else if method == Method::OPTIONS {
            Outcome::Preflight
        } else {
            Outcome::Served
        }
    }
}

/// Runs the request inside a `request` span (method and matched route, never
/// the query string) and reports status and latency when it finishes.
///
/// Pre-flights go to debug, 4xx and 2xx to info, 5xx to warn.
pub async fn log_request(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| req.uri().path().to_owned());
    let span = tracing::info_span!("request", method = %method, route = %route);

    async move {
        let start = Instant::now();
        let response = next.run(req).await;

        let status = response.status().as_u16();
        let elapsed_ms = start.elapsed().as_millis() as u64;
        match Outcome::classify(&method, response.status()) {
            Outcome::Preflight => tracing::debug!(status, elapsed_ms, "Pre-flight answered"),
            Outcome::Served => tracing::info!(status, elapsed_ms, "Request served"),
            Outcome::Rejected => tracing::info!(status, elapsed_ms, "Request rejected"),
            Outcome::Failed => tracing::warn!(status, elapsed_ms, "Request failed"),
        }

        response
    }
    .instrument(span)
    .await
}
