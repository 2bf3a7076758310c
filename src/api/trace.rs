use std::time::Instant;

use axum::{body::Body, extract::Request, middleware::Next, response::Response};
use log::{info, warn};

/// Logs method, path, status and latency of every request.
pub async fn log_requests(req: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_owned();

    let response = next.run(req).await;

    let status = response.status();
    let latency_ms = start.elapsed().as_millis();
    if status.is_server_error() {
        warn!("{method} {path} -> {} in {latency_ms}ms", status.as_u16());
    } else {
        info!("{method} {path} -> {} in {latency_ms}ms", status.as_u16());
    }
    response
}
