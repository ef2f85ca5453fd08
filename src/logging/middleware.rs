use axum::{extract::Request, http::header, middleware::Next, response::Response};
use std::time::Instant;
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};

/// Health probes are polled; they log at debug only.
fn is_probe(path: &str) -> bool {
    path == "/health" || path.starts_with("/health/")
}

pub async fn log_request(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let probe = is_probe(&path);

    let req_id: String = request
        .extensions()
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    // never log the session itself
    let has_session = request.headers().contains_key(header::COOKIE)
        || request.headers().contains_key(header::AUTHORIZATION);

    if probe {
        tracing::debug!(request_id = %req_id, method = %method, path = %path, "incoming request");
    } else {
        tracing::info!(
            request_id = %req_id,
            method = %method,
            path = %path,
            has_session,
            "incoming request"
        );
    }

    let response = next.run(request).await;

    let duration_ms = start.elapsed().as_millis();
    let status = response.status();
    let redirect = response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if status.is_server_error() {
        tracing::error!(
            request_id = %req_id,
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration_ms,
            "request completed with error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            request_id = %req_id,
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration_ms,
            "request completed with client error"
        );
    } else if status.is_redirection() {
        tracing::info!(
            request_id = %req_id,
            method = %method,
            path = %path,
            status = %status,
            location = %redirect,
            duration_ms = %duration_ms,
            "request redirected"
        );
    } else if probe {
        tracing::debug!(request_id = %req_id, path = %path, duration_ms = %duration_ms, "probe served");
    } else {
        tracing::info!(
            request_id = %req_id,
            method = %method,
            path = %path,
            status = %status,
            duration_ms = %duration_ms,
            "request completed"
        );
    }

    response
}

pub fn request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::x_request_id(MakeRequestUuid)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}
