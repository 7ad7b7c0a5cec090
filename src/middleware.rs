use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::net::SocketAddr;
use std::time::Instant;
use tracing::info;
use uuid::Uuid;

use crate::error::AvatarResult;
use crate::handlers::SharedState;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Logging middleware for request/response tracking
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let client_ip = client_ip(&request);
    let request_id = Uuid::new_v4();
    let started = Instant::now();

    info!(
        target: "avatar_server::middleware",
        %request_id,
        method = %method,
        uri = %uri,
        client_ip = %client_ip,
        "Incoming request"
    );

    let mut response = next.run(request).await;

    let status = response.status();
    info!(
        target: "avatar_server::middleware",
        %request_id,
        method = %method,
        uri = %uri,
        status = %status,
        latency_ms = started.elapsed().as_millis() as u64,
        "Request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

/// Admission control for avatar routes.
pub async fn rate_limit_middleware(
    State(state): State<SharedState>,
    request: Request,
    next: Next,
) -> AvatarResult<Response> {
    let client_ip = client_ip(&request);
    let decision = state.limiter.check(&client_ip)?;
    state.metrics.record_admission(decision.is_allowed());
    decision.into_result()?;

    Ok(next.run(request).await)
}

/// First `X-Forwarded-For` entry, else the transport peer address.
///
/// The header is trusted as-is; deployments must sit behind a proxy that
/// overwrites it, otherwise clients can pick their own rate-limit key.
pub fn client_ip(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(first_ip) = forwarded_str.split(',').next().map(str::trim) {
                if !first_ip.is_empty() {
                    return first_ip.to_string();
                }
            }
        }
    }

    if let Some(ConnectInfo(addr)) = request.extensions().get::<ConnectInfo<SocketAddr>>() {
        addr.ip().to_string()
    } else {
        "unknown".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_ip_with_forwarded_header() {
        let mut request = Request::new(axum::body::Body::empty());
        request.headers_mut().insert(
            "x-forwarded-for",
            HeaderValue::from_static("192.168.1.1, 10.0.0.1"),
        );

        assert_eq!(client_ip(&request), "192.168.1.1");
    }

    #[test]
    fn test_client_ip_from_peer_address() {
        let mut request = Request::new(axum::body::Body::empty());
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([203, 0, 113, 1], 54321))));

        assert_eq!(client_ip(&request), "203.0.113.1");
    }

    #[test]
    fn test_empty_forwarded_header_falls_through() {
        let mut request = Request::new(axum::body::Body::empty());
        request
            .headers_mut()
            .insert("x-forwarded-for", HeaderValue::from_static(" "));
        request
            .extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([198, 51, 100, 7], 80))));

        assert_eq!(client_ip(&request), "198.51.100.7");
    }

    #[test]
    fn test_client_ip_fallback() {
        let request = Request::new(axum::body::Body::empty());
        assert_eq!(client_ip(&request), "unknown");
    }
}
