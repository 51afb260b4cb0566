//! Inbound request handling.
//!
//! # Responsibilities
//! - Generate a unique request ID (UUID v4) when the caller sent none
//! - Turn an inbound request into the parts forwarded upstream
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Body is buffered once (bounded by the listener limit) so it can be
//!   replayed across retries and instances

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request};
use tower_http::request_id::{MakeRequestId, RequestId};
use uuid::Uuid;

use crate::proxy::{OutboundRequest, X_REQUEST_ID};

/// Header name used by the request-id layers.
pub fn request_id_header() -> HeaderName {
    HeaderName::from_static(X_REQUEST_ID)
}

/// Issues a fresh UUID v4 per request.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        Uuid::new_v4()
            .to_string()
            .parse::<HeaderValue>()
            .ok()
            .map(RequestId::new)
    }
}

/// Request ID carried by `headers`, if any.
pub fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

/// Buffer `request` into the parts sent to a backend.
///
/// Fails only if the body exceeds `max_body_bytes` or the connection broke.
pub async fn into_outbound(request: Request<Body>, max_body_bytes: usize) -> Result<OutboundRequest, axum::Error> {
    let (parts, body) = request.into_parts();
    let body: Bytes = axum::body::to_bytes(body, max_body_bytes).await?;
    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| parts.uri.path().to_owned());

    Ok(OutboundRequest {
        method: parts.method,
        path,
        content_type: parts.headers.get(header::CONTENT_TYPE).cloned(),
        request_id: request_id(&parts.headers),
        body,
    })
}
