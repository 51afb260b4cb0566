//! Request forwarding to a selected endpoint.
//!
//! # Responsibilities
//! - Send the inbound method, target path and body to one endpoint
//! - Enforce the per-call timeout over the whole exchange
//! - Classify the result for the selector and the breaker
//!
//! # Design Decisions
//! - No retries here; the instance selector owns retry and failover
//! - Any non-2xx reply that was fully received is the backend talking to the
//!   caller and is passed through verbatim, whatever its content type
//! - Only 5xx replies count against the endpoint's breaker

use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderValue, Method, Request, StatusCode};
use hyper_util::client::legacy::{connect::HttpConnector, Client};

use crate::error::GatewayError;
use crate::load_balancer::endpoint::Endpoint;
use crate::resilience::with_timeout;

/// Shared upstream HTTP client.
pub type UpstreamClient = Client<HttpConnector, Body>;

/// Request header carrying the correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// A buffered upstream response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl UpstreamReply {
    pub fn json(status: StatusCode, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: Some(HeaderValue::from_static("application/json")),
            body: body.into(),
        }
    }
}

/// Classified result of one forwarded call.
#[derive(Debug, Clone)]
pub enum Forwarded {
    /// 2xx reply.
    Success(UpstreamReply),
    /// Non-2xx reply, mirrored to the caller.
    UpstreamError(UpstreamReply),
    /// Timeout, transport failure or unreadable reply.
    Failed(GatewayError),
}

impl Forwarded {
    /// Whether the outcome counts against the endpoint's breaker.
    ///
    /// Client errors reported by a healthy backend do not.
    pub fn is_breaker_failure(&self) -> bool {
        match self {
            Forwarded::Success(_) => false,
            Forwarded::UpstreamError(reply) => reply.status.is_server_error(),
            Forwarded::Failed(_) => true,
        }
    }
}

/// Inbound request parts that are forwarded.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    /// Upstream path plus optional query, e.g. `/session/7/npc/create`.
    pub path: String,
    pub content_type: Option<HeaderValue>,
    pub request_id: Option<String>,
    pub body: Bytes,
}

/// Forwards requests to endpoints with a fixed timeout.
#[derive(Debug, Clone)]
pub struct RequestForwarder {
    client: UpstreamClient,
    timeout: Duration,
    max_response_bytes: usize,
}

impl RequestForwarder {
    pub fn new(client: UpstreamClient, timeout: Duration, max_response_bytes: usize) -> Self {
        Self {
            client,
            timeout,
            max_response_bytes,
        }
    }

    /// Execute `request` against `endpoint`.
    pub async fn forward(&self, endpoint: &Endpoint, request: &OutboundRequest) -> Forwarded {
        let upstream = match build_request(endpoint, request) {
            Ok(req) => req,
            Err(message) => {
                return Forwarded::Failed(GatewayError::Transport {
                    endpoint: endpoint.clone(),
                    message,
                })
            }
        };

        let exchange = async {
            let response = self.client.request(upstream).await.map_err(|e| e.to_string())?;
            let (parts, body) = response.into_parts();
            let body = axum::body::to_bytes(Body::new(body), self.max_response_bytes)
                .await
                .map_err(|e| format!("failed to read response body: {e}"))?;
            Ok::<_, String>(UpstreamReply {
                status: parts.status,
                content_type: parts.headers.get(header::CONTENT_TYPE).cloned(),
                body,
            })
        };

        match with_timeout(self.timeout, exchange).await {
            Err(elapsed) => Forwarded::Failed(GatewayError::Timeout {
                endpoint: endpoint.clone(),
                after: elapsed.after,
            }),
            Ok(Err(message)) => Forwarded::Failed(GatewayError::Transport {
                endpoint: endpoint.clone(),
                message,
            }),
            Ok(Ok(reply)) => classify(reply),
        }
    }
}

fn build_request(endpoint: &Endpoint, request: &OutboundRequest) -> Result<Request<Body>, String> {
    let mut builder = Request::builder()
        .method(request.method.clone())
        .uri(endpoint.url_for(&request.path));
    if let Some(content_type) = &request.content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type.clone());
    }
    if let Some(id) = &request.request_id {
        builder = builder.header(X_REQUEST_ID, id.as_str());
    }
    builder
        .body(Body::from(request.body.clone()))
        .map_err(|e| format!("invalid upstream request: {e}"))
}

fn classify(reply: UpstreamReply) -> Forwarded {
    if reply.status.is_success() {
        Forwarded::Success(reply)
    } else {
        Forwarded::UpstreamError(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint() -> Endpoint {
        Endpoint::new("127.0.0.1", 5001)
    }

    #[test]
    fn test_classify_success() {
        let reply = UpstreamReply::json(StatusCode::CREATED, r#"{"session_id":1}"#);
        assert!(matches!(classify(reply), Forwarded::Success(_)));
    }

    #[test]
    fn test_classify_structured_error_passes_through() {
        let reply = UpstreamReply::json(StatusCode::UNPROCESSABLE_ENTITY, r#"{"error":"bad name"}"#);
        match classify(reply.clone()) {
            Forwarded::UpstreamError(r) => assert_eq!(r, reply),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_classify_html_error_passes_through() {
        let not_found = UpstreamReply {
            status: StatusCode::NOT_FOUND,
            content_type: Some(HeaderValue::from_static("text/html")),
            body: Bytes::from_static(b"<h1>Not Found</h1>"),
        };
        match classify(not_found.clone()) {
            Forwarded::UpstreamError(r) => assert_eq!(r, not_found),
            other => panic!("unexpected {other:?}"),
        }
        assert!(!classify(not_found).is_breaker_failure());

        let bad_gateway = UpstreamReply {
            status: StatusCode::BAD_GATEWAY,
            content_type: Some(HeaderValue::from_static("text/html")),
            body: Bytes::from_static(b"<html>bad gateway</html>"),
        };
        let forwarded = classify(bad_gateway);
        assert!(matches!(forwarded, Forwarded::UpstreamError(_)));
        assert!(forwarded.is_breaker_failure());
    }

    #[test]
    fn test_client_errors_do_not_trip_breaker() {
        let client_err = Forwarded::UpstreamError(UpstreamReply::json(StatusCode::NOT_FOUND, "{}"));
        let server_err = Forwarded::UpstreamError(UpstreamReply::json(StatusCode::INTERNAL_SERVER_ERROR, "{}"));
        assert!(!client_err.is_breaker_failure());
        assert!(server_err.is_breaker_failure());
    }

    #[test]
    fn test_build_request_targets_endpoint() {
        let req = build_request(
            &endpoint(),
            &OutboundRequest {
                method: Method::POST,
                path: "/session/7/npc/create".into(),
                content_type: Some(HeaderValue::from_static("application/json")),
                request_id: Some("abc".into()),
                body: Bytes::from_static(b"{}"),
            },
        )
        .unwrap();
        assert_eq!(req.uri(), "http://127.0.0.1:5001/session/7/npc/create");
        assert_eq!(req.method(), Method::POST);
        assert_eq!(req.headers()[X_REQUEST_ID], "abc");
    }
}
