//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router with one handler per logical route
//! - Wire up middleware (tracing, timeout, body limit, request ID)
//! - Start the registry refresher alongside the listener
//! - Serve until the shutdown broadcast fires, then drain

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    response::Response,
    routing::{get, post, MethodRouter},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::discovery::ServiceRegistry;
use crate::http::request::{into_outbound, request_id_header, MakeRequestUuid};
use crate::http::response::{error_response, render};
use crate::http::status::status_handler;
use crate::routing::{GatewayRouter, RouteMethod, RouteSpec, ROUTES};

/// HTTP server for the gateway.
pub struct GatewayServer {
    router: GatewayRouter,
}

impl GatewayServer {
    /// Create a new server over `registry` with the given configuration.
    pub fn new(config: GatewayConfig, registry: Arc<dyn ServiceRegistry>) -> Self {
        Self {
            router: GatewayRouter::new(config, registry),
        }
    }

    pub fn router(&self) -> &GatewayRouter {
        &self.router
    }

    /// Build the axum router with all middleware layers.
    #[allow(deprecated)]
    pub fn build_app(&self) -> Router {
        let config = self.router.config();
        let mut app = Router::new().route("/status", get(status_handler));
        for spec in ROUTES {
            app = app.route(spec.path, route_handler(spec));
        }

        let middleware = ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(request_id_header(), MakeRequestUuid))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::new(request_id_header()))
            .layer(RequestBodyLimitLayer::new(config.listener.max_body_bytes))
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)));

        app.with_state(self.router.clone()).layer(middleware)
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Refreshes the registry once before accepting traffic; a failed
    /// refresh is logged and the first request retries it.
    pub async fn run(self, listener: TcpListener, mut shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let refresher = self.router.refresher();
        refresher.tick().await;
        let refresh_task = tokio::spawn(refresher.run(shutdown.resubscribe()));

        let app = self.build_app();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        if let Err(e) = refresh_task.await {
            tracing::error!(error = %e, "Registry refresher task failed");
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn route_handler(spec: &'static RouteSpec) -> MethodRouter<GatewayRouter> {
    let handler = move |State(router): State<GatewayRouter>, request: Request<Body>| async move {
        handle(router, spec, request).await
    };
    match spec.method {
        RouteMethod::Get => get(handler),
        RouteMethod::Post => post(handler),
    }
}

/// Buffer the request, route it, render the outcome.
async fn handle(router: GatewayRouter, spec: &'static RouteSpec, request: Request<Body>) -> Response {
    let max_body_bytes = router.config().listener.max_body_bytes;
    let outbound = match into_outbound(request, max_body_bytes).await {
        Ok(outbound) => outbound,
        Err(e) => {
            tracing::warn!(route = spec.name, error = %e, "Failed to read request body");
            return error_response(StatusCode::BAD_REQUEST, format!("Error {}", spec.action), e);
        }
    };

    let outcome = router.route(spec, outbound).await;
    render(spec, outcome)
}
