//! Breaker-gated liveness checks.

use std::sync::Arc;

use async_trait::async_trait;

use crate::health::prober::{HealthProber, ProbeDetail, ProbeResult};
use crate::load_balancer::endpoint::Endpoint;
use crate::observability::metrics;
use crate::resilience::BreakerRegistry;

/// Answers "should this endpoint be tried right now?".
#[async_trait]
pub trait Liveness: Send + Sync {
    async fn is_up(&self, endpoint: &Endpoint) -> bool;
}

/// Health prober wrapped by the endpoint's circuit breaker.
///
/// While the breaker is open the probe is skipped and a cached "down" result
/// is returned immediately.
#[derive(Debug, Clone)]
pub struct GuardedProber {
    prober: HealthProber,
    breakers: Arc<BreakerRegistry>,
}

impl GuardedProber {
    pub fn new(prober: HealthProber, breakers: Arc<BreakerRegistry>) -> Self {
        Self { prober, breakers }
    }

    pub async fn check(&self, endpoint: &Endpoint) -> ProbeResult {
        let breaker = self.breakers.get(endpoint);
        let permit = match breaker.try_acquire() {
            Ok(permit) => permit,
            Err(_) => {
                tracing::debug!(endpoint = %endpoint, "Circuit open, skipping health probe");
                return ProbeResult::down(ProbeDetail::CircuitOpen);
            }
        };

        let result = self.prober.probe(endpoint).await;
        permit.report(!result.alive);
        metrics::record_probe(endpoint, result.alive);
        result
    }
}

#[async_trait]
impl Liveness for GuardedProber {
    async fn is_up(&self, endpoint: &Endpoint) -> bool {
        self.check(endpoint).await.alive
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use hyper_util::client::legacy::{connect::HttpConnector, Client};
    use hyper_util::rt::TokioExecutor;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use crate::config::CircuitBreakerConfig;
    use crate::resilience::BreakerState;

    /// Health endpoint answering 200 or 503 depending on `healthy`.
    struct StatusBackend {
        endpoint: Endpoint,
        healthy: Arc<AtomicBool>,
        hits: Arc<AtomicUsize>,
    }

    async fn start_status_backend(healthy: bool) -> StatusBackend {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let healthy = Arc::new(AtomicBool::new(healthy));
        let hits = Arc::new(AtomicUsize::new(0));

        let (up, seen) = (healthy.clone(), hits.clone());
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let (up, seen) = (up.clone(), seen.clone());
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 1024];
                    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => return,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                    }
                    seen.fetch_add(1, Ordering::SeqCst);
                    let status = if up.load(Ordering::SeqCst) {
                        "200 OK"
                    } else {
                        "503 Service Unavailable"
                    };
                    let body = r#"{"status":"up"}"#;
                    let response = format!(
                        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        StatusBackend {
            endpoint: Endpoint::new(addr.ip().to_string(), addr.port()),
            healthy,
            hits,
        }
    }

    fn guarded(reset_timeout_ms: u64) -> (GuardedProber, Arc<BreakerRegistry>) {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        let prober = HealthProber::new(client, "/status", Duration::from_secs(1));
        let breakers = Arc::new(BreakerRegistry::new(CircuitBreakerConfig {
            error_threshold_percentage: 50,
            reset_timeout_ms,
            rolling_window_secs: 10,
            volume_threshold: 1,
        }));
        (GuardedProber::new(prober, breakers.clone()), breakers)
    }

    #[tokio::test]
    async fn test_open_breaker_skips_network() {
        let backend = start_status_backend(true).await;
        let (prober, breakers) = guarded(60_000);
        breakers.get(&backend.endpoint).try_acquire().unwrap().failure();

        let result = prober.check(&backend.endpoint).await;

        assert!(!result.alive);
        assert_eq!(result.detail, ProbeDetail::CircuitOpen);
        assert!(!prober.is_up(&backend.endpoint).await);
        assert_eq!(backend.hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_probe_trips_breaker() {
        let backend = start_status_backend(false).await;
        let (prober, breakers) = guarded(60_000);

        let result = prober.check(&backend.endpoint).await;

        assert_eq!(result.detail, ProbeDetail::Status(503));
        assert_eq!(breakers.state_of(&backend.endpoint), BreakerState::Open);

        // Cached "down" until the cool-down elapses.
        assert_eq!(prober.check(&backend.endpoint).await.detail, ProbeDetail::CircuitOpen);
        assert_eq!(backend.hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_successful_trial_probe_closes_breaker() {
        let backend = start_status_backend(false).await;
        let (prober, breakers) = guarded(50);

        assert!(!prober.check(&backend.endpoint).await.alive);
        assert_eq!(breakers.state_of(&backend.endpoint), BreakerState::Open);

        backend.healthy.store(true, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let result = prober.check(&backend.endpoint).await;
        assert!(result.alive);
        assert_eq!(result.response(), Some(&serde_json::json!({"status": "up"})));
        assert_eq!(breakers.state_of(&backend.endpoint), BreakerState::Closed);
        assert_eq!(backend.hits.load(Ordering::SeqCst), 2);
    }
}
