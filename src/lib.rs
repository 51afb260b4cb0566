//! Game gateway library: service discovery, health-aware instance selection
//! and request forwarding for the auth and session services.

pub mod config;
pub mod discovery;
pub mod error;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod load_balancer;
pub mod observability;
pub mod proxy;
pub mod resilience;
pub mod routing;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
