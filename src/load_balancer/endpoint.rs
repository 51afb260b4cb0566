//! Endpoint and logical service identity.
//!
//! # Responsibilities
//! - Represent one concrete `address:port` instance of a logical service
//! - Name a logical group of interchangeable instances
//! - Build upstream URIs for forwarding and probing

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical backend group (e.g. `auth_service`, `session_service`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceName(String);

impl ServiceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ServiceName {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl From<String> for ServiceName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl Borrow<str> for ServiceName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A single backend instance, immutable once read from the registry.
///
/// The address may be a hostname (container name) or an IP literal, so it is
/// kept as a string rather than a `SocketAddr`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// `host:port`, suitable for a URI authority.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    /// Absolute `http://` URI for `path` on this endpoint.
    pub fn url_for(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("http://{}{}", self.authority(), path)
        } else {
            format!("http://{}/{}", self.authority(), path)
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_equality_is_by_value() {
        let a = Endpoint::new("session_service1", 5001);
        let b = Endpoint::new(String::from("session_service1"), 5001);
        assert_eq!(a, b);
        assert_ne!(a, Endpoint::new("session_service1", 5002));
    }

    #[test]
    fn test_url_for() {
        let ep = Endpoint::new("127.0.0.1", 8080);
        assert_eq!(ep.url_for("/status"), "http://127.0.0.1:8080/status");
        assert_eq!(ep.url_for("session/init"), "http://127.0.0.1:8080/session/init");
    }
}
