//! Logical route table.
//!
//! # Responsibilities
//! - Bind each caller-facing operation to a logical service
//! - Fix the retry policy each operation runs under
//! - Carry the wording used in gateway-generated error bodies
//!
//! # Design Decisions
//! - Static table, compiled in; the set of operations is part of the gateway
//! - Upstream path equals the inbound path (paths are shared with backends)
//! - Auth operations always target one canonical instance

use axum::http::Method;

use crate::config::{RetryConfig, ServicesConfig};
use crate::load_balancer::endpoint::ServiceName;
use crate::resilience::{EndpointOrdering, RetryPolicy};

/// Which configured logical service a route targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceKind {
    Auth,
    Session,
}

impl ServiceKind {
    pub fn service_name(&self, services: &ServicesConfig) -> ServiceName {
        match self {
            ServiceKind::Auth => ServiceName::new(services.auth.clone()),
            ServiceKind::Session => ServiceName::new(services.session.clone()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteMethod {
    Get,
    Post,
}

impl RouteMethod {
    pub fn as_method(&self) -> Method {
        match self {
            RouteMethod::Get => Method::GET,
            RouteMethod::Post => Method::POST,
        }
    }
}

/// How a route reaches its service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePolicy {
    /// One direct attempt against the first registered instance.
    Single,
    /// Round-robin start, ordered failover, bounded attempts per instance.
    Failover { attempts_per_instance: u32 },
}

/// One caller-facing operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteSpec {
    /// Stable name used in logs and metric labels.
    pub name: &'static str,
    pub method: RouteMethod,
    /// axum path pattern; also the upstream path template.
    pub path: &'static str,
    pub service: ServiceKind,
    pub policy: RoutePolicy,
    /// Completes "Request to ... timed out".
    pub target: &'static str,
    /// Completes "Error ...".
    pub action: &'static str,
}

impl RouteSpec {
    /// Retry policy for multi-instance routes; `None` for single-instance ones.
    pub fn retry_policy(&self, config: &RetryConfig) -> Option<RetryPolicy> {
        match self.policy {
            RoutePolicy::Single => None,
            RoutePolicy::Failover {
                attempts_per_instance,
            } => Some(RetryPolicy::from_config(
                config,
                attempts_per_instance.min(config.max_attempts_per_instance),
                EndpointOrdering::RoundRobin,
            )),
        }
    }
}

const fn auth(
    name: &'static str,
    method: RouteMethod,
    path: &'static str,
    action: &'static str,
) -> RouteSpec {
    RouteSpec {
        name,
        method,
        path,
        service: ServiceKind::Auth,
        policy: RoutePolicy::Single,
        target: "auth service",
        action,
    }
}

const fn session(
    name: &'static str,
    method: RouteMethod,
    path: &'static str,
    attempts_per_instance: u32,
    target: &'static str,
    action: &'static str,
) -> RouteSpec {
    RouteSpec {
        name,
        method,
        path,
        service: ServiceKind::Session,
        policy: RoutePolicy::Failover {
            attempts_per_instance,
        },
        target,
        action,
    }
}

/// Every routed operation, in registration order.
pub const ROUTES: &[RouteSpec] = &[
    auth("register_user", RouteMethod::Post, "/auth/register", "registering user"),
    auth("authenticate", RouteMethod::Post, "/auth", "authenticating user"),
    auth(
        "create_character",
        RouteMethod::Post,
        "/auth/create-character",
        "creating character",
    ),
    auth(
        "get_user",
        RouteMethod::Get,
        "/auth/user/{user_id}",
        "retrieving user details",
    ),
    auth(
        "get_character",
        RouteMethod::Get,
        "/auth/character/{character_id}",
        "retrieving character details",
    ),
    session(
        "init_session",
        RouteMethod::Post,
        "/session/init",
        3,
        "session service",
        "registering session",
    ),
    session(
        "create_npc",
        RouteMethod::Post,
        "/session/{session_id}/npc/create",
        1,
        "create NPC",
        "creating NPC",
    ),
    session(
        "initiate_combat",
        RouteMethod::Post,
        "/session/{session_id}/combat/initiate",
        1,
        "initiate combat",
        "initiating combat",
    ),
    session(
        "end_session",
        RouteMethod::Post,
        "/session/{session_id}/end",
        1,
        "end session",
        "ending session",
    ),
    session(
        "get_session",
        RouteMethod::Get,
        "/get_session/{session_id}",
        3,
        "session service",
        "retrieving session",
    ),
    session(
        "list_sessions",
        RouteMethod::Get,
        "/get_sessions",
        3,
        "session service",
        "retrieving sessions",
    ),
];

/// Look up a route by its stable name.
pub fn find_route(name: &str) -> Option<&'static RouteSpec> {
    ROUTES.iter().find(|route| route.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_route_names_and_paths_are_unique() {
        let names: HashSet<_> = ROUTES.iter().map(|r| r.name).collect();
        let paths: HashSet<_> = ROUTES.iter().map(|r| (r.method, r.path)).collect();
        assert_eq!(names.len(), ROUTES.len());
        assert_eq!(paths.len(), ROUTES.len());
    }

    #[test]
    fn test_auth_routes_are_single_instance() {
        for route in ROUTES.iter().filter(|r| r.service == ServiceKind::Auth) {
            assert_eq!(route.policy, RoutePolicy::Single, "{}", route.name);
            assert!(route.retry_policy(&RetryConfig::default()).is_none());
        }
    }

    #[test]
    fn test_session_init_retries_each_instance() {
        let route = find_route("init_session").unwrap();
        let policy = route.retry_policy(&RetryConfig::default()).unwrap();
        assert_eq!(policy.max_attempts_per_instance, 3);
        assert_eq!(policy.ordering, EndpointOrdering::RoundRobin);

        let npc = find_route("create_npc").unwrap();
        assert_eq!(npc.retry_policy(&RetryConfig::default()).unwrap().max_attempts_per_instance, 1);
    }

    #[test]
    fn test_configured_cap_limits_attempts() {
        let config = RetryConfig {
            max_attempts_per_instance: 2,
            ..RetryConfig::default()
        };
        let policy = find_route("init_session").unwrap().retry_policy(&config).unwrap();
        assert_eq!(policy.max_attempts_per_instance, 2);
    }

    #[test]
    fn test_service_kind_resolves_configured_names() {
        let services = ServicesConfig::default();
        assert_eq!(ServiceKind::Auth.service_name(&services).as_str(), "auth_service");
        assert_eq!(ServiceKind::Session.service_name(&services).as_str(), "session_service");
    }
}
