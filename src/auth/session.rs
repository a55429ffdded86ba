//! Session gating for the note view
//!
//! Any signed-in identity may reach every route. There are no roles.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::identity::{Identity, IdentityGateway};

/// Routes exposed to the presentation layer
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Route {
    /// Public landing page
    Landing,
    Login,
    Register,
    /// The note board, reachable only with an identity
    Notes,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Landing => "/",
            Route::Login => "/login",
            Route::Register => "/register",
            Route::Notes => "/notes",
        }
    }

    pub fn parse(path: &str) -> Option<Self> {
        match path {
            "/" | "" => Some(Route::Landing),
            "/login" => Some(Route::Login),
            "/register" => Some(Route::Register),
            "/notes" => Some(Route::Notes),
            _ => None,
        }
    }

    pub fn requires_identity(&self) -> bool {
        matches!(self, Route::Notes)
    }
}

/// Outcome of checking a route against the current session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Allow,
    Redirect(Route),
}

/// Decides whether gated routes are reachable
pub struct SessionGate {
    gateway: Arc<dyn IdentityGateway>,
}

impl SessionGate {
    pub fn new(gateway: Arc<dyn IdentityGateway>) -> Self {
        Self { gateway }
    }

    /// True iff an identity is present
    pub fn is_authorized(identity: Option<&Identity>) -> bool {
        identity.is_some()
    }

    pub fn resolve(route: Route, identity: Option<&Identity>) -> GateDecision {
        if route.requires_identity() && !Self::is_authorized(identity) {
            GateDecision::Redirect(Route::Login)
        } else {
            GateDecision::Allow
        }
    }

    /// Resolve a route against the gateway's current identity
    pub fn check(&self, route: Route) -> GateDecision {
        let identity = self.gateway.current_identity();
        let decision = Self::resolve(route, identity.as_ref());
        if let GateDecision::Redirect(target) = decision {
            log::debug!("Redirecting {} to {}", route.path(), target.path());
        }
        decision
    }
}
