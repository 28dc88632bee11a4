//! Bearer-token authentication and role gating for the API routes.
//!
//! `authenticate` resolves the `Authorization: Bearer <token>` header to an
//! [`Actor`] and stores it in the request extensions; `authorize` then checks
//! the resolved actor against the roles a router allows.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use tracing::debug;

use crate::api::failure;
use crate::workflows::applications::domain::{Actor, ActorRole};

/// Static token table mapping bearer tokens to actors.
#[derive(Clone, Default)]
pub struct AccessTokens {
    tokens: Arc<HashMap<String, Actor>>,
}

impl AccessTokens {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder: register `token` for `actor`. Blank tokens are ignored.
    pub fn with_token(mut self, token: impl Into<String>, actor: Actor) -> Self {
        let token = token.into();
        if token.trim().is_empty() {
            return self;
        }
        Arc::make_mut(&mut self.tokens).insert(token, actor);
        self
    }

    pub fn resolve(&self, token: &str) -> Option<&Actor> {
        self.tokens.get(token)
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

/// Roles permitted past [`authorize`].
#[derive(Debug, Clone, Copy)]
pub struct RoleGate(pub &'static [ActorRole]);

impl RoleGate {
    pub const BOT: RoleGate = RoleGate(&[ActorRole::Bot]);

    fn admits(self, role: ActorRole) -> bool {
        self.0.contains(&role)
    }
}

fn bearer_token(req: &Request) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Axum middleware resolving the bearer token to an [`Actor`].
pub async fn authenticate(
    State(tokens): State<AccessTokens>,
    mut req: Request,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(&req) else {
        return failure(StatusCode::UNAUTHORIZED, "missing bearer token");
    };

    let Some(actor) = tokens.resolve(token).cloned() else {
        debug!(path = %req.uri().path(), "rejected unknown bearer token");
        return failure(StatusCode::UNAUTHORIZED, "invalid bearer token");
    };

    req.extensions_mut().insert(actor);
    next.run(req).await
}

/// Axum middleware rejecting authenticated actors whose role is not admitted.
pub async fn authorize(State(gate): State<RoleGate>, req: Request, next: Next) -> Response {
    let Some(actor) = req.extensions().get::<Actor>() else {
        return failure(StatusCode::UNAUTHORIZED, "request is not authenticated");
    };

    if !gate.admits(actor.role) {
        return failure(
            StatusCode::FORBIDDEN,
            format!("role '{}' may not access this resource", actor.role.label()),
        );
    }

    next.run(req).await
}
