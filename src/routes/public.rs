use crate::{AppState, gate::GatePaths, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Public Router Module
///
/// Endpoints reachable without a session. The three gate destinations are mounted at
/// the configured `GatePaths`; they must never be gated themselves or the redirect
/// would loop.
pub fn public_routes(paths: &GatePaths) -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // Home page; destination of role denials.
        .route(&paths.home, get(handlers::home))
        // Sign-in page (`?returnTo=...`); destination of unauthenticated navigations.
        .route(&paths.sign_in, get(handlers::sign_in_page))
        .route("/auth/sign-in", post(handlers::sign_in))
        .route("/auth/sign-out", post(handlers::sign_out))
        // Destination of approval denials.
        .route(&paths.pending, get(handlers::pending_approval_page))
}
