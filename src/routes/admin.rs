use crate::{AppState, access::gated, gate::RouteRequirement, handlers, models::Role};
use axum::{
    Router,
    routing::{get, put},
};

/// Admin Router Module
///
/// Moderation and oversight pages. Unlike handler-level role checks, the gate in
/// front of these routes turns non-admins away before any handler runs.
pub fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(gated(
            Router::new()
                // GET /admin/users
                // All accounts with their approval status.
                .route("/admin/users", get(handlers::list_users))
                // PUT /admin/users/{id}/approval
                // The approval workflow: approve or reject a registration.
                .route("/admin/users/{id}/approval", put(handlers::update_approval))
                .route("/admin/stats", get(handlers::admin_stats))
                // PUT /admin/bookings/{id}/assign
                // Booking table `onAssign`.
                .route("/admin/bookings/{id}/assign", put(handlers::assign_booking)),
            RouteRequirement::roles([Role::Admin]),
            state,
        ))
        // GET /admin/bookings
        // Sales managers share the bookings overview with admins.
        .merge(gated(
            Router::new().route("/admin/bookings", get(handlers::all_bookings)),
            RouteRequirement::roles([Role::Admin, Role::SalesManager]),
            state,
        ))
}
