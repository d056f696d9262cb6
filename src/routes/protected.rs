use crate::{AppState, access::gated, gate::RouteRequirement, handlers, models::Role};
use axum::{
    Router,
    routing::{get, put},
};

/// Protected Router Module
///
/// Pages for signed-in viewers. Each block is one route group with its requirement.
pub fn protected_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        // GET /dashboard
        // Any role, approval required (admins and sales managers are exempt).
        .merge(gated(
            Router::new().route("/dashboard", get(handlers::dashboard)),
            RouteRequirement::any_role(),
            state,
        ))
        // GET /profile
        // Any role, no approval: pending accounts can check their own status.
        .merge(gated(
            Router::new().route("/profile", get(handlers::get_profile)),
            RouteRequirement::any_role().without_approval(),
            state,
        ))
        // PUT /bookings/{id}/status
        // Booking table `onStatusUpdate`, shared by admins and sales managers.
        .merge(gated(
            Router::new().route("/bookings/{id}/status", put(handlers::update_booking_status)),
            RouteRequirement::roles([Role::Admin, Role::SalesManager]),
            state,
        ))
        .merge(gated(
            Router::new().route("/sales/bookings", get(handlers::my_assigned_bookings)),
            RouteRequirement::roles([Role::SalesManager]),
            state,
        ))
        .merge(gated(
            Router::new()
                .route("/brand/services", get(handlers::brand_services))
                .route("/brand/orders", get(handlers::brand_orders)),
            RouteRequirement::roles([Role::Brand]),
            state,
        ))
        // POST /buyer/bookings is the booking calendar's `onDateSelect`.
        .merge(gated(
            Router::new()
                .route(
                    "/buyer/bookings",
                    get(handlers::buyer_bookings).post(handlers::create_booking),
                )
                .route("/buyer/orders", get(handlers::buyer_orders)),
            RouteRequirement::roles([Role::Buyer]),
            state,
        ))
}
