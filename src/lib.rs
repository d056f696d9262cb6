use axum::{Router, http::HeaderName};
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Access control core: decision function, identity capability, redirect state machine.
pub mod gate;
pub mod identity;
pub mod navigator;

// Portal services and the HTTP adapter of the gate.
pub mod access;
pub mod auth;
pub mod config;
pub mod handlers;
pub mod models;
pub mod repository;

pub mod routes;
use routes::{admin, protected, public};

use access::IdentityResolverState;
use auth::SessionResolver;

// --- Public Re-exports ---

pub use config::AppConfig;
pub use gate::{AccessDecision, Denial, GateInput, GatePaths, RouteRequirement, evaluate};
pub use repository::{InMemoryRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document of the portal, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::home, handlers::sign_in_page, handlers::sign_in, handlers::sign_out,
        handlers::pending_approval_page, handlers::dashboard, handlers::get_profile,
        handlers::list_users, handlers::update_approval, handlers::admin_stats,
        handlers::all_bookings, handlers::assign_booking, handlers::update_booking_status,
        handlers::my_assigned_bookings, handlers::brand_services, handlers::brand_orders,
        handlers::buyer_bookings, handlers::create_booking, handlers::buyer_orders
    ),
    components(
        schemas(
            models::Role, models::ApprovalStatus, models::Profile, models::Session,
            models::PaidService, models::BookingStatus, models::Booking, models::OrderStatus,
            models::Order, models::SignInRequest, models::SignInResponse,
            models::UpdateApprovalRequest, models::UpdateBookingStatusRequest,
            models::AssignBookingRequest, models::CreateBookingRequest,
            models::AdminDashboardStats, models::DashboardView, models::PageNotice,
        )
    ),
    tags(
        (name = "marketplace-portal", description = "B2B marketplace portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable container of the portal's services and configuration.
#[derive(Clone)]
pub struct AppState {
    /// Data layer (mock data in every environment).
    pub repo: RepositoryState,
    pub config: AppConfig,
    /// Where the gate reads each request's identity from.
    pub identity: IdentityResolverState,
}

impl AppState {
    /// Portal state whose gate resolves identity from session tokens.
    pub fn new(repo: RepositoryState, config: AppConfig) -> Self {
        let identity = Arc::new(SessionResolver {
            repo: repo.clone(),
            config: config.clone(),
        });
        Self {
            repo,
            config,
            identity,
        }
    }

    pub fn with_identity_resolver(mut self, identity: IdentityResolverState) -> Self {
        self.identity = identity;
        self
    }
}

/// create_router
///
/// Assembles public and gated routers and applies the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes(&state.config.gate_paths))
        // Each protected group carries its own gate layer.
        .merge(protected::protected_routes(&state))
        .merge(admin::admin_routes(&state))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Span for one request, correlated by its `x-request-id`.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
