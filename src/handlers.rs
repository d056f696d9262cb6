use crate::{
    AppState,
    auth::{Viewer, decode_claims, issue_token},
    models::{
        AdminDashboardStats, AssignBookingRequest, Booking, CreateBookingRequest, DashboardView,
        Order, PageNotice, PaidService, Profile, Role, SignInRequest, SignInResponse,
        UpdateApprovalRequest, UpdateBookingStatusRequest,
    },
    repository::RepositoryError,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

/// Maps data-layer failures onto HTTP status codes.
fn status_for(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::NotFound(_) => StatusCode::NOT_FOUND,
        RepositoryError::NotSalesManager(_) | RepositoryError::ServiceInactive(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        RepositoryError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Only same-origin absolute paths are accepted as a post-sign-in destination.
/// Browsers drop tabs and newlines from URLs, so control characters could turn
/// `/\t/host` into `//host`; any path containing one is refused.
pub fn sanitize_return_to(raw: Option<&str>, home: &str) -> String {
    match raw {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => home.to_string(),
    }
}

// --- Public pages ---

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct SignInQuery {
    /// The protected path the viewer was redirected away from.
    pub return_to: Option<String>,
}

/// sign_in_page
///
/// [Public Route] Model of the sign-in page. Echoes the `returnTo` hint placed by the
/// access gate so the form can post it back.
#[utoipa::path(
    get,
    path = "/auth",
    params(SignInQuery),
    responses((status = 200, description = "Sign-in page", body = PageNotice))
)]
pub async fn sign_in_page(
    State(state): State<AppState>,
    Query(query): Query<SignInQuery>,
) -> Json<PageNotice> {
    let home = &state.config.gate_paths.home;
    Json(PageNotice {
        page: "sign_in".to_string(),
        message: "Sign in to continue".to_string(),
        return_to: Some(sanitize_return_to(query.return_to.as_deref(), home)),
    })
}

/// sign_in
///
/// [Public Route] Verifies credentials, creates a session and returns its token.
#[utoipa::path(
    post,
    path = "/auth/sign-in",
    request_body = SignInRequest,
    responses(
        (status = 200, description = "Signed in", body = SignInResponse),
        (status = 401, description = "Bad credentials")
    )
)]
pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> Result<Json<SignInResponse>, StatusCode> {
    let profile = state
        .repo
        .verify_credentials(&payload.email, &payload.password)
        .await
        .ok_or_else(|| {
            tracing::info!(email = %payload.email, "sign-in rejected");
            StatusCode::UNAUTHORIZED
        })?;

    let session = state.repo.create_session(profile.user_id).await;
    let token = issue_token(&session, &state.config).map_err(|e| {
        tracing::error!(error = %e, "failed to sign session token");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    tracing::info!(user_id = %profile.user_id, role = %profile.role, "signed in");

    Ok(Json(SignInResponse {
        token,
        return_to: sanitize_return_to(payload.return_to.as_deref(), &state.config.gate_paths.home),
        profile,
    }))
}

/// sign_out
///
/// [Public Route] Destroys the session behind the presented token. Idempotent: an
/// unknown or missing token still yields 204.
#[utoipa::path(
    post,
    path = "/auth/sign-out",
    responses((status = 204, description = "Signed out"))
)]
pub async fn sign_out(State(state): State<AppState>, headers: HeaderMap) -> StatusCode {
    if let Some(claims) = decode_claims(&headers, &state.config) {
        if state.repo.delete_session(claims.sid).await {
            tracing::info!(user_id = %claims.sub, "signed out");
        }
    }
    StatusCode::NO_CONTENT
}

/// pending_approval_page
///
/// [Public Route] Destination of approval denials. Explains why access was refused.
#[utoipa::path(
    get,
    path = "/pending-approval",
    responses((status = 200, description = "Pending approval notice", body = PageNotice))
)]
pub async fn pending_approval_page() -> Json<PageNotice> {
    Json(PageNotice {
        page: "pending_approval".to_string(),
        message: "Your account is awaiting review by an administrator".to_string(),
        return_to: None,
    })
}

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Home page", body = PageNotice))
)]
pub async fn home() -> Json<PageNotice> {
    Json(PageNotice {
        page: "home".to_string(),
        message: "Welcome to the marketplace".to_string(),
        return_to: None,
    })
}

// --- Any signed-in role ---

/// dashboard
///
/// [Protected Route] Landing view. The sections list drives the role-specific menu.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses((status = 200, description = "Dashboard", body = DashboardView))
)]
pub async fn dashboard(Viewer { profile, .. }: Viewer) -> Json<DashboardView> {
    let sections = match profile.role {
        Role::Admin => vec!["users", "bookings", "stats"],
        Role::SalesManager => vec!["bookings", "sales"],
        Role::Brand => vec!["services", "orders"],
        Role::Buyer => vec!["bookings", "orders"],
    };
    Json(DashboardView {
        profile,
        sections: sections.into_iter().map(String::from).collect(),
    })
}

/// get_profile
///
/// [Protected Route, no approval required] Lets pending accounts see their own status.
#[utoipa::path(
    get,
    path = "/profile",
    responses((status = 200, description = "Own profile", body = Profile))
)]
pub async fn get_profile(Viewer { profile, .. }: Viewer) -> Json<Profile> {
    Json(profile)
}

// --- Admin ---

#[utoipa::path(
    get,
    path = "/admin/users",
    responses((status = 200, description = "All accounts", body = [Profile]))
)]
pub async fn list_users(State(state): State<AppState>) -> Json<Vec<Profile>> {
    Json(state.repo.list_profiles().await)
}

/// update_approval
///
/// [Admin Route] Approves or rejects a registered account. Takes effect on the
/// account's next navigation, since the gate re-reads the profile every time.
#[utoipa::path(
    put,
    path = "/admin/users/{id}/approval",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateApprovalRequest,
    responses(
        (status = 200, description = "Updated", body = Profile),
        (status = 404, description = "Unknown user")
    )
)]
pub async fn update_approval(
    Viewer { profile: admin, .. }: Viewer,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateApprovalRequest>,
) -> Result<Json<Profile>, StatusCode> {
    let profile = state
        .repo
        .set_approval_status(user_id, payload.approval_status)
        .await
        .map_err(|e| status_for(&e))?;

    tracing::info!(
        admin = %admin.user_id,
        user_id = %user_id,
        status = ?payload.approval_status,
        "approval status changed"
    );
    Ok(Json(profile))
}

#[utoipa::path(
    get,
    path = "/admin/stats",
    responses((status = 200, description = "Stats", body = AdminDashboardStats))
)]
pub async fn admin_stats(State(state): State<AppState>) -> Json<AdminDashboardStats> {
    Json(state.repo.get_stats().await)
}

#[utoipa::path(
    get,
    path = "/admin/bookings",
    responses((status = 200, description = "All bookings", body = [Booking]))
)]
pub async fn all_bookings(State(state): State<AppState>) -> Json<Vec<Booking>> {
    Json(state.repo.list_bookings().await)
}

/// assign_booking
///
/// [Admin Route] `onAssign` of the bookings table: hands a booking to a sales manager.
#[utoipa::path(
    put,
    path = "/admin/bookings/{id}/assign",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = AssignBookingRequest,
    responses(
        (status = 200, description = "Assigned", body = Booking),
        (status = 404, description = "Unknown booking"),
        (status = 422, description = "Assignee is not a sales manager")
    )
)]
pub async fn assign_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AssignBookingRequest>,
) -> Result<Json<Booking>, StatusCode> {
    state
        .repo
        .assign_booking(id, payload.sales_manager_id)
        .await
        .map(Json)
        .map_err(|e| status_for(&e))
}

/// update_booking_status
///
/// [Admin / Sales Route] `onStatusUpdate` of the bookings table.
#[utoipa::path(
    put,
    path = "/bookings/{id}/status",
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = UpdateBookingStatusRequest,
    responses(
        (status = 200, description = "Updated", body = Booking),
        (status = 404, description = "Unknown booking")
    )
)]
pub async fn update_booking_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateBookingStatusRequest>,
) -> Result<Json<Booking>, StatusCode> {
    state
        .repo
        .update_booking_status(id, payload.status)
        .await
        .map(Json)
        .map_err(|e| status_for(&e))
}

// --- Sales manager ---

#[utoipa::path(
    get,
    path = "/sales/bookings",
    responses((status = 200, description = "Bookings assigned to me", body = [Booking]))
)]
pub async fn my_assigned_bookings(
    Viewer { profile, .. }: Viewer,
    State(state): State<AppState>,
) -> Json<Vec<Booking>> {
    Json(state.repo.bookings_assigned_to(profile.user_id).await)
}

// --- Brand ---

#[utoipa::path(
    get,
    path = "/brand/services",
    responses((status = 200, description = "Paid services", body = [PaidService]))
)]
pub async fn brand_services(State(state): State<AppState>) -> Json<Vec<PaidService>> {
    Json(state.repo.list_services().await)
}

#[utoipa::path(
    get,
    path = "/brand/orders",
    responses((status = 200, description = "Orders placed with my brand", body = [Order]))
)]
pub async fn brand_orders(
    Viewer { profile, .. }: Viewer,
    State(state): State<AppState>,
) -> Json<Vec<Order>> {
    Json(state.repo.orders_for_brand(profile.user_id).await)
}

// --- Buyer ---

#[utoipa::path(
    get,
    path = "/buyer/bookings",
    responses((status = 200, description = "My bookings", body = [Booking]))
)]
pub async fn buyer_bookings(
    Viewer { profile, .. }: Viewer,
    State(state): State<AppState>,
) -> Json<Vec<Booking>> {
    Json(state.repo.bookings_for_buyer(profile.user_id).await)
}

/// create_booking
///
/// [Buyer Route] `onDateSelect` of the booking calendar: books a service on the chosen date.
#[utoipa::path(
    post,
    path = "/buyer/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booked", body = Booking),
        (status = 404, description = "Unknown service"),
        (status = 422, description = "Service not bookable")
    )
)]
pub async fn create_booking(
    Viewer { profile, .. }: Viewer,
    State(state): State<AppState>,
    Json(payload): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), StatusCode> {
    let booking = state
        .repo
        .create_booking(profile.user_id, payload)
        .await
        .map_err(|e| status_for(&e))?;
    Ok((StatusCode::CREATED, Json(booking)))
}

#[utoipa::path(
    get,
    path = "/buyer/orders",
    responses((status = 200, description = "My orders", body = [Order]))
)]
pub async fn buyer_orders(
    Viewer { profile, .. }: Viewer,
    State(state): State<AppState>,
) -> Json<Vec<Order>> {
    Json(state.repo.orders_for_buyer(profile.user_id).await)
}
