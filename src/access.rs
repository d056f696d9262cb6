use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{OriginalUri, Request, State},
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use url::form_urlencoded;

use crate::{
    AppState,
    auth::Viewer,
    gate::{AccessDecision, RouteRequirement},
    identity::IdentityProvider,
    models::PageNotice,
    navigator::{GateController, RecordedRedirect, RecordingNavigator},
};

/// Tells SPA clients whether the redirect should replace the current history entry.
pub const NAVIGATION_HEADER: HeaderName = HeaderName::from_static("x-navigation");

/// IdentityResolver
///
/// Produces the identity provider the gate reads for one request. The portal uses
/// [`SessionResolver`](crate::auth::SessionResolver); a provider that is still
/// resolving makes the gate answer with the loading page.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, headers: &HeaderMap) -> Box<dyn IdentityProvider>;
}

pub type IdentityResolverState = Arc<dyn IdentityResolver>;

/// GuardState
///
/// State of one gate layer: the application state plus the requirement of the
/// routes it wraps.
#[derive(Clone)]
pub struct GuardState {
    pub app: AppState,
    pub requirement: RouteRequirement,
}

/// gated
///
/// Wraps every route of `router` in the access gate. The route requirement is static;
/// only the approval exemption set comes from configuration.
pub fn gated(
    router: Router<AppState>,
    requirement: RouteRequirement,
    state: &AppState,
) -> Router<AppState> {
    let requirement = requirement.with_exempt_roles(state.config.approval_exempt_roles.clone());
    router.route_layer(middleware::from_fn_with_state(
        GuardState {
            app: state.clone(),
            requirement,
        },
        enforce_gate,
    ))
}

/// enforce_gate
///
/// Middleware run on every navigation to a protected route:
///
/// * Granted: the admitted `Viewer` is inserted into the request extensions and the
///   handler runs.
/// * Redirect: `303 See Other` to the target. Sign-in redirects carry the requested
///   path as a `returnTo` query parameter.
/// * Loading: `202 Accepted` with a loading notice; nothing protected is rendered.
pub async fn enforce_gate(
    State(guard): State<GuardState>,
    mut request: Request,
    next: Next,
) -> Response {
    // Nested routers see a stripped URI; the return-to hint needs the full one.
    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| original.0.clone())
        .unwrap_or_else(|| request.uri().clone());
    let current_path = uri
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());

    let identity = guard.app.identity.resolve(request.headers()).await.snapshot();

    let mut controller = GateController::new(
        RecordingNavigator::new(),
        guard.app.config.gate_paths.clone(),
    );
    controller.navigate(&current_path, guard.requirement.clone());

    match controller.observe(&identity) {
        Some(AccessDecision::Granted) => match Viewer::from_input(&identity) {
            Some(viewer) => {
                request.extensions_mut().insert(viewer);
                next.run(request).await
            }
            None => StatusCode::UNAUTHORIZED.into_response(),
        },
        Some(AccessDecision::Redirect(_)) => match controller.navigator().last() {
            Some(redirect) => redirect_response(&redirect),
            None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        },
        Some(AccessDecision::Loading) | None => loading_response(&current_path),
    }
}

/// Builds the `Location` of a recorded redirect, appending `returnTo` when present.
pub fn redirect_location(redirect: &RecordedRedirect) -> String {
    let return_to = redirect
        .options
        .state
        .as_ref()
        .and_then(|state| state.return_to.as_deref());

    match return_to {
        Some(return_to) => {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair("returnTo", return_to)
                .finish();
            format!("{}?{}", redirect.path, query)
        }
        None => redirect.path.clone(),
    }
}

fn redirect_response(redirect: &RecordedRedirect) -> Response {
    let Ok(location) = HeaderValue::try_from(redirect_location(redirect)) else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };
    let mode = if redirect.options.replace { "replace" } else { "push" };

    (
        StatusCode::SEE_OTHER,
        [
            (header::LOCATION, location),
            (NAVIGATION_HEADER, HeaderValue::from_static(mode)),
        ],
    )
        .into_response()
}

fn loading_response(current_path: &str) -> Response {
    (
        StatusCode::ACCEPTED,
        [(header::RETRY_AFTER, HeaderValue::from_static("1"))],
        Json(PageNotice {
            page: "loading".to_string(),
            message: "Resolving your session".to_string(),
            return_to: Some(current_path.to_string()),
        }),
    )
        .into_response()
}
