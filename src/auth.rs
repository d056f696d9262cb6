use axum::{
    extract::FromRequestParts,
    http::{HeaderMap, StatusCode, header, request::Parts},
};
use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    access::IdentityResolver,
    config::{AppConfig, Env},
    identity::{IdentityProvider, StaticIdentity},
    gate::{GateInput, ProfileState},
    models::{Profile, Session},
    repository::RepositoryState,
};

/// Claims
///
/// Payload of a portal session token. `sid` ties the token to a server-side
/// session so that signing out invalidates it before `exp`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's id, primary key of the profile.
    pub sub: Uuid,
    /// Session id created at sign-in.
    pub sid: Uuid,
    pub exp: usize,
    pub iat: usize,
}

/// issue_token
///
/// Signs a token for a freshly created session.
pub fn issue_token(
    session: &Session,
    config: &AppConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let iat = usize::try_from(session.issued_at.timestamp()).unwrap_or(0);
    let ttl = usize::try_from(config.session_ttl_secs).unwrap_or(usize::MAX);
    let claims = Claims {
        sub: session.user_id,
        sid: session.id,
        iat,
        exp: iat.saturating_add(ttl),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
}

/// decode_claims
///
/// Extracts and validates the Bearer token of a request. Any failure means "no session".
pub fn decode_claims(headers: &HeaderMap, config: &AppConfig) -> Option<Claims> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))?;

    let mut validation = Validation::default();
    validation.validate_exp = true;

    match decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
        &validation,
    ) {
        Ok(data) => Some(data.claims),
        Err(e) => {
            match e.kind() {
                ErrorKind::ExpiredSignature => tracing::debug!("session token expired"),
                _ => tracing::debug!(error = %e, "rejected session token"),
            }
            None
        }
    }
}

/// resolve_identity
///
/// Builds the gate's identity snapshot for one request:
///
/// 1. Local bypass: in `Env::Local`, an `x-user-id` header naming a known profile
///    yields a synthetic session.
/// 2. Bearer token -> claims -> live server-side session.
/// 3. Profile lookup. A lookup error, or a session whose account no longer exists,
///    is reported as `ProfileState::Failed` so the gate fails closed.
///
/// Resolution completes before returning, so the snapshot is never `loading`.
pub async fn resolve_identity(
    headers: &HeaderMap,
    repo: &RepositoryState,
    config: &AppConfig,
) -> GateInput {
    if config.env == Env::Local {
        if let Some(input) = local_bypass(headers, repo).await {
            return input;
        }
    }

    let Some(claims) = decode_claims(headers, config) else {
        return GateInput::anonymous();
    };

    let session = match repo.get_session(claims.sid).await {
        Some(session) if session.user_id == claims.sub => session,
        _ => {
            tracing::debug!(session_id = %claims.sid, "token refers to a closed session");
            return GateInput::anonymous();
        }
    };

    let profile = match repo.get_profile(session.user_id).await {
        Ok(Some(profile)) => ProfileState::Loaded(profile),
        Ok(None) => {
            tracing::warn!(user_id = %session.user_id, "session has no profile");
            ProfileState::Failed
        }
        Err(e) => {
            tracing::error!(user_id = %session.user_id, error = %e, "profile lookup failed");
            ProfileState::Failed
        }
    };

    GateInput {
        loading: false,
        session: Some(session),
        profile,
    }
}

/// SessionResolver
///
/// The portal's `IdentityResolver`: bearer token (or the local bypass) resolved
/// against the session store and profile repository.
pub struct SessionResolver {
    pub repo: RepositoryState,
    pub config: AppConfig,
}

#[async_trait]
impl IdentityResolver for SessionResolver {
    async fn resolve(&self, headers: &HeaderMap) -> Box<dyn IdentityProvider> {
        Box::new(StaticIdentity::new(
            resolve_identity(headers, &self.repo, &self.config).await,
        ))
    }
}

async fn local_bypass(headers: &HeaderMap, repo: &RepositoryState) -> Option<GateInput> {
    let user_id = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|raw| Uuid::parse_str(raw).ok())?;

    let profile = repo.get_profile(user_id).await.ok().flatten()?;
    let session = Session {
        id: Uuid::nil(),
        user_id,
        issued_at: Utc::now(),
    };
    Some(GateInput::signed_in(session, profile))
}

/// Viewer
///
/// The identity of a viewer the gate has admitted. The gate layer places it in the
/// request extensions; handlers behind the gate take it as an argument.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub session: Session,
    pub profile: Profile,
}

impl Viewer {
    pub fn from_input(input: &GateInput) -> Option<Self> {
        Some(Self {
            session: input.session.clone()?,
            profile: input.profile.loaded()?.clone(),
        })
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Only present when the request passed through the access gate.
        parts
            .extensions
            .get::<Viewer>()
            .cloned()
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
