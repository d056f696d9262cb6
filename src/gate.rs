//! Access gate: decides, per navigation, whether a viewer may see a protected page.
//!
//! The decision is a pure function of the identity snapshot and the route's static
//! requirement. It performs no IO and never mutates the session or profile; redirect
//! side effects are issued by [`crate::navigator::GateController`].

use std::collections::BTreeSet;

use serde::Serialize;
use thiserror::Error;

use crate::models::{Profile, Role, Session};

/// RouteRequirement
///
/// Static configuration declared alongside each protected route.
///
/// - `allowed_roles`: empty means any role is permitted.
/// - `require_approval`: when true, the viewer's profile must be approved unless
///   their role is listed in `approval_exempt_roles`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteRequirement {
    pub allowed_roles: BTreeSet<Role>,
    pub require_approval: bool,
    pub approval_exempt_roles: BTreeSet<Role>,
}

impl Default for RouteRequirement {
    fn default() -> Self {
        Self {
            allowed_roles: BTreeSet::new(),
            require_approval: true,
            approval_exempt_roles: default_exempt_roles(),
        }
    }
}

/// Roles that skip the approval check unless a route says otherwise.
pub fn default_exempt_roles() -> BTreeSet<Role> {
    BTreeSet::from([Role::Admin, Role::SalesManager])
}

impl RouteRequirement {
    /// Any authenticated, approved (or exempt) viewer.
    pub fn any_role() -> Self {
        Self::default()
    }

    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            allowed_roles: roles.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn without_approval(mut self) -> Self {
        self.require_approval = false;
        self
    }

    pub fn with_exempt_roles(mut self, roles: impl IntoIterator<Item = Role>) -> Self {
        self.approval_exempt_roles = roles.into_iter().collect();
        self
    }

    /// Approval is satisfied when the route does not require it, the profile is
    /// approved, or the role is exempt.
    pub fn approval_satisfied(&self, profile: &Profile) -> bool {
        !self.require_approval
            || profile.is_approved()
            || self.approval_exempt_roles.contains(&profile.role)
    }

    pub fn role_permitted(&self, role: Role) -> bool {
        self.allowed_roles.is_empty() || self.allowed_roles.contains(&role)
    }
}

/// Load state of the viewer's profile. `Failed` is distinct from `NotLoaded`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ProfileState {
    #[default]
    NotLoaded,
    Loaded(Profile),
    Failed,
}

impl ProfileState {
    pub fn loaded(&self) -> Option<&Profile> {
        match self {
            ProfileState::Loaded(profile) => Some(profile),
            ProfileState::NotLoaded | ProfileState::Failed => None,
        }
    }
}

/// A read-only snapshot of everything the gate depends on besides the route.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GateInput {
    pub loading: bool,
    pub session: Option<Session>,
    pub profile: ProfileState,
}

impl GateInput {
    pub fn loading() -> Self {
        Self {
            loading: true,
            ..Self::default()
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn signed_in(session: Session, profile: Profile) -> Self {
        Self {
            loading: false,
            session: Some(session),
            profile: ProfileState::Loaded(profile),
        }
    }
}

/// Why a viewer was turned away. Every denial results in a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum Denial {
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("account pending approval")]
    PendingApproval,
    #[error("role not permitted for this route")]
    RoleNotPermitted,
    #[error("profile could not be loaded")]
    ProfileLoadFailure,
}

/// Where denied viewers are sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatePaths {
    pub sign_in: String,
    pub pending: String,
    pub home: String,
}

impl Default for GatePaths {
    fn default() -> Self {
        Self {
            sign_in: "/auth".to_string(),
            pending: "/pending-approval".to_string(),
            home: "/".to_string(),
        }
    }
}

impl GatePaths {
    pub fn target_for(&self, denial: Denial) -> &str {
        match denial {
            Denial::NotAuthenticated | Denial::ProfileLoadFailure => &self.sign_in,
            Denial::PendingApproval => &self.pending,
            Denial::RoleNotPermitted => &self.home,
        }
    }
}

/// A redirect the gate wants performed. Gate redirects always use replace semantics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub target: String,
    pub reason: Denial,
    pub replace: bool,
    pub return_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Loading,
    Redirect(Redirect),
    Granted,
}

impl AccessDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, AccessDecision::Granted)
    }

    pub fn redirect(&self) -> Option<&Redirect> {
        match self {
            AccessDecision::Redirect(redirect) => Some(redirect),
            AccessDecision::Loading | AccessDecision::Granted => None,
        }
    }

    pub fn denial(&self) -> Option<Denial> {
        self.redirect().map(|r| r.reason)
    }
}

/// Evaluates the gate. States are checked in a fixed priority order; first match wins:
/// loading, unauthenticated, approval pending, role forbidden, granted.
pub fn evaluate(
    input: &GateInput,
    requirement: &RouteRequirement,
    paths: &GatePaths,
    current_path: &str,
) -> AccessDecision {
    if input.loading {
        return AccessDecision::Loading;
    }

    if input.session.is_none() {
        return deny(paths, Denial::NotAuthenticated, current_path);
    }

    let profile = match &input.profile {
        ProfileState::Loaded(profile) => profile,
        // Session resolved but the profile has not arrived yet.
        ProfileState::NotLoaded => return AccessDecision::Loading,
        ProfileState::Failed => return deny(paths, Denial::ProfileLoadFailure, current_path),
    };

    if !requirement.approval_satisfied(profile) {
        return deny(paths, Denial::PendingApproval, current_path);
    }

    if !requirement.role_permitted(profile.role) {
        return deny(paths, Denial::RoleNotPermitted, current_path);
    }

    AccessDecision::Granted
}

fn deny(paths: &GatePaths, reason: Denial, current_path: &str) -> AccessDecision {
    let return_to = match reason {
        Denial::NotAuthenticated | Denial::ProfileLoadFailure => Some(current_path.to_string()),
        Denial::PendingApproval | Denial::RoleNotPermitted => None,
    };

    tracing::debug!(path = %current_path, ?reason, "access gate denied navigation");

    AccessDecision::Redirect(Redirect {
        target: paths.target_for(reason).to_string(),
        reason,
        replace: true,
        return_to,
    })
}
