use tokio::sync::watch;

use crate::{
    gate::{GateInput, ProfileState},
    models::{Profile, Session},
};

/// IdentityProvider
///
/// The capability the gate reads identity from. It is handed to the gate at
/// construction or request time rather than looked up globally, so tests can
/// substitute a fake.
pub trait IdentityProvider: Send + Sync {
    fn current_session(&self) -> Option<Session>;
    fn current_profile(&self) -> ProfileState;
    fn is_resolving(&self) -> bool;

    /// A consistent view of all three values.
    fn snapshot(&self) -> GateInput {
        GateInput {
            loading: self.is_resolving(),
            session: self.current_session(),
            profile: self.current_profile(),
        }
    }
}

/// StaticIdentity
///
/// A fixed identity snapshot. Used for per-request identities resolved by the HTTP
/// layer, where resolution has already finished before the gate runs.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentity(GateInput);

impl StaticIdentity {
    pub fn new(input: GateInput) -> Self {
        Self(input)
    }

    pub fn anonymous() -> Self {
        Self(GateInput::anonymous())
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_session(&self) -> Option<Session> {
        self.0.session.clone()
    }

    fn current_profile(&self) -> ProfileState {
        self.0.profile.clone()
    }

    fn is_resolving(&self) -> bool {
        self.0.loading
    }

    fn snapshot(&self) -> GateInput {
        self.0.clone()
    }
}

/// WatchedIdentity
///
/// A reactive identity provider. Every change to session, profile or the resolving flag
/// is published through a `tokio::sync::watch` channel, so a
/// [`GateController`](crate::navigator::GateController) can re-evaluate on each change.
///
/// Starts in the resolving state: nothing is known until the first resolution.
pub struct WatchedIdentity {
    tx: watch::Sender<GateInput>,
}

impl Default for WatchedIdentity {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchedIdentity {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(GateInput::loading());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<GateInput> {
        self.tx.subscribe()
    }

    /// Marks identity as being (re)resolved, e.g. when a token refresh starts.
    pub fn begin_resolving(&self) {
        self.tx.send_if_modified(|input| {
            if input.loading {
                return false;
            }
            input.loading = true;
            true
        });
    }

    /// Publishes a finished resolution. A `None` session means the viewer is signed out.
    pub fn resolve(&self, session: Option<Session>, profile: Option<Profile>) {
        let profile = match (&session, profile) {
            (Some(_), Some(profile)) => ProfileState::Loaded(profile),
            (Some(_), None) => ProfileState::NotLoaded,
            (None, _) => ProfileState::NotLoaded,
        };
        self.publish(GateInput {
            loading: false,
            session,
            profile,
        });
    }

    /// The session resolved but its profile could not be fetched.
    pub fn fail_profile(&self, session: Session) {
        tracing::warn!(user_id = %session.user_id, "profile resolution failed");
        self.publish(GateInput {
            loading: false,
            session: Some(session),
            profile: ProfileState::Failed,
        });
    }

    pub fn sign_out(&self) {
        self.publish(GateInput::anonymous());
    }

    fn publish(&self, next: GateInput) {
        self.tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }
}

impl IdentityProvider for WatchedIdentity {
    fn current_session(&self) -> Option<Session> {
        self.tx.borrow().session.clone()
    }

    fn current_profile(&self) -> ProfileState {
        self.tx.borrow().profile.clone()
    }

    fn is_resolving(&self) -> bool {
        self.tx.borrow().loading
    }

    fn snapshot(&self) -> GateInput {
        self.tx.borrow().clone()
    }
}
