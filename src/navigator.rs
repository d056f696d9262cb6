use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use tokio::sync::watch;

use crate::gate::{self, AccessDecision, GateInput, GatePaths, RouteRequirement};

/// Navigation state carried along with a redirect.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationState {
    pub return_to: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RedirectOptions {
    /// Replace the current history entry instead of pushing a new one.
    pub replace: bool,
    pub state: Option<NavigationState>,
}

/// Navigator
///
/// Performs redirects on behalf of the gate. Implementations must honour `replace`.
pub trait Navigator: Send + Sync {
    fn redirect(&self, path: &str, options: RedirectOptions);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRedirect {
    pub path: String,
    pub options: RedirectOptions,
}

/// RecordingNavigator
///
/// Keeps every redirect it is asked to perform. The HTTP gate layer turns the last
/// recorded redirect into a response.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    redirects: Mutex<Vec<RecordedRedirect>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirects(&self) -> Vec<RecordedRedirect> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn last(&self) -> Option<RecordedRedirect> {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn redirect(&self, path: &str, options: RedirectOptions) {
        self.redirects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedRedirect {
                path: path.to_string(),
                options,
            });
    }
}

/// Identifies one navigation. Decisions computed for a ticket that is no longer
/// current are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NavigationTicket(u64);

struct ActiveNavigation {
    ticket: NavigationTicket,
    path: String,
    requirement: RouteRequirement,
    last_input: Option<GateInput>,
    last_decision: Option<AccessDecision>,
}

/// GateController
///
/// Wraps [`gate::evaluate`] in an explicit state machine:
///
/// * `navigate` starts a navigation and abandons the previous one.
/// * `observe` re-evaluates against a new identity snapshot. A redirect is issued at
///   most once per distinct input tuple of the current navigation; re-observing the
///   same snapshot returns the cached decision and never navigates again.
pub struct GateController<N: Navigator> {
    navigator: N,
    paths: GatePaths,
    next_ticket: u64,
    active: Option<ActiveNavigation>,
}

impl<N: Navigator> GateController<N> {
    pub fn new(navigator: N, paths: GatePaths) -> Self {
        Self {
            navigator,
            paths,
            next_ticket: 0,
            active: None,
        }
    }

    pub fn navigator(&self) -> &N {
        &self.navigator
    }

    pub fn current_path(&self) -> Option<&str> {
        self.active.as_ref().map(|nav| nav.path.as_str())
    }

    pub fn navigate(&mut self, path: &str, requirement: RouteRequirement) -> NavigationTicket {
        self.next_ticket += 1;
        let ticket = NavigationTicket(self.next_ticket);

        if let Some(previous) = self.active.take() {
            tracing::debug!(from = %previous.path, to = %path, "abandoning navigation");
        }

        self.active = Some(ActiveNavigation {
            ticket,
            path: path.to_string(),
            requirement,
            last_input: None,
            last_decision: None,
        });
        ticket
    }

    /// Evaluates the current navigation. Returns `None` when nothing is being navigated.
    pub fn observe(&mut self, input: &GateInput) -> Option<AccessDecision> {
        let ticket = self.active.as_ref()?.ticket;
        self.observe_for(ticket, input)
    }

    /// Like [`observe`](Self::observe), but only for the navigation identified by
    /// `ticket`. Stale tickets yield `None` and never redirect.
    pub fn observe_for(
        &mut self,
        ticket: NavigationTicket,
        input: &GateInput,
    ) -> Option<AccessDecision> {
        let nav = self.active.as_mut().filter(|nav| nav.ticket == ticket)?;

        if nav.last_input.as_ref() == Some(input) {
            return nav.last_decision.clone();
        }

        let decision = gate::evaluate(input, &nav.requirement, &self.paths, &nav.path);
        nav.last_input = Some(input.clone());
        nav.last_decision = Some(decision.clone());

        if let AccessDecision::Redirect(redirect) = &decision {
            tracing::info!(
                from = %nav.path,
                to = %redirect.target,
                reason = %redirect.reason,
                "gate redirect"
            );
            self.navigator.redirect(
                &redirect.target,
                RedirectOptions {
                    replace: redirect.replace,
                    state: redirect.return_to.clone().map(|return_to| NavigationState {
                        return_to: Some(return_to),
                    }),
                },
            );
        }

        Some(decision)
    }

    /// Re-evaluates on every identity change until the current navigation reaches a
    /// terminal decision (granted or redirected). Returns `None` if the identity source
    /// goes away first or no navigation is active.
    pub async fn drive(&mut self, identity: &mut watch::Receiver<GateInput>) -> Option<AccessDecision> {
        let ticket = self.active.as_ref()?.ticket;
        loop {
            let input = identity.borrow_and_update().clone();
            match self.observe_for(ticket, &input)? {
                AccessDecision::Loading => {}
                terminal => return Some(terminal),
            }
            if identity.changed().await.is_err() {
                return None;
            }
        }
    }
}
