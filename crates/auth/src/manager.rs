//! Scope aggregation across independently mounted widgets.
//!
//! Each widget announces the scopes it needs. The manager unions them per
//! audience and asks the [`AuthLayer`] to ensure the consolidated set, issuing
//! a request only when the set actually changed. One manager is shared (via
//! `Arc`) by everything mounted in the same application tree.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{Audience, AuthLayer, Scope, ScopeSet, parse_scopes};

/// Failure to elevate scopes for one audience.
///
/// Recorded and logged; never returned from [`ScopeManager::register_scopes`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("failed to ensure scopes '{scope}' for {audience}: {message}")]
pub struct ScopeEnsureError {
    pub audience: Audience,
    pub scope: String,
    pub message: String,
}

#[derive(Debug, Default)]
struct RegistryState {
    required: BTreeMap<Audience, ScopeSet>,
    ensured: BTreeMap<Audience, String>,
    failures: BTreeMap<Audience, ScopeEnsureError>,
}

impl RegistryState {
    fn required_string(&self, audience: Audience) -> String {
        self.required
            .get(&audience)
            .map(ScopeSet::to_scope_string)
            .unwrap_or_default()
    }

    fn ensured_string(&self, audience: Audience) -> String {
        self.ensured.get(&audience).cloned().unwrap_or_default()
    }

    /// Union `tokens` into the audience's set; returns whether anything was added.
    fn add(&mut self, audience: Audience, tokens: Vec<Scope>) -> bool {
        self.required.entry(audience).or_default().extend(tokens) > 0
    }
}

/// Per-tree scope registry.
///
/// State is private; the only writers are [`register_scopes`](Self::register_scopes)
/// and the evaluation pass it triggers.
pub struct ScopeManager {
    auth: Arc<dyn AuthLayer>,
    state: Mutex<RegistryState>,
    // Serializes evaluation passes so an older pass can never overwrite a
    // newer `ensured` value.
    evaluation: tokio::sync::Mutex<()>,
    ready: watch::Sender<bool>,
}

impl core::fmt::Debug for ScopeManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ScopeManager")
            .field("state", &*self.lock())
            .field("ready", &self.is_ready())
            .finish_non_exhaustive()
    }
}

impl ScopeManager {
    pub fn new(auth: Arc<dyn AuthLayer>) -> Self {
        let (ready, _) = watch::channel(false);
        Self {
            auth,
            state: Mutex::new(RegistryState::default()),
            evaluation: tokio::sync::Mutex::new(()),
            ready,
        }
    }

    /// Seed registrations before the tree mounts.
    ///
    /// Nothing is requested until [`mount`](Self::mount) runs.
    pub fn with_initial(self, audience: Audience, scopes: &str) -> Self {
        let tokens = parse_scopes(scopes);
        if !tokens.is_empty() {
            self.lock().add(audience, tokens);
        }
        self
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Announce scopes required by a widget.
    ///
    /// Blank input, or input that adds no new token, changes nothing and issues
    /// no request. Otherwise an evaluation pass runs before this returns.
    /// Returns whether the registry changed.
    pub async fn register_scopes(&self, audience: Audience, scopes: &str) -> bool {
        let tokens = parse_scopes(scopes);
        if tokens.is_empty() {
            return false;
        }

        let changed = self.lock().add(audience, tokens);
        if !changed {
            debug!(%audience, scopes, "scopes already registered");
            return false;
        }

        self.reevaluate().await;
        true
    }

    /// Run the initial evaluation pass for seeded registrations.
    pub async fn mount(&self) {
        self.reevaluate().await;
    }

    /// Ensure every audience whose required set differs from what was last
    /// ensured.
    ///
    /// Failures are recorded per audience and do not stop the remaining
    /// audiences. Readiness is raised once any audience has scopes, whether or
    /// not the requests succeeded.
    pub async fn reevaluate(&self) {
        let _pass = self.evaluation.lock().await;
        let mut any_required = false;

        for audience in Audience::ALL {
            let (current, ensured) = {
                let state = self.lock();
                (state.required_string(audience), state.ensured_string(audience))
            };
            if current.is_empty() {
                continue;
            }
            any_required = true;

            if current == ensured {
                debug!(%audience, scope = %current, "scopes unchanged; skipping");
                continue;
            }

            match self.auth.ensure_scopes(&current, audience).await {
                Ok(()) => {
                    info!(%audience, scope = %current, "scopes ensured");
                    let mut state = self.lock();
                    state.failures.remove(&audience);
                    state.ensured.insert(audience, current);
                }
                Err(err) => {
                    warn!(%audience, scope = %current, error = %err, "failed to ensure scopes");
                    self.lock().failures.insert(
                        audience,
                        ScopeEnsureError {
                            audience,
                            scope: current,
                            message: err.to_string(),
                        },
                    );
                }
            }
        }

        if any_required {
            self.ready.send_if_modified(|ready| {
                let changed = !*ready;
                *ready = true;
                changed
            });
        }
    }

    /// Whether an evaluation pass has completed with at least one scope
    /// registered. Never reverts to `false`.
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Observe readiness changes.
    pub fn ready_signal(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    /// Wait until [`is_ready`](Self::is_ready) holds.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives as long as `self`, so this only ends once ready.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    /// Scope string last successfully ensured for `audience` (empty if none).
    pub fn ensured(&self, audience: Audience) -> String {
        self.lock().ensured_string(audience)
    }

    /// Ensured scope strings for every audience.
    pub fn ensured_snapshot(&self) -> BTreeMap<Audience, String> {
        let state = self.lock();
        Audience::ALL
            .into_iter()
            .map(|audience| (audience, state.ensured_string(audience)))
            .collect()
    }

    /// Sorted, space-joined required scopes for `audience`.
    pub fn required(&self, audience: Audience) -> String {
        self.lock().required_string(audience)
    }

    /// Whether every token in `scopes` has been ensured for `audience`.
    pub fn covers(&self, audience: Audience, scopes: &str) -> bool {
        let ensured = self.ensured(audience);
        let granted: ScopeSet = parse_scopes(&ensured).into_iter().collect();
        parse_scopes(scopes).iter().all(|scope| granted.contains(scope))
    }

    /// Last ensure failure for `audience`, cleared by the next success.
    pub fn last_failure(&self, audience: Audience) -> Option<ScopeEnsureError> {
        self.lock().failures.get(&audience).cloned()
    }
}
