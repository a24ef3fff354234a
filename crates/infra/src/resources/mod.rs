//! Resource controllers: one per management widget.
//!
//! A controller owns the list it displays, registers the scopes it needs with
//! the shared [`ScopeManager`], and runs every mutation through a
//! host-configured [`Action`](orgkit_actions::Action) followed by a refresh.
//!
//! Outcomes map to user feedback the same way everywhere:
//!
//! | result                  | notification | return value                    |
//! |-------------------------|--------------|---------------------------------|
//! | disabled / vetoed       | none         | `Ok(Outcome::Skipped(_))`       |
//! | mutation failed         | error        | `Err(ResourceError::Mutation)`  |
//! | after-hook failed       | warning      | `Err(ResourceError::PostAction)`|
//! | success                 | success      | `Ok(Outcome::Completed(_))`     |

mod domains;
mod mfa;
mod organization;
mod sso_providers;

pub use domains::{DOMAIN_SCOPES, DomainActions, DomainTable};
pub use mfa::{MFA_SCOPES, MfaActions, MfaManager};
pub use organization::{ORG_DETAILS_SCOPES, OrgDetailsActions, OrganizationDetails};
pub use sso_providers::{
    DomainAssociation, SSO_PROVIDER_SCOPES, SsoActions, SsoProviderTable, domain_associations,
};

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, warn};

use orgkit_actions::{ActionError, Notification, Notifier, Severity, Translator};
use orgkit_auth::{Audience, ScopeManager};
use orgkit_core::DomainError;

use crate::client::ApiError;

/// Why a mutation did not run.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    Vetoed,
}

/// Result of a controller mutation that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    Completed(T),
    Skipped(SkipReason),
}

impl<T> Outcome<T> {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Outcome::Completed(v) => Some(v),
            Outcome::Skipped(_) => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum ResourceError {
    /// Input rejected before any request was made.
    #[error(transparent)]
    Validation(#[from] DomainError),

    /// No evaluation pass has completed for the widget's scopes yet.
    #[error("scopes for {0} are not ready")]
    Scopes(Audience),

    #[error("{resource} {id} is not loaded")]
    NotFound { resource: &'static str, id: String },

    #[error("failed to load: {0}")]
    Fetch(ApiError),

    #[error(transparent)]
    Mutation(ApiError),

    /// The change was applied; only the after-hook failed.
    #[error("the change was saved but a follow-up step failed: {0}")]
    PostAction(anyhow::Error),
}

impl ResourceError {
    fn not_found(resource: &'static str, id: impl ToString) -> Self {
        ResourceError::NotFound {
            resource,
            id: id.to_string(),
        }
    }
}

/// Message catalog plus toast sink.
#[derive(Clone)]
pub struct Feedback {
    translator: Arc<dyn Translator>,
    notifier: Arc<dyn Notifier>,
}

impl core::fmt::Debug for Feedback {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Feedback").finish_non_exhaustive()
    }
}

impl Feedback {
    pub fn new(translator: Arc<dyn Translator>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            translator,
            notifier,
        }
    }

    pub fn notify(&self, severity: Severity, key: &str, substitutions: &[(&str, &str)]) {
        self.notifier.notify(Notification {
            severity,
            key: key.to_string(),
            message: self.translator.t(key, substitutions),
        });
    }

    pub fn success(&self, key: &str, substitutions: &[(&str, &str)]) {
        self.notify(Severity::Success, key, substitutions);
    }

    pub fn warning(&self, key: &str, substitutions: &[(&str, &str)]) {
        self.notify(Severity::Warning, key, substitutions);
    }

    pub fn error(&self, key: &str, substitutions: &[(&str, &str)]) {
        self.notify(Severity::Error, key, substitutions);
    }

    /// Error notification for a failed list fetch.
    fn fetch_failed(&self, resource: &'static str, key: &str, err: ApiError) -> ResourceError {
        warn!(resource, error = %err, "fetch failed");
        let message = err.to_string();
        self.error(key, &[("error", &message)]);
        ResourceError::Fetch(err)
    }

    /// Map an action result to an [`Outcome`], notifying on failures.
    ///
    /// Success notifications are left to the caller since some depend on the
    /// returned value.
    fn settle<T>(
        &self,
        resource: &'static str,
        result: Result<T, ActionError<ApiError>>,
        error_key: &str,
        substitutions: &[(&str, &str)],
    ) -> Result<Outcome<T>, ResourceError> {
        match result {
            Ok(value) => Ok(Outcome::Completed(value)),
            Err(ActionError::Disabled) => Ok(Outcome::Skipped(SkipReason::Disabled)),
            Err(ActionError::Vetoed) => Ok(Outcome::Skipped(SkipReason::Vetoed)),
            Err(ActionError::Mutation(err)) => {
                error!(resource, error = %err, "mutation failed");
                let message = err.to_string();
                let mut subs = substitutions.to_vec();
                subs.push(("error", &message));
                self.error(error_key, &subs);
                Err(ResourceError::Mutation(err))
            }
            Err(ActionError::PostAction(err)) => {
                warn!(resource, error = %err, "after-hook failed; change was kept");
                let message = err.to_string();
                self.warning("common.post_action.error", &[("error", &message)]);
                Err(ResourceError::PostAction(err))
            }
        }
    }
}

/// Shared collaborators every controller is built with.
#[derive(Debug, Clone)]
pub struct ComponentContext {
    pub scopes: Arc<ScopeManager>,
    pub feedback: Feedback,
}

impl ComponentContext {
    pub fn new(scopes: Arc<ScopeManager>, feedback: Feedback) -> Self {
        Self { scopes, feedback }
    }

    /// Register `scopes` for `audience` and return once readiness is raised.
    ///
    /// A registration that adds nothing runs no pass of its own; it then
    /// queues behind the pass already in progress.
    async fn register(&self, audience: Audience, scopes: &str) {
        let added = self.scopes.register_scopes(audience, scopes).await;
        if !added && !self.scopes.is_ready() {
            self.scopes.reevaluate().await;
        }
    }

    fn require_ready(&self, audience: Audience) -> Result<(), ResourceError> {
        if self.scopes.is_ready() {
            Ok(())
        } else {
            Err(ResourceError::Scopes(audience))
        }
    }
}
