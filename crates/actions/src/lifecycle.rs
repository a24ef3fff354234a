//! Action execution lifecycle.
//!
//! ```text
//! disabled? ──yes──▶ Disabled
//!    │ no
//! on_before ──Cancel──▶ Vetoed
//!    │ Proceed / absent
//! mutation ──Err──▶ Mutation(err)
//!    │ Ok(result)
//! on_after ──Err──▶ PostAction(err)   (mutation already committed)
//!    │ Ok / absent
//! Ok(result)
//! ```
//!
//! Phases of one invocation never overlap. Separate invocations of the same
//! action are not serialized; callers disable the triggering control while a
//! call is in flight (see [`crate::ResourceList::begin`]).

use std::future::Future;

use thiserror::Error;
use tracing::debug;

use crate::action::{Action, Decision};

/// Why an action did not complete cleanly.
#[derive(Debug, Error)]
pub enum ActionError<E> {
    /// The action was disabled; nothing ran.
    #[error("action is disabled")]
    Disabled,

    /// The before-hook cancelled the action; nothing was sent.
    #[error("action was cancelled before it ran")]
    Vetoed,

    /// The mutation itself failed.
    #[error("{0}")]
    Mutation(E),

    /// The mutation succeeded but the after-hook failed.
    #[error("the change was saved but a follow-up step failed: {0}")]
    PostAction(anyhow::Error),
}

impl<E> ActionError<E> {
    /// Disabled or vetoed: the user (or host) chose not to run it.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, ActionError::Disabled | ActionError::Vetoed)
    }

    /// The remote change happened even though an error is reported.
    pub fn mutation_committed(&self) -> bool {
        matches!(self, ActionError::PostAction(_))
    }

    pub fn mutation_error(&self) -> Option<&E> {
        match self {
            ActionError::Mutation(e) => Some(e),
            _ => None,
        }
    }

    pub fn map_mutation<F, E2>(self, f: F) -> ActionError<E2>
    where
        F: FnOnce(E) -> E2,
    {
        match self {
            ActionError::Disabled => ActionError::Disabled,
            ActionError::Vetoed => ActionError::Vetoed,
            ActionError::Mutation(e) => ActionError::Mutation(f(e)),
            ActionError::PostAction(e) => ActionError::PostAction(e),
        }
    }
}

/// Run `perform` inside the action's lifecycle.
///
/// `perform` receives owned copies of the input; the originals are kept for
/// the after-hook.
pub async fn run_action<I, E, O, M, F, Fut>(
    action: &Action<I, E, O>,
    input: I,
    extra: Option<E>,
    perform: F,
) -> Result<O, ActionError<M>>
where
    I: Clone,
    E: Clone,
    F: FnOnce(I, Option<E>) -> Fut,
    Fut: Future<Output = Result<O, M>>,
{
    let name = action.name();

    if action.is_disabled() {
        debug!(action = name, "action disabled; skipping");
        return Err(ActionError::Disabled);
    }

    if let Some(hook) = action.before_hook() {
        if hook.on_before(&input, extra.as_ref()).await == Decision::Cancel {
            debug!(action = name, "action vetoed by before-hook");
            return Err(ActionError::Vetoed);
        }
    }

    debug!(action = name, "running mutation");
    let result = perform(input.clone(), extra.clone())
        .await
        .map_err(ActionError::Mutation)?;

    if let Some(hook) = action.after_hook() {
        hook.on_after(&input, extra.as_ref(), &result)
            .await
            .map_err(ActionError::PostAction)?;
    }

    debug!(action = name, "action completed");
    Ok(result)
}
