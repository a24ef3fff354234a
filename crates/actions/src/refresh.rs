//! Mutate-then-refresh combinator shared by every resource controller.

use std::future::Future;

use crate::action::Action;
use crate::lifecycle::{ActionError, run_action};

/// Run the action and, if the remote change committed, refresh local state.
///
/// The refresh runs after `Ok` and after [`ActionError::PostAction`] (the
/// server already applied the change); it is skipped when the action was
/// cancelled or the mutation failed. The action's outcome is returned
/// unchanged.
pub async fn mutate_then_refresh<I, E, O, M, F, Fut, R, RFut>(
    action: &Action<I, E, O>,
    input: I,
    extra: Option<E>,
    perform: F,
    refresh: R,
) -> Result<O, ActionError<M>>
where
    I: Clone,
    E: Clone,
    F: FnOnce(I, Option<E>) -> Fut,
    Fut: Future<Output = Result<O, M>>,
    R: FnOnce() -> RFut,
    RFut: Future<Output = ()>,
{
    let outcome = run_action(action, input, extra, perform).await;

    let committed = match &outcome {
        Ok(_) => true,
        Err(err) => err.mutation_committed(),
    };
    if committed {
        refresh().await;
    }

    outcome
}
