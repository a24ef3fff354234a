//! Host-configurable wrapper around one mutating operation.
//!
//! Every create/update/delete/verify/associate call a widget makes is described
//! by an [`Action`]: whether it is currently allowed, a hook that may cancel it
//! before anything is sent, and a hook that runs after the server accepted the
//! change.
//!
//! ```ignore
//! let create = Action::<NewDomain, (), Domain>::new("domains.create")
//!     .on_before(|req, _| Decision::from(!req.domain.ends_with(".test")))
//!     .on_after(|_, _, domain| {
//!         audit.record(&domain.id);
//!         Ok(())
//!     });
//! ```

use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

/// Outcome of a before-hook.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Decision {
    Proceed,
    Cancel,
}

impl Decision {
    pub fn is_proceed(self) -> bool {
        self == Decision::Proceed
    }
}

impl From<bool> for Decision {
    fn from(proceed: bool) -> Self {
        if proceed {
            Decision::Proceed
        } else {
            Decision::Cancel
        }
    }
}

/// Veto hook run before the mutation.
#[async_trait]
pub trait BeforeHook<I, E>: Send + Sync {
    async fn on_before(&self, input: &I, extra: Option<&E>) -> Decision;
}

/// Side-effect hook run after a successful mutation.
///
/// An error here does not undo the mutation.
#[async_trait]
pub trait AfterHook<I, E, O>: Send + Sync {
    async fn on_after(&self, input: &I, extra: Option<&E>, result: &O) -> anyhow::Result<()>;
}

struct FnBefore<F>(F);

#[async_trait]
impl<I, E, F> BeforeHook<I, E> for FnBefore<F>
where
    I: Sync,
    E: Sync,
    F: Fn(&I, Option<&E>) -> Decision + Send + Sync,
{
    async fn on_before(&self, input: &I, extra: Option<&E>) -> Decision {
        (self.0)(input, extra)
    }
}

struct AsyncFnBefore<F>(F);

#[async_trait]
impl<I, E, F, Fut> BeforeHook<I, E> for AsyncFnBefore<F>
where
    I: Clone + Sync,
    E: Clone + Sync,
    F: Fn(I, Option<E>) -> Fut + Send + Sync,
    Fut: Future<Output = Decision> + Send,
{
    async fn on_before(&self, input: &I, extra: Option<&E>) -> Decision {
        (self.0)(input.clone(), extra.cloned()).await
    }
}

struct FnAfter<F>(F);

#[async_trait]
impl<I, E, O, F> AfterHook<I, E, O> for FnAfter<F>
where
    I: Sync,
    E: Sync,
    O: Sync,
    F: Fn(&I, Option<&E>, &O) -> anyhow::Result<()> + Send + Sync,
{
    async fn on_after(&self, input: &I, extra: Option<&E>, result: &O) -> anyhow::Result<()> {
        (self.0)(input, extra, result)
    }
}

struct AsyncFnAfter<F>(F);

#[async_trait]
impl<I, E, O, F, Fut> AfterHook<I, E, O> for AsyncFnAfter<F>
where
    I: Clone + Sync,
    E: Clone + Sync,
    O: Clone + Sync,
    F: Fn(I, Option<E>, O) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    async fn on_after(&self, input: &I, extra: Option<&E>, result: &O) -> anyhow::Result<()> {
        (self.0)(input.clone(), extra.cloned(), result.clone()).await
    }
}

/// Configuration of one mutating operation.
///
/// - `I`: the operation's input (e.g. the domain being created)
/// - `E`: optional extra context passed alongside the input
/// - `O`: what the mutation returns
///
/// Cheap to clone; hooks are shared.
pub struct Action<I, E = (), O = ()> {
    name: Cow<'static, str>,
    disabled: bool,
    before: Option<Arc<dyn BeforeHook<I, E>>>,
    after: Option<Arc<dyn AfterHook<I, E, O>>>,
}

impl<I, E, O> Action<I, E, O> {
    /// An enabled action without hooks. `name` is used in logs.
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            disabled: false,
            before: None,
            after: None,
        }
    }

    pub fn disabled(mut self, disabled: bool) -> Self {
        self.disabled = disabled;
        self
    }

    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Synchronous before-hook.
    pub fn on_before<F>(mut self, hook: F) -> Self
    where
        I: Sync + 'static,
        E: Sync + 'static,
        F: Fn(&I, Option<&E>) -> Decision + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(FnBefore(hook)));
        self
    }

    /// Asynchronous before-hook; receives owned copies of the input.
    pub fn on_before_async<F, Fut>(mut self, hook: F) -> Self
    where
        I: Clone + Sync + 'static,
        E: Clone + Sync + 'static,
        F: Fn(I, Option<E>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Decision> + Send + 'static,
    {
        self.before = Some(Arc::new(AsyncFnBefore(hook)));
        self
    }

    /// Use a custom [`BeforeHook`] implementation.
    pub fn with_before_hook(mut self, hook: Arc<dyn BeforeHook<I, E>>) -> Self {
        self.before = Some(hook);
        self
    }

    /// Synchronous after-hook.
    pub fn on_after<F>(mut self, hook: F) -> Self
    where
        I: Sync + 'static,
        E: Sync + 'static,
        O: Sync + 'static,
        F: Fn(&I, Option<&E>, &O) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(FnAfter(hook)));
        self
    }

    /// Asynchronous after-hook; receives owned copies of input and result.
    pub fn on_after_async<F, Fut>(mut self, hook: F) -> Self
    where
        I: Clone + Sync + 'static,
        E: Clone + Sync + 'static,
        O: Clone + Sync + 'static,
        F: Fn(I, Option<E>, O) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        self.after = Some(Arc::new(AsyncFnAfter(hook)));
        self
    }

    /// Use a custom [`AfterHook`] implementation.
    pub fn with_after_hook(mut self, hook: Arc<dyn AfterHook<I, E, O>>) -> Self {
        self.after = Some(hook);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub(crate) fn before_hook(&self) -> Option<&Arc<dyn BeforeHook<I, E>>> {
        self.before.as_ref()
    }

    pub(crate) fn after_hook(&self) -> Option<&Arc<dyn AfterHook<I, E, O>>> {
        self.after.as_ref()
    }
}

impl<I, E, O> Default for Action<I, E, O> {
    fn default() -> Self {
        Self::new("action")
    }
}

impl<I, E, O> Clone for Action<I, E, O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            disabled: self.disabled,
            before: self.before.clone(),
            after: self.after.clone(),
        }
    }
}

impl<I, E, O> core::fmt::Debug for Action<I, E, O> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("disabled", &self.disabled)
            .field("on_before", &self.before.is_some())
            .field("on_after", &self.after.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_from_bool() {
        assert_eq!(Decision::from(true), Decision::Proceed);
        assert_eq!(Decision::from(false), Decision::Cancel);
        assert!(!Decision::Cancel.is_proceed());
    }

    #[test]
    fn builder_sets_flags_and_hooks() {
        let action = Action::<String, (), ()>::new("domains.delete")
            .disabled(true)
            .on_before(|_, _| Decision::Proceed);
        assert!(action.is_disabled());
        assert_eq!(action.name(), "domains.delete");
        let debug = format!("{action:?}");
        assert!(debug.contains("on_before: true"));
        assert!(debug.contains("on_after: false"));
    }

    #[test]
    fn default_action_is_enabled_without_hooks() {
        let action = Action::<u32>::default();
        assert!(!action.is_disabled());
        assert!(action.before_hook().is_none());
        assert!(action.after_hook().is_none());
    }
}
