//! `orgkit-actions` — the execution envelope around every mutating operation.
//!
//! - [`Action`]: host configuration (disabled flag, before/after hooks)
//! - [`run_action`]: the lifecycle (veto → mutation → follow-up)
//! - [`mutate_then_refresh`]: lifecycle + list refresh after a committed change
//! - [`ResourceList`]: list state and in-flight flags owned by one controller
//! - [`Translator`] / [`Notifier`]: user-facing copy and notification sinks

pub mod action;
pub mod feedback;
pub mod lifecycle;
pub mod list;
pub mod refresh;

pub use action::{Action, AfterHook, BeforeHook, Decision};
pub use feedback::{
    CatalogTranslator, Notification, Notifier, RecordingNotifier, Severity, TracingNotifier,
    Translator,
};
pub use lifecycle::{ActionError, run_action};
pub use list::{InFlight, MutationKind, ResourceList};
pub use refresh::mutate_then_refresh;
