//! `orgkit-auth` — OAuth scope bookkeeping on top of the host's auth session.
//!
//! This crate is intentionally decoupled from HTTP and from any UI runtime.

pub mod audience;
pub mod layer;
pub mod manager;
pub mod scope;

pub use audience::Audience;
pub use layer::{AccessToken, AuthError, AuthLayer, StaticAuthLayer};
pub use manager::{ScopeEnsureError, ScopeManager};
pub use scope::{Scope, ScopeSet, parse_scopes};
