//! `orgkit-core` — resource models and validation shared by every widget.
//!
//! This crate contains **pure** data and checks (no IO, no async).

pub mod entity;
pub mod error;
pub mod id;
pub mod resources;
pub mod validate;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{AuthenticatorId, DomainId, OrganizationId, ProviderId};
pub use resources::*;
