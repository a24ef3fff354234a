//! Remote-owned resource records.
//!
//! These are plain data carriers: the management APIs own their consistency
//! and the client keeps nothing beyond the last fetched list.

pub mod authenticator;
pub mod domain;
pub mod organization;
pub mod provider;

pub use authenticator::{
    Authenticator, Enrollment, EnrollmentInput, Factor, FactorType, validate_otp_code,
};
pub use domain::{Domain, DomainStatus, NewDomain};
pub use organization::{BrandColors, Branding, OrgDetailsUpdate, Organization};
pub use provider::{IdentityProvider, NewProvider, ProviderStrategy, ProviderUpdate};
