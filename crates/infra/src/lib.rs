//! Infrastructure layer: management API clients, client configuration and
//! the resource controllers built on them.

pub mod client;
pub mod config;
pub mod resources;

pub use client::{
    ApiError, ApiResult, AuthenticatorApi, DomainApi, HttpManagementClient, IdentityProviderApi,
    InMemoryManagementClient, OrganizationApi,
};
pub use config::{ClientConfig, ConfigError};
pub use resources::{
    ComponentContext, DOMAIN_SCOPES, DomainActions, DomainAssociation, DomainTable, Feedback,
    MFA_SCOPES, MfaActions, MfaManager, ORG_DETAILS_SCOPES, OrgDetailsActions,
    OrganizationDetails, Outcome, ResourceError, SSO_PROVIDER_SCOPES, SkipReason, SsoActions,
    SsoProviderTable, domain_associations,
};
