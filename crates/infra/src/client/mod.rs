//! Management API boundary.
//!
//! One trait per resource family, so a widget only depends on the calls it
//! makes. [`InMemoryManagementClient`] and [`HttpManagementClient`] implement
//! all of them.

mod error;
mod http;
mod in_memory;

pub use error::{ApiError, ApiResult};
pub use http::HttpManagementClient;
pub use in_memory::InMemoryManagementClient;

use async_trait::async_trait;

use orgkit_core::{
    Authenticator, AuthenticatorId, Domain, DomainId, Enrollment, EnrollmentInput, Factor,
    FactorType, IdentityProvider, NewDomain, NewProvider, OrgDetailsUpdate, Organization,
    ProviderId, ProviderUpdate,
};

/// Organization domains (My Org API).
#[async_trait]
pub trait DomainApi: Send + Sync {
    async fn list_domains(&self) -> ApiResult<Vec<Domain>>;

    async fn create_domain(&self, request: &NewDomain) -> ApiResult<Domain>;

    async fn delete_domain(&self, id: &DomainId) -> ApiResult<()>;

    /// Ask the server to check the domain's DNS record now.
    ///
    /// Returns the domain with its updated status; a record that is not
    /// visible yet leaves it `pending` and is not an error.
    async fn verify_domain(&self, id: &DomainId) -> ApiResult<Domain>;
}

/// Enterprise identity providers (My Org API).
#[async_trait]
pub trait IdentityProviderApi: Send + Sync {
    async fn list_providers(&self) -> ApiResult<Vec<IdentityProvider>>;

    async fn create_provider(&self, request: &NewProvider) -> ApiResult<IdentityProvider>;

    async fn update_provider(
        &self,
        id: &ProviderId,
        update: &ProviderUpdate,
    ) -> ApiResult<IdentityProvider>;

    async fn delete_provider(&self, id: &ProviderId) -> ApiResult<()>;

    /// Route sign-ins for a verified organization domain to the provider.
    async fn add_provider_domain(&self, id: &ProviderId, domain: &str) -> ApiResult<()>;

    async fn remove_provider_domain(&self, id: &ProviderId, domain: &str) -> ApiResult<()>;
}

/// Organization details (My Org API).
#[async_trait]
pub trait OrganizationApi: Send + Sync {
    async fn get_details(&self) -> ApiResult<Organization>;

    async fn update_details(&self, update: &OrgDetailsUpdate) -> ApiResult<Organization>;
}

/// MFA factors and authenticators of the signed-in user (My Account API).
#[async_trait]
pub trait AuthenticatorApi: Send + Sync {
    async fn list_factors(&self) -> ApiResult<Vec<Factor>>;

    async fn list_authenticators(&self) -> ApiResult<Vec<Authenticator>>;

    async fn enroll(&self, factor: FactorType, input: &EnrollmentInput) -> ApiResult<Enrollment>;

    async fn confirm_enrollment(&self, id: &AuthenticatorId, otp_code: &str)
    -> ApiResult<Authenticator>;

    async fn delete_authenticator(&self, id: &AuthenticatorId) -> ApiResult<()>;
}
