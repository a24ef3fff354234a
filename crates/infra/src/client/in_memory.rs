use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use orgkit_core::{
    Authenticator, AuthenticatorId, Branding, Domain, DomainId, DomainStatus, Enrollment,
    EnrollmentInput, Factor, FactorType, IdentityProvider, NewDomain, NewProvider,
    OrgDetailsUpdate, Organization, OrganizationId, ProviderId, ProviderUpdate,
};

use super::{
    ApiError, ApiResult, AuthenticatorApi, DomainApi, IdentityProviderApi, OrganizationApi,
};

const DEFAULT_OTP_CODE: &str = "123456";

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// In-memory implementation of every management API.
///
/// Intended for tests/dev. Enforces the same uniqueness (409) and existence
/// (404) rules as the real service. Domain verification succeeds only for
/// names passed to [`publish_dns_record`](Self::publish_dns_record), and OTP
/// confirmation only accepts the configured code.
#[derive(Debug)]
pub struct InMemoryManagementClient {
    domains: RwLock<HashMap<DomainId, Domain>>,
    dns_records: RwLock<HashSet<String>>,
    providers: RwLock<HashMap<ProviderId, IdentityProvider>>,
    organization: RwLock<Organization>,
    factors: RwLock<Vec<Factor>>,
    authenticators: RwLock<HashMap<AuthenticatorId, Authenticator>>,
    otp_code: String,
    failures: Mutex<HashMap<&'static str, ApiError>>,
}

impl Default for InMemoryManagementClient {
    fn default() -> Self {
        Self {
            domains: RwLock::default(),
            dns_records: RwLock::default(),
            providers: RwLock::default(),
            organization: RwLock::new(Organization {
                id: OrganizationId::new("org_default"),
                name: "default".to_string(),
                display_name: "Default Organization".to_string(),
                branding: Branding::default(),
            }),
            factors: RwLock::default(),
            authenticators: RwLock::default(),
            otp_code: DEFAULT_OTP_CODE.to_string(),
            failures: Mutex::default(),
        }
    }
}

impl InMemoryManagementClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_organization(self, organization: Organization) -> Self {
        *write(&self.organization) = organization;
        self
    }

    /// Factors offered to the signed-in account.
    pub fn with_factors(self, factors: impl IntoIterator<Item = Factor>) -> Self {
        *write(&self.factors) = factors.into_iter().collect();
        self
    }

    /// Code accepted by [`AuthenticatorApi::confirm_enrollment`].
    pub fn with_otp_code(mut self, code: impl Into<String>) -> Self {
        self.otp_code = code.into();
        self
    }

    /// Make the verification record for `domain` visible.
    pub fn publish_dns_record(&self, domain: &str) {
        write(&self.dns_records).insert(domain.trim().to_ascii_lowercase());
    }

    /// Fail the next call of `operation` (a trait method name such as
    /// `"delete_domain"`) with `error`.
    pub fn fail_next(&self, operation: &'static str, error: ApiError) {
        self.failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation, error);
    }

    fn check(&self, operation: &'static str) -> ApiResult<()> {
        match self
            .failures
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(operation)
        {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl DomainApi for InMemoryManagementClient {
    async fn list_domains(&self) -> ApiResult<Vec<Domain>> {
        self.check("list_domains")?;
        let mut domains: Vec<Domain> = read(&self.domains).values().cloned().collect();
        domains.sort_by(|a, b| a.domain.cmp(&b.domain));
        Ok(domains)
    }

    async fn create_domain(&self, request: &NewDomain) -> ApiResult<Domain> {
        self.check("create_domain")?;
        let request = request
            .normalized()
            .map_err(|e| ApiError::bad_request("invalid_request", e.to_string()))?;

        let mut domains = write(&self.domains);
        if domains.values().any(|d| d.domain == request.domain) {
            return Err(ApiError::conflict(format!("{} already exists", request.domain)));
        }

        let domain = Domain {
            id: DomainId::generate(),
            verification_host: Some(format!("_orgkit-challenge.{}", request.domain)),
            verification_txt: Some(format!("orgkit-verification={}", Uuid::now_v7().simple())),
            domain: request.domain,
            status: DomainStatus::Pending,
            created_at: Some(Utc::now()),
        };
        domains.insert(domain.id.clone(), domain.clone());
        Ok(domain)
    }

    async fn delete_domain(&self, id: &DomainId) -> ApiResult<()> {
        self.check("delete_domain")?;
        let removed = write(&self.domains)
            .remove(id)
            .ok_or_else(|| ApiError::not_found(format!("domain {id}")))?;

        // A deleted domain can no longer route sign-ins.
        for provider in write(&self.providers).values_mut() {
            provider.domains.retain(|d| *d != removed.domain);
        }
        Ok(())
    }

    async fn verify_domain(&self, id: &DomainId) -> ApiResult<Domain> {
        self.check("verify_domain")?;
        let published = read(&self.dns_records).clone();
        let mut domains = write(&self.domains);
        let domain = domains
            .get_mut(id)
            .ok_or_else(|| ApiError::not_found(format!("domain {id}")))?;

        if published.contains(&domain.domain) {
            domain.status = DomainStatus::Verified;
        }
        Ok(domain.clone())
    }
}

#[async_trait]
impl IdentityProviderApi for InMemoryManagementClient {
    async fn list_providers(&self) -> ApiResult<Vec<IdentityProvider>> {
        self.check("list_providers")?;
        let mut providers: Vec<IdentityProvider> =
            read(&self.providers).values().cloned().collect();
        providers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(providers)
    }

    async fn create_provider(&self, request: &NewProvider) -> ApiResult<IdentityProvider> {
        self.check("create_provider")?;
        request
            .validate()
            .map_err(|e| ApiError::bad_request("invalid_request", e.to_string()))?;

        let mut providers = write(&self.providers);
        if providers.values().any(|p| p.name == request.name) {
            return Err(ApiError::conflict(format!(
                "a provider named {} already exists",
                request.name
            )));
        }

        let provider = IdentityProvider {
            id: ProviderId::generate(),
            name: request.name.clone(),
            display_name: request.display_name.trim().to_string(),
            strategy: request.strategy,
            is_enabled: true,
            show_as_button: request.show_as_button,
            assign_membership_on_login: request.assign_membership_on_login,
            domains: Vec::new(),
            options: request.options.clone(),
        };
        providers.insert(provider.id.clone(), provider.clone());
        Ok(provider)
    }

    async fn update_provider(
        &self,
        id: &ProviderId,
        update: &ProviderUpdate,
    ) -> ApiResult<IdentityProvider> {
        self.check("update_provider")?;
        let mut providers = write(&self.providers);
        let provider = providers
            .get_mut(id)
            .ok_or_else(|| ApiError::not_found(format!("identity provider {id}")))?;

        update
            .validate(provider.strategy)
            .map_err(|e| ApiError::bad_request("invalid_request", e.to_string()))?;
        update.apply_to(provider);
        Ok(provider.clone())
    }

    async fn delete_provider(&self, id: &ProviderId) -> ApiResult<()> {
        self.check("delete_provider")?;
        write(&self.providers)
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found(format!("identity provider {id}")))
    }

    async fn add_provider_domain(&self, id: &ProviderId, domain: &str) -> ApiResult<()> {
        self.check("add_provider_domain")?;
        let verified = read(&self.domains)
            .values()
            .find(|d| d.domain == domain)
            .map(Domain::is_verified);
        match verified {
            None => return Err(ApiError::not_found(format!("domain {domain}"))),
            Some(false) => {
                return Err(ApiError::bad_request(
                    "domain_not_verified",
                    format!("{domain} must be verified first"),
                ));
            }
            Some(true) => {}
        }

        let mut providers = write(&self.providers);
        if let Some(owner) = providers
            .values()
            .find(|p| p.id != *id && p.domains.iter().any(|d| d == domain))
        {
            return Err(ApiError::conflict(format!(
                "{domain} is already used by {}",
                owner.name
            )));
        }

        let provider = providers
            .get_mut(id)
            .ok_or_else(|| ApiError::not_found(format!("identity provider {id}")))?;
        if !provider.domains.iter().any(|d| d == domain) {
            provider.domains.push(domain.to_string());
        }
        Ok(())
    }

    async fn remove_provider_domain(&self, id: &ProviderId, domain: &str) -> ApiResult<()> {
        self.check("remove_provider_domain")?;
        let mut providers = write(&self.providers);
        let provider = providers
            .get_mut(id)
            .ok_or_else(|| ApiError::not_found(format!("identity provider {id}")))?;

        let before = provider.domains.len();
        provider.domains.retain(|d| d != domain);
        if provider.domains.len() == before {
            return Err(ApiError::not_found(format!("domain {domain} on {}", provider.name)));
        }
        Ok(())
    }
}

#[async_trait]
impl OrganizationApi for InMemoryManagementClient {
    async fn get_details(&self) -> ApiResult<Organization> {
        self.check("get_details")?;
        Ok(read(&self.organization).clone())
    }

    async fn update_details(&self, update: &OrgDetailsUpdate) -> ApiResult<Organization> {
        self.check("update_details")?;
        update
            .validate()
            .map_err(|e| ApiError::bad_request("invalid_request", e.to_string()))?;
        let mut organization = write(&self.organization);
        update.apply_to(&mut organization);
        Ok(organization.clone())
    }
}

#[async_trait]
impl AuthenticatorApi for InMemoryManagementClient {
    async fn list_factors(&self) -> ApiResult<Vec<Factor>> {
        self.check("list_factors")?;
        Ok(read(&self.factors).clone())
    }

    async fn list_authenticators(&self) -> ApiResult<Vec<Authenticator>> {
        self.check("list_authenticators")?;
        let mut authenticators: Vec<Authenticator> =
            read(&self.authenticators).values().cloned().collect();
        authenticators.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(authenticators)
    }

    async fn enroll(&self, factor: FactorType, input: &EnrollmentInput) -> ApiResult<Enrollment> {
        self.check("enroll")?;
        let offered = read(&self.factors)
            .iter()
            .any(|f| f.factor == factor && f.enabled);
        if !offered {
            return Err(ApiError::bad_request(
                "factor_not_enabled",
                format!("{} is not enabled", factor.as_str()),
            ));
        }
        input
            .validate(factor)
            .map_err(|e| ApiError::bad_request("invalid_request", e.to_string()))?;

        let authenticator = Authenticator {
            id: AuthenticatorId::generate(),
            factor,
            name: input
                .name
                .clone()
                .or_else(|| input.phone_number.clone())
                .or_else(|| input.email.clone()),
            confirmed: !factor.confirms_with_code(),
            created_at: Utc::now(),
        };

        let secret = Uuid::now_v7().simple().to_string();
        let enrollment = Enrollment {
            authenticator_id: authenticator.id.clone(),
            factor,
            barcode_uri: (factor == FactorType::Otp)
                .then(|| format!("otpauth://totp/orgkit?secret={secret}")),
            recovery_code: (factor == FactorType::RecoveryCode).then(|| secret.to_uppercase()),
        };

        write(&self.authenticators).insert(authenticator.id.clone(), authenticator);
        Ok(enrollment)
    }

    async fn confirm_enrollment(
        &self,
        id: &AuthenticatorId,
        otp_code: &str,
    ) -> ApiResult<Authenticator> {
        self.check("confirm_enrollment")?;
        let mut authenticators = write(&self.authenticators);
        let authenticator = authenticators
            .get_mut(id)
            .ok_or_else(|| ApiError::not_found(format!("authenticator {id}")))?;

        if otp_code.trim() != self.otp_code {
            return Err(ApiError::status(403, "invalid_otp", "the code is not valid"));
        }
        authenticator.confirmed = true;
        Ok(authenticator.clone())
    }

    async fn delete_authenticator(&self, id: &AuthenticatorId) -> ApiResult<()> {
        self.check("delete_authenticator")?;
        write(&self.authenticators)
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found(format!("authenticator {id}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn provider(name: &str) -> NewProvider {
        NewProvider {
            name: name.to_string(),
            display_name: "Acme Okta".to_string(),
            strategy: orgkit_core::ProviderStrategy::Oidc,
            show_as_button: true,
            assign_membership_on_login: false,
            options: json!({
                "client_id": "abc",
                "discovery_url": "https://acme.example/.well-known/openid-configuration"
            }),
        }
    }

    #[tokio::test]
    async fn domains_are_unique_and_verify_needs_a_published_record() {
        let client = InMemoryManagementClient::new();
        let created = client.create_domain(&NewDomain::new("Example.com")).await.unwrap();
        assert_eq!(created.domain, "example.com");
        assert_eq!(created.status, DomainStatus::Pending);

        let dup = client.create_domain(&NewDomain::new("example.com")).await.unwrap_err();
        assert!(dup.is_conflict());

        let still_pending = client.verify_domain(&created.id).await.unwrap();
        assert!(!still_pending.is_verified());

        client.publish_dns_record("example.com");
        assert!(client.verify_domain(&created.id).await.unwrap().is_verified());

        client.delete_domain(&created.id).await.unwrap();
        assert!(client.delete_domain(&created.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn provider_domains_must_be_verified_and_unshared() {
        let client = InMemoryManagementClient::new();
        let domain = client.create_domain(&NewDomain::new("acme.com")).await.unwrap();
        let first = client.create_provider(&provider("acme-oidc")).await.unwrap();
        let second = client.create_provider(&provider("acme-oidc-2")).await.unwrap();

        let err = client.add_provider_domain(&first.id, "acme.com").await.unwrap_err();
        assert_eq!(err.status_code(), Some(400));

        client.publish_dns_record("acme.com");
        client.verify_domain(&domain.id).await.unwrap();
        client.add_provider_domain(&first.id, "acme.com").await.unwrap();
        client.add_provider_domain(&first.id, "acme.com").await.unwrap();

        let err = client.add_provider_domain(&second.id, "acme.com").await.unwrap_err();
        assert!(err.is_conflict());

        client.delete_domain(&domain.id).await.unwrap();
        let providers = client.list_providers().await.unwrap();
        assert!(providers.iter().all(|p| p.domains.is_empty()));
    }

    #[tokio::test]
    async fn injected_failures_fire_once() {
        let client = InMemoryManagementClient::new();
        client.fail_next("list_domains", ApiError::Network("reset".into()));
        assert!(client.list_domains().await.is_err());
        assert!(client.list_domains().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn otp_enrollment_needs_the_right_code() {
        let client = InMemoryManagementClient::new()
            .with_factors([Factor { factor: FactorType::Otp, enabled: true }])
            .with_otp_code("654321");

        let err = client
            .enroll(FactorType::Sms, &EnrollmentInput::default())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(400));

        let enrollment = client
            .enroll(FactorType::Otp, &EnrollmentInput::default())
            .await
            .unwrap();
        assert!(enrollment.barcode_uri.is_some());

        let wrong = client
            .confirm_enrollment(&enrollment.authenticator_id, "000000")
            .await
            .unwrap_err();
        assert_eq!(wrong.status_code(), Some(403));

        let confirmed = client
            .confirm_enrollment(&enrollment.authenticator_id, "654321")
            .await
            .unwrap();
        assert!(confirmed.confirmed);
    }
}
