use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, Method, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};

use orgkit_auth::{Audience, AuthLayer};
use orgkit_core::{
    Authenticator, AuthenticatorId, Domain, DomainId, Enrollment, EnrollmentInput, Factor,
    FactorType, IdentityProvider, NewDomain, NewProvider, OrgDetailsUpdate, Organization,
    ProviderId, ProviderUpdate,
};

use super::{
    ApiError, ApiResult, AuthenticatorApi, DomainApi, IdentityProviderApi, OrganizationApi,
};
use crate::config::ClientConfig;

/// `reqwest`-backed client for the My Org and My Account APIs.
///
/// Every request carries a bearer token obtained from the host's
/// [`AuthLayer`] for the API's audience.
pub struct HttpManagementClient {
    http: Client,
    config: ClientConfig,
    auth: Arc<dyn AuthLayer>,
}

impl core::fmt::Debug for HttpManagementClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HttpManagementClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct EnrollRequest<'a> {
    #[serde(rename = "type")]
    factor: FactorType,
    #[serde(flatten)]
    input: &'a EnrollmentInput,
}

impl HttpManagementClient {
    pub fn new(config: ClientConfig, auth: Arc<dyn AuthLayer>) -> ApiResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(config.user_agent())
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;
        Ok(Self { http, config, auth })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn url(&self, audience: Audience, segments: &[&str]) -> ApiResult<Url> {
        let mut url = self.config.base_url(audience).clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Network("API base URL cannot have path segments".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(
        &self,
        audience: Audience,
        method: Method,
        segments: &[&str],
        body: Option<Value>,
    ) -> ApiResult<Response> {
        let url = self.url(audience, segments)?;
        let token = self.auth.access_token(audience).await?;

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .bearer_auth(token.secret());
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await.map_err(|e| {
            warn!(%method, %url, error = %e, "request failed");
            ApiError::Network(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            debug!(%method, %url, status = status.as_u16(), "request succeeded");
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let err = ApiError::from_response(status.as_u16(), &text);
        warn!(%method, %url, status = status.as_u16(), error = %err, "request rejected");
        Err(err)
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        audience: Audience,
        method: Method,
        segments: &[&str],
        body: Option<Value>,
    ) -> ApiResult<T> {
        self.send(audience, method, segments, body)
            .await?
            .json::<T>()
            .await
            .map_err(|e| ApiError::Decode(e.to_string()))
    }

    /// List endpoints answer either with a bare array or with an object
    /// holding the array under `field`.
    async fn fetch_list<T: DeserializeOwned>(
        &self,
        audience: Audience,
        segments: &[&str],
        field: &str,
    ) -> ApiResult<Vec<T>> {
        let body: Value = self.fetch(audience, Method::GET, segments, None).await?;
        let items = match body {
            Value::Array(items) => Value::Array(items),
            Value::Object(mut map) => map
                .remove(field)
                .ok_or_else(|| ApiError::Decode(format!("missing '{field}' in list response")))?,
            other => {
                return Err(ApiError::Decode(format!("unexpected list response: {other}")));
            }
        };
        serde_json::from_value(items).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn execute(
        &self,
        audience: Audience,
        method: Method,
        segments: &[&str],
        body: Option<Value>,
    ) -> ApiResult<()> {
        self.send(audience, method, segments, body).await.map(|_| ())
    }
}

fn json_body<T: Serialize + ?Sized>(value: &T) -> ApiResult<Value> {
    serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

const ORG: Audience = Audience::Organization;
const ME: Audience = Audience::SelfAccount;

#[async_trait]
impl DomainApi for HttpManagementClient {
    async fn list_domains(&self) -> ApiResult<Vec<Domain>> {
        self.fetch_list(ORG, &["domains"], "organization_domains").await
    }

    async fn create_domain(&self, request: &NewDomain) -> ApiResult<Domain> {
        let body = json_body(request)?;
        self.fetch(ORG, Method::POST, &["domains"], Some(body)).await
    }

    async fn delete_domain(&self, id: &DomainId) -> ApiResult<()> {
        self.execute(ORG, Method::DELETE, &["domains", id.as_str()], None).await
    }

    async fn verify_domain(&self, id: &DomainId) -> ApiResult<Domain> {
        self.fetch(ORG, Method::POST, &["domains", id.as_str(), "verify"], None)
            .await
    }
}

#[async_trait]
impl IdentityProviderApi for HttpManagementClient {
    async fn list_providers(&self) -> ApiResult<Vec<IdentityProvider>> {
        self.fetch_list(ORG, &["identity-providers"], "identity_providers")
            .await
    }

    async fn create_provider(&self, request: &NewProvider) -> ApiResult<IdentityProvider> {
        let body = json_body(request)?;
        self.fetch(ORG, Method::POST, &["identity-providers"], Some(body))
            .await
    }

    async fn update_provider(
        &self,
        id: &ProviderId,
        update: &ProviderUpdate,
    ) -> ApiResult<IdentityProvider> {
        let body = json_body(update)?;
        self.fetch(
            ORG,
            Method::PATCH,
            &["identity-providers", id.as_str()],
            Some(body),
        )
        .await
    }

    async fn delete_provider(&self, id: &ProviderId) -> ApiResult<()> {
        self.execute(ORG, Method::DELETE, &["identity-providers", id.as_str()], None)
            .await
    }

    async fn add_provider_domain(&self, id: &ProviderId, domain: &str) -> ApiResult<()> {
        self.execute(
            ORG,
            Method::POST,
            &["identity-providers", id.as_str(), "domains"],
            Some(json!({ "domain": domain })),
        )
        .await
    }

    async fn remove_provider_domain(&self, id: &ProviderId, domain: &str) -> ApiResult<()> {
        self.execute(
            ORG,
            Method::DELETE,
            &["identity-providers", id.as_str(), "domains", domain],
            None,
        )
        .await
    }
}

#[async_trait]
impl OrganizationApi for HttpManagementClient {
    async fn get_details(&self) -> ApiResult<Organization> {
        self.fetch(ORG, Method::GET, &["details"], None).await
    }

    async fn update_details(&self, update: &OrgDetailsUpdate) -> ApiResult<Organization> {
        let body = json_body(update)?;
        self.fetch(ORG, Method::PATCH, &["details"], Some(body)).await
    }
}

#[async_trait]
impl AuthenticatorApi for HttpManagementClient {
    async fn list_factors(&self) -> ApiResult<Vec<Factor>> {
        self.fetch_list(ME, &["factors"], "factors").await
    }

    async fn list_authenticators(&self) -> ApiResult<Vec<Authenticator>> {
        self.fetch_list(ME, &["authentication-methods"], "authentication_methods")
            .await
    }

    async fn enroll(&self, factor: FactorType, input: &EnrollmentInput) -> ApiResult<Enrollment> {
        let body = json_body(&EnrollRequest { factor, input })?;
        self.fetch(ME, Method::POST, &["authentication-methods"], Some(body))
            .await
    }

    async fn confirm_enrollment(
        &self,
        id: &AuthenticatorId,
        otp_code: &str,
    ) -> ApiResult<Authenticator> {
        self.fetch(
            ME,
            Method::POST,
            &["authentication-methods", id.as_str(), "verify"],
            Some(json!({ "otp_code": otp_code.trim() })),
        )
        .await
    }

    async fn delete_authenticator(&self, id: &AuthenticatorId) -> ApiResult<()> {
        self.execute(
            ME,
            Method::DELETE,
            &["authentication-methods", id.as_str()],
            None,
        )
        .await
    }
}
