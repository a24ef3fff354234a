use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::id::ProviderId;
use crate::validate;

const MAX_NAME_LEN: usize = 128;

/// Protocol/vendor of an enterprise identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderStrategy {
    Okta,
    Adfs,
    Samlp,
    Oidc,
    Pingfederate,
    GoogleApps,
    Waad,
}

impl ProviderStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderStrategy::Okta => "okta",
            ProviderStrategy::Adfs => "adfs",
            ProviderStrategy::Samlp => "samlp",
            ProviderStrategy::Oidc => "oidc",
            ProviderStrategy::Pingfederate => "pingfederate",
            ProviderStrategy::GoogleApps => "google-apps",
            ProviderStrategy::Waad => "waad",
        }
    }

    /// Option keys the provider cannot be created without.
    pub fn required_options(&self) -> &'static [&'static str] {
        match self {
            ProviderStrategy::Okta | ProviderStrategy::GoogleApps | ProviderStrategy::Waad => {
                &["domain", "client_id", "client_secret"]
            }
            ProviderStrategy::Oidc => &["discovery_url", "client_id"],
            ProviderStrategy::Samlp => &["sign_in_endpoint", "signing_cert"],
            ProviderStrategy::Pingfederate => &["ping_federate_base_url", "signing_cert"],
            ProviderStrategy::Adfs => &["adfs_server"],
        }
    }
}

/// An SSO identity provider attached to the organization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentityProvider {
    pub id: ProviderId,
    pub name: String,
    pub display_name: String,
    pub strategy: ProviderStrategy,
    #[serde(default = "default_true")]
    pub is_enabled: bool,
    #[serde(default)]
    pub show_as_button: bool,
    #[serde(default)]
    pub assign_membership_on_login: bool,
    #[serde(default)]
    pub domains: Vec<String>,
    #[serde(default)]
    pub options: Value,
}

fn default_true() -> bool {
    true
}

impl Entity for IdentityProvider {
    type Id = ProviderId;

    fn id(&self) -> &ProviderId {
        &self.id
    }
}

/// Request body for creating a provider (the final step of the create wizard).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProvider {
    pub name: String,
    pub display_name: String,
    pub strategy: ProviderStrategy,
    #[serde(default)]
    pub show_as_button: bool,
    #[serde(default)]
    pub assign_membership_on_login: bool,
    pub options: Value,
}

impl NewProvider {
    pub fn validate(&self) -> DomainResult<()> {
        validate::slug("name", &self.name, MAX_NAME_LEN)?;
        validate::display_text("display_name", &self.display_name, MAX_NAME_LEN)?;
        validate_options(self.strategy, &self.options)
    }
}

/// Partial update of a provider; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_enabled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_as_button: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assign_membership_on_login: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

impl ProviderUpdate {
    pub fn enabled(is_enabled: bool) -> Self {
        Self {
            is_enabled: Some(is_enabled),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn validate(&self, strategy: ProviderStrategy) -> DomainResult<()> {
        if let Some(display_name) = &self.display_name {
            validate::display_text("display_name", display_name, MAX_NAME_LEN)?;
        }
        if let Some(options) = &self.options {
            validate_options(strategy, options)?;
        }
        Ok(())
    }

    /// Merge the update into an existing record.
    pub fn apply_to(&self, provider: &mut IdentityProvider) {
        if let Some(display_name) = &self.display_name {
            provider.display_name = display_name.trim().to_string();
        }
        if let Some(v) = self.is_enabled {
            provider.is_enabled = v;
        }
        if let Some(v) = self.show_as_button {
            provider.show_as_button = v;
        }
        if let Some(v) = self.assign_membership_on_login {
            provider.assign_membership_on_login = v;
        }
        if let Some(options) = &self.options {
            provider.options = options.clone();
        }
    }
}

fn validate_options(strategy: ProviderStrategy, options: &Value) -> DomainResult<()> {
    let map = options
        .as_object()
        .ok_or_else(|| DomainError::validation("options", "must be an object"))?;

    for key in strategy.required_options() {
        let present = map
            .get(*key)
            .and_then(Value::as_str)
            .is_some_and(|v| !v.trim().is_empty());
        if !present {
            return Err(DomainError::validation(
                "options",
                format!("'{key}' is required for {}", strategy.as_str()),
            ));
        }
    }

    if let Some(url) = map.get("discovery_url").and_then(Value::as_str) {
        validate::https_url("options", url)?;
    }
    Ok(())
}
