use std::sync::Arc;

use tracing::info;

use orgkit_actions::{Action, MutationKind, ResourceList, mutate_then_refresh};
use orgkit_auth::Audience;
use orgkit_core::{
    Domain, IdentityProvider, NewProvider, ProviderId, ProviderUpdate, validate,
};

use super::{ComponentContext, Outcome, ResourceError};
use crate::client::IdentityProviderApi;

pub const SSO_PROVIDER_SCOPES: &str = "read:my_org:identity_providers create:my_org:identity_providers update:my_org:identity_providers delete:my_org:identity_providers";

const RESOURCE: &str = "identity provider";

/// Host hooks for the SSO provider table.
///
/// The domain actions receive the domain name as extra context.
#[derive(Debug, Clone)]
pub struct SsoActions {
    pub create: Action<NewProvider, (), IdentityProvider>,
    pub update: Action<IdentityProvider, ProviderUpdate, IdentityProvider>,
    pub delete: Action<IdentityProvider, (), ()>,
    pub associate_domain: Action<IdentityProvider, String, ()>,
    pub remove_domain: Action<IdentityProvider, String, ()>,
}

impl Default for SsoActions {
    fn default() -> Self {
        Self {
            create: Action::new("sso.create"),
            update: Action::new("sso.update"),
            delete: Action::new("sso.delete"),
            associate_domain: Action::new("sso.associate"),
            remove_domain: Action::new("sso.remove_domain"),
        }
    }
}

/// A verified organization domain and whether a provider handles it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomainAssociation {
    pub domain: Domain,
    pub associated: bool,
}

/// Rows of a provider's domain tab. Only verified domains can be associated.
pub fn domain_associations(
    provider: &IdentityProvider,
    domains: &[Domain],
) -> Vec<DomainAssociation> {
    domains
        .iter()
        .filter(|d| d.is_verified())
        .map(|d| DomainAssociation {
            associated: provider.domains.iter().any(|p| *p == d.domain),
            domain: d.clone(),
        })
        .collect()
}

/// Enterprise SSO provider table.
pub struct SsoProviderTable {
    ctx: ComponentContext,
    client: Arc<dyn IdentityProviderApi>,
    actions: SsoActions,
    list: ResourceList<IdentityProvider>,
}

impl SsoProviderTable {
    pub fn new(
        ctx: ComponentContext,
        client: Arc<dyn IdentityProviderApi>,
        actions: SsoActions,
    ) -> Self {
        Self {
            ctx,
            client,
            actions,
            list: ResourceList::new(),
        }
    }

    pub async fn mount(&self) -> Result<(), ResourceError> {
        self.ctx.register(Audience::Organization, SSO_PROVIDER_SCOPES).await;
        self.fetch().await
    }

    pub fn list(&self) -> &ResourceList<IdentityProvider> {
        &self.list
    }

    pub fn providers(&self) -> Vec<IdentityProvider> {
        self.list.items()
    }

    pub async fn fetch(&self) -> Result<(), ResourceError> {
        self.ctx.require_ready(Audience::Organization)?;
        let _loading = self.list.begin_load();
        match self.client.list_providers().await {
            Ok(providers) => {
                self.list.replace(providers);
                Ok(())
            }
            Err(err) => Err(self.ctx.feedback.fetch_failed(RESOURCE, "sso.fetch.error", err)),
        }
    }

    async fn refresh(&self) {
        let _ = self.fetch().await;
    }

    fn loaded(&self, id: &ProviderId) -> Result<IdentityProvider, ResourceError> {
        self.list
            .find(id)
            .ok_or_else(|| ResourceError::not_found(RESOURCE, id))
    }

    pub async fn create(
        &self,
        request: NewProvider,
    ) -> Result<Outcome<IdentityProvider>, ResourceError> {
        request.validate()?;
        self.ctx.require_ready(Audience::Organization)?;
        let _busy = self.list.begin(MutationKind::Create);

        let client = self.client.clone();
        let result = mutate_then_refresh(
            &self.actions.create,
            request.clone(),
            None,
            |request, _| async move { client.create_provider(&request).await },
            || self.refresh(),
        )
        .await;

        let outcome = self.ctx.feedback.settle(
            RESOURCE,
            result,
            "sso.create.error",
            &[("provider", &request.display_name)],
        )?;
        if let Outcome::Completed(provider) = &outcome {
            info!(provider = %provider.name, id = %provider.id, "identity provider created");
            self.ctx
                .feedback
                .success("sso.create.success", &[("provider", &provider.display_name)]);
        }
        Ok(outcome)
    }

    /// Apply a partial update. An empty update completes without a request.
    pub async fn update(
        &self,
        id: &ProviderId,
        update: ProviderUpdate,
    ) -> Result<Outcome<IdentityProvider>, ResourceError> {
        self.ctx.require_ready(Audience::Organization)?;
        let provider = self.loaded(id)?;
        update.validate(provider.strategy)?;
        if update.is_empty() {
            return Ok(Outcome::Completed(provider));
        }
        let _busy = self.list.begin(MutationKind::Update);

        let client = self.client.clone();
        let result = mutate_then_refresh(
            &self.actions.update,
            provider.clone(),
            Some(update),
            |provider, update| async move {
                let update = update.unwrap_or_default();
                client.update_provider(&provider.id, &update).await
            },
            || self.refresh(),
        )
        .await;

        let outcome = self.ctx.feedback.settle(
            RESOURCE,
            result,
            "sso.update.error",
            &[("provider", &provider.display_name)],
        )?;
        if let Outcome::Completed(updated) = &outcome {
            self.ctx
                .feedback
                .success("sso.update.success", &[("provider", &updated.display_name)]);
        }
        Ok(outcome)
    }

    pub async fn set_enabled(
        &self,
        id: &ProviderId,
        enabled: bool,
    ) -> Result<Outcome<IdentityProvider>, ResourceError> {
        self.update(id, ProviderUpdate::enabled(enabled)).await
    }

    pub async fn delete(&self, id: &ProviderId) -> Result<Outcome<()>, ResourceError> {
        self.ctx.require_ready(Audience::Organization)?;
        let provider = self.loaded(id)?;
        let _busy = self.list.begin(MutationKind::Delete);

        let client = self.client.clone();
        let result = mutate_then_refresh(
            &self.actions.delete,
            provider.clone(),
            None,
            |provider, _| async move { client.delete_provider(&provider.id).await },
            || self.refresh(),
        )
        .await;

        let outcome = self.ctx.feedback.settle(
            RESOURCE,
            result,
            "sso.delete.error",
            &[("provider", &provider.display_name)],
        )?;
        if outcome.is_completed() {
            info!(provider = %provider.name, "identity provider deleted");
            self.ctx
                .feedback
                .success("sso.delete.success", &[("provider", &provider.display_name)]);
        }
        Ok(outcome)
    }

    /// Route sign-ins for `domain` to the provider.
    pub async fn associate_domain(
        &self,
        id: &ProviderId,
        domain: &str,
    ) -> Result<Outcome<()>, ResourceError> {
        let domain = validate::host_name("domain", domain)?;
        self.ctx.require_ready(Audience::Organization)?;
        let provider = self.loaded(id)?;
        let _busy = self.list.begin(MutationKind::Associate);

        let client = self.client.clone();
        let result = mutate_then_refresh(
            &self.actions.associate_domain,
            provider.clone(),
            Some(domain.clone()),
            |provider, domain| async move {
                let domain = domain.unwrap_or_default();
                client.add_provider_domain(&provider.id, &domain).await
            },
            || self.refresh(),
        )
        .await;

        let subs = [
            ("domain", domain.as_str()),
            ("provider", provider.display_name.as_str()),
        ];
        let outcome = self
            .ctx
            .feedback
            .settle(RESOURCE, result, "sso.associate.error", &subs)?;
        if outcome.is_completed() {
            info!(provider = %provider.name, %domain, "domain associated");
            self.ctx.feedback.success("sso.associate.success", &subs);
        }
        Ok(outcome)
    }

    pub async fn remove_domain(
        &self,
        id: &ProviderId,
        domain: &str,
    ) -> Result<Outcome<()>, ResourceError> {
        let domain = validate::host_name("domain", domain)?;
        self.ctx.require_ready(Audience::Organization)?;
        let provider = self.loaded(id)?;
        let _busy = self.list.begin(MutationKind::Associate);

        let client = self.client.clone();
        let result = mutate_then_refresh(
            &self.actions.remove_domain,
            provider.clone(),
            Some(domain.clone()),
            |provider, domain| async move {
                let domain = domain.unwrap_or_default();
                client.remove_provider_domain(&provider.id, &domain).await
            },
            || self.refresh(),
        )
        .await;

        let subs = [
            ("domain", domain.as_str()),
            ("provider", provider.display_name.as_str()),
        ];
        let outcome = self
            .ctx
            .feedback
            .settle(RESOURCE, result, "sso.remove_domain.error", &subs)?;
        if outcome.is_completed() {
            info!(provider = %provider.name, %domain, "domain removed from provider");
            self.ctx.feedback.success("sso.remove_domain.success", &subs);
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orgkit_core::{DomainId, DomainStatus, ProviderStrategy};
    use serde_json::json;

    fn domain(name: &str, status: DomainStatus) -> Domain {
        Domain {
            id: DomainId::new(format!("dom_{name}")),
            domain: name.to_string(),
            status,
            verification_host: None,
            verification_txt: None,
            created_at: None,
        }
    }

    #[test]
    fn associations_only_list_verified_domains() {
        let provider = IdentityProvider {
            id: ProviderId::new("con_1"),
            name: "acme".to_string(),
            display_name: "Acme".to_string(),
            strategy: ProviderStrategy::Oidc,
            is_enabled: true,
            show_as_button: false,
            assign_membership_on_login: false,
            domains: vec!["acme.com".to_string()],
            options: json!({}),
        };
        let rows = domain_associations(
            &provider,
            &[
                domain("acme.com", DomainStatus::Verified),
                domain("acme.dev", DomainStatus::Verified),
                domain("pending.io", DomainStatus::Pending),
            ],
        );

        let summary: Vec<(&str, bool)> = rows
            .iter()
            .map(|r| (r.domain.domain.as_str(), r.associated))
            .collect();
        assert_eq!(summary, vec![("acme.com", true), ("acme.dev", false)]);
    }
}
