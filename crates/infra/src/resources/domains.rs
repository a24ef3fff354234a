use std::sync::Arc;

use tracing::info;

use orgkit_actions::{Action, MutationKind, ResourceList, mutate_then_refresh};
use orgkit_auth::Audience;
use orgkit_core::{Domain, DomainId, NewDomain};

use super::{ComponentContext, Outcome, ResourceError};
use crate::client::DomainApi;

pub const DOMAIN_SCOPES: &str =
    "read:my_org:domains create:my_org:domains delete:my_org:domains update:my_org:domains";

const RESOURCE: &str = "domain";

/// Host hooks for the domain table.
#[derive(Debug, Clone)]
pub struct DomainActions {
    pub create: Action<NewDomain, (), Domain>,
    pub delete: Action<Domain, (), ()>,
    pub verify: Action<Domain, (), Domain>,
}

impl Default for DomainActions {
    fn default() -> Self {
        Self {
            create: Action::new("domains.create"),
            delete: Action::new("domains.delete"),
            verify: Action::new("domains.verify"),
        }
    }
}

/// Organization domain table: list, add, delete and verify domains.
pub struct DomainTable {
    ctx: ComponentContext,
    client: Arc<dyn DomainApi>,
    actions: DomainActions,
    list: ResourceList<Domain>,
}

impl DomainTable {
    pub fn new(ctx: ComponentContext, client: Arc<dyn DomainApi>, actions: DomainActions) -> Self {
        Self {
            ctx,
            client,
            actions,
            list: ResourceList::new(),
        }
    }

    /// Register the table's scopes and load the list.
    pub async fn mount(&self) -> Result<(), ResourceError> {
        self.ctx.register(Audience::Organization, DOMAIN_SCOPES).await;
        self.fetch().await
    }

    pub fn list(&self) -> &ResourceList<Domain> {
        &self.list
    }

    pub fn domains(&self) -> Vec<Domain> {
        self.list.items()
    }

    pub async fn fetch(&self) -> Result<(), ResourceError> {
        self.ctx.require_ready(Audience::Organization)?;
        let _loading = self.list.begin_load();
        match self.client.list_domains().await {
            Ok(domains) => {
                self.list.replace(domains);
                Ok(())
            }
            Err(err) => Err(self.ctx.feedback.fetch_failed(RESOURCE, "domains.fetch.error", err)),
        }
    }

    async fn refresh(&self) {
        // Failures were already reported by `fetch`.
        let _ = self.fetch().await;
    }

    pub async fn create(&self, request: NewDomain) -> Result<Outcome<Domain>, ResourceError> {
        let request = request.normalized()?;
        self.ctx.require_ready(Audience::Organization)?;
        let _busy = self.list.begin(MutationKind::Create);

        let client = self.client.clone();
        let result = mutate_then_refresh(
            &self.actions.create,
            request.clone(),
            None,
            |request, _| async move { client.create_domain(&request).await },
            || self.refresh(),
        )
        .await;

        let outcome = self.ctx.feedback.settle(
            RESOURCE,
            result,
            "domains.create.error",
            &[("domain", &request.domain)],
        )?;
        if let Outcome::Completed(domain) = &outcome {
            info!(domain = %domain.domain, id = %domain.id, "domain created");
            self.ctx
                .feedback
                .success("domains.create.success", &[("domain", &domain.domain)]);
        }
        Ok(outcome)
    }

    pub async fn delete(&self, id: &DomainId) -> Result<Outcome<()>, ResourceError> {
        self.ctx.require_ready(Audience::Organization)?;
        let domain = self
            .list
            .find(id)
            .ok_or_else(|| ResourceError::not_found(RESOURCE, id))?;
        let _busy = self.list.begin(MutationKind::Delete);

        let client = self.client.clone();
        let result = mutate_then_refresh(
            &self.actions.delete,
            domain.clone(),
            None,
            |domain, _| async move { client.delete_domain(&domain.id).await },
            || self.refresh(),
        )
        .await;

        let outcome = self.ctx.feedback.settle(
            RESOURCE,
            result,
            "domains.delete.error",
            &[("domain", &domain.domain)],
        )?;
        if outcome.is_completed() {
            info!(domain = %domain.domain, "domain deleted");
            self.ctx
                .feedback
                .success("domains.delete.success", &[("domain", &domain.domain)]);
        }
        Ok(outcome)
    }

    /// Ask the server to check the domain's DNS record.
    ///
    /// A domain that is still pending completes normally but produces a
    /// warning instead of a success notification.
    pub async fn verify(&self, id: &DomainId) -> Result<Outcome<Domain>, ResourceError> {
        self.ctx.require_ready(Audience::Organization)?;
        let domain = self
            .list
            .find(id)
            .ok_or_else(|| ResourceError::not_found(RESOURCE, id))?;
        let _busy = self.list.begin(MutationKind::Verify);

        let client = self.client.clone();
        let result = mutate_then_refresh(
            &self.actions.verify,
            domain.clone(),
            None,
            |domain, _| async move { client.verify_domain(&domain.id).await },
            || self.refresh(),
        )
        .await;

        let outcome = self.ctx.feedback.settle(
            RESOURCE,
            result,
            "domains.verify.error",
            &[("domain", &domain.domain)],
        )?;
        if let Outcome::Completed(checked) = &outcome {
            let subs = [("domain", checked.domain.as_str())];
            if checked.is_verified() {
                info!(domain = %checked.domain, "domain verified");
                self.ctx.feedback.success("domains.verify.success", &subs);
            } else {
                self.ctx.feedback.warning("domains.verify.pending", &subs);
            }
        }
        Ok(outcome)
    }
}
