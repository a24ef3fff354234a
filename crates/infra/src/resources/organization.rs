use std::sync::Arc;

use orgkit_actions::{Action, MutationKind, ResourceList, mutate_then_refresh};
use orgkit_auth::Audience;
use orgkit_core::{OrgDetailsUpdate, Organization};

use super::{ComponentContext, Outcome, ResourceError};
use crate::client::OrganizationApi;

pub const ORG_DETAILS_SCOPES: &str = "read:my_org:details update:my_org:details";

const RESOURCE: &str = "organization";

/// Host hooks for the organization details form.
///
/// `save` receives the details as last loaded (if any) as extra context.
#[derive(Debug, Clone)]
pub struct OrgDetailsActions {
    pub save: Action<OrgDetailsUpdate, Organization, Organization>,
}

impl Default for OrgDetailsActions {
    fn default() -> Self {
        Self {
            save: Action::new("org.save"),
        }
    }
}

/// Organization details form (display name and branding).
///
/// Holds a single record; the underlying list has at most one item.
pub struct OrganizationDetails {
    ctx: ComponentContext,
    client: Arc<dyn OrganizationApi>,
    actions: OrgDetailsActions,
    state: ResourceList<Organization>,
}

impl OrganizationDetails {
    pub fn new(
        ctx: ComponentContext,
        client: Arc<dyn OrganizationApi>,
        actions: OrgDetailsActions,
    ) -> Self {
        Self {
            ctx,
            client,
            actions,
            state: ResourceList::new(),
        }
    }

    pub async fn mount(&self) -> Result<(), ResourceError> {
        self.ctx.register(Audience::Organization, ORG_DETAILS_SCOPES).await;
        self.fetch().await
    }

    pub fn details(&self) -> Option<Organization> {
        self.state.first()
    }

    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    pub fn is_saving(&self) -> bool {
        self.state.is_busy(MutationKind::Update)
    }

    pub async fn fetch(&self) -> Result<(), ResourceError> {
        self.ctx.require_ready(Audience::Organization)?;
        let _loading = self.state.begin_load();
        match self.client.get_details().await {
            Ok(organization) => {
                self.state.replace(vec![organization]);
                Ok(())
            }
            Err(err) => Err(self.ctx.feedback.fetch_failed(RESOURCE, "org.fetch.error", err)),
        }
    }

    async fn refresh(&self) {
        let _ = self.fetch().await;
    }

    pub async fn save(
        &self,
        update: OrgDetailsUpdate,
    ) -> Result<Outcome<Organization>, ResourceError> {
        update.validate()?;
        self.ctx.require_ready(Audience::Organization)?;
        let _busy = self.state.begin(MutationKind::Update);

        let client = self.client.clone();
        let result = mutate_then_refresh(
            &self.actions.save,
            update,
            self.details(),
            |update, _| async move { client.update_details(&update).await },
            || self.refresh(),
        )
        .await;

        let outcome = self
            .ctx
            .feedback
            .settle(RESOURCE, result, "org.save.error", &[])?;
        if outcome.is_completed() {
            self.ctx.feedback.success("org.save.success", &[]);
        }
        Ok(outcome)
    }
}
