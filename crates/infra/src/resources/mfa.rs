use std::sync::Arc;

use tracing::info;

use orgkit_actions::{Action, MutationKind, ResourceList, mutate_then_refresh};
use orgkit_auth::Audience;
use orgkit_core::{
    Authenticator, AuthenticatorId, DomainError, Enrollment, EnrollmentInput, Factor, FactorType,
    validate_otp_code,
};

use super::{ComponentContext, Outcome, ResourceError};
use crate::client::AuthenticatorApi;

pub const MFA_SCOPES: &str = "read:me:factors read:me:authentication_methods create:me:authentication_methods delete:me:authentication_methods";

const RESOURCE: &str = "authenticator";

/// Host hooks for the MFA management screen.
#[derive(Debug, Clone)]
pub struct MfaActions {
    /// Extra context: the contact details entered for the factor.
    pub enroll: Action<FactorType, EnrollmentInput, Enrollment>,
    /// Extra context: the one-time code.
    pub confirm: Action<AuthenticatorId, String, Authenticator>,
    pub delete: Action<Authenticator, (), ()>,
}

impl Default for MfaActions {
    fn default() -> Self {
        Self {
            enroll: Action::new("mfa.enroll"),
            confirm: Action::new("mfa.confirm"),
            delete: Action::new("mfa.delete"),
        }
    }
}

/// The signed-in user's MFA factors and enrolled authenticators.
pub struct MfaManager {
    ctx: ComponentContext,
    client: Arc<dyn AuthenticatorApi>,
    actions: MfaActions,
    factors: ResourceList<Factor>,
    authenticators: ResourceList<Authenticator>,
}

impl MfaManager {
    pub fn new(
        ctx: ComponentContext,
        client: Arc<dyn AuthenticatorApi>,
        actions: MfaActions,
    ) -> Self {
        Self {
            ctx,
            client,
            actions,
            factors: ResourceList::new(),
            authenticators: ResourceList::new(),
        }
    }

    pub async fn mount(&self) -> Result<(), ResourceError> {
        self.ctx.register(Audience::SelfAccount, MFA_SCOPES).await;
        self.fetch().await
    }

    pub fn factors(&self) -> Vec<Factor> {
        self.factors.items()
    }

    /// Factors the account may enroll.
    pub fn enabled_factors(&self) -> Vec<FactorType> {
        self.factors
            .items()
            .into_iter()
            .filter(|f| f.enabled)
            .map(|f| f.factor)
            .collect()
    }

    pub fn authenticators(&self) -> &ResourceList<Authenticator> {
        &self.authenticators
    }

    /// Load factors and authenticators together; both lists are replaced only
    /// if both requests succeed.
    pub async fn fetch(&self) -> Result<(), ResourceError> {
        self.ctx.require_ready(Audience::SelfAccount)?;
        let _loading = self.authenticators.begin_load();
        let _factors_loading = self.factors.begin_load();

        let (factors, authenticators) = tokio::join!(
            self.client.list_factors(),
            self.client.list_authenticators()
        );
        match factors.and_then(|f| authenticators.map(|a| (f, a))) {
            Ok((factors, authenticators)) => {
                self.factors.replace(factors);
                self.authenticators.replace(authenticators);
                Ok(())
            }
            Err(err) => Err(self.ctx.feedback.fetch_failed(RESOURCE, "mfa.fetch.error", err)),
        }
    }

    async fn refresh(&self) {
        let _ = self.fetch().await;
    }

    fn factor_label(&self, id: &AuthenticatorId) -> String {
        self.authenticators
            .find(id)
            .map(|a| a.factor.as_str().to_string())
            .unwrap_or_else(|| id.to_string())
    }

    /// Start enrolling `factor`. Factors not enabled for the account are
    /// rejected without a request.
    pub async fn enroll(
        &self,
        factor: FactorType,
        input: EnrollmentInput,
    ) -> Result<Outcome<Enrollment>, ResourceError> {
        input.validate(factor)?;
        self.ctx.require_ready(Audience::SelfAccount)?;

        let label = factor.as_str();
        if !self.enabled_factors().contains(&factor) {
            self.ctx
                .feedback
                .error("mfa.enroll.factor_disabled", &[("factor", label)]);
            return Err(DomainError::validation("factor", format!("{label} is not enabled")).into());
        }
        let _busy = self.authenticators.begin(MutationKind::Create);

        let client = self.client.clone();
        let result = mutate_then_refresh(
            &self.actions.enroll,
            factor,
            Some(input),
            |factor, input| async move {
                let input = input.unwrap_or_default();
                client.enroll(factor, &input).await
            },
            || self.refresh(),
        )
        .await;

        let outcome = self
            .ctx
            .feedback
            .settle(RESOURCE, result, "mfa.enroll.error", &[("factor", label)])?;
        if let Outcome::Completed(enrollment) = &outcome {
            info!(factor = label, id = %enrollment.authenticator_id, "enrollment started");
            self.ctx
                .feedback
                .success("mfa.enroll.success", &[("factor", label)]);
        }
        Ok(outcome)
    }

    /// Finish an enrollment with the code the user received.
    pub async fn confirm(
        &self,
        id: &AuthenticatorId,
        otp_code: &str,
    ) -> Result<Outcome<Authenticator>, ResourceError> {
        validate_otp_code(otp_code)?;
        self.ctx.require_ready(Audience::SelfAccount)?;
        let label = self.factor_label(id);
        let _busy = self.authenticators.begin(MutationKind::Verify);

        let client = self.client.clone();
        let result = mutate_then_refresh(
            &self.actions.confirm,
            id.clone(),
            Some(otp_code.trim().to_string()),
            |id, code| async move {
                let code = code.unwrap_or_default();
                client.confirm_enrollment(&id, &code).await
            },
            || self.refresh(),
        )
        .await;

        let outcome = self
            .ctx
            .feedback
            .settle(RESOURCE, result, "mfa.confirm.error", &[("factor", &label)])?;
        if let Outcome::Completed(authenticator) = &outcome {
            let factor = authenticator.factor.as_str();
            info!(factor, id = %authenticator.id, "authenticator confirmed");
            self.ctx
                .feedback
                .success("mfa.confirm.success", &[("factor", factor)]);
        }
        Ok(outcome)
    }

    pub async fn delete(&self, id: &AuthenticatorId) -> Result<Outcome<()>, ResourceError> {
        self.ctx.require_ready(Audience::SelfAccount)?;
        let authenticator = self
            .authenticators
            .find(id)
            .ok_or_else(|| ResourceError::not_found(RESOURCE, id))?;
        let label = authenticator.factor.as_str();
        let _busy = self.authenticators.begin(MutationKind::Delete);

        let client = self.client.clone();
        let result = mutate_then_refresh(
            &self.actions.delete,
            authenticator.clone(),
            None,
            |authenticator, _| async move { client.delete_authenticator(&authenticator.id).await },
            || self.refresh(),
        )
        .await;

        let outcome = self
            .ctx
            .feedback
            .settle(RESOURCE, result, "mfa.delete.error", &[("factor", label)])?;
        if outcome.is_completed() {
            info!(factor = label, %id, "authenticator removed");
            self.ctx
                .feedback
                .success("mfa.delete.success", &[("factor", label)]);
        }
        Ok(outcome)
    }
}
