// Resource controllers driven against the in-memory management client

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use orgkit_actions::{
    Action, CatalogTranslator, Decision, Notification, RecordingNotifier, Severity,
};
use orgkit_auth::{
    AccessToken, Audience, AuthError, AuthLayer, ScopeManager, StaticAuthLayer,
};
use orgkit_core::{
    BrandColors, Branding, EnrollmentInput, Factor, FactorType, IdentityProvider, NewDomain,
    NewProvider, OrgDetailsUpdate, Organization, ProviderStrategy,
};
use orgkit_infra::{
    ApiError, ComponentContext, DOMAIN_SCOPES, DomainApi, DomainActions, DomainTable, Feedback,
    InMemoryManagementClient, MFA_SCOPES, MfaActions, MfaManager, OrgDetailsActions,
    OrganizationDetails, Outcome, ResourceError, SSO_PROVIDER_SCOPES, SkipReason, SsoActions,
    SsoProviderTable, domain_associations,
};

struct Harness {
    client: Arc<InMemoryManagementClient>,
    auth: Arc<StaticAuthLayer>,
    notifier: Arc<RecordingNotifier>,
    ctx: ComponentContext,
}

fn harness_with(client: InMemoryManagementClient) -> Harness {
    let client = Arc::new(client);
    let auth = Arc::new(StaticAuthLayer::new("test-token"));
    let notifier = Arc::new(RecordingNotifier::new());
    let scopes = Arc::new(ScopeManager::new(auth.clone()));
    let feedback = Feedback::new(Arc::new(CatalogTranslator::new()), notifier.clone());
    Harness {
        client,
        auth,
        notifier,
        ctx: ComponentContext::new(scopes, feedback),
    }
}

fn harness() -> Harness {
    harness_with(InMemoryManagementClient::new())
}

impl Harness {
    fn domains(&self, actions: DomainActions) -> DomainTable {
        DomainTable::new(self.ctx.clone(), self.client.clone(), actions)
    }

    fn providers(&self, actions: SsoActions) -> SsoProviderTable {
        SsoProviderTable::new(self.ctx.clone(), self.client.clone(), actions)
    }

    fn last(&self) -> Notification {
        self.notifier.last().expect("a notification")
    }
}

fn okta() -> NewProvider {
    NewProvider {
        name: "acme-okta".to_string(),
        display_name: "Acme Okta".to_string(),
        strategy: ProviderStrategy::Okta,
        show_as_button: true,
        assign_membership_on_login: false,
        options: json!({
            "domain": "acme.okta.com",
            "client_id": "abc",
            "client_secret": "shh"
        }),
    }
}

#[tokio::test]
async fn domain_table_full_lifecycle() {
    let h = harness();
    let table = h.domains(DomainActions::default());
    table.mount().await.unwrap();
    assert!(h.ctx.scopes.covers(Audience::Organization, DOMAIN_SCOPES));
    assert!(table.domains().is_empty());

    let created = table
        .create(NewDomain::new(" Acme.COM "))
        .await
        .unwrap()
        .completed()
        .unwrap();
    assert_eq!(created.domain, "acme.com");
    assert_eq!(h.last().message, "Domain acme.com added.");
    assert_eq!(table.domains().len(), 1);

    let pending = table.verify(&created.id).await.unwrap().completed().unwrap();
    assert!(!pending.is_verified());
    assert_eq!(h.last().severity, Severity::Warning);
    assert_eq!(h.last().key, "domains.verify.pending");

    h.client.publish_dns_record("acme.com");
    table.verify(&created.id).await.unwrap();
    assert_eq!(h.last().message, "Domain acme.com verified.");
    assert!(table.list().find(&created.id).unwrap().is_verified());

    table.delete(&created.id).await.unwrap();
    assert_eq!(h.last().message, "Domain acme.com deleted.");
    assert!(table.domains().is_empty());
    assert!(!table.list().is_busy(orgkit_actions::MutationKind::Delete));
}

#[tokio::test]
async fn mutation_failures_notify_and_leave_the_list_alone() {
    let h = harness();
    let table = h.domains(DomainActions::default());
    table.mount().await.unwrap();
    table.create(NewDomain::new("acme.com")).await.unwrap();
    h.notifier.take();

    let err = table.create(NewDomain::new("acme.com")).await.unwrap_err();
    match err {
        ResourceError::Mutation(api) => assert!(api.is_conflict()),
        other => panic!("expected mutation error, got {other:?}"),
    }
    let note = h.last();
    assert_eq!(note.severity, Severity::Error);
    assert!(note.message.starts_with("Could not add acme.com: "));
    assert_eq!(table.domains().len(), 1);
}

#[tokio::test]
async fn veto_skips_the_request_without_feedback() {
    let h = harness();
    let actions = DomainActions {
        delete: Action::new("domains.delete").on_before(|_, _| Decision::Cancel),
        ..DomainActions::default()
    };
    let table = h.domains(actions);
    table.mount().await.unwrap();
    let domain = table
        .create(NewDomain::new("keep.com"))
        .await
        .unwrap()
        .completed()
        .unwrap();
    h.notifier.take();

    let outcome = table.delete(&domain.id).await.unwrap();

    assert_eq!(outcome, Outcome::Skipped(SkipReason::Vetoed));
    assert!(h.notifier.notifications().is_empty());
    assert_eq!(h.client.list_domains().await.unwrap().len(), 1);
}

#[tokio::test]
async fn disabled_actions_never_reach_the_server() {
    let h = harness();
    let actions = DomainActions {
        create: Action::new("domains.create").disabled(true),
        ..DomainActions::default()
    };
    let table = h.domains(actions);
    table.mount().await.unwrap();

    let outcome = table.create(NewDomain::new("acme.com")).await.unwrap();

    assert_eq!(outcome, Outcome::Skipped(SkipReason::Disabled));
    assert_eq!(h.client.list_domains().await.unwrap().len(), 0);
    assert!(h.notifier.notifications().is_empty());
}

#[tokio::test]
async fn after_hook_failure_keeps_the_deletion() {
    let h = harness();
    let actions = DomainActions {
        delete: Action::new("domains.delete")
            .on_after(|_, _, _| Err(anyhow::anyhow!("audit webhook returned 500"))),
        ..DomainActions::default()
    };
    let table = h.domains(actions);
    table.mount().await.unwrap();
    let keep = table.create(NewDomain::new("a.com")).await.unwrap().completed().unwrap();
    let gone = table.create(NewDomain::new("x.com")).await.unwrap().completed().unwrap();

    let err = table.delete(&gone.id).await.unwrap_err();

    assert!(matches!(err, ResourceError::PostAction(_)));
    let note = h.last();
    assert_eq!(note.severity, Severity::Warning);
    assert_eq!(note.key, "common.post_action.error");
    assert!(note.message.contains("audit webhook returned 500"));

    let remaining: Vec<String> = table.domains().into_iter().map(|d| d.domain).collect();
    assert_eq!(remaining, vec!["a.com".to_string()]);
    assert!(table.list().contains(&keep.id));
}

#[tokio::test]
async fn validation_fails_before_any_request() {
    let h = harness();
    let table = h.domains(DomainActions::default());
    table.mount().await.unwrap();

    let err = table.create(NewDomain::new("not a host")).await.unwrap_err();

    match err {
        ResourceError::Validation(e) => assert_eq!(e.field(), Some("domain")),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(h.client.list_domains().await.unwrap().len(), 0);
}

#[tokio::test]
async fn controllers_refuse_to_fetch_before_scopes_are_ready() {
    let h = harness();
    let table = h.domains(DomainActions::default());

    let err = table.fetch().await.unwrap_err();

    assert!(matches!(err, ResourceError::Scopes(Audience::Organization)));
}

#[tokio::test]
async fn fetch_errors_are_reported() {
    let h = harness();
    let table = h.domains(DomainActions::default());
    h.client
        .fail_next("list_domains", ApiError::Network("connection reset".into()));

    let err = table.mount().await.unwrap_err();

    assert!(matches!(err, ResourceError::Fetch(ApiError::Network(_))));
    assert_eq!(h.last().key, "domains.fetch.error");
    assert!(!table.list().is_loading());
}

#[tokio::test]
async fn widgets_share_one_scope_registry() {
    let h = harness();
    let domains = h.domains(DomainActions::default());
    let providers = h.providers(SsoActions::default());
    domains.mount().await.unwrap();
    providers.mount().await.unwrap();

    assert!(h.ctx.scopes.covers(Audience::Organization, DOMAIN_SCOPES));
    assert!(h.ctx.scopes.covers(Audience::Organization, SSO_PROVIDER_SCOPES));
    assert_eq!(h.ctx.scopes.ensured(Audience::SelfAccount), "");
    assert_eq!(h.auth.granted(Audience::Organization).len(), 8);

    // A second mount adds nothing and requests nothing.
    assert!(
        !h.ctx
            .scopes
            .register_scopes(Audience::Organization, DOMAIN_SCOPES)
            .await
    );
}

#[tokio::test]
async fn sso_provider_lifecycle_with_domains() {
    let h = harness();
    let domains = h.domains(DomainActions::default());
    let seen_domain = Arc::new(Mutex::new(None));
    let actions = {
        let seen_domain = seen_domain.clone();
        SsoActions {
            associate_domain: Action::<IdentityProvider, String, ()>::new("sso.associate")
                .on_before(move |_, domain| {
                    *seen_domain.lock().unwrap() = domain.cloned();
                    Decision::Proceed
                }),
            ..SsoActions::default()
        }
    };
    let providers = h.providers(actions);
    domains.mount().await.unwrap();
    providers.mount().await.unwrap();

    let provider = providers.create(okta()).await.unwrap().completed().unwrap();
    assert_eq!(h.last().message, "Identity provider Acme Okta created.");
    assert!(provider.is_enabled);

    let disabled = providers
        .set_enabled(&provider.id, false)
        .await
        .unwrap()
        .completed()
        .unwrap();
    assert!(!disabled.is_enabled);
    assert!(!providers.list().find(&provider.id).unwrap().is_enabled);

    let pending = domains.create(NewDomain::new("acme.com")).await.unwrap().completed().unwrap();
    let err = providers
        .associate_domain(&provider.id, "acme.com")
        .await
        .unwrap_err();
    assert!(matches!(err, ResourceError::Mutation(ref api) if api.status_code() == Some(400)));
    assert_eq!(h.last().severity, Severity::Error);

    h.client.publish_dns_record("acme.com");
    domains.verify(&pending.id).await.unwrap();
    providers
        .associate_domain(&provider.id, "ACME.com")
        .await
        .unwrap();
    assert_eq!(seen_domain.lock().unwrap().as_deref(), Some("acme.com"));
    assert_eq!(h.last().message, "acme.com now signs in with Acme Okta.");

    let current = providers.list().find(&provider.id).unwrap();
    let rows = domain_associations(&current, &domains.domains());
    assert_eq!(rows.len(), 1);
    assert!(rows[0].associated);

    providers
        .remove_domain(&provider.id, "acme.com")
        .await
        .unwrap();
    assert!(providers.list().find(&provider.id).unwrap().domains.is_empty());

    providers.delete(&provider.id).await.unwrap();
    assert!(providers.providers().is_empty());
    assert_eq!(h.last().message, "Identity provider Acme Okta deleted.");
}

#[tokio::test]
async fn unknown_ids_are_rejected_locally() {
    let h = harness();
    let providers = h.providers(SsoActions::default());
    providers.mount().await.unwrap();

    let err = providers
        .delete(&orgkit_core::ProviderId::new("con_missing"))
        .await
        .unwrap_err();

    assert!(matches!(err, ResourceError::NotFound { .. }));
}

#[tokio::test]
async fn organization_details_save_passes_previous_details() {
    let h = harness_with(InMemoryManagementClient::new().with_organization(Organization {
        id: orgkit_core::OrganizationId::new("org_acme"),
        name: "acme".to_string(),
        display_name: "Acme".to_string(),
        branding: Branding::default(),
    }));
    let previous = Arc::new(Mutex::new(None));
    let actions = {
        let previous = previous.clone();
        OrgDetailsActions {
            save: Action::<OrgDetailsUpdate, Organization, Organization>::new("org.save")
                .on_before(move |_, current| {
                    *previous.lock().unwrap() = current.map(|o| o.display_name.clone());
                    Decision::Proceed
                }),
        }
    };
    let details = OrganizationDetails::new(h.ctx.clone(), h.client.clone(), actions);
    details.mount().await.unwrap();
    assert_eq!(details.details().unwrap().display_name, "Acme");

    let bad = OrgDetailsUpdate {
        branding: Some(Branding {
            logo_url: None,
            colors: Some(BrandColors {
                primary: "blue".to_string(),
                page_background: "#ffffff".to_string(),
            }),
        }),
        ..OrgDetailsUpdate::default()
    };
    assert!(matches!(
        details.save(bad).await.unwrap_err(),
        ResourceError::Validation(_)
    ));

    let update = OrgDetailsUpdate {
        display_name: Some("Acme Inc.".to_string()),
        branding: Some(Branding {
            logo_url: Some("https://cdn.acme.example/logo.png".to_string()),
            colors: Some(BrandColors {
                primary: "#0055ff".to_string(),
                page_background: "#ffffff".to_string(),
            }),
        }),
    };
    let saved = details.save(update).await.unwrap().completed().unwrap();

    assert_eq!(saved.display_name, "Acme Inc.");
    assert_eq!(previous.lock().unwrap().as_deref(), Some("Acme"));
    assert_eq!(details.details().unwrap().display_name, "Acme Inc.");
    assert_eq!(h.last().message, "Organization details saved.");
    assert!(!details.is_saving());
}

#[tokio::test]
async fn mfa_enrollment_flow() {
    let h = harness_with(
        InMemoryManagementClient::new()
            .with_factors([
                Factor {
                    factor: FactorType::Otp,
                    enabled: true,
                },
                Factor {
                    factor: FactorType::Sms,
                    enabled: false,
                },
            ])
            .with_otp_code("246810"),
    );
    let mfa = MfaManager::new(h.ctx.clone(), h.client.clone(), MfaActions::default());
    mfa.mount().await.unwrap();

    assert_eq!(h.ctx.scopes.ensured(Audience::SelfAccount), {
        let mut scopes: Vec<&str> = MFA_SCOPES.split_whitespace().collect();
        scopes.sort_unstable();
        scopes.join(" ")
    });
    assert!(h.ctx.scopes.covers(Audience::SelfAccount, "read:me:factors"));
    assert_eq!(mfa.enabled_factors(), vec![FactorType::Otp]);

    let sms = EnrollmentInput {
        phone_number: Some("+14155550123".to_string()),
        ..EnrollmentInput::default()
    };
    let err = mfa.enroll(FactorType::Sms, sms).await.unwrap_err();
    assert!(matches!(err, ResourceError::Validation(_)));
    assert_eq!(h.last().key, "mfa.enroll.factor_disabled");

    let enrollment = mfa
        .enroll(FactorType::Otp, EnrollmentInput::default())
        .await
        .unwrap()
        .completed()
        .unwrap();
    assert!(enrollment.barcode_uri.is_some());
    assert!(!mfa.authenticators().find(&enrollment.authenticator_id).unwrap().confirmed);

    let err = mfa
        .confirm(&enrollment.authenticator_id, "111111")
        .await
        .unwrap_err();
    assert!(matches!(err, ResourceError::Mutation(_)));
    assert_eq!(h.last().message.split(':').next(), Some("Could not confirm otp"));

    let confirmed = mfa
        .confirm(&enrollment.authenticator_id, " 246810 ")
        .await
        .unwrap()
        .completed()
        .unwrap();
    assert!(confirmed.confirmed);
    assert_eq!(h.last().message, "otp is ready to use.");

    mfa.delete(&enrollment.authenticator_id).await.unwrap();
    assert!(mfa.authenticators().is_empty());
    assert_eq!(h.last().message, "otp removed.");
}

/// Consent that takes a while, so passes overlap with later registrations.
#[derive(Default)]
struct SlowConsent {
    calls: AtomicUsize,
}

#[async_trait::async_trait]
impl AuthLayer for SlowConsent {
    async fn ensure_scopes(&self, _scope: &str, _audience: Audience) -> Result<(), AuthError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(())
    }

    async fn access_token(&self, _audience: Audience) -> Result<AccessToken, AuthError> {
        Ok(AccessToken::new("test-token", None))
    }
}

#[tokio::test]
async fn widgets_mounted_together_both_wait_for_consent() {
    let client = Arc::new(InMemoryManagementClient::new());
    let auth = Arc::new(SlowConsent::default());
    let scopes = Arc::new(ScopeManager::new(auth.clone()));
    let feedback = Feedback::new(
        Arc::new(CatalogTranslator::new()),
        Arc::new(RecordingNotifier::new()),
    );
    let ctx = ComponentContext::new(scopes, feedback);

    let first = DomainTable::new(ctx.clone(), client.clone(), DomainActions::default());
    let second = DomainTable::new(ctx.clone(), client.clone(), DomainActions::default());

    let (a, b) = tokio::join!(first.mount(), second.mount());

    assert!(a.is_ok());
    assert!(b.is_ok());
    assert!(second.list().is_loaded());
    assert_eq!(auth.calls.load(Ordering::SeqCst), 1);
}
