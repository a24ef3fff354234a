//! User-facing feedback: message lookup and notification delivery.
//!
//! Both are host collaborators. Controllers only call them to turn outcomes
//! into copy; nothing here affects control flow.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;

/// Message lookup with `${name}` substitutions.
pub trait Translator: Send + Sync {
    fn t(&self, key: &str, substitutions: &[(&str, &str)]) -> String;
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub severity: Severity,
    /// Catalog key the message was rendered from.
    pub key: String,
    pub message: String,
}

/// Toast/notification sink.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

const DEFAULT_CATALOG: &[(&str, &str)] = &[
    ("common.post_action.error", "The change was saved, but a follow-up step failed: ${error}"),
    ("domains.fetch.error", "Could not load domains: ${error}"),
    ("domains.create.success", "Domain ${domain} added."),
    ("domains.create.error", "Could not add ${domain}: ${error}"),
    ("domains.delete.success", "Domain ${domain} deleted."),
    ("domains.delete.error", "Could not delete ${domain}: ${error}"),
    ("domains.verify.success", "Domain ${domain} verified."),
    ("domains.verify.pending", "Domain ${domain} is not verified yet. DNS changes can take a while to propagate."),
    ("domains.verify.error", "Could not verify ${domain}: ${error}"),
    ("sso.fetch.error", "Could not load identity providers: ${error}"),
    ("sso.create.success", "Identity provider ${provider} created."),
    ("sso.create.error", "Could not create ${provider}: ${error}"),
    ("sso.update.success", "Identity provider ${provider} updated."),
    ("sso.update.error", "Could not update ${provider}: ${error}"),
    ("sso.delete.success", "Identity provider ${provider} deleted."),
    ("sso.delete.error", "Could not delete ${provider}: ${error}"),
    ("sso.associate.success", "${domain} now signs in with ${provider}."),
    ("sso.associate.error", "Could not add ${domain} to ${provider}: ${error}"),
    ("sso.remove_domain.success", "${domain} removed from ${provider}."),
    ("sso.remove_domain.error", "Could not remove ${domain} from ${provider}: ${error}"),
    ("org.fetch.error", "Could not load organization details: ${error}"),
    ("org.save.success", "Organization details saved."),
    ("org.save.error", "Could not save organization details: ${error}"),
    ("mfa.fetch.error", "Could not load your authentication methods: ${error}"),
    ("mfa.enroll.success", "Enrollment started for ${factor}."),
    ("mfa.enroll.error", "Could not enroll ${factor}: ${error}"),
    ("mfa.enroll.factor_disabled", "${factor} is not available for this account."),
    ("mfa.confirm.success", "${factor} is ready to use."),
    ("mfa.confirm.error", "Could not confirm ${factor}: ${error}"),
    ("mfa.delete.success", "${factor} removed."),
    ("mfa.delete.error", "Could not remove ${factor}: ${error}"),
];

/// In-process message catalog.
///
/// Starts from the built-in English messages; hosts override individual keys.
/// Unknown keys render as the key itself.
#[derive(Debug, Clone)]
pub struct CatalogTranslator {
    messages: HashMap<Cow<'static, str>, Cow<'static, str>>,
}

impl Default for CatalogTranslator {
    fn default() -> Self {
        Self {
            messages: DEFAULT_CATALOG
                .iter()
                .map(|(k, v)| (Cow::Borrowed(*k), Cow::Borrowed(*v)))
                .collect(),
        }
    }
}

impl CatalogTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_message(
        mut self,
        key: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        self.messages.insert(key.into(), message.into());
        self
    }
}

impl Translator for CatalogTranslator {
    fn t(&self, key: &str, substitutions: &[(&str, &str)]) -> String {
        let template = self.messages.get(key).map(|m| m.as_ref()).unwrap_or(key);
        render(template, substitutions)
    }
}

/// Single pass over `template`; substituted values are never rescanned.
/// Placeholders without a value are left as written.
fn render(template: &str, substitutions: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let name = &after[..end];
        match substitutions.iter().find(|(n, _)| *n == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[start..start + end + 3]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

/// Keeps notifications in memory. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    inner: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.inner.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn last(&self) -> Option<Notification> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification);
    }
}

/// Forwards notifications to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Success => {
                tracing::info!(key = %notification.key, "{}", notification.message)
            }
            Severity::Warning => {
                tracing::warn!(key = %notification.key, "{}", notification.message)
            }
            Severity::Error => {
                tracing::error!(key = %notification.key, "{}", notification.message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_named_placeholders() {
        let t = CatalogTranslator::new();
        assert_eq!(
            t.t("domains.create.error", &[("domain", "example.com"), ("error", "conflict")]),
            "Could not add example.com: conflict"
        );
    }

    #[test]
    fn substituted_values_are_not_rescanned() {
        let t = CatalogTranslator::new();
        assert_eq!(
            t.t(
                "domains.create.error",
                &[("domain", "${error}.example.com"), ("error", "conflict")]
            ),
            "Could not add ${error}.example.com: conflict"
        );
    }

    #[test]
    fn unknown_and_unterminated_placeholders_are_kept() {
        let t = CatalogTranslator::new()
            .with_message("custom.partial", "${known} and ${unknown} then ${open");
        assert_eq!(
            t.t("custom.partial", &[("known", "ok")]),
            "ok and ${unknown} then ${open"
        );
    }

    #[test]
    fn unknown_keys_fall_back_to_the_key() {
        let t = CatalogTranslator::new();
        assert_eq!(t.t("nope.missing", &[]), "nope.missing");
    }

    #[test]
    fn host_overrides_win() {
        let t = CatalogTranslator::new().with_message("org.save.success", "Gespeichert.");
        assert_eq!(t.t("org.save.success", &[]), "Gespeichert.");
    }

    #[test]
    fn recording_notifier_drains() {
        let n = RecordingNotifier::new();
        n.notify(Notification {
            severity: Severity::Success,
            key: "org.save.success".to_string(),
            message: "saved".to_string(),
        });
        assert_eq!(n.last().map(|x| x.severity), Some(Severity::Success));
        assert_eq!(n.take().len(), 1);
        assert!(n.notifications().is_empty());
    }
}
