//! Authentication layer boundary.
//!
//! The host application owns the OAuth session (token cache, consent popups,
//! redirects). This crate only needs to ask it to widen the granted scopes and
//! to hand out bearer tokens.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use thiserror::Error;

use crate::{Audience, Scope, parse_scopes};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("login required")]
    LoginRequired,

    #[error("consent required for scopes '{0}'")]
    ConsentRequired(String),

    #[error("authorization server unreachable: {0}")]
    Network(String),

    #[error("{0}")]
    Other(String),
}

/// Bearer token for one audience.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    token: String,
    expires_in: Option<u64>,
}

impl AccessToken {
    pub fn new(token: impl Into<String>, expires_in: Option<u64>) -> Self {
        Self {
            token: token.into(),
            expires_in,
        }
    }

    pub fn secret(&self) -> &str {
        &self.token
    }

    pub fn expires_in(&self) -> Option<u64> {
        self.expires_in
    }
}

impl core::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Host-provided OAuth session.
#[async_trait]
pub trait AuthLayer: Send + Sync {
    /// Make sure the session holds `scope` (space-separated) for `audience`,
    /// prompting for consent if needed.
    async fn ensure_scopes(&self, scope: &str, audience: Audience) -> Result<(), AuthError>;

    /// Obtain a bearer token for `audience` without user interaction.
    async fn access_token(&self, audience: Audience) -> Result<AccessToken, AuthError>;

    /// Start an interactive login.
    async fn login_with_redirect(&self) -> Result<(), AuthError> {
        Err(AuthError::Other("interactive login is not supported".to_string()))
    }
}

#[async_trait]
impl<A> AuthLayer for Arc<A>
where
    A: AuthLayer + ?Sized,
{
    async fn ensure_scopes(&self, scope: &str, audience: Audience) -> Result<(), AuthError> {
        (**self).ensure_scopes(scope, audience).await
    }

    async fn access_token(&self, audience: Audience) -> Result<AccessToken, AuthError> {
        (**self).access_token(audience).await
    }

    async fn login_with_redirect(&self) -> Result<(), AuthError> {
        (**self).login_with_redirect().await
    }
}

/// Auth layer backed by a fixed token.
///
/// Intended for service accounts, local development and tests: every ensured
/// scope is granted immediately and recorded.
#[derive(Debug)]
pub struct StaticAuthLayer {
    token: String,
    granted: Mutex<BTreeMap<Audience, BTreeSet<Scope>>>,
}

impl StaticAuthLayer {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            granted: Mutex::new(BTreeMap::new()),
        }
    }

    /// Scopes granted so far for `audience`.
    pub fn granted(&self, audience: Audience) -> Vec<Scope> {
        let granted = self.granted.lock().unwrap_or_else(PoisonError::into_inner);
        granted
            .get(&audience)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl AuthLayer for StaticAuthLayer {
    async fn ensure_scopes(&self, scope: &str, audience: Audience) -> Result<(), AuthError> {
        let mut granted = self.granted.lock().unwrap_or_else(PoisonError::into_inner);
        granted.entry(audience).or_default().extend(parse_scopes(scope));
        Ok(())
    }

    async fn access_token(&self, _audience: Audience) -> Result<AccessToken, AuthError> {
        Ok(AccessToken::new(self.token.clone(), None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_layer_records_granted_scopes() {
        let layer = Arc::new(StaticAuthLayer::new("tok"));
        layer
            .ensure_scopes("read:me:factors", Audience::SelfAccount)
            .await
            .unwrap();
        assert_eq!(layer.granted(Audience::SelfAccount), vec![Scope::new("read:me:factors")]);
        assert!(layer.granted(Audience::Organization).is_empty());

        let token = layer.access_token(Audience::Organization).await.unwrap();
        assert_eq!(token.secret(), "tok");
        assert!(!format!("{token:?}").contains("tok\""));
    }

    #[tokio::test]
    async fn login_is_unsupported_by_default() {
        let layer = StaticAuthLayer::new("tok");
        assert!(layer.login_with_redirect().await.is_err());
    }
}
