use std::borrow::Cow;
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// OAuth scope token.
///
/// Scopes are modeled as opaque strings (e.g. "read:me:factors").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Scope(Cow<'static, str>);

impl Scope {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for Scope {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Split a whitespace-separated scope string into tokens.
///
/// Blank input yields no tokens.
pub fn parse_scopes(raw: &str) -> Vec<Scope> {
    raw.split_whitespace()
        .map(|token| Scope::new(token.to_string()))
        .collect()
}

/// Deduplicated, sorted set of scopes for one audience.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeSet(BTreeSet<Scope>);

impl ScopeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add tokens; returns how many were not already present.
    pub fn extend<I>(&mut self, scopes: I) -> usize
    where
        I: IntoIterator<Item = Scope>,
    {
        let before = self.0.len();
        self.0.extend(scopes);
        self.0.len() - before
    }

    pub fn contains(&self, scope: &Scope) -> bool {
        self.0.contains(scope)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Scope> {
        self.0.iter()
    }

    /// Space-joined, sorted form sent to the authorization server.
    pub fn to_scope_string(&self) -> String {
        self.0
            .iter()
            .map(Scope::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl FromIterator<Scope> for ScopeSet {
    fn from_iter<T: IntoIterator<Item = Scope>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
