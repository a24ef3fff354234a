use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::DomainResult;
use crate::id::DomainId;
use crate::validate;

/// Verification state of an organization domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DomainStatus {
    Pending,
    Verified,
    Failed,
}

impl DomainStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainStatus::Pending => "pending",
            DomainStatus::Verified => "verified",
            DomainStatus::Failed => "failed",
        }
    }
}

/// A domain claimed by the organization.
///
/// Until verified, `verification_host`/`verification_txt` describe the DNS TXT
/// record the owner has to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    pub id: DomainId,
    pub domain: String,
    pub status: DomainStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_host: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verification_txt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Domain {
    pub fn is_verified(&self) -> bool {
        self.status == DomainStatus::Verified
    }
}

impl Entity for Domain {
    type Id = DomainId;

    fn id(&self) -> &DomainId {
        &self.id
    }
}

/// Request body for claiming a new domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDomain {
    pub domain: String,
}

impl NewDomain {
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
        }
    }

    /// Validate and return the normalized request.
    pub fn normalized(&self) -> DomainResult<Self> {
        Ok(Self {
            domain: validate::host_name("domain", &self.domain)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_lowercase_wire_names() {
        let json = serde_json::json!({
            "id": "dom_1",
            "domain": "example.com",
            "status": "verified"
        });
        let domain: Domain = serde_json::from_value(json).unwrap();
        assert!(domain.is_verified());
        assert_eq!(domain.verification_txt, None);
    }

    #[test]
    fn new_domain_is_normalized() {
        let req = NewDomain::new(" Example.COM ").normalized().unwrap();
        assert_eq!(req.domain, "example.com");
        assert!(NewDomain::new("nodots").normalized().is_err());
    }
}
