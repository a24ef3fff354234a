use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::id::AuthenticatorId;
use crate::validate;

/// Kind of MFA factor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FactorType {
    Sms,
    Email,
    Otp,
    PushNotification,
    WebauthnRoaming,
    WebauthnPlatform,
    RecoveryCode,
}

impl FactorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FactorType::Sms => "sms",
            FactorType::Email => "email",
            FactorType::Otp => "otp",
            FactorType::PushNotification => "push-notification",
            FactorType::WebauthnRoaming => "webauthn-roaming",
            FactorType::WebauthnPlatform => "webauthn-platform",
            FactorType::RecoveryCode => "recovery-code",
        }
    }

    /// Whether enrollment is finished by submitting a one-time code.
    pub fn confirms_with_code(&self) -> bool {
        matches!(
            self,
            FactorType::Sms | FactorType::Email | FactorType::Otp | FactorType::PushNotification
        )
    }
}

/// A factor the tenant offers to this account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Factor {
    #[serde(rename = "type")]
    pub factor: FactorType,
    pub enabled: bool,
}

/// An enrolled authenticator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authenticator {
    pub id: AuthenticatorId,
    #[serde(rename = "type")]
    pub factor: FactorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub confirmed: bool,
    pub created_at: DateTime<Utc>,
}

impl Entity for Authenticator {
    type Id = AuthenticatorId;

    fn id(&self) -> &AuthenticatorId {
        &self.id
    }
}

/// Contact details needed to start an enrollment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl EnrollmentInput {
    pub fn validate(&self, factor: FactorType) -> DomainResult<()> {
        match factor {
            FactorType::Sms => match &self.phone_number {
                Some(phone) => validate::phone_number("phone_number", phone),
                None => Err(DomainError::validation("phone_number", "is required for sms")),
            },
            FactorType::Email => match &self.email {
                Some(email) => validate::email("email", email),
                None => Err(DomainError::validation("email", "is required for email")),
            },
            _ => Ok(()),
        }
    }
}

/// A started, not yet confirmed enrollment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    pub authenticator_id: AuthenticatorId,
    #[serde(rename = "type")]
    pub factor: FactorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recovery_code: Option<String>,
}

/// Validate a one-time code typed by the user.
pub fn validate_otp_code(code: &str) -> DomainResult<()> {
    let code = code.trim();
    if !(4..=32).contains(&code.len()) || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(DomainError::validation("otp_code", "must be 4 to 32 letters or digits"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sms_enrollment_needs_a_phone_number() {
        let input = EnrollmentInput::default();
        assert!(input.validate(FactorType::Sms).is_err());
        assert!(input.validate(FactorType::Otp).is_ok());

        let input = EnrollmentInput {
            phone_number: Some("+14155550100".to_string()),
            ..EnrollmentInput::default()
        };
        assert!(input.validate(FactorType::Sms).is_ok());
    }

    #[test]
    fn factor_wire_names_use_type_key() {
        let json = serde_json::json!({ "type": "push-notification", "enabled": true });
        let factor: Factor = serde_json::from_value(json).unwrap();
        assert_eq!(factor.factor, FactorType::PushNotification);
    }

    #[test]
    fn otp_code_shape() {
        assert!(validate_otp_code("123456").is_ok());
        assert!(validate_otp_code("12").is_err());
        assert!(validate_otp_code("12 34 56").is_err());
    }
}
