use serde::{Deserialize, Serialize};

/// API audience a scope set is requested for.
///
/// Variant order is the order scopes are ensured in.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Audience {
    /// The signed-in user's own account API (`/me`).
    SelfAccount,
    /// The organization management API (`/my-org`).
    Organization,
}

impl Audience {
    pub const ALL: [Audience; 2] = [Audience::SelfAccount, Audience::Organization];

    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::SelfAccount => "self-account",
            Audience::Organization => "organization",
        }
    }
}

impl core::fmt::Display for Audience {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_form_matches_display() {
        for audience in Audience::ALL {
            let json = serde_json::to_string(&audience).unwrap();
            assert_eq!(json, format!("\"{audience}\""));
            assert_eq!(serde_json::from_str::<Audience>(&json).unwrap(), audience);
        }
        assert_eq!(
            serde_json::to_string(&Audience::SelfAccount).unwrap(),
            "\"self-account\""
        );
    }

    #[test]
    fn ensure_order_puts_the_account_first() {
        assert_eq!(Audience::ALL, [Audience::SelfAccount, Audience::Organization]);
        assert!(Audience::SelfAccount < Audience::Organization);
    }
}
