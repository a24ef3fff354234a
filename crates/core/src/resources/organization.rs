use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::DomainResult;
use crate::id::OrganizationId;
use crate::validate;

const MAX_DISPLAY_NAME_LEN: usize = 255;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrandColors {
    pub primary: String,
    pub page_background: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<BrandColors>,
}

impl Branding {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(url) = &self.logo_url {
            validate::https_url("branding.logo_url", url)?;
        }
        if let Some(colors) = &self.colors {
            validate::hex_color("branding.colors.primary", &colors.primary)?;
            validate::hex_color("branding.colors.page_background", &colors.page_background)?;
        }
        Ok(())
    }
}

/// Organization details edited by the settings screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organization {
    pub id: OrganizationId,
    pub name: String,
    pub display_name: String,
    #[serde(default)]
    pub branding: Branding,
}

impl Entity for Organization {
    type Id = OrganizationId;

    fn id(&self) -> &OrganizationId {
        &self.id
    }
}

/// Partial update of the organization details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrgDetailsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branding: Option<Branding>,
}

impl OrgDetailsUpdate {
    pub fn validate(&self) -> DomainResult<()> {
        if let Some(name) = &self.display_name {
            validate::display_text("display_name", name, MAX_DISPLAY_NAME_LEN)?;
        }
        if let Some(branding) = &self.branding {
            branding.validate()?;
        }
        Ok(())
    }

    pub fn apply_to(&self, org: &mut Organization) {
        if let Some(name) = &self.display_name {
            org.display_name = name.trim().to_string();
        }
        if let Some(branding) = &self.branding {
            org.branding = branding.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_blank_display_name_and_bad_colours() {
        let blank = OrgDetailsUpdate {
            display_name: Some("   ".to_string()),
            branding: None,
        };
        assert_eq!(blank.validate().unwrap_err().field(), Some("display_name"));

        let bad_colour = OrgDetailsUpdate {
            display_name: None,
            branding: Some(Branding {
                logo_url: None,
                colors: Some(BrandColors {
                    primary: "#0059d6".to_string(),
                    page_background: "white".to_string(),
                }),
            }),
        };
        assert_eq!(
            bad_colour.validate().unwrap_err().field(),
            Some("branding.colors.page_background")
        );
    }
}
