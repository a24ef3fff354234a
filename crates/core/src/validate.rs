//! Input validation shared by the resource models.
//!
//! These checks mirror what the management APIs reject so the user gets a
//! field-level message before a request is made. They are not a substitute
//! for server-side validation.

use crate::error::{DomainError, DomainResult};

const MAX_HOST_LEN: usize = 253;
const MAX_LABEL_LEN: usize = 63;

/// Normalize and validate a DNS host name (`login.example.com`).
///
/// Returns the lowercased, trimmed host.
pub fn host_name(field: &'static str, raw: &str) -> DomainResult<String> {
    let host = raw.trim().trim_end_matches('.').to_ascii_lowercase();
    if host.is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    if host.len() > MAX_HOST_LEN {
        return Err(DomainError::validation(field, "host name is too long"));
    }

    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return Err(DomainError::validation(
            field,
            "must contain at least one dot (e.g. example.com)",
        ));
    }

    for label in &labels {
        if label.is_empty() || label.len() > MAX_LABEL_LEN {
            return Err(DomainError::validation(field, "invalid label length"));
        }
        if label.starts_with('-') || label.ends_with('-') {
            return Err(DomainError::validation(
                field,
                "labels must not start or end with '-'",
            ));
        }
        if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
            return Err(DomainError::validation(
                field,
                format!("invalid character in '{label}'"),
            ));
        }
    }

    // TLDs are never all-numeric; this also rejects bare IPv4 addresses.
    if labels
        .last()
        .is_some_and(|tld| tld.chars().all(|c| c.is_ascii_digit()))
    {
        return Err(DomainError::validation(field, "must end in a valid top-level domain"));
    }

    Ok(host)
}

/// Validate a `#RGB` / `#RRGGBB` colour.
pub fn hex_color(field: &'static str, raw: &str) -> DomainResult<()> {
    let digits = raw
        .strip_prefix('#')
        .ok_or_else(|| DomainError::validation(field, "colour must start with '#'"))?;
    let ok = matches!(digits.len(), 3 | 6) && digits.chars().all(|c| c.is_ascii_hexdigit());
    if ok {
        Ok(())
    } else {
        Err(DomainError::validation(field, format!("'{raw}' is not a hex colour")))
    }
}

/// Validate an absolute `https://` URL with a non-empty host part.
pub fn https_url(field: &'static str, raw: &str) -> DomainResult<()> {
    let rest = raw
        .trim()
        .strip_prefix("https://")
        .ok_or_else(|| DomainError::validation(field, "must be an https:// URL"))?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() {
        return Err(DomainError::validation(field, "URL has no host"));
    }
    Ok(())
}

/// Validate a non-blank display string up to `max` characters.
pub fn display_text(field: &'static str, raw: &str, max: usize) -> DomainResult<()> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation(field, "must not be empty"));
    }
    if trimmed.chars().count() > max {
        return Err(DomainError::validation(
            field,
            format!("must be at most {max} characters"),
        ));
    }
    Ok(())
}

/// Validate a machine name (`acme-okta`): ascii alphanumerics and inner hyphens.
pub fn slug(field: &'static str, raw: &str, max: usize) -> DomainResult<()> {
    if raw.is_empty() || raw.len() > max {
        return Err(DomainError::validation(
            field,
            format!("must be between 1 and {max} characters"),
        ));
    }
    if raw.starts_with('-') || raw.ends_with('-') {
        return Err(DomainError::validation(field, "must not start or end with '-'"));
    }
    if !raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(DomainError::validation(
            field,
            "may only contain letters, digits and '-'",
        ));
    }
    Ok(())
}

/// Validate an E.164 phone number (`+14155550100`).
pub fn phone_number(field: &'static str, raw: &str) -> DomainResult<()> {
    let digits = raw
        .strip_prefix('+')
        .ok_or_else(|| DomainError::validation(field, "must start with '+' and country code"))?;
    if !(8..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(DomainError::validation(field, "must contain 8 to 15 digits"));
    }
    Ok(())
}

/// Minimal e-mail shape check (`local@host.tld`).
pub fn email(field: &'static str, raw: &str) -> DomainResult<()> {
    match raw.trim().split_once('@') {
        Some((local, host))
            if !local.is_empty() && host.contains('.') && !host.starts_with('.') =>
        {
            Ok(())
        }
        _ => Err(DomainError::validation(field, "is not a valid e-mail address")),
    }
}
