//! Concierge API group suffix handling
//!
//! The Concierge can be installed with its API groups rebased onto a custom
//! suffix, e.g. `config.concierge.example.com` instead of
//! `config.concierge.pinniped.dev`. Clients must address the same groups.

use thiserror::Error;

/// Suffix used by a default Concierge installation.
pub const DEFAULT_API_GROUP_SUFFIX: &str = "pinniped.dev";

/// Group prefix of the CredentialIssuer API.
pub const CONFIG_GROUP_PREFIX: &str = "config.concierge";

/// Group prefix of the WebhookAuthenticator and JWTAuthenticator APIs.
pub const AUTHENTICATION_GROUP_PREFIX: &str = "authentication.concierge";

/// Maximum length of a DNS-1123 subdomain.
const MAX_SUBDOMAIN_LEN: usize = 253;

/// Maximum length of a single DNS label.
const MAX_LABEL_LEN: usize = 63;

/// Reasons an API group suffix is rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GroupSuffixError {
    #[error("suffix must not be empty")]
    Empty,

    #[error("suffix {0:?} must contain a '.'")]
    MissingDot(String),

    #[error("suffix {suffix:?} is not a valid DNS-1123 subdomain: {reason}")]
    InvalidSubdomain { suffix: String, reason: String },
}

/// Validate an API group suffix.
///
/// The suffix must be a DNS-1123 subdomain with at least two labels.
pub fn validate(suffix: &str) -> Result<(), GroupSuffixError> {
    if suffix.is_empty() {
        return Err(GroupSuffixError::Empty);
    }
    if !suffix.contains('.') {
        return Err(GroupSuffixError::MissingDot(suffix.to_string()));
    }
    if suffix.len() > MAX_SUBDOMAIN_LEN {
        return Err(invalid(
            suffix,
            format!("must be no more than {} characters", MAX_SUBDOMAIN_LEN),
        ));
    }
    for label in suffix.split('.') {
        validate_label(suffix, label)?;
    }
    Ok(())
}

fn validate_label(suffix: &str, label: &str) -> Result<(), GroupSuffixError> {
    if label.is_empty() {
        return Err(invalid(suffix, "contains an empty label"));
    }
    if label.len() > MAX_LABEL_LEN {
        return Err(invalid(
            suffix,
            format!("label {:?} is longer than {} characters", label, MAX_LABEL_LEN),
        ));
    }
    if !label
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(invalid(
            suffix,
            format!(
                "label {:?} must consist of lower case alphanumeric characters or '-'",
                label
            ),
        ));
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(invalid(
            suffix,
            format!("label {:?} must start and end with an alphanumeric character", label),
        ));
    }
    Ok(())
}

fn invalid(suffix: &str, reason: impl Into<String>) -> GroupSuffixError {
    GroupSuffixError::InvalidSubdomain {
        suffix: suffix.to_string(),
        reason: reason.into(),
    }
}

/// Full API group for the CredentialIssuer API under `suffix`.
pub fn config_group(suffix: &str) -> String {
    format!("{}.{}", CONFIG_GROUP_PREFIX, suffix)
}

/// Full API group for the authenticator APIs under `suffix`.
pub fn authentication_group(suffix: &str) -> String {
    format!("{}.{}", AUTHENTICATION_GROUP_PREFIX, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_suffix_is_valid() {
        assert!(validate(DEFAULT_API_GROUP_SUFFIX).is_ok());
    }

    #[test]
    fn custom_suffixes() {
        assert!(validate("example.com").is_ok());
        assert!(validate("tuna.io").is_ok());
        assert!(validate("a-b.c1.example").is_ok());
    }

    #[test]
    fn rejects_empty_and_single_label() {
        assert_eq!(validate(""), Err(GroupSuffixError::Empty));
        assert_eq!(
            validate("localhost"),
            Err(GroupSuffixError::MissingDot("localhost".to_string()))
        );
    }

    #[test]
    fn rejects_malformed_labels() {
        assert!(matches!(
            validate("Example.com"),
            Err(GroupSuffixError::InvalidSubdomain { .. })
        ));
        assert!(matches!(
            validate("example..com"),
            Err(GroupSuffixError::InvalidSubdomain { .. })
        ));
        assert!(matches!(
            validate("-example.com"),
            Err(GroupSuffixError::InvalidSubdomain { .. })
        ));
        assert!(matches!(
            validate("example.com."),
            Err(GroupSuffixError::InvalidSubdomain { .. })
        ));
    }

    #[test]
    fn rejects_overlong_label() {
        let label = "a".repeat(64);
        let suffix = format!("{}.com", label);
        assert!(matches!(
            validate(&suffix),
            Err(GroupSuffixError::InvalidSubdomain { .. })
        ));
    }

    #[test]
    fn groups_are_rebased_onto_suffix() {
        assert_eq!(config_group("pinniped.dev"), "config.concierge.pinniped.dev");
        assert_eq!(
            authentication_group("example.com"),
            "authentication.concierge.example.com"
        );
    }
}
