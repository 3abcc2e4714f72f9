//! Error types for the CLI
//!
//! Every variant names the resolution step that failed so the operator can
//! tell which flag to supply or which object to fix.

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Conflicting or invalid explicit flags
    #[error("{message}")]
    Input { message: String },

    /// An object named explicitly does not exist
    #[error("{kind} {name:?} not found")]
    NotFound { kind: String, name: String },

    /// Zero or many candidates and not enough explicit input to pick one
    #[error("{message}{}", found_suffix(.candidates))]
    Ambiguous {
        message: String,
        candidates: Vec<String>,
    },

    /// The run deadline elapsed while a step was still waiting
    #[error("timed out while {step}")]
    DeadlineExceeded { step: String },

    /// The run was cancelled before its deadline
    #[error("cancelled while {step}")]
    Cancelled { step: String },

    /// Data that was present but could not be parsed
    #[error("{step}: {message}")]
    Malformed { step: String, message: String },

    #[error("{step}: {source}")]
    Kube {
        step: String,
        #[source]
        source: kube::Error,
    },

    #[error("{step}: {source}")]
    Http {
        step: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not determine the kestrel executable path: {0}")]
    SelfPath(#[source] std::io::Error),

    #[error("could not load --kubeconfig: {0}")]
    Kubeconfig(#[from] kube::config::KubeconfigError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

fn found_suffix(candidates: &[String]) -> String {
    if candidates.is_empty() {
        String::new()
    } else {
        format!(". Found these candidates: {}", candidates.join(", "))
    }
}

impl Error {
    pub fn input(message: impl Into<String>) -> Self {
        Error::Input {
            message: message.into(),
        }
    }

    pub fn not_found(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Error::NotFound {
            kind: kind.into(),
            name: name.into(),
        }
    }

    pub fn ambiguous(message: impl Into<String>, candidates: Vec<String>) -> Self {
        Error::Ambiguous {
            message: message.into(),
            candidates,
        }
    }

    pub fn malformed(step: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Malformed {
            step: step.into(),
            message: message.into(),
        }
    }

    pub fn kube(step: impl Into<String>, source: kube::Error) -> Self {
        Error::Kube {
            step: step.into(),
            source,
        }
    }

    pub fn http(step: impl Into<String>, source: reqwest::Error) -> Self {
        Error::Http {
            step: step.into(),
            source,
        }
    }

    /// Whether the error came from running out of time or being cancelled.
    pub fn is_deadline(&self) -> bool {
        matches!(self, Error::DeadlineExceeded { .. } | Error::Cancelled { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ambiguous_lists_candidates() {
        let err = Error::ambiguous(
            "multiple CredentialIssuers were found",
            vec!["ci-1".to_string(), "ci-2".to_string()],
        );
        assert_eq!(
            err.to_string(),
            "multiple CredentialIssuers were found. Found these candidates: ci-1, ci-2"
        );
    }

    #[test]
    fn ambiguous_without_candidates() {
        let err = Error::ambiguous("no authenticators were found", vec![]);
        assert_eq!(err.to_string(), "no authenticators were found");
    }

    #[test]
    fn not_found_names_kind_and_object() {
        let err = Error::not_found("JWTAuthenticator", "jwt1");
        assert_eq!(err.to_string(), r#"JWTAuthenticator "jwt1" not found"#);
    }

    #[test]
    fn deadline_errors_are_classified() {
        assert!(Error::DeadlineExceeded {
            step: "x".to_string()
        }
        .is_deadline());
        assert!(!Error::input("bad flag").is_deadline());
    }
}
