use crate::group::Group;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Fixed, user-visible message carried by every denial.
pub const FORBIDDEN_MESSAGE: &str = "You do not have permission to perform this action";

/// The membership oracle could not produce an answer.
///
/// "Not a member" is never an error; it is `Ok(false)`.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("membership oracle unavailable while checking {group}: {reason}")]
    Unavailable { group: Group, reason: String },

    #[error("no directory group is mapped for {group}")]
    Unmapped { group: Group },

    #[error("membership check for {group} timed out after {after:?}")]
    Timeout { group: Group, after: Duration },

    #[error("directory request for {group} failed: {source}")]
    Http {
        group: Group,
        #[source]
        source: reqwest::Error,
    },
}

impl OracleError {
    pub fn group(&self) -> Group {
        match self {
            Self::Unavailable { group, .. }
            | Self::Unmapped { group }
            | Self::Timeout { group, .. }
            | Self::Http { group, .. } => *group,
        }
    }
}

/// Errors surfaced to the caller of a protected operation.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("{}", FORBIDDEN_MESSAGE)]
    Forbidden { operation: String },

    #[error("authorization check failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("invalid arguments for '{operation}': {reason}")]
    InvalidArguments { operation: String, reason: String },

    #[error("operation failed: {0}")]
    Handler(#[source] anyhow::Error),
}

impl AccessError {
    pub fn is_forbidden(&self) -> bool {
        matches!(self, Self::Forbidden { .. })
    }

    /// True when the authorization system itself failed, as opposed to a
    /// decision having been made.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, Self::Oracle(_))
    }
}

/// Load-time configuration errors. None of these are per-call conditions.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("operation '{operation}' declares unknown group '{name}'")]
    UnknownGroup { operation: String, name: String },

    #[error("operation '{operation}' is gated on an empty group list and can never be reached")]
    EmptyRequiredGroups { operation: String },

    #[error("no authorization is declared for operation '{0}'")]
    UndeclaredOperation(String),

    #[error("invalid value '{value}' for {name}")]
    InvalidEnv { name: String, value: String },

    #[error("invalid directory url '{value}': {reason}")]
    InvalidUrl { value: String, reason: String },

    #[error("failed to build directory client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_uses_fixed_message() {
        let err = AccessError::Forbidden {
            operation: "getMembersOf".to_string(),
        };
        assert_eq!(err.to_string(), FORBIDDEN_MESSAGE);
        assert!(err.is_forbidden());
        assert!(!err.is_infrastructure());
    }

    #[test]
    fn test_oracle_failure_is_distinct_from_forbidden() {
        let err: AccessError = OracleError::Unavailable {
            group: Group::SuperUser,
            reason: "connection refused".to_string(),
        }
        .into();
        assert!(err.is_infrastructure());
        assert!(!err.is_forbidden());
        assert!(err.to_string().contains("SUPER_USER"));
    }
}
