/// Shared error type used across all Switchboard crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Credential missing, malformed, expired, unknown, or the principal is
    /// banned/inactive.
    #[error("authentication failed")]
    AuthFailure,

    /// Conversation absent or owned by another principal.
    #[error("conversation not found")]
    OwnershipFailure,

    #[error("provider {provider}: {message}")]
    Upstream { provider: String, message: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("persistence: {0}")]
    Persistence(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("extraction: {0}")]
    Extraction(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("config: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error must be reported to a client with the single
    /// "access denied" shape (never distinguishing the two causes).
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Error::AuthFailure | Error::OwnershipFailure)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_denied_covers_both_causes() {
        assert!(Error::AuthFailure.is_access_denied());
        assert!(Error::OwnershipFailure.is_access_denied());
        assert!(!Error::Persistence("down".into()).is_access_denied());
    }

    #[test]
    fn upstream_display_names_provider() {
        let err = Error::Upstream {
            provider: "openai".into(),
            message: "HTTP 500".into(),
        };
        assert_eq!(err.to_string(), "provider openai: HTTP 500");
    }
}
