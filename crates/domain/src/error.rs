/// Shared error type used across all relay crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider}: {message}")]
    Provider { provider: String, message: String },

    #[error("cancelled")]
    Cancelled,

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True when the failure reflects a caller-initiated abort rather than
    /// a defect. Cancelled runs end without emitting an error event.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_is_classified() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::Other("boom".into()).is_cancelled());
        assert!(!Error::Timeout("slow".into()).is_cancelled());
    }

    #[test]
    fn provider_error_display() {
        let e = Error::Provider {
            provider: "claude-cli".into(),
            message: "exit status 1".into(),
        };
        assert_eq!(e.to_string(), "provider claude-cli: exit status 1");
    }
}
