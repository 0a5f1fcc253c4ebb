use thiserror::Error;

#[derive(Debug, Error)]
pub enum AutosaveError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Server error: HTTP {0}")]
    Server(u16),

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Autosave worker has stopped")]
    WorkerStopped,
}

impl AutosaveError {
    /// Whether a save that failed with this error may be attempted again.
    /// Validation and configuration problems never go away on retry.
    pub fn is_transient(&self) -> bool {
        !matches!(
            self,
            AutosaveError::Validation(_) | AutosaveError::Config(_) | AutosaveError::WorkerStopped
        )
    }
}

impl From<AutosaveError> for String {
    fn from(err: AutosaveError) -> Self {
        err.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(AutosaveError::Server(503).is_transient());
        assert!(AutosaveError::Decode("eof".into()).is_transient());
        assert!(AutosaveError::Rejected("Save failed".into()).is_transient());
        assert!(!AutosaveError::Validation("bad date".into()).is_transient());
        assert!(!AutosaveError::Config("zero attempts".into()).is_transient());
        assert!(!AutosaveError::WorkerStopped.is_transient());
    }

    #[test]
    fn test_error_into_string() {
        let msg: String = AutosaveError::Server(502).into();
        assert_eq!(msg, "Server error: HTTP 502");
    }
}
