use thiserror::Error;

/// Caller and contract errors. Problems found in an audited artifact are
/// never errors; they are reported as violations.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown rule id: {0}")]
    UnknownRule(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
