use crate::validation::ValidationError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("network error: {0}")]
    Network(String),

    #[error("remote rejected the request with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("offline")]
    Offline,

    #[error("no remote backend configured")]
    NotConfigured,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Retrying will never help: the entry should be dead-lettered right away.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Error::Rejected { .. }
                | Error::NotFound { .. }
                | Error::Validation(_)
                | Error::Storage(rusqlite::Error::FromSqlConversionFailure(..))
        )
    }

    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Error::Storage(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Network(format!("request timed out: {e}"))
        } else if e.is_connect() {
            Error::Network(format!("connection failed: {e}"))
        } else if e.is_decode() {
            Error::Network(format!("unexpected response format: {e}"))
        } else {
            Error::Network(e.to_string())
        }
    }
}
