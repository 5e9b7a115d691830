use thiserror::Error;

/// Errors surfaced by the content stores, the claim ledger and the coordinator.
#[derive(Debug, Error)]
pub enum StowageError {
    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("blob already registered: {0}")]
    Conflict(String),

    #[error("blob is in use: {0}")]
    InUse(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("object store error: {0}")]
    ObjectStore(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("config error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse classification of [`StowageError`] that callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    InUse,
    InvalidArgument,
    Io,
    Cancelled,
}

impl StowageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StowageError::NotFound(_) => ErrorKind::NotFound,
            StowageError::Conflict(_) => ErrorKind::Conflict,
            StowageError::InUse(_) => ErrorKind::InUse,
            StowageError::InvalidArgument(_) | StowageError::Config(_) => {
                ErrorKind::InvalidArgument
            }
            StowageError::Io(_)
            | StowageError::Database(_)
            | StowageError::ObjectStore(_)
            | StowageError::Internal(_) => ErrorKind::Io,
            StowageError::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// A blocked delete may succeed once the claim is released; I/O failures may be transient.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::InUse | ErrorKind::Io)
    }

    /// Maps a filesystem error, turning a missing file into `NotFound` for `name`.
    pub(crate) fn from_io(error: std::io::Error, name: &str) -> Self {
        if error.kind() == std::io::ErrorKind::NotFound {
            StowageError::NotFound(name.to_string())
        } else {
            StowageError::Io(error)
        }
    }
}

impl From<object_store::Error> for StowageError {
    fn from(error: object_store::Error) -> Self {
        match error {
            object_store::Error::NotFound { path, .. } => StowageError::NotFound(path),
            other => StowageError::ObjectStore(other.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for StowageError {
    fn from(error: tokio::task::JoinError) -> Self {
        StowageError::Internal(format!("blocking task failed: {}", error))
    }
}

pub type Result<T> = std::result::Result<T, StowageError>;
