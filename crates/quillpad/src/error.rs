use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("invalid command: {0}")]
    InvalidCommand(String),
    #[error("empty search query")]
    EmptyQuery,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("document '{0}' not found")]
    NotFound(String),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}
