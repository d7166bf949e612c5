//! Store error type

use plebis_core::ExternalId;

#[derive(Debug)]
pub enum StoreError {
    /// Query or connection failure
    Database(sqlx::Error),
    /// ID outside the range of the key column
    InvalidId(ExternalId),
    /// Injected or backend-specific failure without a database error
    Unavailable(String),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Database(e) => write!(f, "database: {e}"),
            Self::InvalidId(id) => write!(f, "id {id} does not fit the key column"),
            Self::Unavailable(msg) => write!(f, "store unavailable: {msg}"),
        }
    }
}

impl std::error::Error for StoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Database(e) => Some(e),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Database(e)
    }
}

impl plebis_core::Retryable for StoreError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Database(e) => matches!(
                e,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
            Self::InvalidId(_) => false,
            Self::Unavailable(_) => true,
        }
    }
}
