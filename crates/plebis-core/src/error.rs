//! Error type for record fetching

/// Error from fetching a single record over HTTP.
#[derive(Debug)]
pub enum FetchError {
    /// HTTP error with optional status code
    Http {
        status: Option<u16>,
        message: String,
    },
    /// Client could not be constructed
    Client(String),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "HTTP error: {message}"),
            Self::Client(message) => write!(f, "HTTP client: {message}"),
        }
    }
}

impl std::error::Error for FetchError {}

impl FetchError {
    /// Create HTTP error from reqwest error.
    ///
    /// The URL is stripped so log lines carry only the record ID the caller adds.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.without_url().to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => *status,
            Self::Client(_) => None,
        }
    }
}

impl crate::retry::Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            // 404/410 = record does not exist, retrying won't help
            Self::Http { status, .. } => !matches!(status, Some(400 | 404 | 410)),
            Self::Client(_) => false,
        }
    }
}
