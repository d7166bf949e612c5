//! Search index error type

#[derive(Debug)]
pub enum IndexError {
    /// Transport failure or non-2xx bulk response
    Http {
        status: Option<u16>,
        message: String,
    },
    /// Request body or response could not be (de)serialized
    Encode(serde_json::Error),
    /// Configured cluster address is not a usable URL
    InvalidHost { host: String, message: String },
}

impl std::fmt::Display for IndexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http {
                status: Some(s),
                message,
            } => write!(f, "bulk HTTP {s}: {message}"),
            Self::Http {
                status: None,
                message,
            } => write!(f, "bulk HTTP error: {message}"),
            Self::Encode(e) => write!(f, "bulk encoding: {e}"),
            Self::InvalidHost { host, message } => {
                write!(f, "invalid search host {host:?}: {message}")
            }
        }
    }
}

impl std::error::Error for IndexError {}

impl IndexError {
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        Self::Http {
            status: e.status().map(|s| s.as_u16()),
            message: e.without_url().to_string(),
        }
    }
}

impl From<serde_json::Error> for IndexError {
    fn from(e: serde_json::Error) -> Self {
        Self::Encode(e)
    }
}

impl plebis_core::Retryable for IndexError {
    fn is_retryable(&self) -> bool {
        match self {
            // 429 = cluster pushing back, 5xx = node trouble, None = transport
            Self::Http { status, .. } => {
                matches!(status, None | Some(429) | Some(500..=599))
            }
            Self::Encode(_) | Self::InvalidHost { .. } => false,
        }
    }
}
