//! Raw record fetching over HTTP.
//!
//! Bodies are returned as opaque bytes; decoding is left to the caller since
//! sources serve legacy encodings.

use std::time::Duration;

use async_trait::async_trait;

use crate::ExternalId;
use crate::error::FetchError;

/// Retrieves the raw payload of one record.
#[async_trait]
pub trait RecordFetcher: Send + Sync {
    async fn fetch(&self, id: ExternalId) -> Result<Vec<u8>, FetchError>;
}

/// HTTP settings for record fetching
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Record URL; the ID is appended as the `ID` query parameter
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: "http://erowid.org.global.prod.fastly.net/experiences/exp.php".to_string(),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
        }
    }
}

/// `GET <base_url>?ID=<id>` with its own keep-alive connection pool.
///
/// Create one per worker so each worker reuses its own connection.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpFetcher {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .timeout(config.request_timeout)
            .pool_max_idle_per_host(1)
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RecordFetcher for HttpFetcher {
    async fn fetch(&self, id: ExternalId) -> Result<Vec<u8>, FetchError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("ID", id)])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(FetchError::from_reqwest)?;

        let body = response.bytes().await.map_err(FetchError::from_reqwest)?;
        Ok(body.to_vec())
    }
}
