//! Bulk submission to the search engine

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::error::IndexError;
use crate::op::{IndexOp, to_ndjson};

/// Per-request result of a bulk submission
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BulkOutcome {
    pub indexed: usize,
    /// Items the engine rejected individually (mapping errors etc.)
    pub rejected: usize,
}

/// A search index accepting bulk `index` operations.
#[async_trait]
pub trait SearchIndex: Send + Sync {
    async fn bulk(&self, ops: &[IndexOp]) -> Result<BulkOutcome, IndexError>;
}

#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    errors: bool,
    #[serde(default)]
    items: Vec<serde_json::Map<String, serde_json::Value>>,
}

impl BulkResponse {
    fn outcome(&self, submitted: usize) -> BulkOutcome {
        if !self.errors {
            return BulkOutcome {
                indexed: submitted,
                rejected: 0,
            };
        }
        let rejected: Vec<&serde_json::Value> = self
            .items
            .iter()
            .filter_map(|item| item.values().next())
            .filter(|result| result.get("error").is_some())
            .collect();
        if let Some(first) = rejected.first() {
            log::warn!(
                "bulk: {} of {submitted} items rejected, first: id={} {}",
                rejected.len(),
                first["_id"],
                first["error"]
            );
        }
        BulkOutcome {
            indexed: submitted.saturating_sub(rejected.len()),
            rejected: rejected.len(),
        }
    }
}

/// Elasticsearch `_bulk` endpoint
#[derive(Debug, Clone)]
pub struct ElasticsearchIndex {
    client: reqwest::Client,
    bulk_url: Url,
}

impl ElasticsearchIndex {
    /// `host` may omit the scheme (`localhost:9200`)
    pub fn new(host: &str, timeout: Duration) -> Result<Self, IndexError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(IndexError::from_reqwest)?;
        Ok(Self {
            client,
            bulk_url: bulk_endpoint(host)?,
        })
    }

    pub fn bulk_url(&self) -> &str {
        self.bulk_url.as_str()
    }
}

/// `_bulk` under the cluster URL, keeping any path prefix of a proxied host.
fn bulk_endpoint(host: &str) -> Result<Url, IndexError> {
    let mut url = match Url::parse(host) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url,
        // `localhost:9200` parses with `localhost` as its scheme
        _ => Url::parse(&format!("http://{host}")).map_err(|e| IndexError::InvalidHost {
            host: host.to_string(),
            message: e.to_string(),
        })?,
    };
    url.path_segments_mut()
        .map_err(|()| IndexError::InvalidHost {
            host: host.to_string(),
            message: "cannot carry a path".into(),
        })?
        .pop_if_empty()
        .push("_bulk");
    Ok(url)
}

#[async_trait]
impl SearchIndex for ElasticsearchIndex {
    async fn bulk(&self, ops: &[IndexOp]) -> Result<BulkOutcome, IndexError> {
        if ops.is_empty() {
            return Ok(BulkOutcome::default());
        }
        let body = to_ndjson(ops)?;
        let response = self
            .client
            .post(self.bulk_url.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(IndexError::from_reqwest)?;

        let text = response.text().await.map_err(IndexError::from_reqwest)?;
        let parsed: BulkResponse = serde_json::from_str(&text)?;
        Ok(parsed.outcome(ops.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plebis_core::Retryable;
    use serde_json::json;
    use wiremock::matchers::{body_string, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ops(ids: &[u64]) -> Vec<IndexOp> {
        ids.iter()
            .map(|&id| IndexOp::new("reports", Some("report"), id, json!({"meta": {"erowidId": id}})))
            .collect()
    }

    fn endpoint(host: &str) -> String {
        bulk_endpoint(host).unwrap().to_string()
    }

    #[test]
    fn bulk_endpoint_from_host() {
        assert_eq!(endpoint("localhost:9200"), "http://localhost:9200/_bulk");
        assert_eq!(endpoint("https://es:9200/"), "https://es:9200/_bulk");
        assert_eq!(endpoint("http://proxy/es"), "http://proxy/es/_bulk");
    }

    #[test]
    fn bulk_endpoint_keeps_credentials() {
        assert_eq!(
            endpoint("https://elastic:p@ss@es:9200"),
            "https://elastic:p%40ss@es:9200/_bulk"
        );
    }

    #[test]
    fn unparseable_host_is_rejected() {
        let err = bulk_endpoint("es host:9200").unwrap_err();
        assert!(matches!(err, IndexError::InvalidHost { .. }));
        assert!(!plebis_core::Retryable::is_retryable(&err));
    }

    #[test]
    fn outcome_counts_item_errors() {
        let response: BulkResponse = serde_json::from_value(json!({
            "took": 3,
            "errors": true,
            "items": [
                {"index": {"_id": "1", "status": 201}},
                {"index": {"_id": "2", "status": 400, "error": {"type": "mapper_parsing_exception"}}},
                {"index": {"_id": "3", "status": 201}}
            ]
        }))
        .unwrap();
        assert_eq!(
            response.outcome(3),
            BulkOutcome {
                indexed: 2,
                rejected: 1
            }
        );
    }

    #[tokio::test]
    async fn posts_ndjson_to_bulk() {
        let server = MockServer::start().await;
        let expected = to_ndjson(&ops(&[6, 7])).unwrap();
        Mock::given(method("POST"))
            .and(path("/_bulk"))
            .and(header("content-type", "application/x-ndjson"))
            .and(body_string(expected))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"errors": false, "items": []})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let index = ElasticsearchIndex::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let outcome = index.bulk(&ops(&[6, 7])).await.unwrap();
        assert_eq!(outcome.indexed, 2);
        assert_eq!(outcome.rejected, 0);
    }

    #[tokio::test]
    async fn overloaded_cluster_is_retryable_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let index = ElasticsearchIndex::new(&server.uri(), Duration::from_secs(5)).unwrap();
        let err = index.bulk(&ops(&[1])).await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn empty_batch_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let index = ElasticsearchIndex::new(&server.uri(), Duration::from_secs(5)).unwrap();
        assert_eq!(index.bulk(&[]).await.unwrap(), BulkOutcome::default());
    }
}
