//! Bulk index operations

use plebis_core::ExternalId;
use serde::Serialize;
use serde_json::Value;

/// Target of one `index` action
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndexAction {
    #[serde(rename = "_index")]
    pub index: String,
    #[serde(rename = "_type", skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(rename = "_id")]
    pub id: ExternalId,
}

/// One queued (action, document) pair
#[derive(Debug, Clone, PartialEq)]
pub struct IndexOp {
    pub action: IndexAction,
    pub document: Value,
}

impl IndexOp {
    pub fn new(index: &str, doc_type: Option<&str>, id: ExternalId, document: Value) -> Self {
        Self {
            action: IndexAction {
                index: index.to_string(),
                doc_type: doc_type.map(str::to_string),
                id,
            },
            document,
        }
    }

    pub fn id(&self) -> ExternalId {
        self.action.id
    }

    /// Append the two NDJSON lines of this op to `out`
    pub fn write_ndjson(&self, out: &mut String) -> Result<(), serde_json::Error> {
        #[derive(Serialize)]
        struct Line<'a> {
            index: &'a IndexAction,
        }
        out.push_str(&serde_json::to_string(&Line {
            index: &self.action,
        })?);
        out.push('\n');
        out.push_str(&serde_json::to_string(&self.document)?);
        out.push('\n');
        Ok(())
    }
}

/// Render a bulk request body
pub fn to_ndjson(ops: &[IndexOp]) -> Result<String, serde_json::Error> {
    let mut body = String::new();
    for op in ops {
        op.write_ndjson(&mut body)?;
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn action_line_carries_index_type_and_id() {
        let op = IndexOp::new("reports", Some("report"), 6, json!({"meta": {"erowidId": 6}}));
        let body = to_ndjson(&[op]).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"index":{"_index":"reports","_type":"report","_id":6}}"#
        );
        assert_eq!(lines[1], r#"{"meta":{"erowidId":6}}"#);
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn type_omitted_when_unset() {
        let op = IndexOp::new("reports", None, 1, json!({}));
        let body = to_ndjson(&[op]).unwrap();
        assert!(!body.contains("_type"));
    }

    #[test]
    fn empty_body() {
        assert_eq!(to_ndjson(&[]).unwrap(), "");
    }
}
