//! Table and index definitions for the `reports` collection.
//!
//! Index keys are written as document paths. `meta.erowidId` maps to the
//! key column; paths through arrays (`[*]`) index the array of matched
//! values; everything else indexes the JSON value at that path.

use sqlx::PgPool;

use crate::error::StoreError;

/// Collection (table) holding harvested documents
pub const TABLE: &str = "reports";

/// Document path stored in the key column
const KEY_PATH: &str = "meta.erowidId";

/// One secondary index over document paths, all keys descending.
#[derive(Debug, Clone, Copy)]
pub struct IndexSpec {
    pub name: &'static str,
    pub keys: &'static [&'static str],
    pub unique: bool,
}

pub const INDEXES: &[IndexSpec] = &[
    IndexSpec {
        name: "reports_published_erowid_id",
        keys: &["meta.published", "meta.erowidId"],
        unique: true,
    },
    IndexSpec {
        name: "reports_published_substance",
        keys: &["meta.published", "substanceInfo[*].substance"],
        unique: false,
    },
    IndexSpec {
        name: "reports_published_author",
        keys: &["meta.published", "author"],
        unique: false,
    },
    IndexSpec {
        name: "reports_published",
        keys: &["meta.published"],
        unique: false,
    },
    IndexSpec {
        name: "reports_erowid_id",
        keys: &["meta.erowidId"],
        unique: false,
    },
    IndexSpec {
        name: "reports_category_name",
        keys: &["meta.erowidAttributes.categories[*].name"],
        unique: false,
    },
    IndexSpec {
        name: "reports_category_id",
        keys: &["meta.erowidAttributes.categories[*].id"],
        unique: false,
    },
    IndexSpec {
        name: "reports_attribute_name",
        keys: &["meta.erowidAttributes.attributes[*].name"],
        unique: false,
    },
    IndexSpec {
        name: "reports_attribute_id",
        keys: &["meta.erowidAttributes.attributes[*].id"],
        unique: false,
    },
];

/// SQL expression for one index key
fn key_expr(path: &str) -> String {
    if path == KEY_PATH {
        "erowid_id".to_string()
    } else if path.contains("[*]") {
        format!("(jsonb_path_query_array(doc, '$.{path}'::jsonpath))")
    } else {
        let segments = path.split('.').collect::<Vec<_>>().join(",");
        format!("(doc #> '{{{segments}}}')")
    }
}

impl IndexSpec {
    pub fn create_sql(&self) -> String {
        let keys: Vec<String> = self
            .keys
            .iter()
            .map(|k| format!("{} DESC", key_expr(k)))
            .collect();
        format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {TABLE} ({})",
            if self.unique { "UNIQUE " } else { "" },
            self.name,
            keys.join(", ")
        )
    }
}

pub fn create_table_sql() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {TABLE} (\n    erowid_id BIGINT PRIMARY KEY,\n    doc JSONB NOT NULL\n)"
    )
}

/// Create the collection and its indexes (idempotent)
pub async fn ensure_schema(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::query(&create_table_sql()).execute(pool).await?;
    for index in INDEXES {
        log::debug!("ensuring index {}", index.name);
        sqlx::query(&index.create_sql()).execute(pool).await?;
    }
    log::info!("Schema ready: {TABLE} with {} indexes", INDEXES.len());
    Ok(())
}
