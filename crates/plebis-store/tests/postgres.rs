//! Integration tests for PgStore
//!
//! These tests need a scratch PostgreSQL database and are marked #[ignore].
//! Run with: DATABASE_URL=postgres://... cargo test -p plebis-store --test postgres -- --ignored

use plebis_store::{DocumentStore, PgStore};
use serde_json::json;

async fn connect() -> PgStore {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let store = PgStore::connect(&url, 4).await.expect("connect");
    sqlx::query("DELETE FROM reports WHERE erowid_id >= 900000000")
        .execute(store.pool())
        .await
        .expect("cleanup");
    store
}

#[tokio::test]
#[ignore]
async fn stub_upsert_is_idempotent() {
    let store = connect().await;
    let id = 900_000_005;
    let stub = json!({"meta": {"erowidId": id, "reviewed": true, "available": false}});

    assert!(!store.exists(id).await.unwrap());
    store.upsert(id, &stub).await.unwrap();
    store.upsert(id, &stub).await.unwrap();

    assert!(store.exists(id).await.unwrap());
    assert_eq!(store.get(id).await.unwrap(), Some(stub));
}

#[tokio::test]
#[ignore]
async fn upsert_replaces_top_level_fields() {
    let store = connect().await;
    let id = 900_000_006;
    store
        .upsert(id, &json!({"meta": {"erowidId": id}, "title": "first"}))
        .await
        .unwrap();
    store
        .upsert(id, &json!({"meta": {"erowidId": id, "available": true}}))
        .await
        .unwrap();

    let doc = store.get(id).await.unwrap().unwrap();
    assert_eq!(doc["title"], "first");
    assert_eq!(doc["meta"]["available"], true);

    let page = store.scan_published(id - 1, 10).await.unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].0, id);
}

#[tokio::test]
#[ignore]
async fn schema_is_reentrant() {
    let store = connect().await;
    plebis_store::ensure_schema(store.pool()).await.unwrap();
    assert!(store.count().await.unwrap() >= 0);
}
