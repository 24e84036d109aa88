//! Integration tests for the event store backends.
//!
//! Both backends are exercised through the `EventStore` trait: the
//! flat-file dual-encoded store against a temporary directory, and the
//! relational store against an in-memory SQLite database.

use std::sync::Arc;

use beacon::models::{AccessEvent, GeoInfo};
use beacon::store::{EventStore, FileStore, SqliteStore, StoreError};

fn event(ip: &str, city: Option<&str>) -> AccessEvent {
    AccessEvent {
        timestamp: None,
        ip: ip.to_string(),
        ua: "test-agent".to_string(),
        referer: "Direct".to_string(),
        path: Some("probe".to_string()),
        code: None,
        geo: GeoInfo {
            city: city.map(str::to_string),
            ..GeoInfo::default()
        },
    }
}

async fn create_sqlite_store() -> Arc<dyn EventStore> {
    let store = SqliteStore::new("sqlite::memory:", 1).await.unwrap();
    store.init().await.unwrap();
    Arc::new(store)
}

async fn create_file_store(dir: &tempfile::TempDir) -> Arc<dyn EventStore> {
    let store = FileStore::new(dir.path());
    store.init().await.unwrap();
    Arc::new(store)
}

async fn append_read_preserves_order(store: Arc<dyn EventStore>) {
    let stored = store.append(event("1.1.1.1", Some("Rio"))).await.unwrap();
    assert!(stored.timestamp.is_some(), "append must stamp the timestamp");
    store.append(event("2.2.2.2", Some("Lima"))).await.unwrap();
    store.append(event("1.1.1.1", Some("Rio"))).await.unwrap();

    let events = store.read_all().await.unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].ip, "1.1.1.1");
    assert_eq!(events[1].ip, "2.2.2.2");
    assert_eq!(events[2].ip, "1.1.1.1");
    assert!(events.iter().all(|e| e.timestamp.is_some()));
}

#[tokio::test]
async fn test_append_read_order_file() {
    let dir = tempfile::tempdir().unwrap();
    append_read_preserves_order(create_file_store(&dir).await).await;
}

#[tokio::test]
async fn test_append_read_order_sqlite() {
    append_read_preserves_order(create_sqlite_store().await).await;
}

#[tokio::test]
async fn test_empty_store_reads_empty_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = create_file_store(&dir).await;
    assert!(store.read_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_empty_store_reads_empty_sqlite() {
    let store = create_sqlite_store().await;
    assert!(store.read_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_file_store_mirrors_document_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let store = create_file_store(&dir).await;
    store.append(event("1.1.1.1", Some("Rio"))).await.unwrap();
    store.append(event("2.2.2.2", None)).await.unwrap();

    let doc = std::fs::read_to_string(dir.path().join("events.json")).unwrap();
    let mirrored: Vec<AccessEvent> = serde_json::from_str(&doc).unwrap();
    assert_eq!(mirrored.len(), 2);
    assert_eq!(mirrored[0].ip, "1.1.1.1");

    let line_log = std::fs::read_to_string(dir.path().join("events.log")).unwrap();
    assert_eq!(line_log.lines().count(), 2);
}

#[tokio::test]
async fn test_corrupt_document_falls_back_to_line_log() {
    let dir = tempfile::tempdir().unwrap();
    let store = create_file_store(&dir).await;
    store.append(event("1.1.1.1", Some("Rio"))).await.unwrap();
    store.append(event("2.2.2.2", Some("Lima"))).await.unwrap();

    // Simulate a torn document rewrite.
    std::fs::write(dir.path().join("events.json"), "[{\"ip\": \"trunc").unwrap();

    let events = store.read_all().await.unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].ip, "1.1.1.1");
}

#[tokio::test]
async fn test_corrupt_line_is_skipped_on_fallback_read() {
    let dir = tempfile::tempdir().unwrap();
    let store = create_file_store(&dir).await;
    store.append(event("1.1.1.1", Some("Rio"))).await.unwrap();
    store.append(event("2.2.2.2", Some("Lima"))).await.unwrap();

    // Corrupt the document so the read falls back to the line log, and
    // wedge a malformed line between two good ones.
    std::fs::remove_file(dir.path().join("events.json")).unwrap();
    let log_path = dir.path().join("events.log");
    let mut log = std::fs::read_to_string(&log_path).unwrap();
    log.push_str("{{{ definitely not json\n");
    std::fs::write(&log_path, log).unwrap();
    store.append(event("3.3.3.3", None)).await.unwrap();
    std::fs::remove_file(dir.path().join("events.json")).unwrap();

    let events = store.read_all().await.unwrap();
    assert_eq!(events.len(), 3);
    assert_eq!(events[2].ip, "3.3.3.3");
}

#[tokio::test]
async fn test_document_preferred_over_line_log() {
    let dir = tempfile::tempdir().unwrap();
    let store = create_file_store(&dir).await;
    store.append(event("1.1.1.1", Some("Rio"))).await.unwrap();

    // Wipe the line log; the document still carries the record.
    std::fs::write(dir.path().join("events.log"), "").unwrap();

    let events = store.read_all().await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].ip, "1.1.1.1");
}

async fn concurrent_appends_all_land(store: Arc<dyn EventStore>) {
    let mut handles = vec![];
    for i in 0..10 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store.append(event(&format!("10.0.0.{i}"), None)).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let events = store.read_all().await.unwrap();
    assert_eq!(events.len(), 10, "no append may be lost to interleaving");
}

#[tokio::test]
async fn test_concurrent_appends_file() {
    let dir = tempfile::tempdir().unwrap();
    concurrent_appends_all_land(create_file_store(&dir).await).await;
}

#[tokio::test]
async fn test_concurrent_appends_sqlite() {
    concurrent_appends_all_land(create_sqlite_store().await).await;
}

async fn link_registry_round_trip(store: Arc<dyn EventStore>) {
    let link = store.create_link("aB3xQ9", "campaign").await.unwrap();
    assert_eq!(link.code, "aB3xQ9");
    assert_eq!(link.label, "campaign");

    let fetched = store.get_link("aB3xQ9").await.unwrap().unwrap();
    assert_eq!(fetched.code, "aB3xQ9");
    assert!(store.get_link("nope42").await.unwrap().is_none());

    match store.create_link("aB3xQ9", "other").await {
        Err(StoreError::Conflict) => {}
        other => panic!("expected Conflict, got {:?}", other.map(|l| l.code)),
    }

    store.create_link("zZ9yX8", "second").await.unwrap();
    let links = store.list_links().await.unwrap();
    assert_eq!(links.len(), 2);
    assert_eq!(links[0].code, "zZ9yX8", "newest link first");
}

#[tokio::test]
async fn test_link_registry_file() {
    let dir = tempfile::tempdir().unwrap();
    link_registry_round_trip(create_file_store(&dir).await).await;
}

#[tokio::test]
async fn test_link_registry_sqlite() {
    link_registry_round_trip(create_sqlite_store().await).await;
}

async fn events_scoped_to_code(store: Arc<dyn EventStore>) {
    store.create_link("aB3xQ9", "one").await.unwrap();
    store.create_link("zZ9yX8", "two").await.unwrap();

    let mut tagged = event("1.1.1.1", Some("Rio"));
    tagged.path = None;
    tagged.code = Some("aB3xQ9".to_string());
    store.append(tagged.clone()).await.unwrap();
    store.append(event("2.2.2.2", None)).await.unwrap();
    tagged.ip = "3.3.3.3".to_string();
    store.append(tagged).await.unwrap();

    let scoped = store.events_for_code("aB3xQ9").await.unwrap();
    assert_eq!(scoped.len(), 2);
    assert_eq!(scoped[0].ip, "1.1.1.1");
    assert_eq!(scoped[1].ip, "3.3.3.3");
    assert!(store.events_for_code("zZ9yX8").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_events_for_code_file() {
    let dir = tempfile::tempdir().unwrap();
    events_scoped_to_code(create_file_store(&dir).await).await;
}

#[tokio::test]
async fn test_events_for_code_sqlite() {
    events_scoped_to_code(create_sqlite_store().await).await;
}

#[tokio::test]
async fn test_geo_survives_relational_round_trip() {
    let store = create_sqlite_store().await;
    let mut enriched = event("1.1.1.1", Some("São Paulo"));
    enriched.geo.country = Some("Brazil".to_string());
    enriched.geo.lat = Some(-23.55);
    enriched.geo.lon = Some(-46.63);
    enriched.geo.org = Some("Example Telecom".to_string());
    store.append(enriched.clone()).await.unwrap();

    let events = store.read_all().await.unwrap();
    assert_eq!(events[0].geo, enriched.geo);
}
