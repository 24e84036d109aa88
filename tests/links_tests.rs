//! Integration tests for short-code issuing.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use beacon::links;
use beacon::models::{AccessEvent, TrackingLink};
use beacon::store::{EventStore, SqliteStore, StoreError, StoreResult};

#[tokio::test]
async fn test_issue_never_repeats_codes() {
    let store = SqliteStore::new("sqlite::memory:", 1).await.unwrap();
    store.init().await.unwrap();

    let mut seen = HashSet::new();
    for i in 0..10_000 {
        let link = links::issue(&store, &format!("label-{i}")).await.unwrap();
        assert!(seen.insert(link.code.clone()), "duplicate code issued: {}", link.code);
    }
    assert_eq!(seen.len(), 10_000);
}

/// Store stub whose link registry rejects the first `conflicts` codes.
struct ConflictingStore {
    conflicts: usize,
    attempts: AtomicUsize,
}

impl ConflictingStore {
    fn new(conflicts: usize) -> Self {
        Self {
            conflicts,
            attempts: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl EventStore for ConflictingStore {
    async fn init(&self) -> Result<()> {
        Ok(())
    }

    async fn append(&self, event: AccessEvent) -> StoreResult<AccessEvent> {
        Ok(event)
    }

    async fn read_all(&self) -> Result<Vec<AccessEvent>> {
        Ok(Vec::new())
    }

    async fn events_for_code(&self, _code: &str) -> Result<Vec<AccessEvent>> {
        Ok(Vec::new())
    }

    async fn create_link(&self, code: &str, label: &str) -> StoreResult<TrackingLink> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.conflicts {
            return Err(StoreError::Conflict);
        }
        Ok(TrackingLink {
            code: code.to_string(),
            label: label.to_string(),
            created_at: chrono::Utc::now(),
        })
    }

    async fn get_link(&self, _code: &str) -> Result<Option<TrackingLink>> {
        Ok(None)
    }

    async fn list_links(&self) -> Result<Vec<TrackingLink>> {
        Ok(Vec::new())
    }
}

#[tokio::test]
async fn test_issue_retries_through_collisions() {
    let store = ConflictingStore::new(2);
    let link = links::issue(&store, "retry-me").await.unwrap();
    assert_eq!(link.code.len(), links::CODE_LENGTH);
    assert_eq!(store.attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_issue_exhausts_after_bounded_retries() {
    let store = ConflictingStore::new(usize::MAX);
    match links::issue(&store, "doomed").await {
        Err(StoreError::CodeSpaceExhausted) => {}
        other => panic!("expected CodeSpaceExhausted, got {:?}", other.map(|l| l.code)),
    }
    assert_eq!(store.attempts.load(Ordering::SeqCst), 5);
}
