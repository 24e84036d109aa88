use crate::models::{AccessEvent, TrackingLink};
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("short code already exists")]
    Conflict,
    #[error("could not generate a unique short code")]
    CodeSpaceExhausted,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Append-only event store. Events are never updated or deleted.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Initialize the backing store (create tables, parent directories, etc.)
    async fn init(&self) -> Result<()>;

    /// Append an event, stamping its timestamp when absent.
    ///
    /// Returns the event as stored. A returned error means the primary
    /// encoding could not be written; the caller decides whether to retry
    /// or drop.
    async fn append(&self, event: AccessEvent) -> StoreResult<AccessEvent>;

    /// Read the full record set in arrival order.
    ///
    /// A missing backing store yields an empty list, not an error.
    async fn read_all(&self) -> Result<Vec<AccessEvent>>;

    /// Read the events captured against one issued code, in arrival order.
    async fn events_for_code(&self, code: &str) -> Result<Vec<AccessEvent>>;

    /// Register a tracking link with a caller-provided code.
    ///
    /// Fails with [`StoreError::Conflict`] when the code was already issued.
    async fn create_link(&self, code: &str, label: &str) -> StoreResult<TrackingLink>;

    /// Get an issued link by code.
    async fn get_link(&self, code: &str) -> Result<Option<TrackingLink>>;

    /// List all issued links, newest first.
    async fn list_links(&self) -> Result<Vec<TrackingLink>>;
}
