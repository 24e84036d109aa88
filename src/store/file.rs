//! Flat-file dual-encoded event store.
//!
//! The line-encoded log is the primary encoding: every append goes there
//! first, one record per line. The JSON document is a mirror rewritten in
//! full after each append; a mirror failure is logged and never fails the
//! append. Reads prefer the document when it parses and fall back to the
//! line log otherwise, so a torn document rewrite degrades to the
//! crash-safer encoding instead of losing the history.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::models::{AccessEvent, TrackingLink};
use crate::store::codec;
use crate::store::{EventStore, StoreError, StoreResult};

const LINE_LOG: &str = "events.log";
const DOCUMENT: &str = "events.json";
const LINKS: &str = "links.json";

pub struct FileStore {
    data_dir: PathBuf,
    line_path: PathBuf,
    doc_path: PathBuf,
    links_path: PathBuf,
    // Serializes the multi-step read-modify-write across both encodings.
    lock: RwLock<()>,
}

impl FileStore {
    pub fn new(data_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            line_path: data_dir.join(LINE_LOG),
            doc_path: data_dir.join(DOCUMENT),
            links_path: data_dir.join(LINKS),
            data_dir,
            lock: RwLock::new(()),
        }
    }

    /// Load the full record set without taking the lock; callers hold it.
    async fn load_events(&self) -> Result<Vec<AccessEvent>> {
        match fs::read_to_string(&self.doc_path).await {
            Ok(content) => match codec::decode_document(&content) {
                Ok(events) => return Ok(events),
                Err(err) => {
                    warn!(error = %err, "unreadable document encoding, falling back to line log");
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no document encoding yet, reading line log");
            }
            Err(err) => {
                warn!(error = %err, "could not read document encoding, falling back to line log");
            }
        }

        match fs::read_to_string(&self.line_path).await {
            Ok(content) => Ok(codec::decode_line_log(&content)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(anyhow::Error::new(err).context("reading line log")),
        }
    }

    /// Rewrite the document encoding with the new event included.
    ///
    /// An unreadable existing document aborts the mirror (the line log
    /// still has the record) rather than silently dropping history.
    async fn mirror_document(&self, event: &AccessEvent) -> Result<()> {
        let mut events = match fs::read_to_string(&self.doc_path).await {
            Ok(content) => codec::decode_document(&content).context("parsing document encoding")?,
            Err(err) if err.kind() == ErrorKind::NotFound => Vec::new(),
            Err(err) => return Err(anyhow::Error::new(err).context("reading document encoding")),
        };

        events.push(event.clone());
        let doc = codec::encode_document(&events)?;
        fs::write(&self.doc_path, doc)
            .await
            .context("writing document encoding")?;
        Ok(())
    }

    async fn load_links(&self) -> Result<Vec<TrackingLink>> {
        match fs::read_to_string(&self.links_path).await {
            Ok(content) => serde_json::from_str(&content).context("parsing links document"),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(err) => Err(anyhow::Error::new(err).context("reading links document")),
        }
    }
}

#[async_trait]
impl EventStore for FileStore {
    async fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir)
            .await
            .with_context(|| format!("creating data directory {}", self.data_dir.display()))?;
        Ok(())
    }

    async fn append(&self, mut event: AccessEvent) -> StoreResult<AccessEvent> {
        let _guard = self.lock.write().await;

        if event.timestamp.is_none() {
            event.timestamp = Some(Utc::now());
        }

        let line = codec::encode_line(&event)
            .map_err(|err| StoreError::Other(anyhow::Error::new(err)))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.line_path)
            .await
            .context("opening line log")?;
        file.write_all(line.as_bytes()).await.context("appending to line log")?;
        file.write_all(b"\n").await.context("appending to line log")?;
        file.flush().await.context("flushing line log")?;

        // Primary write is the success signal; the mirror is best-effort.
        if let Err(err) = self.mirror_document(&event).await {
            warn!(error = %err, "failed to mirror event into document encoding");
        }

        Ok(event)
    }

    async fn read_all(&self) -> Result<Vec<AccessEvent>> {
        let _guard = self.lock.read().await;
        self.load_events().await
    }

    async fn events_for_code(&self, code: &str) -> Result<Vec<AccessEvent>> {
        let _guard = self.lock.read().await;
        let events = self.load_events().await?;
        Ok(events
            .into_iter()
            .filter(|event| event.code.as_deref() == Some(code))
            .collect())
    }

    async fn create_link(&self, code: &str, label: &str) -> StoreResult<TrackingLink> {
        let _guard = self.lock.write().await;

        let mut links = self.load_links().await?;
        if links.iter().any(|link| link.code == code) {
            return Err(StoreError::Conflict);
        }

        let link = TrackingLink {
            code: code.to_string(),
            label: label.to_string(),
            created_at: Utc::now(),
        };
        links.push(link.clone());

        let doc = serde_json::to_string_pretty(&links)
            .map_err(|err| StoreError::Other(anyhow::Error::new(err)))?;
        fs::write(&self.links_path, doc)
            .await
            .context("writing links document")?;

        Ok(link)
    }

    async fn get_link(&self, code: &str) -> Result<Option<TrackingLink>> {
        let _guard = self.lock.read().await;
        let links = self.load_links().await?;
        Ok(links.into_iter().find(|link| link.code == code))
    }

    async fn list_links(&self) -> Result<Vec<TrackingLink>> {
        let _guard = self.lock.read().await;
        let mut links = self.load_links().await?;
        links.reverse();
        Ok(links)
    }
}
