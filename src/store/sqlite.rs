use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use std::sync::Arc;

use crate::models::{AccessEvent, TrackingLink};
use crate::store::codec::EventRow;
use crate::store::{EventStore, StoreError, StoreResult};

pub struct SqliteStore {
    pool: Arc<SqlitePool>,
}

#[derive(Debug, sqlx::FromRow)]
struct LinkRow {
    code: String,
    label: String,
    created_at: String,
}

impl LinkRow {
    fn into_link(self) -> Result<TrackingLink> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .with_context(|| format!("parsing created_at for link {}", self.code))?
            .with_timezone(&Utc);
        Ok(TrackingLink {
            code: self.code,
            label: self.label,
            created_at,
        })
    }
}

impl SqliteStore {
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }
}

#[async_trait]
impl EventStore for SqliteStore {
    async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS links (
                code TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                code TEXT,
                ip TEXT NOT NULL,
                ua TEXT NOT NULL,
                referer TEXT NOT NULL,
                path TEXT,
                geo TEXT,
                ts TEXT NOT NULL
            )
            "#,
        )
        .execute(self.pool.as_ref())
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_events_code ON events(code)")
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn append(&self, mut event: AccessEvent) -> StoreResult<AccessEvent> {
        let ts = event.timestamp.get_or_insert_with(Utc::now).to_rfc3339();

        let geo = if event.geo.is_empty() {
            None
        } else {
            Some(
                serde_json::to_string(&event.geo)
                    .map_err(|err| StoreError::Other(anyhow::Error::new(err)))?,
            )
        };

        sqlx::query(
            r#"
            INSERT INTO events (code, ip, ua, referer, path, geo, ts)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&event.code)
        .bind(&event.ip)
        .bind(&event.ua)
        .bind(&event.referer)
        .bind(&event.path)
        .bind(&geo)
        .bind(&ts)
        .execute(self.pool.as_ref())
        .await
        .map_err(|err| StoreError::Other(err.into()))?;

        Ok(event)
    }

    async fn read_all(&self) -> Result<Vec<AccessEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, code, ip, ua, referer, path, geo, ts
            FROM events
            ORDER BY id
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(EventRow::into_event).collect())
    }

    async fn events_for_code(&self, code: &str) -> Result<Vec<AccessEvent>> {
        let rows = sqlx::query_as::<_, EventRow>(
            r#"
            SELECT id, code, ip, ua, referer, path, geo, ts
            FROM events
            WHERE code = ?
            ORDER BY id
            "#,
        )
        .bind(code)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows.into_iter().map(EventRow::into_event).collect())
    }

    async fn create_link(&self, code: &str, label: &str) -> StoreResult<TrackingLink> {
        let created_at = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO links (code, label, created_at)
            VALUES (?, ?, ?)
            ON CONFLICT(code) DO NOTHING
            "#,
        )
        .bind(code)
        .bind(label)
        .bind(created_at.to_rfc3339())
        .execute(self.pool.as_ref())
        .await
        .map_err(|err| StoreError::Other(err.into()))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict);
        }

        Ok(TrackingLink {
            code: code.to_string(),
            label: label.to_string(),
            created_at,
        })
    }

    async fn get_link(&self, code: &str) -> Result<Option<TrackingLink>> {
        let row = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT code, label, created_at
            FROM links
            WHERE code = ?
            "#,
        )
        .bind(code)
        .fetch_optional(self.pool.as_ref())
        .await?;

        row.map(LinkRow::into_link).transpose()
    }

    async fn list_links(&self) -> Result<Vec<TrackingLink>> {
        let rows = sqlx::query_as::<_, LinkRow>(
            r#"
            SELECT code, label, created_at
            FROM links
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(self.pool.as_ref())
        .await?;

        rows.into_iter().map(LinkRow::into_link).collect()
    }
}
