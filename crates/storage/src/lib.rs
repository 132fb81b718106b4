use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow},
    Pool, Row, Sqlite,
};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use uuid::Uuid;

use shared::{
    domain::{HistoryKind, MetricId, ModelId},
    protocol::HistoryRecord,
};

const MEMORY_DATABASE_URL: &str = "sqlite::memory:";

/// Local record of refinements and other saved documents.
#[derive(Clone)]
pub struct HistoryStore {
    pool: Pool<Sqlite>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryFilter {
    pub kind: Option<HistoryKind>,
    /// Case-insensitive substring of the title.
    pub query: Option<String>,
}

impl HistoryFilter {
    pub fn kind(kind: HistoryKind) -> Self {
        Self {
            kind: Some(kind),
            query: None,
        }
    }

    pub fn search(mut self, query: impl Into<String>) -> Self {
        let query = query.into();
        self.query = (!query.trim().is_empty()).then_some(query);
        self
    }
}

impl HistoryStore {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)
            .with_context(|| format!("invalid database url '{database_url}'"))?
            .create_if_missing(true);
        // Every in-memory connection is its own database.
        let max_connections = if database_url == MEMORY_DATABASE_URL { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await
            .with_context(|| format!("failed to open history database '{database_url}'"))?;

        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS history (
                id            TEXT PRIMARY KEY NOT NULL,
                kind          TEXT NOT NULL,
                title         TEXT NOT NULL,
                content       TEXT NOT NULL,
                original_text TEXT NOT NULL,
                instruction   TEXT,
                models        TEXT NOT NULL DEFAULT '{}',
                created_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure history table exists")?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS history_kind_created_at ON history (kind, created_at)",
        )
        .execute(&self.pool)
        .await
        .context("failed to ensure history index exists")?;
        Ok(())
    }

    /// Inserts or replaces the record with the same id.
    pub async fn save(&self, record: &HistoryRecord) -> Result<()> {
        let models =
            serde_json::to_string(&record.models).context("failed to encode model assignments")?;
        sqlx::query(
            r#"
            INSERT INTO history (id, kind, title, content, original_text, instruction, models, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                kind = excluded.kind,
                title = excluded.title,
                content = excluded.content,
                original_text = excluded.original_text,
                instruction = excluded.instruction,
                models = excluded.models,
                created_at = excluded.created_at
            "#,
        )
        .bind(record.id.to_string())
        .bind(record.kind.as_str())
        .bind(&record.title)
        .bind(&record.content)
        .bind(&record.original_text)
        .bind(record.instruction.as_deref())
        .bind(models)
        .bind(timestamp(&record.created_at))
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to save history record {}", record.id))?;
        Ok(())
    }

    /// Newest first.
    pub async fn list(&self, filter: &HistoryFilter) -> Result<Vec<HistoryRecord>> {
        let kind = filter.kind.map(HistoryKind::as_str);
        let query = filter.query.as_deref().map(str::trim);
        let rows = sqlx::query(
            r#"
            SELECT id, kind, title, content, original_text, instruction, models, created_at
            FROM history
            WHERE (? IS NULL OR kind = ?)
              AND (? IS NULL OR instr(lower(title), lower(?)) > 0)
            ORDER BY created_at DESC, rowid DESC
            "#,
        )
        .bind(kind)
        .bind(kind)
        .bind(query)
        .bind(query)
        .fetch_all(&self.pool)
        .await
        .context("failed to list history")?;

        rows.iter().map(record_from_row).collect()
    }

    pub async fn get(&self, id: Uuid) -> Result<Option<HistoryRecord>> {
        let row = sqlx::query(
            r#"
            SELECT id, kind, title, content, original_text, instruction, models, created_at
            FROM history WHERE id = ?
            "#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to load history record {id}"))?;

        row.as_ref().map(record_from_row).transpose()
    }

    /// Returns whether a record was removed.
    pub async fn delete(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM history WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete history record {id}"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Removes every record, or only those of `kind`. Returns the count removed.
    pub async fn clear(&self, kind: Option<HistoryKind>) -> Result<u64> {
        let kind = kind.map(HistoryKind::as_str);
        let result = sqlx::query("DELETE FROM history WHERE (? IS NULL OR kind = ?)")
            .bind(kind)
            .bind(kind)
            .execute(&self.pool)
            .await
            .context("failed to clear history")?;
        Ok(result.rows_affected())
    }
}

fn record_from_row(row: &SqliteRow) -> Result<HistoryRecord> {
    let id: String = row.try_get("id")?;
    let kind: String = row.try_get("kind")?;
    let models: String = row.try_get("models")?;
    let created_at: String = row.try_get("created_at")?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .with_context(|| format!("invalid timestamp '{created_at}' for history record {id}"))?
        .with_timezone(&Utc);

    let models: BTreeMap<MetricId, ModelId> = serde_json::from_str(&models)
        .with_context(|| format!("invalid model assignments stored for history record {id}"))?;

    Ok(HistoryRecord {
        id: Uuid::parse_str(&id).with_context(|| format!("invalid history id '{id}'"))?,
        kind: HistoryKind::parse(&kind)
            .with_context(|| format!("unknown history kind '{kind}' for record {id}"))?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        original_text: row.try_get("original_text")?,
        instruction: row.try_get("instruction")?,
        models,
        created_at,
    })
}

/// Fixed-width UTC timestamps so text ordering matches time ordering.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

pub fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if database_url == MEMORY_DATABASE_URL || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
