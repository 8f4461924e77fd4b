//! SQLite index store / SQLite 索引存储
//!
//! Storage layout:
//! - fts_entries: one row per (message id, token), time padded, session normalized
//! - fts_meta: last update time and similar bookkeeping
//!
//! Features:
//! - WAL mode + busy timeout (one database file per identity)
//! - Batched transactional writes with retry while the database is locked
//! - Clauses compiled to SQL, range bounds compared as padded strings

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Row, Sqlite};
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::query::{Clause, Field, FieldMatch, Query, RangeClause};
use super::store::{IndexHit, IndexStats, IndexStore};
use crate::error::StoreError;
use crate::models::{Direction, TokenEntry};

const MAX_RETRIES: u32 = 3;

/// SQLite-backed index store / SQLite 索引存储
pub struct SqliteIndexStore {
    name: String,
    path: PathBuf,
    db: Pool<Sqlite>,
}

impl SqliteIndexStore {
    /// Open (creating if absent) the store at `location` / 打开或创建索引库
    pub async fn open(location: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = location.as_ref().to_path_buf();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());

        // 确保目录存在
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).ok();
        }

        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let db = SqlitePoolOptions::new()
            .max_connections(2)
            .connect_with(options)
            .await?;

        let store = Self { name, path, db };
        store.init().await?;

        tracing::info!("Full-text index store opened: {:?} (WAL mode)", store.path);
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create tables when missing, keeping existing data / 初始化表结构
    async fn init(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS fts_entries (
                id TEXT NOT NULL,
                token TEXT NOT NULL,
                time TEXT NOT NULL,
                session_id TEXT NOT NULL,
                PRIMARY KEY(id, token)
            ) WITHOUT ROWID
        "#,
        )
        .execute(&self.db)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_fts_token ON fts_entries(token)")
            .execute(&self.db)
            .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_fts_session ON fts_entries(session_id)")
            .execute(&self.db)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS fts_meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )
        "#,
        )
        .execute(&self.db)
        .await?;

        Ok(())
    }

    fn ensure_open(&self) -> Result<(), StoreError> {
        if self.db.is_closed() {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    async fn set_last_updated(&self) -> Result<(), StoreError> {
        let now = chrono::Utc::now().timestamp();
        sqlx::query("INSERT OR REPLACE INTO fts_meta (key, value) VALUES ('last_updated', ?)")
            .bind(now.to_string())
            .execute(&self.db)
            .await?;
        Ok(())
    }

    async fn last_updated(&self) -> Option<i64> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT value FROM fts_meta WHERE key = 'last_updated'")
                .fetch_optional(&self.db)
                .await
                .ok()
                .flatten();
        row.and_then(|(v,)| v.parse::<i64>().ok())
    }

    async fn do_put(&self, entries: &[TokenEntry]) -> Result<(), sqlx::Error> {
        let mut tx = self.db.begin().await?;
        for entry in entries {
            sqlx::query(
                "INSERT OR REPLACE INTO fts_entries (id, token, time, session_id) VALUES (?, ?, ?, ?)",
            )
            .bind(&entry.id)
            .bind(&entry.token)
            .bind(&entry.time)
            .bind(&entry.session_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await
    }

    async fn do_delete(&self, ids: &[String]) -> Result<(), sqlx::Error> {
        let mut tx = self.db.begin().await?;
        for id in ids {
            sqlx::query("DELETE FROM fts_entries WHERE id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await
    }
}

fn is_locked(err: &sqlx::Error) -> bool {
    let msg = err.to_string();
    msg.contains("database is locked") || msg.contains("SQLITE_BUSY")
}

/// Retries while SQLite reports the database as locked / 数据库锁定时重试
macro_rules! with_retry {
    ($op:expr) => {{
        let mut attempt = 0;
        loop {
            match $op.await {
                Ok(v) => break Ok(v),
                Err(e) if is_locked(&e) && attempt + 1 < MAX_RETRIES => {
                    attempt += 1;
                    let delay = 100 * attempt as u64;
                    tracing::debug!(
                        "Index store locked, retrying in {}ms (attempt {}/{})",
                        delay,
                        attempt,
                        MAX_RETRIES
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Err(e) => break Err(StoreError::from(e)),
            }
        }
    }};
}

/// SQL fragment matching one field value against the document `d`
fn match_sql(m: &FieldMatch, binds: &mut Vec<String>) -> String {
    binds.push(m.value.clone());
    match m.field {
        Field::Token => {
            "EXISTS (SELECT 1 FROM fts_entries t WHERE t.id = d.id AND t.token = ?)".to_string()
        }
        Field::SessionId => "d.session_id = ?".to_string(),
        Field::Time => "d.time = ?".to_string(),
    }
}

fn range_sql(range: &RangeClause, binds: &mut Vec<String>) -> String {
    let column = match range.field {
        Field::Token => "t.token",
        Field::SessionId => "d.session_id",
        Field::Time => "d.time",
    };
    let mut parts = Vec::new();
    if let Some(low) = &range.gte {
        parts.push(format!("{} >= ?", column));
        binds.push(low.clone());
    }
    if let Some(high) = &range.lte {
        parts.push(format!("{} <= ?", column));
        binds.push(high.clone());
    }
    let cond = if parts.is_empty() { "1".to_string() } else { parts.join(" AND ") };
    match range.field {
        Field::Token => format!(
            "EXISTS (SELECT 1 FROM fts_entries t WHERE t.id = d.id AND {})",
            cond
        ),
        _ => format!("({})", cond),
    }
}

fn clause_sql(clause: &Clause, binds: &mut Vec<String>) -> String {
    match clause {
        Clause::Match(m) => match_sql(m, binds),
        Clause::Any(ms) if ms.is_empty() => "0".to_string(),
        Clause::Any(ms) => {
            let parts: Vec<String> = ms.iter().map(|m| match_sql(m, binds)).collect();
            format!("({})", parts.join(" OR "))
        }
        Clause::Range(range) => range_sql(range, binds),
    }
}

/// Compile a query to SQL plus its string binds / 生成 SQL
fn build_sql(query: &Query) -> (String, Vec<String>) {
    let mut binds = Vec::new();
    let conds: Vec<String> = query.search.iter().map(|c| clause_sql(c, &mut binds)).collect();
    let filter = if conds.is_empty() { "1".to_string() } else { conds.join(" AND ") };

    let mut sql = format!(
        "SELECT d.id, d.time, d.session_id FROM fts_entries d WHERE {} GROUP BY d.id",
        filter
    );
    if let Some(sort) = &query.options.sort {
        let column = match sort.field {
            Field::Time => "CAST(d.time AS INTEGER)",
            Field::Token => "d.token",
            Field::SessionId => "d.session_id",
        };
        let dir = match sort.direction {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        };
        sql.push_str(&format!(" ORDER BY {} {}", column, dir));
    }
    sql.push_str(" LIMIT ? OFFSET ?");
    (sql, binds)
}

#[async_trait]
impl IndexStore for SqliteIndexStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, entries: &[TokenEntry]) -> Result<(), StoreError> {
        self.ensure_open()?;
        if entries.is_empty() {
            return Ok(());
        }
        with_retry!(self.do_put(entries))?;
        self.set_last_updated().await
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        self.ensure_open()?;
        if ids.is_empty() {
            return Ok(());
        }
        with_retry!(self.do_delete(ids))?;
        self.set_last_updated().await
    }

    async fn query(&self, query: &Query) -> Result<Vec<IndexHit>, StoreError> {
        self.ensure_open()?;
        let (sql, binds) = build_sql(query);

        let mut q = sqlx::query(&sql);
        for value in &binds {
            q = q.bind(value);
        }
        let page = query.options.page;
        let rows = q
            .bind(page.size as i64)
            .bind(page.offset() as i64)
            .fetch_all(&self.db)
            .await?;

        Ok(rows
            .iter()
            .map(|row| IndexHit {
                id: row.get("id"),
                time: row.get("time"),
                session_id: row.get("session_id"),
            })
            .collect())
    }

    async fn flush(&self) -> Result<(), StoreError> {
        self.ensure_open()?;
        sqlx::query("DELETE FROM fts_entries").execute(&self.db).await?;
        // VACUUM压缩
        sqlx::query("VACUUM").execute(&self.db).await.ok();
        self.set_last_updated().await
    }

    async fn stats(&self) -> Result<IndexStats, StoreError> {
        self.ensure_open()?;
        let row = sqlx::query(
            "SELECT COUNT(*) as total, COUNT(DISTINCT id) as messages FROM fts_entries",
        )
        .fetch_one(&self.db)
        .await?;
        let total: i64 = row.get("total");
        let messages: i64 = row.get("messages");
        Ok(IndexStats {
            entry_count: total as u64,
            message_count: messages as u64,
            last_updated: self.last_updated().await,
        })
    }

    async fn close(&self) -> Result<(), StoreError> {
        self.db.close().await;
        tracing::info!("Full-text index store closed: {:?}", self.path);
        Ok(())
    }
}
