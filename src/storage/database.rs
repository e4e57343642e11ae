//! Draft Store
//!
//! SQLite-backed persistence for parsed RFQ drafts, with connection
//! pooling via r2d2 and WAL mode. The extraction pipeline never depends on
//! this layer succeeding — it is a downstream collaborator consumed through
//! the narrow [`DraftStore`] trait.

use std::path::Path;
use std::sync::Arc;

use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{Connection, params};
use uuid::Uuid;

use crate::types::{ParsedRfq, Result, RfqDraft, RfqError};

/// Shared store handle for async contexts.
pub type SharedStore = Arc<Database>;

const SCHEMA: &str = include_str!("schema.sql");

/// Current schema version for migration tracking
const SCHEMA_VERSION: u32 = 1;

/// Narrow persistence interface the application composes over.
pub trait DraftStore: Send + Sync {
    /// Persist a completed parse with its source text and file metadata.
    fn save_draft(&self, draft: &RfqDraft) -> Result<()>;

    /// Fetch a draft by id.
    fn get_draft(&self, id: Uuid) -> Result<Option<RfqDraft>>;

    /// List the most recent drafts, newest first.
    fn list_drafts(&self, limit: usize) -> Result<Vec<RfqDraft>>;

    /// Mark a draft as routed to a quote template.
    fn mark_processed(&self, id: Uuid) -> Result<()>;
}

/// Connection pool configuration
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool
    pub max_size: u32,
    /// Timeout for acquiring a connection (seconds)
    pub connection_timeout_secs: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_size: 8,
            connection_timeout_secs: 30,
        }
    }
}

/// Thread-safe database with connection pooling.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open database with connection pooling at the specified path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open_with_config(path, PoolConfig::default())
    }

    /// Open database with custom pool configuration.
    pub fn open_with_config<P: AsRef<Path>>(path: P, config: PoolConfig) -> Result<Self> {
        let manager =
            SqliteConnectionManager::file(path.as_ref()).with_init(Self::configure_connection);

        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(std::time::Duration::from_secs(
                config.connection_timeout_secs,
            ))
            .build(manager)
            .map_err(|e| RfqError::Storage(format!("failed to create connection pool: {}", e)))?;

        let db = Self { pool };
        db.initialize()?;
        Ok(db)
    }

    /// Open an in-memory database for testing or temporary use.
    pub fn open_in_memory() -> Result<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch("PRAGMA foreign_keys = ON;")?;
            Ok(())
        });

        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(|e| RfqError::Storage(format!("failed to create in-memory pool: {}", e)))?;

        let db = Self { pool };
        db.initialize()?;
        Ok(db)
    }

    /// Configure a new connection with production-ready settings.
    fn configure_connection(conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            "#,
        )?;
        Ok(())
    }

    /// Get a connection from the pool.
    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>> {
        self.pool
            .get()
            .map_err(|e| RfqError::Storage(format!("failed to acquire database connection: {}", e)))
    }

    /// Initialize database schema.
    fn initialize(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    fn row_to_draft(row: &rusqlite::Row<'_>) -> rusqlite::Result<RfqDraft> {
        let id: String = row.get("id")?;
        let parsed_json: String = row.get("parsed_json")?;

        let id = Uuid::parse_str(&id).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                0,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;
        let parsed: ParsedRfq = serde_json::from_str(&parsed_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;

        Ok(RfqDraft {
            id,
            parsed,
            raw_text: row.get("raw_text")?,
            original_filename: row.get("original_filename")?,
            file_type: row.get("file_type")?,
            is_processed: row.get("is_processed")?,
            created_at: row.get("created_at")?,
        })
    }
}

impl DraftStore for Database {
    fn save_draft(&self, draft: &RfqDraft) -> Result<()> {
        let parsed_json = serde_json::to_string(&draft.parsed)
            .map_err(|e| RfqError::Storage(format!("failed to serialize draft: {}", e)))?;

        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT OR REPLACE INTO rfq_drafts
                (id, raw_text, parsed_json, material, quantity, industry,
                 model_used, parsing_version, original_filename, file_type,
                 is_processed, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            "#,
            params![
                draft.id.to_string(),
                draft.raw_text,
                parsed_json,
                draft.parsed.material,
                draft.parsed.quantity,
                draft.parsed.industry.as_str(),
                draft.parsed.model_used,
                draft.parsed.parsing_version,
                draft.original_filename,
                draft.file_type,
                draft.is_processed,
                draft.created_at,
            ],
        )?;

        tracing::info!(draft_id = %draft.id, industry = %draft.parsed.industry, "Saved RFQ draft");
        Ok(())
    }

    fn get_draft(&self, id: Uuid) -> Result<Option<RfqDraft>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT * FROM rfq_drafts WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id.to_string()], Self::row_to_draft)?;

        match rows.next() {
            Some(row) => Ok(Some(row?)),
            None => Ok(None),
        }
    }

    fn list_drafts(&self, limit: usize) -> Result<Vec<RfqDraft>> {
        let conn = self.conn()?;
        let mut stmt =
            conn.prepare("SELECT * FROM rfq_drafts ORDER BY created_at DESC LIMIT ?1")?;
        let rows = stmt.query_map(params![limit as i64], Self::row_to_draft)?;

        let mut drafts = Vec::new();
        for row in rows {
            drafts.push(row?);
        }
        Ok(drafts)
    }

    fn mark_processed(&self, id: Uuid) -> Result<()> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE rfq_drafts SET is_processed = 1 WHERE id = ?1",
            params![id.to_string()],
        )?;

        if updated == 0 {
            return Err(RfqError::Storage(format!("draft {} not found", id)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Complexity, Dimensions, Industry};

    fn sample_parsed() -> ParsedRfq {
        ParsedRfq {
            material: "304 Stainless Steel".to_string(),
            material_confidence: 0.97,
            quantity: 25.0,
            dimensions: Dimensions::new(500.0, 300.0, 200.0),
            complexity: Complexity::Medium,
            deadline: "2024-01-31".to_string(),
            industry: Industry::SheetMetal,
            industry_confidence: 0.89,
            finish: Some("brushed".to_string()),
            tolerance: Some("±0.1mm".to_string()),
            model_used: "llama-3.3-70b-versatile".to_string(),
            parsing_version: "1.2.0".to_string(),
            timestamp: "2024-01-01T00:00:00Z".to_string(),
            is_reviewed: false,
        }
    }

    #[test]
    fn test_save_and_get_round_trip() {
        let db = Database::open_in_memory().unwrap();
        let draft = RfqDraft::new(
            sample_parsed(),
            "RFQ for 25 steel enclosures",
            Some("rfq.pdf".to_string()),
            Some("pdf".to_string()),
        );

        db.save_draft(&draft).unwrap();
        let loaded = db.get_draft(draft.id).unwrap().unwrap();
        assert_eq!(loaded, draft);
    }

    #[test]
    fn test_get_missing_draft_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_draft(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn test_list_drafts_respects_limit() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..5 {
            let mut draft = RfqDraft::new(sample_parsed(), format!("rfq {}", i), None, None);
            draft.created_at = format!("2024-01-0{}T00:00:00Z", i + 1);
            db.save_draft(&draft).unwrap();
        }

        let drafts = db.list_drafts(3).unwrap();
        assert_eq!(drafts.len(), 3);
        // Newest first
        assert_eq!(drafts[0].raw_text, "rfq 4");
    }

    #[test]
    fn test_mark_processed() {
        let db = Database::open_in_memory().unwrap();
        let draft = RfqDraft::new(sample_parsed(), "text", None, None);
        db.save_draft(&draft).unwrap();

        db.mark_processed(draft.id).unwrap();
        assert!(db.get_draft(draft.id).unwrap().unwrap().is_processed);

        assert!(db.mark_processed(Uuid::new_v4()).is_err());
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("drafts.db");
        let db = Database::open(&path).unwrap();
        let draft = RfqDraft::new(sample_parsed(), "text", None, None);
        db.save_draft(&draft).unwrap();
        drop(db);

        let reopened = Database::open(&path).unwrap();
        assert!(reopened.get_draft(draft.id).unwrap().is_some());
    }
}
