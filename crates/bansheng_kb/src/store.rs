//! Fact Store - SQLite + FTS5 persistence for the knowledge base
//!
//! - One content table per fact kind, each shadowed by an external-content
//!   FTS5 index over its salient text fields
//! - `kb_meta` key/value table holding the content version tag
//! - Schema creation is idempotent and runs on every open
//!
//! The handle is opened once by the composition root and shared by
//! reference (`Arc<FactStore>`). All statements run on the blocking pool
//! behind a single mutex, so callers await but never run SQL concurrently.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::config::default_db_path;
use crate::error::{KbError, Result};
use crate::facts::KbFact;
use crate::types::KbStats;

/// Where the knowledge database lives
#[derive(Debug, Clone, PartialEq)]
pub enum StoreLocation {
    /// `$XDG_DATA_HOME/bansheng/knowledge.db`
    Default,
    /// Explicit file path
    Custom(PathBuf),
    /// Private in-memory database (lost on close)
    Memory,
}

impl StoreLocation {
    pub fn path(&self) -> Option<PathBuf> {
        match self {
            StoreLocation::Default => Some(default_db_path()),
            StoreLocation::Custom(path) => Some(path.clone()),
            StoreLocation::Memory => None,
        }
    }
}

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS kb_meta (
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL,
        updated_at TEXT DEFAULT (datetime('now'))
    );

    CREATE TABLE IF NOT EXISTS kb_food (
        id TEXT PRIMARY KEY,
        name TEXT NOT NULL,
        name_en TEXT,
        category TEXT NOT NULL,
        safety_level TEXT NOT NULL CHECK(safety_level IN ('SAFE', 'CAUTION', 'AVOID')),
        reason TEXT NOT NULL,
        dad_tip TEXT,
        trimester_notes TEXT,
        search_text TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS kb_symptom (
        id TEXT PRIMARY KEY,
        symptom_name TEXT NOT NULL,
        symptom_name_en TEXT,
        questions TEXT NOT NULL,
        decision_paths TEXT NOT NULL,
        dad_actions TEXT,
        search_text TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS kb_emotional (
        id TEXT PRIMARY KEY,
        scenario_name TEXT NOT NULL,
        scenario_name_en TEXT,
        scenario_trigger TEXT NOT NULL,
        wife_feeling TEXT,
        wrong_response TEXT,
        right_response TEXT NOT NULL,
        follow_up_actions TEXT,
        search_text TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS kb_emergency (
        id TEXT PRIMARY KEY,
        emergency_name TEXT NOT NULL,
        emergency_name_en TEXT,
        recognition_signs TEXT NOT NULL,
        immediate_actions TEXT NOT NULL,
        what_not_to_do TEXT,
        when_to_call_ambulance TEXT,
        hospital_bag_items TEXT,
        reassurance_script TEXT,
        search_text TEXT NOT NULL
    );

    -- FTS5 shadow indexes (rebuilt wholesale on every replace)
    CREATE VIRTUAL TABLE IF NOT EXISTS kb_food_fts USING fts5(
        name, name_en, category, reason, dad_tip,
        content='kb_food',
        content_rowid='rowid'
    );

    CREATE VIRTUAL TABLE IF NOT EXISTS kb_symptom_fts USING fts5(
        symptom_name, symptom_name_en,
        content='kb_symptom',
        content_rowid='rowid'
    );

    CREATE VIRTUAL TABLE IF NOT EXISTS kb_emotional_fts USING fts5(
        scenario_name, scenario_name_en, scenario_trigger, wife_feeling,
        content='kb_emotional',
        content_rowid='rowid'
    );

    CREATE VIRTUAL TABLE IF NOT EXISTS kb_emergency_fts USING fts5(
        emergency_name, emergency_name_en, recognition_signs,
        content='kb_emergency',
        content_rowid='rowid'
    );

    CREATE INDEX IF NOT EXISTS idx_food_safety ON kb_food(safety_level);
    CREATE INDEX IF NOT EXISTS idx_food_category ON kb_food(category);
"#;

/// Shared handle to the knowledge database
pub struct FactStore {
    conn: Arc<Mutex<Option<Connection>>>,
    location: StoreLocation,
}

impl FactStore {
    /// Open or create the store and provision its schema
    pub async fn open(location: StoreLocation) -> Result<Self> {
        let path = location.path();

        if let Some(parent) = path.as_ref().and_then(|p| p.parent()) {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        match &path {
            Some(p) => info!("Opening knowledge database at: {}", p.display()),
            None => info!("Opening in-memory knowledge database"),
        }

        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            let conn = match path {
                Some(p) => {
                    let conn = Connection::open(&p)?;
                    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                        row.get::<_, String>(0)
                    })?;
                    conn
                }
                None => Connection::open_in_memory()?,
            };
            ensure_fts5(&conn)?;
            conn.execute_batch(SCHEMA)?;
            Ok(conn)
        })
        .await??;

        Ok(Self {
            conn: Arc::new(Mutex::new(Some(conn))),
            location,
        })
    }

    /// Open a private in-memory store
    pub async fn open_in_memory() -> Result<Self> {
        Self::open(StoreLocation::Memory).await
    }

    pub fn location(&self) -> &StoreLocation {
        &self.location
    }

    /// Close the underlying connection; later calls fail with `StoreClosed`
    pub async fn close(&self) -> Result<()> {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut guard = conn.blocking_lock();
            if let Some(conn) = guard.take() {
                conn.close().map_err(|(_, e)| KbError::Sqlite(e))?;
                debug!("Knowledge database closed");
            }
            Ok(())
        })
        .await?
    }

    pub async fn is_open(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    /// Run a closure against the connection on the blocking pool
    pub async fn execute<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.blocking_lock();
            match guard.as_ref() {
                Some(conn) => f(conn),
                None => Err(KbError::StoreClosed),
            }
        })
        .await?
    }

    /// Stored content version tag, if any
    pub async fn get_version(&self) -> Result<Option<String>> {
        self.execute(get_version).await
    }

    pub async fn set_version(&self, tag: &str) -> Result<()> {
        let tag = tag.to_string();
        self.execute(move |conn| set_version(conn, &tag)).await
    }

    /// Atomically replace every fact of one kind and rebuild its index.
    ///
    /// Returns the number of rows held by the kind afterwards. On any row
    /// error the transaction is rolled back and the prior contents remain.
    pub async fn replace_facts<F: KbFact>(&self, facts: Vec<F>) -> Result<usize> {
        self.execute(move |conn| replace_facts(conn, &facts)).await
    }

    /// Row counts per kind
    pub async fn stats(&self) -> Result<KbStats> {
        self.execute(stats).await
    }
}

// =============================================================================
// Connection-level operations
// =============================================================================

/// The full-text index needs an SQLite built with FTS5
fn ensure_fts5(conn: &Connection) -> Result<()> {
    let enabled: bool = conn.query_row(
        "SELECT sqlite_compileoption_used('ENABLE_FTS5')",
        [],
        |row| row.get(0),
    )?;
    if enabled {
        Ok(())
    } else {
        Err(KbError::StoreUnavailable(
            "SQLite was built without FTS5".to_string(),
        ))
    }
}

pub fn get_version(conn: &Connection) -> Result<Option<String>> {
    let version = conn
        .query_row(
            "SELECT value FROM kb_meta WHERE key = 'version'",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()?;
    Ok(version)
}

pub fn set_version(conn: &Connection, tag: &str) -> Result<()> {
    conn.execute(
        r#"
        INSERT INTO kb_meta (key, value, updated_at) VALUES ('version', ?1, datetime('now'))
        ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')
        "#,
        params![tag],
    )?;
    Ok(())
}

pub fn replace_facts<F: KbFact>(conn: &Connection, facts: &[F]) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;

    tx.execute(&format!("DELETE FROM {}", F::TABLE), [])?;
    for fact in facts {
        fact.insert(&tx)?;
    }
    tx.execute(
        &format!("INSERT INTO {fts}({fts}) VALUES('rebuild')", fts = F::FTS_TABLE),
        [],
    )?;

    let count = count_rows(&tx, F::TABLE)?;
    tx.commit()?;

    debug!("Replaced {} facts: {} rows", F::KIND, count);
    Ok(count)
}

pub fn stats(conn: &Connection) -> Result<KbStats> {
    Ok(KbStats {
        foods: count_rows(conn, "kb_food")?,
        symptoms: count_rows(conn, "kb_symptom")?,
        emotional: count_rows(conn, "kb_emotional")?,
        emergencies: count_rows(conn, "kb_emergency")?,
    })
}

fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
        row.get(0)
    })?;
    Ok(count as usize)
}
