//! Search Service - ranked full-text lookup with substring fallback
//!
//! Per kind:
//! 1. normalize the query (trim + lowercase); empty means no results
//! 2. strip FTS5 operator characters; if nothing is left skip the index
//! 3. query the FTS5 index ordered by bm25 (best first)
//! 4. on an index error or zero hits, scan the raw columns with LIKE
//!
//! Nothing here returns an error. A missing or closed store, or a failing
//! statement, is logged and reported as an empty result.

use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::SearchSettings;
use crate::error::Result;
use crate::facts::{select_list, KbFact};
use crate::store::FactStore;
use crate::types::{EmergencyFact, EmotionalFact, FoodFact, KbSearchResult, SymptomFact};

/// Drop control characters, then trim and lowercase a raw query.
///
/// SQLite ends a bound text value at NUL, which would turn a LIKE pattern
/// into a bare `%`.
pub fn normalize_query(query: &str) -> String {
    let visible: String = query.chars().filter(|c| !c.is_control()).collect();
    visible.trim().to_lowercase()
}

/// Build an FTS5 phrase from a normalized query.
///
/// Returns `None` when nothing searchable remains.
pub fn fts_expression(normalized: &str) -> Option<String> {
    let cleaned: String = normalized
        .chars()
        .map(|c| match c {
            '"' | '\'' | '-' | '*' | '(' | ')' | '^' | '~' | ':' => ' ',
            other => other,
        })
        .collect();
    let collapsed = cleaned.split_whitespace().collect::<Vec<_>>().join(" ");

    if collapsed.is_empty() {
        None
    } else {
        Some(format!("\"{}\"", collapsed))
    }
}

/// `%text%` with LIKE metacharacters escaped (ESCAPE '\')
pub fn like_pattern(normalized: &str) -> String {
    let mut pattern = String::with_capacity(normalized.len() + 2);
    pattern.push('%');
    for c in normalized.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

// =============================================================================
// Connection-level queries
// =============================================================================

fn collect_rows<F: KbFact>(
    stmt: &mut rusqlite::Statement<'_>,
    params: impl rusqlite::Params,
) -> rusqlite::Result<Vec<F>> {
    stmt.query_map(params, |row| F::from_row(row))?.collect()
}

fn fts_search<F: KbFact>(conn: &Connection, expr: &str, limit: usize) -> rusqlite::Result<Vec<F>> {
    let sql = format!(
        "SELECT {cols} FROM {table} t JOIN {fts} ON t.rowid = {fts}.rowid \
         WHERE {fts} MATCH ?1 ORDER BY bm25({fts}) LIMIT ?2",
        cols = select_list::<F>("t"),
        table = F::TABLE,
        fts = F::FTS_TABLE,
    );
    let mut stmt = conn.prepare(&sql)?;
    collect_rows(&mut stmt, params![expr, limit as i64])
}

fn like_search<F: KbFact>(conn: &Connection, normalized: &str, limit: usize) -> rusqlite::Result<Vec<F>> {
    let filter = F::FALLBACK_COLUMNS
        .iter()
        .map(|c| format!("t.{} LIKE ?1 ESCAPE '\\'", c))
        .collect::<Vec<_>>()
        .join(" OR ");
    let sql = format!(
        "SELECT {cols} FROM {table} t WHERE {filter} LIMIT ?2",
        cols = select_list::<F>("t"),
        table = F::TABLE,
    );
    let mut stmt = conn.prepare(&sql)?;
    collect_rows(&mut stmt, params![like_pattern(normalized), limit as i64])
}

/// Indexed search with substring fallback over one kind
pub fn search_facts<F: KbFact>(conn: &Connection, normalized: &str, limit: usize) -> Result<Vec<F>> {
    if normalized.is_empty() || limit == 0 {
        return Ok(Vec::new());
    }

    if let Some(expr) = fts_expression(normalized) {
        match fts_search::<F>(conn, &expr, limit) {
            Ok(rows) if !rows.is_empty() => return Ok(rows),
            Ok(_) => debug!("No {} index hits for {:?}, using substring scan", F::KIND, expr),
            Err(e) => debug!("{} index query failed ({}), using substring scan", F::KIND, e),
        }
    }

    Ok(like_search::<F>(conn, normalized, limit)?)
}

fn query_one<F: KbFact>(conn: &Connection, filter: &str, value: &str) -> Result<Option<F>> {
    let sql = format!(
        "SELECT {cols} FROM {table} t WHERE {filter} LIMIT 1",
        cols = select_list::<F>("t"),
        table = F::TABLE,
    );
    Ok(conn
        .query_row(&sql, params![value], |row| F::from_row(row))
        .optional()?)
}

// =============================================================================
// Service
// =============================================================================

/// Query surface over a shared store
#[derive(Clone)]
pub struct SearchService {
    store: Option<Arc<FactStore>>,
    limits: SearchSettings,
}

impl SearchService {
    pub fn new(store: Arc<FactStore>) -> Self {
        Self {
            store: Some(store),
            limits: SearchSettings::default(),
        }
    }

    /// A service with no store; every query returns nothing
    pub fn unavailable() -> Self {
        Self {
            store: None,
            limits: SearchSettings::default(),
        }
    }

    pub fn with_limits(mut self, limits: SearchSettings) -> Self {
        self.limits = limits;
        self
    }

    pub fn limits(&self) -> &SearchSettings {
        &self.limits
    }

    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }

    async fn run<R, F>(&self, what: &str, default: R, f: F) -> R
    where
        F: FnOnce(&Connection) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let Some(store) = &self.store else {
            return default;
        };
        match store.execute(f).await {
            Ok(value) => value,
            Err(e) => {
                warn!("Knowledge {} failed: {}", what, e);
                default
            }
        }
    }

    /// Ranked search over one kind
    pub async fn search<F: KbFact>(&self, query: &str, limit: usize) -> KbSearchResult<F> {
        let normalized = normalize_query(query);
        if normalized.is_empty() {
            return KbSearchResult::empty(normalized);
        }

        let q = normalized.clone();
        let items = self
            .run("search", Vec::new(), move |conn| {
                search_facts::<F>(conn, &q, limit)
            })
            .await;
        KbSearchResult::from_items(items, normalized)
    }

    pub async fn search_food(&self, query: &str, limit: usize) -> KbSearchResult<FoodFact> {
        self.search(query, limit).await
    }

    pub async fn search_symptom(&self, query: &str, limit: usize) -> KbSearchResult<SymptomFact> {
        self.search(query, limit).await
    }

    pub async fn search_emotional(&self, query: &str, limit: usize) -> KbSearchResult<EmotionalFact> {
        self.search(query, limit).await
    }

    /// Best emergency procedure for the query, if any
    pub async fn search_emergency(&self, query: &str) -> Option<EmergencyFact> {
        self.search::<EmergencyFact>(query, 1).await.items.into_iter().next()
    }

    // -------------------------------------------------------------------------
    // Point lookups (no ranking)
    // -------------------------------------------------------------------------

    /// Exact match on the native or English name
    pub async fn food_by_name(&self, name: &str) -> Option<FoodFact> {
        let name = name.to_string();
        self.run("lookup", None, move |conn| {
            query_one(conn, "t.name = ?1 OR t.name_en = ?1", &name)
        })
        .await
    }

    /// Foods in a category, ordered by safety level then name
    pub async fn foods_by_category(&self, category: &str) -> Vec<FoodFact> {
        let category = category.to_string();
        self.run("lookup", Vec::new(), move |conn| {
            let sql = format!(
                "SELECT {} FROM kb_food t WHERE t.category = ?1 ORDER BY t.safety_level, t.name",
                select_list::<FoodFact>("t")
            );
            let mut stmt = conn.prepare(&sql)?;
            Ok(collect_rows::<FoodFact>(&mut stmt, params![category])?)
        })
        .await
    }

    pub async fn symptom_by_id(&self, id: &str) -> Option<SymptomFact> {
        let id = id.to_string();
        self.run("lookup", None, move |conn| query_one(conn, "t.id = ?1", &id))
            .await
    }

    pub async fn emotional_by_id(&self, id: &str) -> Option<EmotionalFact> {
        let id = id.to_string();
        self.run("lookup", None, move |conn| query_one(conn, "t.id = ?1", &id))
            .await
    }

    /// Every emergency procedure, ordered by name
    pub async fn all_emergencies(&self) -> Vec<EmergencyFact> {
        self.run("lookup", Vec::new(), |conn| {
            let sql = format!(
                "SELECT {} FROM kb_emergency t ORDER BY t.emergency_name",
                select_list::<EmergencyFact>("t")
            );
            let mut stmt = conn.prepare(&sql)?;
            Ok(collect_rows::<EmergencyFact>(&mut stmt, params![])?)
        })
        .await
    }
}
