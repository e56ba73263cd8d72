//! SQLite-backed catalog store.
//!
//! Persists the model catalog (workspaces, datasets, tables, columns,
//! measures, relationships), curated business rules, the query journal, and
//! the extracted-dependency cache. The database lives at
//! `~/.atlas/catalog.db` by default.
//!
//! # Design
//!
//! - Natural-key upserts (`INSERT ... ON CONFLICT ... DO UPDATE`), one row
//!   per statement, so each row upsert is its own transaction
//! - Dataset-owned children declare `ON DELETE CASCADE`; deleting a dataset
//!   removes its tables, columns, measures, relationships, rules and history
//! - Versioned - auto-clears on schema version mismatch
//! - List-valued columns (measures used, rule applicability) are stored as
//!   JSON text

mod hash;
pub use hash::expression_hash;

use std::path::{Path, PathBuf};

use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::classify::{BusinessArea, MeasureType};
use crate::expr::Dependencies;
use crate::model::{
    BusinessRule, Cardinality, Column, CrossFilterDirection, Dataset, Measure, QueryFeedback,
    QueryHistoryEntry, Relationship, Table, TableType, Workspace,
};

/// Current store schema version. Bump this when the schema changes.
const SCHEMA_VERSION: i32 = 1;

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to determine store directory")]
    NoStoreDir,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Current Unix time in seconds.
pub fn now_epoch() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

/// Filter for query-history reads. Unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub dataset_id: Option<String>,
    pub user_identifier: Option<String>,
    pub session_id: Option<String>,
    /// Unix-second range bounds, inclusive.
    pub since: Option<i64>,
    pub until: Option<i64>,
    pub success_only: bool,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// Catalog-wide entity counts and latest sync stamps.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStatus {
    pub workspaces: usize,
    pub datasets: usize,
    pub tables: usize,
    pub measures: usize,
    pub relationships: usize,
    pub business_rules: usize,
    pub query_history: usize,
    pub last_workspace_sync: Option<i64>,
    pub last_dataset_sync: Option<i64>,
}

/// SQLite-backed catalog store.
pub struct CatalogStore {
    conn: Connection,
}

impl CatalogStore {
    /// Open or create the store database at the given path.
    ///
    /// If the schema version doesn't match, the store is cleared and
    /// rebuilt.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Open an in-memory store (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Default store path: `~/.atlas/catalog.db`.
    pub fn default_path() -> StoreResult<PathBuf> {
        let base = dirs::home_dir().ok_or(StoreError::NoStoreDir)?;
        Ok(base.join(".atlas").join("catalog.db"))
    }

    fn init(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            "
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS meta (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS workspaces (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                last_synced INTEGER
            );

            CREATE TABLE IF NOT EXISTS datasets (
                id TEXT PRIMARY KEY,
                workspace_id TEXT NOT NULL REFERENCES workspaces(id),
                name TEXT NOT NULL,
                description TEXT,
                business_area TEXT,
                last_synced INTEGER
            );

            CREATE TABLE IF NOT EXISTS tables (
                id INTEGER PRIMARY KEY,
                dataset_id TEXT NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                table_type TEXT NOT NULL,
                description TEXT,
                is_hidden INTEGER NOT NULL DEFAULT 0,
                UNIQUE (dataset_id, name)
            );

            CREATE TABLE IF NOT EXISTS columns (
                id INTEGER PRIMARY KEY,
                table_id INTEGER NOT NULL REFERENCES tables(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                data_type TEXT,
                is_hidden INTEGER NOT NULL DEFAULT 0,
                UNIQUE (table_id, name)
            );

            CREATE TABLE IF NOT EXISTS measures (
                id INTEGER PRIMARY KEY,
                dataset_id TEXT NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                table_name TEXT,
                expression TEXT,
                measure_type TEXT NOT NULL,
                business_area TEXT NOT NULL,
                folder TEXT,
                description TEXT,
                is_hidden INTEGER NOT NULL DEFAULT 0,
                UNIQUE (dataset_id, name)
            );

            CREATE TABLE IF NOT EXISTS relationships (
                id INTEGER PRIMARY KEY,
                dataset_id TEXT NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
                from_table TEXT NOT NULL,
                from_column TEXT NOT NULL,
                to_table TEXT NOT NULL,
                to_column TEXT NOT NULL,
                cardinality TEXT NOT NULL,
                cross_filter TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                UNIQUE (dataset_id, from_table, from_column, to_table, to_column)
            );

            CREATE TABLE IF NOT EXISTS business_rules (
                id INTEGER PRIMARY KEY,
                dataset_id TEXT REFERENCES datasets(id) ON DELETE CASCADE,
                name TEXT NOT NULL,
                category TEXT,
                business_area TEXT,
                description TEXT NOT NULL,
                rule_logic TEXT,
                calculation TEXT,
                applies_to_measures TEXT NOT NULL DEFAULT '[]',
                applies_to_tables TEXT NOT NULL DEFAULT '[]',
                is_active INTEGER NOT NULL DEFAULT 1,
                version TEXT NOT NULL DEFAULT '1.0'
            );

            CREATE TABLE IF NOT EXISTS query_history (
                id INTEGER PRIMARY KEY,
                dataset_id TEXT NOT NULL REFERENCES datasets(id) ON DELETE CASCADE,
                session_id TEXT,
                user_identifier TEXT,
                question TEXT NOT NULL,
                generated_query TEXT,
                query_type TEXT NOT NULL DEFAULT 'analysis',
                execution_time_ms INTEGER,
                row_count INTEGER,
                success INTEGER NOT NULL DEFAULT 1,
                error_message TEXT,
                result_summary TEXT,
                insights TEXT,
                recommendations TEXT,
                confidence_score REAL,
                measures_used TEXT NOT NULL DEFAULT '[]',
                tables_used TEXT NOT NULL DEFAULT '[]',
                user_rating INTEGER,
                user_feedback TEXT,
                was_helpful INTEGER,
                led_to_query_id INTEGER REFERENCES query_history(id),
                created_at INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_history_dataset_created
                ON query_history (dataset_id, created_at);

            CREATE TABLE IF NOT EXISTS measure_deps (
                dataset_id TEXT NOT NULL,
                measure_name TEXT NOT NULL,
                expression_hash TEXT NOT NULL,
                measure_refs TEXT NOT NULL,
                column_refs TEXT NOT NULL,
                PRIMARY KEY (dataset_id, measure_name)
            );
            ",
        )?;

        let stored_version: Option<i32> = self
            .conn
            .query_row("SELECT value FROM meta WHERE key = 'version'", [], |row| {
                let s: String = row.get(0)?;
                Ok(s.parse().unwrap_or(0))
            })
            .optional()?;

        match stored_version {
            Some(v) if v == SCHEMA_VERSION => {}
            Some(_) => {
                self.clear_all()?;
                self.set_version()?;
            }
            None => {
                self.set_version()?;
            }
        }

        Ok(())
    }

    fn set_version(&self) -> StoreResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO meta (key, value) VALUES ('version', ?)",
            params![SCHEMA_VERSION.to_string()],
        )?;
        Ok(())
    }

    /// Drop all catalog content (but keep metadata).
    pub fn clear_all(&self) -> StoreResult<()> {
        self.conn.execute_batch(
            "DELETE FROM measure_deps;
             DELETE FROM query_history;
             DELETE FROM business_rules;
             DELETE FROM relationships;
             DELETE FROM columns;
             DELETE FROM tables;
             DELETE FROM measures;
             DELETE FROM datasets;
             DELETE FROM workspaces;",
        )?;
        Ok(())
    }

    // ===== Workspaces =====

    /// Insert or update a workspace by its external id. `last_synced` is not
    /// touched here; use [`CatalogStore::touch_workspace_sync`].
    pub fn upsert_workspace(&self, w: &Workspace) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO workspaces (id, name, description) VALUES (?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name,
                                           description = excluded.description",
            params![w.id, w.name, w.description],
        )?;
        Ok(())
    }

    pub fn get_workspace(&self, id: &str) -> StoreResult<Option<Workspace>> {
        self.conn
            .query_row(
                "SELECT id, name, description, last_synced FROM workspaces WHERE id = ?",
                params![id],
                |row| {
                    Ok(Workspace {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        description: row.get(2)?,
                        last_synced: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn touch_workspace_sync(&self, id: &str, ts: i64) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE workspaces SET last_synced = ? WHERE id = ?",
            params![ts, id],
        )?;
        Ok(())
    }

    // ===== Datasets =====

    pub fn upsert_dataset(&self, d: &Dataset) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO datasets (id, workspace_id, name, description, business_area)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET workspace_id = excluded.workspace_id,
                                           name = excluded.name,
                                           description = COALESCE(excluded.description, description),
                                           business_area = COALESCE(excluded.business_area, business_area)",
            params![d.id, d.workspace_id, d.name, d.description, d.business_area],
        )?;
        Ok(())
    }

    pub fn get_dataset(&self, id: &str) -> StoreResult<Option<Dataset>> {
        self.conn
            .query_row(
                "SELECT id, workspace_id, name, description, business_area, last_synced
                 FROM datasets WHERE id = ?",
                params![id],
                |row| {
                    Ok(Dataset {
                        id: row.get(0)?,
                        workspace_id: row.get(1)?,
                        name: row.get(2)?,
                        description: row.get(3)?,
                        business_area: row.get(4)?,
                        last_synced: row.get(5)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_datasets(&self, workspace_id: Option<&str>) -> StoreResult<Vec<Dataset>> {
        let mut sql = String::from(
            "SELECT id, workspace_id, name, description, business_area, last_synced FROM datasets",
        );
        let mut binds: Vec<String> = Vec::new();
        if let Some(ws) = workspace_id {
            sql.push_str(" WHERE workspace_id = ?");
            binds.push(ws.to_string());
        }
        sql.push_str(" ORDER BY name");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(binds.iter()), |row| {
            Ok(Dataset {
                id: row.get(0)?,
                workspace_id: row.get(1)?,
                name: row.get(2)?,
                description: row.get(3)?,
                business_area: row.get(4)?,
                last_synced: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn touch_dataset_sync(&self, id: &str, ts: i64) -> StoreResult<()> {
        self.conn.execute(
            "UPDATE datasets SET last_synced = ? WHERE id = ?",
            params![ts, id],
        )?;
        Ok(())
    }

    /// Delete a dataset and, through cascade, everything it owns.
    pub fn delete_dataset(&self, id: &str) -> StoreResult<bool> {
        self.conn
            .execute("DELETE FROM measure_deps WHERE dataset_id = ?", params![id])?;
        let rows = self
            .conn
            .execute("DELETE FROM datasets WHERE id = ?", params![id])?;
        Ok(rows > 0)
    }

    // ===== Tables and columns =====

    /// Upsert a table by (dataset, name). Returns the stored row id; the id
    /// field on the input is ignored.
    pub fn upsert_table(&self, t: &Table) -> StoreResult<i64> {
        self.conn
            .query_row(
                "INSERT INTO tables (dataset_id, name, table_type, description, is_hidden)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT(dataset_id, name) DO UPDATE SET
                     table_type = excluded.table_type,
                     description = excluded.description,
                     is_hidden = excluded.is_hidden
                 RETURNING id",
                params![
                    t.dataset_id,
                    t.name,
                    t.table_type.as_str(),
                    t.description,
                    t.is_hidden
                ],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn tables_for_dataset(&self, dataset_id: &str) -> StoreResult<Vec<Table>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, dataset_id, name, table_type, description, is_hidden
             FROM tables WHERE dataset_id = ? ORDER BY name",
        )?;
        let rows = stmt.query_map(params![dataset_id], |row| {
            let type_label: String = row.get(3)?;
            Ok(Table {
                id: row.get(0)?,
                dataset_id: row.get(1)?,
                name: row.get(2)?,
                table_type: TableType::parse(&type_label),
                description: row.get(4)?,
                is_hidden: row.get(5)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Upsert a column by (table, name). Returns the stored row id.
    pub fn upsert_column(&self, c: &Column) -> StoreResult<i64> {
        self.conn
            .query_row(
                "INSERT INTO columns (table_id, name, data_type, is_hidden)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(table_id, name) DO UPDATE SET
                     data_type = excluded.data_type,
                     is_hidden = excluded.is_hidden
                 RETURNING id",
                params![c.table_id, c.name, c.data_type, c.is_hidden],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn columns_for_table(&self, table_id: i64) -> StoreResult<Vec<Column>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, table_id, name, data_type, is_hidden
             FROM columns WHERE table_id = ? ORDER BY name",
        )?;
        let rows = stmt.query_map(params![table_id], |row| {
            Ok(Column {
                id: row.get(0)?,
                table_id: row.get(1)?,
                name: row.get(2)?,
                data_type: row.get(3)?,
                is_hidden: row.get(4)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ===== Measures =====

    /// Upsert a measure by (dataset, name). Returns the stored row id.
    pub fn upsert_measure(&self, m: &Measure) -> StoreResult<i64> {
        self.conn
            .query_row(
                "INSERT INTO measures (dataset_id, name, table_name, expression, measure_type,
                                       business_area, folder, description, is_hidden)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(dataset_id, name) DO UPDATE SET
                     table_name = excluded.table_name,
                     expression = excluded.expression,
                     measure_type = excluded.measure_type,
                     business_area = excluded.business_area,
                     folder = excluded.folder,
                     description = excluded.description,
                     is_hidden = excluded.is_hidden
                 RETURNING id",
                params![
                    m.dataset_id,
                    m.name,
                    m.table_name,
                    m.expression,
                    m.measure_type.as_str(),
                    m.business_area.as_str(),
                    m.folder,
                    m.description,
                    m.is_hidden
                ],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn measures_for_dataset(&self, dataset_id: &str) -> StoreResult<Vec<Measure>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, dataset_id, name, table_name, expression, measure_type, business_area,
                    folder, description, is_hidden
             FROM measures WHERE dataset_id = ? ORDER BY name",
        )?;
        let rows = stmt.query_map(params![dataset_id], Self::measure_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn get_measure(&self, dataset_id: &str, name: &str) -> StoreResult<Option<Measure>> {
        self.conn
            .query_row(
                "SELECT id, dataset_id, name, table_name, expression, measure_type, business_area,
                        folder, description, is_hidden
                 FROM measures WHERE dataset_id = ? AND name = ?",
                params![dataset_id, name],
                Self::measure_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    fn measure_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Measure> {
        let type_label: String = row.get(5)?;
        let area_label: String = row.get(6)?;
        Ok(Measure {
            id: row.get(0)?,
            dataset_id: row.get(1)?,
            name: row.get(2)?,
            table_name: row.get(3)?,
            expression: row.get(4)?,
            measure_type: MeasureType::parse(&type_label),
            business_area: BusinessArea::parse(&area_label),
            folder: row.get(7)?,
            description: row.get(8)?,
            is_hidden: row.get(9)?,
        })
    }

    // ===== Relationships =====

    /// Upsert a relationship by its (dataset, from, to) endpoints.
    pub fn upsert_relationship(&self, r: &Relationship) -> StoreResult<i64> {
        self.conn
            .query_row(
                "INSERT INTO relationships (dataset_id, from_table, from_column, to_table,
                                            to_column, cardinality, cross_filter, is_active)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                 ON CONFLICT(dataset_id, from_table, from_column, to_table, to_column)
                 DO UPDATE SET cardinality = excluded.cardinality,
                               cross_filter = excluded.cross_filter,
                               is_active = excluded.is_active
                 RETURNING id",
                params![
                    r.dataset_id,
                    r.from_table,
                    r.from_column,
                    r.to_table,
                    r.to_column,
                    r.cardinality.as_str(),
                    r.cross_filter.as_str(),
                    r.is_active
                ],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn relationships_for_dataset(&self, dataset_id: &str) -> StoreResult<Vec<Relationship>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, dataset_id, from_table, from_column, to_table, to_column,
                    cardinality, cross_filter, is_active
             FROM relationships WHERE dataset_id = ?",
        )?;
        let rows = stmt.query_map(params![dataset_id], |row| {
            let card: String = row.get(6)?;
            let filter: String = row.get(7)?;
            Ok(Relationship {
                id: row.get(0)?,
                dataset_id: row.get(1)?,
                from_table: row.get(2)?,
                from_column: row.get(3)?,
                to_table: row.get(4)?,
                to_column: row.get(5)?,
                cardinality: Cardinality::parse(&card),
                cross_filter: CrossFilterDirection::parse(&filter),
                is_active: row.get(8)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ===== Business rules =====

    /// Insert a curated rule. Returns the assigned id (input id ignored).
    pub fn insert_rule(&self, r: &BusinessRule) -> StoreResult<i64> {
        self.conn.execute(
            "INSERT INTO business_rules (dataset_id, name, category, business_area, description,
                                         rule_logic, calculation, applies_to_measures,
                                         applies_to_tables, is_active, version)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                r.dataset_id,
                r.name,
                r.category,
                r.business_area,
                r.description,
                r.rule_logic,
                r.calculation,
                serde_json::to_string(&r.applies_to_measures)?,
                serde_json::to_string(&r.applies_to_tables)?,
                r.is_active,
                r.version
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Active rules for a dataset, including catalog-wide rules with no
    /// dataset binding.
    pub fn active_rules(&self, dataset_id: &str) -> StoreResult<Vec<BusinessRule>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, dataset_id, name, category, business_area, description, rule_logic,
                    calculation, applies_to_measures, applies_to_tables, is_active, version
             FROM business_rules
             WHERE is_active = 1 AND (dataset_id = ? OR dataset_id IS NULL)
             ORDER BY name",
        )?;
        let rows = stmt.query_map(params![dataset_id], |row| {
            let measures_json: String = row.get(8)?;
            let tables_json: String = row.get(9)?;
            Ok(BusinessRule {
                id: row.get(0)?,
                dataset_id: row.get(1)?,
                name: row.get(2)?,
                category: row.get(3)?,
                business_area: row.get(4)?,
                description: row.get(5)?,
                rule_logic: row.get(6)?,
                calculation: row.get(7)?,
                applies_to_measures: serde_json::from_str(&measures_json).unwrap_or_default(),
                applies_to_tables: serde_json::from_str(&tables_json).unwrap_or_default(),
                is_active: row.get(10)?,
                version: row.get(11)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ===== Dependency cache =====

    /// Persist extracted dependencies for a measure, keyed by the hash of
    /// the expression they were extracted from.
    pub fn put_measure_deps(
        &self,
        dataset_id: &str,
        measure_name: &str,
        expr_hash: &str,
        deps: &Dependencies,
    ) -> StoreResult<()> {
        self.conn.execute(
            "INSERT INTO measure_deps (dataset_id, measure_name, expression_hash,
                                       measure_refs, column_refs)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(dataset_id, measure_name) DO UPDATE SET
                 expression_hash = excluded.expression_hash,
                 measure_refs = excluded.measure_refs,
                 column_refs = excluded.column_refs",
            params![
                dataset_id,
                measure_name,
                expr_hash,
                serde_json::to_string(&deps.measures)?,
                serde_json::to_string(&deps.columns)?
            ],
        )?;
        Ok(())
    }

    /// Cached dependencies for a measure, or None when the cached row is
    /// absent or was extracted from a different expression.
    pub fn get_measure_deps(
        &self,
        dataset_id: &str,
        measure_name: &str,
        expected_hash: &str,
    ) -> StoreResult<Option<Dependencies>> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                "SELECT expression_hash, measure_refs, column_refs
                 FROM measure_deps WHERE dataset_id = ? AND measure_name = ?",
                params![dataset_id, measure_name],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match row {
            Some((hash, measures_json, columns_json)) if hash == expected_hash => {
                Ok(Some(Dependencies {
                    measures: serde_json::from_str(&measures_json)?,
                    columns: serde_json::from_str(&columns_json)?,
                }))
            }
            _ => Ok(None),
        }
    }

    // ===== Query history =====

    /// Insert a journal entry. Returns the assigned id (input id ignored;
    /// `created_at` is taken from the entry).
    pub fn insert_query(&self, e: &QueryHistoryEntry) -> StoreResult<i64> {
        let json_or_null = |v: &Option<serde_json::Value>| -> StoreResult<Option<String>> {
            v.as_ref()
                .map(serde_json::to_string)
                .transpose()
                .map_err(Into::into)
        };
        self.conn.execute(
            "INSERT INTO query_history (dataset_id, session_id, user_identifier, question,
                 generated_query, query_type, execution_time_ms, row_count, success,
                 error_message, result_summary, insights, recommendations, confidence_score,
                 measures_used, tables_used, user_rating, user_feedback, was_helpful,
                 led_to_query_id, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                e.dataset_id,
                e.session_id,
                e.user_identifier,
                e.question,
                e.generated_query,
                e.query_type,
                e.execution_time_ms,
                e.row_count,
                e.success,
                e.error_message,
                json_or_null(&e.result_summary)?,
                json_or_null(&e.insights)?,
                json_or_null(&e.recommendations)?,
                e.confidence_score,
                serde_json::to_string(&e.measures_used)?,
                serde_json::to_string(&e.tables_used)?,
                e.user_rating,
                e.user_feedback,
                e.was_helpful,
                e.led_to_query_id,
                e.created_at
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_query(&self, id: i64) -> StoreResult<Option<QueryHistoryEntry>> {
        self.conn
            .query_row(
                &format!("{} WHERE id = ?", Self::HISTORY_SELECT),
                params![id],
                Self::history_from_row,
            )
            .optional()
            .map_err(Into::into)
    }

    /// Attach user feedback to an entry. Only fields present in the feedback
    /// are updated. Returns false when the entry does not exist.
    pub fn update_feedback(&self, id: i64, f: &QueryFeedback) -> StoreResult<bool> {
        let rows = self.conn.execute(
            "UPDATE query_history SET
                 user_rating = COALESCE(?, user_rating),
                 user_feedback = COALESCE(?, user_feedback),
                 was_helpful = COALESCE(?, was_helpful)
             WHERE id = ?",
            params![f.user_rating, f.user_feedback, f.was_helpful, id],
        )?;
        Ok(rows > 0)
    }

    const HISTORY_SELECT: &'static str =
        "SELECT id, dataset_id, session_id, user_identifier, question, generated_query,
                query_type, execution_time_ms, row_count, success, error_message,
                result_summary, insights, recommendations, confidence_score, measures_used,
                tables_used, user_rating, user_feedback, was_helpful, led_to_query_id,
                created_at
         FROM query_history";

    fn history_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<QueryHistoryEntry> {
        let parse_json = |s: Option<String>| s.and_then(|s| serde_json::from_str(&s).ok());
        let measures_json: String = row.get(15)?;
        let tables_json: String = row.get(16)?;
        Ok(QueryHistoryEntry {
            id: row.get(0)?,
            dataset_id: row.get(1)?,
            session_id: row.get(2)?,
            user_identifier: row.get(3)?,
            question: row.get(4)?,
            generated_query: row.get(5)?,
            query_type: row.get(6)?,
            execution_time_ms: row.get(7)?,
            row_count: row.get(8)?,
            success: row.get(9)?,
            error_message: row.get(10)?,
            result_summary: parse_json(row.get(11)?),
            insights: parse_json(row.get(12)?),
            recommendations: parse_json(row.get(13)?),
            confidence_score: row.get(14)?,
            measures_used: serde_json::from_str(&measures_json).unwrap_or_default(),
            tables_used: serde_json::from_str(&tables_json).unwrap_or_default(),
            user_rating: row.get(17)?,
            user_feedback: row.get(18)?,
            was_helpful: row.get(19)?,
            led_to_query_id: row.get(20)?,
            created_at: row.get(21)?,
        })
    }

    /// Filtered history read, most recent first.
    pub fn query_history(&self, filter: &HistoryFilter) -> StoreResult<Vec<QueryHistoryEntry>> {
        let mut sql = String::from(Self::HISTORY_SELECT);
        let mut clauses: Vec<&str> = Vec::new();
        let mut binds: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref v) = filter.dataset_id {
            clauses.push("dataset_id = ?");
            binds.push(Box::new(v.clone()));
        }
        if let Some(ref v) = filter.user_identifier {
            clauses.push("user_identifier = ?");
            binds.push(Box::new(v.clone()));
        }
        if let Some(ref v) = filter.session_id {
            clauses.push("session_id = ?");
            binds.push(Box::new(v.clone()));
        }
        if let Some(v) = filter.since {
            clauses.push("created_at >= ?");
            binds.push(Box::new(v));
        }
        if let Some(v) = filter.until {
            clauses.push("created_at <= ?");
            binds.push(Box::new(v));
        }
        if filter.success_only {
            clauses.push("success = 1");
        }

        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {limit}"));
            if let Some(offset) = filter.offset {
                sql.push_str(&format!(" OFFSET {offset}"));
            }
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(binds.iter().map(|b| b.as_ref())),
            Self::history_from_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Entries within an analytics window, oldest first so that first-seen
    /// ordering of measure names is stable.
    pub fn queries_since(
        &self,
        since: i64,
        dataset_id: Option<&str>,
    ) -> StoreResult<Vec<QueryHistoryEntry>> {
        let mut sql = format!("{} WHERE created_at >= ?", Self::HISTORY_SELECT);
        let mut binds: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(since)];
        if let Some(ds) = dataset_id {
            sql.push_str(" AND dataset_id = ?");
            binds.push(Box::new(ds.to_string()));
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params_from_iter(binds.iter().map(|b| b.as_ref())),
            Self::history_from_row,
        )?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Mean execution time over a window, computed in SQL so entries without
    /// a recorded execution time are excluded from both sum and count.
    pub fn average_execution_time(
        &self,
        since: i64,
        dataset_id: Option<&str>,
    ) -> StoreResult<Option<f64>> {
        let mut sql = String::from(
            "SELECT AVG(execution_time_ms) FROM query_history
             WHERE created_at >= ? AND execution_time_ms IS NOT NULL",
        );
        let mut binds: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(since)];
        if let Some(ds) = dataset_id {
            sql.push_str(" AND dataset_id = ?");
            binds.push(Box::new(ds.to_string()));
        }
        self.conn
            .query_row(
                &sql,
                params_from_iter(binds.iter().map(|b| b.as_ref())),
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    /// Per-dataset query counts over a window, with dataset names resolved.
    pub fn dataset_query_counts(&self, since: i64) -> StoreResult<Vec<(String, String, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT q.dataset_id, COALESCE(d.name, q.dataset_id), COUNT(q.id)
             FROM query_history q
             LEFT JOIN datasets d ON d.id = q.dataset_id
             WHERE q.created_at >= ?
             GROUP BY q.dataset_id
             ORDER BY COUNT(q.id) DESC",
        )?;
        let rows = stmt.query_map(params![since], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get::<_, i64>(2)? as usize))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Candidate entries for popular-question ranking: successful, rated 4
    /// or better, best-rated first and most recent first on ties.
    pub fn popular_candidates(&self, dataset_id: &str) -> StoreResult<Vec<QueryHistoryEntry>> {
        let sql = format!(
            "{} WHERE dataset_id = ? AND success = 1 AND user_rating >= 4
             ORDER BY user_rating DESC, created_at DESC LIMIT 20",
            Self::HISTORY_SELECT
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params![dataset_id], Self::history_from_row)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // ===== Status =====

    /// Catalog-wide counts and latest sync stamps.
    pub fn status(&self) -> StoreResult<StoreStatus> {
        let count = |table: &str| -> StoreResult<usize> {
            let n: i64 =
                self.conn
                    .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                        row.get(0)
                    })?;
            Ok(n as usize)
        };
        let last_sync = |table: &str| -> StoreResult<Option<i64>> {
            self.conn
                .query_row(&format!("SELECT MAX(last_synced) FROM {table}"), [], |row| {
                    row.get(0)
                })
                .map_err(Into::into)
        };

        Ok(StoreStatus {
            workspaces: count("workspaces")?,
            datasets: count("datasets")?,
            tables: count("tables")?,
            measures: count("measures")?,
            relationships: count("relationships")?,
            business_rules: count("business_rules")?,
            query_history: count("query_history")?,
            last_workspace_sync: last_sync("workspaces")?,
            last_dataset_sync: last_sync("datasets")?,
        })
    }
}
