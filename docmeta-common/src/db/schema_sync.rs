//! Automatic Schema Synchronization
//!
//! Schema definitions in code are the single source of truth; on startup they
//! are compared to the live SQLite schema and safe fixes are applied.
//!
//! Three-phase initialization:
//! 1. **Create** - `CREATE TABLE IF NOT EXISTS` from the definition (plus all
//!    indexes when the table is new)
//! 2. **Auto-Sync** - add missing nullable columns and missing secondary
//!    indexes (THIS MODULE)
//! 3. **Manual Migrations** - anything that can rewrite or drop data
//!    (`migrations.rs`), e.g. adding a UNIQUE index to a table that may
//!    already hold duplicates
//!
//! # Usage
//!
//! ```rust,ignore
//! pub struct DocumentMetadataSchema;
//!
//! impl TableSchema for DocumentMetadataSchema {
//!     fn table_name() -> &'static str { "document_metadata" }
//!
//!     fn expected_columns() -> Vec<ColumnDefinition> {
//!         vec![
//!             ColumnDefinition::new("id", "INTEGER").primary_key(),
//!             ColumnDefinition::new("image_path", "TEXT"),  // ADD COLUMN HERE
//!         ]
//!     }
//! }
//!
//! SchemaSync::create_table::<DocumentMetadataSchema>(&pool).await?;
//! SchemaSync::sync_table::<DocumentMetadataSchema>(&pool).await?;
//! ```

use crate::Result;
use sqlx::{Row, SqlitePool};
use tracing::{info, warn};

/// Column definition with SQL constraints
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    /// Column name
    pub name: String,
    /// SQL type (e.g., "TEXT", "INTEGER", "REAL", "TIMESTAMP")
    pub sql_type: String,
    /// NOT NULL constraint
    pub not_null: bool,
    /// PRIMARY KEY constraint
    pub primary_key: bool,
    /// AUTOINCREMENT (only meaningful on an INTEGER PRIMARY KEY)
    pub autoincrement: bool,
    /// DEFAULT value (raw SQL expression)
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
            not_null: false,
            primary_key: false,
            autoincrement: false,
            default_value: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn autoincrement(mut self) -> Self {
        self.autoincrement = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Column clause as used inside CREATE TABLE
    fn to_sql(&self) -> String {
        let mut sql = format!("{} {}", self.name, self.sql_type);
        if self.primary_key {
            sql.push_str(" PRIMARY KEY");
            if self.autoincrement {
                sql.push_str(" AUTOINCREMENT");
            }
        }
        if self.not_null {
            sql.push_str(" NOT NULL");
        }
        if let Some(default) = &self.default_value {
            sql.push_str(&format!(" DEFAULT {}", default));
        }
        sql
    }
}

/// Index definition (secondary or unique)
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDefinition {
    pub name: String,
    /// Indexed columns, in order
    pub columns: Vec<String>,
    pub unique: bool,
}

impl IndexDefinition {
    pub fn new(name: impl Into<String>, columns: &[&str]) -> Self {
        Self {
            name: name.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            unique: false,
        }
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    fn to_sql(&self, table: &str) -> String {
        format!(
            "CREATE {}INDEX IF NOT EXISTS {} ON {}({})",
            if self.unique { "UNIQUE " } else { "" },
            self.name,
            table,
            self.columns.join(", ")
        )
    }
}

/// Actual column from database introspection (PRAGMA table_info result)
#[derive(Debug, Clone)]
pub struct ActualColumn {
    /// Column ID (position in table)
    pub cid: i32,
    pub name: String,
    /// SQL type as declared
    pub type_name: String,
    pub not_null: bool,
    pub default_value: Option<String>,
    pub pk: bool,
}

/// Actual index from database introspection (PRAGMA index_list + index_info)
#[derive(Debug, Clone)]
pub struct ActualIndex {
    pub name: String,
    pub unique: bool,
    pub columns: Vec<String>,
}

/// Schema drift detected between expected and actual schema
#[derive(Debug, Clone)]
pub enum SchemaDrift {
    /// Column missing from database
    MissingColumn {
        table: String,
        column: ColumnDefinition,
    },
    /// Column type mismatch (cannot auto-fix)
    TypeMismatch {
        table: String,
        column: String,
        expected: String,
        actual: String,
    },
    /// Constraint mismatch (cannot auto-fix; SQLite needs a table rebuild)
    ConstraintMismatch {
        table: String,
        column: String,
        constraint: String, // "NOT NULL", "PRIMARY KEY"
    },
    /// No index covers these columns
    MissingIndex {
        table: String,
        index: IndexDefinition,
    },
}

/// Defines expected schema for a database table
pub trait TableSchema {
    /// Table name in database
    fn table_name() -> &'static str;

    /// Expected column definitions (order matters for new table creation)
    fn expected_columns() -> Vec<ColumnDefinition>;

    /// Expected indexes (created with the table, synced afterwards)
    fn expected_indexes() -> Vec<IndexDefinition> {
        Vec::new()
    }

    /// CREATE TABLE IF NOT EXISTS statement built from the column list
    fn create_table_sql() -> String {
        let columns: Vec<String> = Self::expected_columns()
            .iter()
            .map(|c| format!("    {}", c.to_sql()))
            .collect();
        format!(
            "CREATE TABLE IF NOT EXISTS {} (\n{}\n)",
            Self::table_name(),
            columns.join(",\n")
        )
    }
}

/// Schema introspection - read actual database schema
pub struct SchemaIntrospector;

impl SchemaIntrospector {
    /// Read actual columns, ordered by cid
    pub async fn introspect_table(pool: &SqlitePool, table_name: &str) -> Result<Vec<ActualColumn>> {
        let query = format!("PRAGMA table_info({})", table_name);
        let rows = sqlx::query(&query).fetch_all(pool).await?;

        let mut columns: Vec<ActualColumn> = rows
            .iter()
            .map(|row| ActualColumn {
                cid: row.get("cid"),
                name: row.get("name"),
                type_name: row.get("type"),
                not_null: row.get::<i32, _>("notnull") != 0,
                default_value: row.get("dflt_value"),
                pk: row.get::<i32, _>("pk") != 0,
            })
            .collect();

        columns.sort_by_key(|c| c.cid);

        Ok(columns)
    }

    /// Read all indexes on a table, including automatic UNIQUE-constraint indexes
    pub async fn introspect_indexes(pool: &SqlitePool, table_name: &str) -> Result<Vec<ActualIndex>> {
        let list = sqlx::query(&format!("PRAGMA index_list({})", table_name))
            .fetch_all(pool)
            .await?;

        let mut indexes = Vec::with_capacity(list.len());
        for row in &list {
            let name: String = row.get("name");
            let unique = row.get::<i32, _>("unique") != 0;

            let info = sqlx::query(&format!("PRAGMA index_info('{}')", name.replace('\'', "''")))
                .fetch_all(pool)
                .await?;
            let mut cols: Vec<(i32, String)> = info
                .iter()
                .map(|r| (r.get::<i32, _>("seqno"), r.get::<Option<String>, _>("name").unwrap_or_default()))
                .collect();
            cols.sort_by_key(|(seq, _)| *seq);

            indexes.push(ActualIndex {
                name,
                unique,
                columns: cols.into_iter().map(|(_, c)| c).collect(),
            });
        }

        Ok(indexes)
    }

    pub async fn table_exists(pool: &SqlitePool, table_name: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM sqlite_master
                WHERE type='table' AND name = ?
            )
            "#,
        )
        .bind(table_name)
        .fetch_one(pool)
        .await?;

        Ok(exists)
    }
}

/// Schema comparison - detect drift between expected and actual
pub struct SchemaDiff;

impl SchemaDiff {
    /// Compare expected columns to the live table
    pub fn compare(
        table_name: &str,
        expected: &[ColumnDefinition],
        actual: &[ActualColumn],
    ) -> Vec<SchemaDrift> {
        let mut drift = Vec::new();

        for expected_col in expected {
            let Some(actual_col) = actual.iter().find(|c| c.name == expected_col.name) else {
                drift.push(SchemaDrift::MissingColumn {
                    table: table_name.to_string(),
                    column: expected_col.clone(),
                });
                continue;
            };

            if !Self::types_compatible(&expected_col.sql_type, &actual_col.type_name) {
                drift.push(SchemaDrift::TypeMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    expected: expected_col.sql_type.clone(),
                    actual: actual_col.type_name.clone(),
                });
            }

            if expected_col.not_null && !actual_col.not_null && !actual_col.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    constraint: "NOT NULL".to_string(),
                });
            }

            if expected_col.primary_key && !actual_col.pk {
                drift.push(SchemaDrift::ConstraintMismatch {
                    table: table_name.to_string(),
                    column: expected_col.name.clone(),
                    constraint: "PRIMARY KEY".to_string(),
                });
            }
        }

        drift
    }

    /// Compare expected indexes to the live ones
    ///
    /// Matching is by column list, not by name: a table-level
    /// `UNIQUE (a, b)` constraint satisfies an expected unique index on (a, b).
    pub fn compare_indexes(
        table_name: &str,
        expected: &[IndexDefinition],
        actual: &[ActualIndex],
    ) -> Vec<SchemaDrift> {
        expected
            .iter()
            .filter(|want| {
                !actual
                    .iter()
                    .any(|have| have.columns == want.columns && (have.unique || !want.unique))
            })
            .map(|want| SchemaDrift::MissingIndex {
                table: table_name.to_string(),
                index: want.clone(),
            })
            .collect()
    }

    /// Check if SQL types are compatible (SQLite type affinity rules)
    fn types_compatible(expected: &str, actual: &str) -> bool {
        let exp = expected.to_uppercase();
        let act = actual.to_uppercase();

        if exp == act {
            return true;
        }

        // INTEGER affinity (covers BIGINT, SERIAL-style declarations)
        if exp.contains("INT") && act.contains("INT") {
            return true;
        }

        // TEXT affinity
        let is_text = |t: &str| t.contains("TEXT") || t.contains("CHAR") || t.contains("CLOB");
        if is_text(&exp) && is_text(&act) {
            return true;
        }

        // Timestamps are stored as TEXT; DATETIME and TIMESTAMP are interchangeable
        let is_time = |t: &str| t.contains("TIMESTAMP") || t.contains("DATETIME");
        if is_time(&exp) && is_time(&act) {
            return true;
        }

        let is_real = |t: &str| t.contains("REAL") || t.contains("FLOAT") || t.contains("DOUBLE");
        is_real(&exp) && is_real(&act)
    }
}

/// Schema synchronization - apply schema changes to database
pub struct SchemaSync;

impl SchemaSync {
    /// Phase 1: create the table if missing
    ///
    /// Indexes are only created together with a brand-new table; on an
    /// existing table they go through `sync_table` (non-unique) or a
    /// migration (unique), since the table may already contain duplicates.
    ///
    /// Returns true when the table was created by this call.
    pub async fn create_table<T: TableSchema>(pool: &SqlitePool) -> Result<bool> {
        let table_name = T::table_name();
        if SchemaIntrospector::table_exists(pool, table_name).await? {
            return Ok(false);
        }

        let mut tx = pool.begin().await?;
        sqlx::query(&T::create_table_sql()).execute(&mut *tx).await?;
        for index in T::expected_indexes() {
            sqlx::query(&index.to_sql(table_name)).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        info!("Created table '{}'", table_name);
        Ok(true)
    }

    /// Phase 2: detect drift and apply safe fixes
    ///
    /// **What this CAN fix:**
    /// - Missing columns (via ALTER TABLE ADD COLUMN)
    /// - Missing non-unique indexes
    ///
    /// **What this CANNOT fix (requires manual migration):**
    /// - Type or constraint changes (SQLite requires table recreation)
    /// - Missing UNIQUE indexes (existing rows may violate them)
    ///
    /// Returns the drift that was found (fixed or not).
    pub async fn sync_table<T: TableSchema>(pool: &SqlitePool) -> Result<Vec<SchemaDrift>> {
        let table_name = T::table_name();

        info!("Schema sync: Checking table '{}'", table_name);

        if !SchemaIntrospector::table_exists(pool, table_name).await? {
            warn!(
                "  Table '{}' does not exist - should be created by SchemaSync::create_table first",
                table_name
            );
            return Ok(Vec::new());
        }

        let actual_columns = SchemaIntrospector::introspect_table(pool, table_name).await?;
        let mut drift = SchemaDiff::compare(table_name, &T::expected_columns(), &actual_columns);

        let actual_indexes = SchemaIntrospector::introspect_indexes(pool, table_name).await?;
        drift.extend(SchemaDiff::compare_indexes(
            table_name,
            &T::expected_indexes(),
            &actual_indexes,
        ));

        if drift.is_empty() {
            info!("  ✓ Schema up to date for '{}'", table_name);
            return Ok(drift);
        }

        for change in &drift {
            match change {
                SchemaDrift::MissingColumn { table, column } => {
                    Self::add_column(pool, table, column).await?;
                }
                SchemaDrift::MissingIndex { table, index } if !index.unique => {
                    info!("  ✓ Creating index {} on {}({})", index.name, table, index.columns.join(", "));
                    sqlx::query(&index.to_sql(table)).execute(pool).await?;
                }
                SchemaDrift::MissingIndex { table, index } => {
                    warn!(
                        "  ⚠ Unique index {} missing on {}({}). Left to migrations.",
                        index.name,
                        table,
                        index.columns.join(", ")
                    );
                }
                SchemaDrift::TypeMismatch { table, column, expected, actual } => {
                    warn!(
                        "  ⚠ Type mismatch in {}.{}: expected '{}', found '{}'. Manual migration required.",
                        table, column, expected, actual
                    );
                }
                SchemaDrift::ConstraintMismatch { table, column, constraint } => {
                    warn!(
                        "  ⚠ Constraint mismatch in {}.{}: missing '{}'. Manual migration required.",
                        table, column, constraint
                    );
                }
            }
        }

        Ok(drift)
    }

    /// Add missing column to table via ALTER TABLE ADD COLUMN
    async fn add_column(pool: &SqlitePool, table: &str, column: &ColumnDefinition) -> Result<()> {
        let mut sql = format!("ALTER TABLE {} ADD COLUMN {} {}", table, column.name, column.sql_type);

        // ADD COLUMN cannot carry PRIMARY KEY, and NOT NULL needs a constant DEFAULT
        if column.primary_key {
            warn!(
                "  ⚠ Cannot add PRIMARY KEY column {}.{} via ALTER TABLE. \
                 Column will be created without PRIMARY KEY constraint.",
                table, column.name
            );
        }

        match (&column.default_value, column.not_null) {
            (Some(default), true) => sql.push_str(&format!(" NOT NULL DEFAULT {}", default)),
            (Some(default), false) => sql.push_str(&format!(" DEFAULT {}", default)),
            (None, true) => warn!(
                "  ⚠ Cannot add NOT NULL column {}.{} without DEFAULT value. \
                 Column will be nullable.",
                table, column.name
            ),
            (None, false) => {}
        }

        info!("  ✓ Adding column: {}.{} ({})", table, column.name, column.sql_type);

        match sqlx::query(&sql).execute(pool).await {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("duplicate column") => {
                // Another process initialized the same database concurrently
                info!("  Column {}.{} already added (concurrent initialization)", table, column.name);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}
