//! SQLite local store — mandi prices and soil reference data.
//!
//! Both tables are flat denormalized snapshots populated by one-shot CSV
//! import (DROP + CREATE + INSERT inside a transaction, wholesale replace).
//! No update or delete path exists.
//!
//! Query execution is guarded: only single SELECT statements reach SQLite.

use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use rusqlite::{params, Connection};
use tracing::info;

// ─── Schema text (also fed to the LLM for text-to-SQL) ───────────────────────

pub const MANDI_SCHEMA: &str = r#"
-- Table: mandi_prices (daily wholesale market price snapshot, data.gov.in export)
CREATE TABLE mandi_prices (
    State        TEXT,   -- e.g. 'Maharashtra'
    District     TEXT,   -- e.g. 'Nashik'
    Market       TEXT,   -- mandi name, e.g. 'Lasalgaon'
    Commodity    TEXT,   -- e.g. 'onion', 'wheat' (lowercase)
    Variety      TEXT,   -- e.g. 'Red', 'Local'
    Arrival_Date TEXT,   -- 'YYYY-MM-DD'
    Min_Price    REAL,   -- Rs per quintal
    Max_Price    REAL,   -- Rs per quintal
    Modal_Price  REAL    -- most frequent trade price, the representative market price
);
"#;

pub const SOIL_SCHEMA: &str = r#"
-- Table: soil_health (static per-district soil reference data)
CREATE TABLE soil_health (
    District       TEXT,  -- e.g. 'Nashik'
    pH             REAL,
    Organic_Carbon REAL,  -- percent
    Nitrogen       REAL,  -- kg/ha
    Phosphorus     REAL,  -- kg/ha
    Potassium      REAL   -- kg/ha
);
"#;

/// System prompt for text-to-SQL generation. Constrains LLM output to a
/// single SQLite SELECT statement against the given schema.
pub fn build_text_to_sql_prompt(schema: &str) -> String {
    format!(
        r#"You are a SQLite query generator for an agricultural market database.

Given the database schema below, convert the user's natural language question into a single SQLite SELECT query.

SCHEMA:
```sql
{schema}
```

RULES:
- Output ONLY the SQL query, nothing else
- No markdown, no explanation, no backticks
- Only SELECT queries (never INSERT, UPDATE, DELETE, DROP)
- Use only tables and columns from the schema
- 'today' = Arrival_Date = date('now'); 'yesterday' = date('now','-1 day')
- Commodity names are lowercase: 'onion', 'wheat', 'rice', 'tomato', etc.
- Match commodities and districts case-insensitively with lower(column) = '...'
- Modal_Price is the representative market price; prefer it when the user asks 'the price'
- Always use COUNT(*) for counting questions
- Default ORDER BY Arrival_Date DESC
- Default LIMIT 50 unless the user specifies otherwise"#,
        schema = schema
    )
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// One `soil_health` row.
#[derive(Debug, Clone, PartialEq)]
pub struct SoilRecord {
    pub district: String,
    pub ph: Option<f64>,
    pub organic_carbon: Option<f64>,
    pub nitrogen: Option<f64>,
    pub phosphorus: Option<f64>,
    pub potassium: Option<f64>,
}

impl SoilRecord {
    /// Prompt-context line handed to the LLM for agronomy questions.
    pub fn summary(&self) -> String {
        fn num(v: Option<f64>) -> String {
            v.map(|x| format!("{:.1}", x)).unwrap_or_else(|| "n/a".into())
        }
        format!(
            "Soil data for {}: pH {}, Organic Carbon {}%, N {} kg/ha, P {} kg/ha, K {} kg/ha",
            self.district,
            num(self.ph),
            num(self.organic_carbon),
            num(self.nitrogen),
            num(self.phosphorus),
            num(self.potassium),
        )
    }
}

/// Result of a guarded query, ready for table rendering.
pub struct QueryResult {
    pub sql: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl QueryResult {
    pub fn print_table(&self) {
        println!();
        println!("SQL: {}", self.sql);
        println!();

        if self.rows.is_empty() {
            println!("(no results)");
            return;
        }

        // Column widths
        let mut widths: Vec<usize> = self.columns.iter().map(|c| c.len()).collect();
        for row in &self.rows {
            for (i, val) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(val.chars().count().min(60));
                }
            }
        }

        let header: String = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{:<width$}", c, width = widths[i]))
            .collect::<Vec<_>>()
            .join(" │ ");
        println!("┌─{}─┐", "─".repeat(header.chars().count()));
        println!("│ {} │", header);
        println!("├─{}─┤", "─".repeat(header.chars().count()));

        // Rows (cap at 50)
        for row in self.rows.iter().take(50) {
            let line: String = row
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    let w = widths.get(i).copied().unwrap_or(10);
                    let s = if v.chars().count() > 60 {
                        let cut: String = v.chars().take(59).collect();
                        format!("{}…", cut)
                    } else {
                        v.clone()
                    };
                    format!("{:<width$}", s, width = w)
                })
                .collect::<Vec<_>>()
                .join(" │ ");
            println!("│ {} │", line);
        }
        println!("└─{}─┘", "─".repeat(header.chars().count()));

        if self.rows.len() > 50 {
            println!("  … {} more rows", self.rows.len() - 50);
        }
        println!("  {} row(s)", self.rows.len());
    }
}

// ─── Database ────────────────────────────────────────────────────────────────

pub struct Database {
    conn: Connection,
}

const PRICE_HEADERS: &[&str] = &[
    "State", "District", "Market", "Commodity", "Variety",
    "Arrival_Date", "Min_Price", "Max_Price", "Modal_Price",
];

const SOIL_HEADERS: &[&str] = &[
    "District", "pH", "Organic_Carbon", "Nitrogen", "Phosphorus", "Potassium",
];

impl Database {
    /// Open (creating tables if absent). Bare filenames resolve into the
    /// platform data directory.
    pub fn open(path: &str) -> Result<Self> {
        let resolved = resolve_db_path(path);
        let conn = Connection::open(&resolved)
            .with_context(|| format!("cannot open database {}", resolved))?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS mandi_prices (
                State        TEXT,
                District     TEXT,
                Market       TEXT,
                Commodity    TEXT,
                Variety      TEXT,
                Arrival_Date TEXT,
                Min_Price    REAL,
                Max_Price    REAL,
                Modal_Price  REAL
            );

            CREATE TABLE IF NOT EXISTS soil_health (
                District       TEXT,
                pH             REAL,
                Organic_Carbon REAL,
                Nitrogen       REAL,
                Phosphorus     REAL,
                Potassium      REAL
            );
        ",
        )?;
        Ok(())
    }

    /// One-shot mandi price import: the table is replaced wholesale.
    /// Returns the number of rows inserted.
    pub fn import_prices_csv(&mut self, path: &Path) -> Result<usize> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("cannot read CSV {}", path.display()))?;
        let idx = header_indices(&mut reader, PRICE_HEADERS)?;

        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "DROP TABLE IF EXISTS mandi_prices;
             CREATE TABLE mandi_prices (
                State        TEXT,
                District     TEXT,
                Market       TEXT,
                Commodity    TEXT,
                Variety      TEXT,
                Arrival_Date TEXT,
                Min_Price    REAL,
                Max_Price    REAL,
                Modal_Price  REAL
             );",
        )?;

        let mut count = 0usize;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO mandi_prices
                 (State, District, Market, Commodity, Variety, Arrival_Date,
                  Min_Price, Max_Price, Modal_Price)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for record in reader.records() {
                let record = record?;
                let field = |i: usize| record.get(idx[i]).unwrap_or("").trim().to_string();
                let price = |i: usize| record.get(idx[i]).and_then(|v| v.trim().parse::<f64>().ok());
                stmt.execute(params![
                    field(0),
                    field(1),
                    field(2),
                    field(3).to_lowercase(),
                    field(4),
                    field(5),
                    price(6),
                    price(7),
                    price(8),
                ])?;
                count += 1;
            }
        }
        tx.commit()?;
        info!("imported {} mandi price rows from {}", count, path.display());
        Ok(count)
    }

    /// One-shot soil data import, same wholesale-replace semantics.
    pub fn import_soil_csv(&mut self, path: &Path) -> Result<usize> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("cannot read CSV {}", path.display()))?;
        let idx = header_indices(&mut reader, SOIL_HEADERS)?;

        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "DROP TABLE IF EXISTS soil_health;
             CREATE TABLE soil_health (
                District       TEXT,
                pH             REAL,
                Organic_Carbon REAL,
                Nitrogen       REAL,
                Phosphorus     REAL,
                Potassium      REAL
             );",
        )?;

        let mut count = 0usize;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO soil_health
                 (District, pH, Organic_Carbon, Nitrogen, Phosphorus, Potassium)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for record in reader.records() {
                let record = record?;
                let num = |i: usize| record.get(idx[i]).and_then(|v| v.trim().parse::<f64>().ok());
                stmt.execute(params![
                    record.get(idx[0]).unwrap_or("").trim(),
                    num(1),
                    num(2),
                    num(3),
                    num(4),
                    num(5),
                ])?;
                count += 1;
            }
        }
        tx.commit()?;
        info!("imported {} soil health rows from {}", count, path.display());
        Ok(count)
    }

    /// Execute a guarded SELECT, rendering every value as a display string.
    pub fn execute_query(&self, sql: &str) -> Result<(Vec<String>, Vec<Vec<String>>)> {
        validate_sql(sql)?;

        let mut stmt = self
            .conn
            .prepare(sql)
            .map_err(|e| anyhow!("SQL error: {} — query: {}", e, sql))?;

        let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let n = columns.len();

        let rows: Vec<Vec<String>> = stmt
            .query_map([], |row| {
                let mut vals = Vec::with_capacity(n);
                for i in 0..n {
                    let val = row
                        .get::<_, rusqlite::types::Value>(i)
                        .map(|v| match v {
                            rusqlite::types::Value::Null => "NULL".to_string(),
                            rusqlite::types::Value::Integer(x) => x.to_string(),
                            rusqlite::types::Value::Real(f) => format!("{:.2}", f),
                            rusqlite::types::Value::Text(s) => s,
                            rusqlite::types::Value::Blob(_) => "[BLOB]".to_string(),
                        })
                        .unwrap_or_else(|_| "?".to_string());
                    vals.push(val);
                }
                Ok(vals)
            })
            .map_err(|e| anyhow!("query execution error: {}", e))?
            .collect::<rusqlite::Result<_>>()
            .map_err(|e| anyhow!("query execution error: {}", e))?;

        Ok((columns, rows))
    }

    /// Case-insensitive single-row soil lookup.
    pub fn soil_for_district(&self, district: &str) -> Result<Option<SoilRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT District, pH, Organic_Carbon, Nitrogen, Phosphorus, Potassium
             FROM soil_health WHERE lower(District) = lower(?1) LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![district.trim()], |row| {
            Ok(SoilRecord {
                district: row.get(0)?,
                ph: row.get(1)?,
                organic_carbon: row.get(2)?,
                nitrogen: row.get(3)?,
                phosphorus: row.get(4)?,
                potassium: row.get(5)?,
            })
        })?;
        match rows.next() {
            Some(rec) => Ok(Some(rec?)),
            None => Ok(None),
        }
    }

    pub fn list_tables(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(names)
    }

    /// `(column, type)` pairs for a table, for the SQL REPL `schema` command.
    pub fn table_schema(&self, table: &str) -> Result<Vec<(String, String)>> {
        if !self.list_tables()?.iter().any(|t| t == table) {
            bail!("no such table: {}", table);
        }
        let mut stmt = self
            .conn
            .prepare(&format!("PRAGMA table_info({})", table))?;
        let cols = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(1)?, row.get::<_, String>(2)?))
            })?
            .filter_map(|r| r.ok())
            .collect();
        Ok(cols)
    }

    pub fn count_rows(&self, table: &str) -> Result<u64> {
        if !self.list_tables()?.iter().any(|t| t == table) {
            return Ok(0);
        }
        let count: u64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))?;
        Ok(count)
    }
}

// ─── SQL guard ───────────────────────────────────────────────────────────────

const DANGEROUS_KEYWORDS: &[&str] = &[
    "INSERT", "UPDATE", "DELETE", "DROP", "ALTER", "CREATE",
    "ATTACH", "DETACH", "REPLACE", "PRAGMA", "VACUUM",
];

/// Validate that the SQL is a single SELECT statement. Keywords are checked
/// as standalone words so identifiers like `created_at` pass.
pub fn validate_sql(sql: &str) -> Result<()> {
    let upper = sql.to_uppercase();
    let trimmed = upper.trim_start();

    if !trimmed.starts_with("SELECT") {
        // Truncate on a char boundary: the "SQL" here may be LLM prose in
        // any script.
        let preview: String = sql.chars().take(50).collect();
        bail!("only SELECT queries allowed, got: {}", preview);
    }

    for word in upper.split(|c: char| !c.is_ascii_alphanumeric() && c != '_') {
        if DANGEROUS_KEYWORDS.contains(&word) {
            bail!("dangerous keyword '{}' not allowed", word);
        }
    }

    // Block semicolons that could chain statements
    if sql.contains(';') {
        let parts: Vec<&str> = sql.split(';').filter(|s| !s.trim().is_empty()).collect();
        if parts.len() > 1 {
            bail!("multiple statements not allowed");
        }
    }

    Ok(())
}

/// Check the CSV header row for every required column; returns the index of
/// each required column in declaration order.
fn header_indices(
    reader: &mut csv::Reader<std::fs::File>,
    required: &[&str],
) -> Result<Vec<usize>> {
    let headers = reader.headers()?.clone();
    required
        .iter()
        .map(|name| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
                .ok_or_else(|| anyhow!("CSV missing required column '{}'", name))
        })
        .collect()
}

/// Resolve bare DB filenames into the platform data directory.
fn resolve_db_path(db_path: &str) -> String {
    if Path::new(db_path).is_absolute() {
        return db_path.to_string();
    }
    if let Some(data_dir) = dirs::data_local_dir() {
        let full = data_dir.join("agri-advisor").join(db_path);
        if let Some(parent) = full.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        return full.to_string_lossy().to_string();
    }
    db_path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_passes() {
        assert!(validate_sql("SELECT * FROM mandi_prices LIMIT 5").is_ok());
        assert!(validate_sql("  select Commodity, Modal_Price from mandi_prices").is_ok());
        assert!(validate_sql("SELECT * FROM mandi_prices;").is_ok());
    }

    #[test]
    fn non_select_rejected() {
        assert!(validate_sql("DELETE FROM mandi_prices").is_err());
        assert!(validate_sql("UPDATE soil_health SET pH = 7").is_err());
        assert!(validate_sql("DROP TABLE mandi_prices").is_err());
    }

    #[test]
    fn embedded_dangerous_keyword_rejected() {
        assert!(validate_sql("SELECT * FROM mandi_prices WHERE 1=1 UNION SELECT 1; DROP TABLE soil_health").is_err());
        assert!(validate_sql("SELECT 1; DELETE FROM mandi_prices").is_err());
    }

    #[test]
    fn keyword_inside_identifier_passes() {
        // "created_at" contains no standalone CREATE; "selection"/"dropped"
        // must not be falsely rejected either.
        assert!(validate_sql("SELECT created_at, selection, dropped FROM mandi_prices").is_ok());
    }

    #[test]
    fn statement_chaining_rejected() {
        assert!(validate_sql("SELECT 1; SELECT 2").is_err());
    }

    #[test]
    fn non_ascii_prose_rejected_without_panic() {
        // A Hindi-mode model sometimes answers in prose instead of SQL;
        // rejecting it must not split the preview mid-character.
        let reply = "क्षमा करें, मैं इस प्रश्न के लिए SQL क्वेरी नहीं बना सकता।";
        let err = validate_sql(reply).unwrap_err();
        assert!(err.to_string().contains("only SELECT"));
    }

    #[test]
    fn soil_summary_handles_missing_values() {
        let rec = SoilRecord {
            district: "Nashik".into(),
            ph: Some(6.8),
            organic_carbon: None,
            nitrogen: Some(240.0),
            phosphorus: None,
            potassium: None,
        };
        let s = rec.summary();
        assert!(s.contains("Nashik"));
        assert!(s.contains("pH 6.8"));
        assert!(s.contains("Organic Carbon n/a%"));
    }
}
