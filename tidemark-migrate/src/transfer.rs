//! Bulk import and export of table data.
//!
//! Imports accept a `.sql` script, executed verbatim, or a `.csv` file whose
//! stem names the target table. Exports dump every user table except the
//! tracking and lock tables, either as one SQL script or one CSV per table.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::Local;
use tracing::{debug, info};

use crate::database::{Database, Dialect, QueryRows, SqlValue};
use crate::error::{MigrateResult, MigrationError};
use crate::history::MigrationLock;

/// Format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// A single SQL script.
    Sql,
    /// One CSV file per table.
    Csv,
}

impl FromStr for ExportFormat {
    type Err = MigrationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sql" => Ok(Self::Sql),
            "csv" => Ok(Self::Csv),
            _ => Err(MigrationError::UnsupportedFormat(s.to_string())),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sql => write!(f, "sql"),
            Self::Csv => write!(f, "csv"),
        }
    }
}

/// Outcome of an import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportSummary {
    /// A SQL script was executed.
    Script {
        /// Imported file.
        path: PathBuf,
    },
    /// CSV rows were inserted into a table.
    Rows {
        /// Target table.
        table: String,
        /// Number of inserted rows.
        rows: usize,
    },
}

/// Outcome of an export.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    /// Exported tables with their row counts, in export order.
    pub tables: Vec<(String, usize)>,
}

impl ExportSummary {
    /// Total number of exported rows.
    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|(_, n)| n).sum()
    }
}

/// Moves data between files and the database.
pub struct DataMover<'a, D: Database + ?Sized> {
    db: &'a D,
    tracking_table: &'a str,
}

impl<'a, D: Database + ?Sized> DataMover<'a, D> {
    /// Create a mover that skips `tracking_table` (and its lock table) on export.
    pub fn new(db: &'a D, tracking_table: &'a str) -> Self {
        Self { db, tracking_table }
    }

    /// Import a `.sql` or `.csv` file.
    pub async fn import(&self, path: &Path) -> MigrateResult<ImportSummary> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "sql" => self.import_sql(path).await,
            "csv" => self.import_csv(path).await,
            _ => Err(MigrationError::UnsupportedFormat(if ext.is_empty() {
                path.display().to_string()
            } else {
                format!(".{}", ext)
            })),
        }
    }

    async fn import_sql(&self, path: &Path) -> MigrateResult<ImportSummary> {
        let sql = read_file(path).await?;
        self.db
            .execute_script(&sql)
            .await
            .map_err(|e| script_error(path, e))?;

        info!(path = %path.display(), "Imported SQL script");
        Ok(ImportSummary::Script {
            path: path.to_path_buf(),
        })
    }

    async fn import_csv(&self, path: &Path) -> MigrateResult<ImportSummary> {
        let table = path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| MigrationError::Csv(format!("cannot derive a table name from {}", path.display())))?
            .to_string();

        let content = read_file(path).await?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_reader(content.as_bytes());

        let headers: Vec<String> = reader.headers()?.iter().map(String::from).collect();
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(MigrationError::Csv(format!(
                "{} has no header row",
                path.display()
            )));
        }

        let sql = insert_statement(self.db.dialect(), &table, &headers);
        let mut rows = 0;
        for record in reader.records() {
            let record = record?;
            let params = record.iter().map(SqlValue::from).collect();
            self.db.execute(&sql, params).await?;
            rows += 1;
        }

        info!(table = %table, rows, "Imported CSV file");
        Ok(ImportSummary::Rows { table, rows })
    }

    /// Export in the given format to `path` (a file for SQL, a directory for CSV).
    pub async fn export(&self, format: ExportFormat, path: &Path) -> MigrateResult<ExportSummary> {
        match format {
            ExportFormat::Sql => self.export_sql(path).await,
            ExportFormat::Csv => self.export_csv(path).await,
        }
    }

    /// Dump every exportable table into one SQL script.
    pub async fn export_sql(&self, path: &Path) -> MigrateResult<ExportSummary> {
        let dialect = self.db.dialect();
        let mut summary = ExportSummary::default();
        let mut out = String::new();
        out.push_str("-- Tidemark dump\n");
        out.push_str(&format!(
            "-- Generated at: {}\n\n",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        ));

        for table in self.tables().await? {
            let definition = self.db.table_definition(&table).await?;
            let data = self.select_all(&table).await?;
            out.push_str(&render_table_sql(dialect, &table, definition.as_deref(), &data));
            summary.tables.push((table, data.rows.len()));
        }

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, out).await?;

        info!(path = %path.display(), tables = summary.tables.len(), "Exported SQL dump");
        Ok(summary)
    }

    /// Dump every exportable table into `<dir>/<table>.csv`.
    pub async fn export_csv(&self, dir: &Path) -> MigrateResult<ExportSummary> {
        tokio::fs::create_dir_all(dir).await?;
        let mut summary = ExportSummary::default();

        for table in self.tables().await? {
            let data = self.select_all(&table).await?;
            let bytes = render_table_csv(&data)?;
            let file = dir.join(format!("{}.csv", table));
            tokio::fs::write(&file, bytes).await?;

            debug!(table = %table, file = %file.display(), rows = data.rows.len(), "Exported table");
            summary.tables.push((table, data.rows.len()));
        }

        info!(dir = %dir.display(), tables = summary.tables.len(), "Exported CSV files");
        Ok(summary)
    }

    /// User tables minus the tracking and lock tables.
    pub async fn tables(&self) -> MigrateResult<Vec<String>> {
        let lock_table = MigrationLock::table_for(self.tracking_table);
        Ok(self
            .db
            .list_tables()
            .await?
            .into_iter()
            .filter(|t| t != self.tracking_table && *t != lock_table)
            .collect())
    }

    async fn select_all(&self, table: &str) -> MigrateResult<QueryRows> {
        let sql = format!("SELECT * FROM {}", self.db.dialect().quote_ident(table));
        self.db.query(&sql, Vec::new()).await
    }
}

/// Positional insert for `columns` of `table`.
fn insert_statement(dialect: Dialect, table: &str, columns: &[String]) -> String {
    let cols: Vec<String> = columns.iter().map(|c| dialect.quote_ident(c)).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.quote_ident(table),
        cols.join(", "),
        placeholders
    )
}

/// SQL dump section for one table.
fn render_table_sql(
    dialect: Dialect,
    table: &str,
    definition: Option<&str>,
    data: &QueryRows,
) -> String {
    let quoted = dialect.quote_ident(table);
    let mut out = format!("-- Table: {}\n", table);
    out.push_str(&format!("DROP TABLE IF EXISTS {};\n", quoted));
    if let Some(ddl) = definition {
        out.push_str(ddl.trim_end().trim_end_matches(';'));
        out.push_str(";\n");
    }
    out.push('\n');

    if data.rows.is_empty() {
        return out;
    }

    let cols: Vec<String> = data.columns.iter().map(|c| dialect.quote_ident(c)).collect();
    out.push_str(&format!("INSERT INTO {} ({}) VALUES\n", quoted, cols.join(", ")));
    let tuples: Vec<String> = data
        .rows
        .iter()
        .map(|row| {
            let values: Vec<String> = row.iter().map(SqlValue::to_sql_literal).collect();
            format!("({})", values.join(", "))
        })
        .collect();
    out.push_str(&tuples.join(",\n"));
    out.push_str(";\n\n");
    out
}

/// CSV bytes for one table, header first.
fn render_table_csv(data: &QueryRows) -> MigrateResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(&data.columns)?;
    for row in &data.rows {
        writer.write_record(row.iter().map(SqlValue::to_csv_field))?;
    }
    writer
        .into_inner()
        .map_err(|e| MigrationError::Csv(e.to_string()))
}

async fn read_file(path: &Path) -> MigrateResult<String> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|source| MigrationError::FileRead {
            path: path.to_path_buf(),
            source,
        })
}

fn script_error(path: &Path, err: MigrationError) -> MigrationError {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    match err {
        MigrationError::Database(message) => MigrationError::execution(file, message),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows() -> QueryRows {
        QueryRows {
            columns: vec!["id".to_string(), "name".to_string(), "note".to_string()],
            rows: vec![
                vec![SqlValue::Int(1), SqlValue::from("O'Brien"), SqlValue::Null],
                vec![SqlValue::Int(2), SqlValue::from("Ada"), SqlValue::from("a,b")],
            ],
        }
    }

    #[test]
    fn test_export_format_parse() {
        assert_eq!("sql".parse::<ExportFormat>().unwrap(), ExportFormat::Sql);
        assert_eq!("CSV".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert!(matches!(
            "xml".parse::<ExportFormat>(),
            Err(MigrationError::UnsupportedFormat(f)) if f == "xml"
        ));
    }

    #[test]
    fn test_insert_statement() {
        let sql = insert_statement(
            Dialect::MySql,
            "users",
            &["id".to_string(), "email".to_string()],
        );
        assert_eq!(sql, "INSERT INTO `users` (`id`, `email`) VALUES (?, ?)");
    }

    #[test]
    fn test_render_table_sql() {
        let out = render_table_sql(
            Dialect::Sqlite,
            "users",
            Some("CREATE TABLE users (id INTEGER, name TEXT, note TEXT)"),
            &rows(),
        );
        let expected = "-- Table: users\n\
            DROP TABLE IF EXISTS \"users\";\n\
            CREATE TABLE users (id INTEGER, name TEXT, note TEXT);\n\n\
            INSERT INTO \"users\" (\"id\", \"name\", \"note\") VALUES\n\
            (1, 'O''Brien', NULL),\n\
            (2, 'Ada', 'a,b');\n\n";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_render_empty_table_has_no_insert() {
        let data = QueryRows {
            columns: vec!["id".to_string()],
            rows: Vec::new(),
        };
        let out = render_table_sql(Dialect::MySql, "empty", None, &data);
        assert!(out.contains("DROP TABLE IF EXISTS `empty`;"));
        assert!(!out.contains("INSERT"));
    }

    #[test]
    fn test_render_table_csv() {
        let bytes = render_table_csv(&rows()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text, "id,name,note\n1,O'Brien,\n2,Ada,\"a,b\"\n");
    }

    #[test]
    fn test_script_error_names_file() {
        let err = script_error(
            Path::new("/tmp/seed.sql"),
            MigrationError::database("near \"FROM\": syntax error"),
        );
        match err {
            MigrationError::Execution { file, message } => {
                assert_eq!(file, "seed.sql");
                assert!(message.contains("syntax error"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
