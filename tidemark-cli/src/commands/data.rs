//! Data commands: `import` and `export`.

use tidemark_migrate::{DataMover, ExportFormat, ImportSummary};

use crate::cli::{ExportArgs, ImportArgs};
use crate::commands::open_database;
use crate::config::Settings;
use crate::error::CliResult;
use crate::output::{self, success};

/// Run `tidemark import` - load a .sql or .csv file
pub async fn run_import(args: ImportArgs, settings: &Settings) -> CliResult<()> {
    output::header("Import");
    output::kv("File", &args.path.display().to_string());
    output::newline();

    let db = open_database(settings).await?;
    let mover = DataMover::new(&db, &settings.table_name);

    match mover.import(&args.path).await? {
        ImportSummary::Script { path } => {
            success(&format!("Imported SQL file {}", path.display()));
        }
        ImportSummary::Rows { table, rows } => {
            success(&format!("Imported {} row(s) into {}", rows, table));
        }
    }

    Ok(())
}

/// Run `tidemark export` - dump all tables as SQL or CSV
pub async fn run_export(args: ExportArgs, settings: &Settings) -> CliResult<()> {
    output::header("Export");

    // Validate the format before touching the database
    let format: ExportFormat = args.format.parse()?;
    output::kv("Format", &format.to_string());
    output::kv("Output", &args.path.display().to_string());
    output::newline();

    let db = open_database(settings).await?;
    let mover = DataMover::new(&db, &settings.table_name);
    let summary = mover.export(format, &args.path).await?;

    for (table, rows) in &summary.tables {
        output::list_item(&format!("{} ({} rows)", table, rows));
    }
    output::newline();
    success(&format!(
        "Exported {} table(s), {} row(s) to {}",
        summary.tables.len(),
        summary.total_rows(),
        args.path.display()
    ));

    Ok(())
}
