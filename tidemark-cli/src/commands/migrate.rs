//! Migration commands: `create`, `up`, `down`, `version`, `goto`, `unlock`.

use tidemark_migrate::{GotoOutcome, MigrationCatalog, RunReport, StatusReport};

use crate::cli::{CreateArgs, DownArgs, GotoArgs, UpArgs};
use crate::commands::open_migrator;
use crate::config::Settings;
use crate::error::CliResult;
use crate::output::{self, success};

/// Run `tidemark create` - write a new migration pair
pub async fn run_create(args: CreateArgs, settings: &Settings) -> CliResult<()> {
    output::header("Create Migration");

    let catalog = MigrationCatalog::new(&settings.migrations_dir);
    let created = catalog.create(&args.name).await?;

    output::kv("Version", created.version.as_str());
    output::list_item(&created.up_path.display().to_string());
    output::list_item(&created.down_path.display().to_string());
    output::newline();
    success(&format!("Created migration {}_{}", created.version, args.name.trim()));

    Ok(())
}

/// Run `tidemark up` - apply pending migrations
pub async fn run_up(args: UpArgs, settings: &Settings) -> CliResult<()> {
    output::header("Migrate Up");
    output::kv("Migrations", &settings.migrations_dir.display().to_string());
    output::newline();

    let migrator = open_migrator(settings).await?;
    let report = migrator.up(args.steps).await?;
    print_report(&report);

    Ok(())
}

/// Run `tidemark down` - roll back applied migrations
pub async fn run_down(args: DownArgs, settings: &Settings) -> CliResult<()> {
    output::header("Migrate Down");
    output::kv("Migrations", &settings.migrations_dir.display().to_string());
    output::newline();

    let migrator = open_migrator(settings).await?;
    let report = migrator.down(args.steps).await?;
    print_report(&report);

    Ok(())
}

/// Run `tidemark goto` - move to an exact version
pub async fn run_goto(args: GotoArgs, settings: &Settings) -> CliResult<()> {
    output::header("Migrate Goto");
    output::kv("Target", &args.version);
    output::newline();

    let migrator = open_migrator(settings).await?;
    match migrator.goto(&args.version).await? {
        GotoOutcome::AlreadyAtTarget(version) => {
            success(&format!("Already at version {}", version));
        }
        GotoOutcome::Forward { report, .. } | GotoOutcome::Backward { report, .. } => {
            print_report(&report);
        }
    }

    Ok(())
}

/// Run `tidemark version` - show migration status
pub async fn run_status(settings: &Settings) -> CliResult<()> {
    output::header("Migration Status");

    let migrator = open_migrator(settings).await?;
    let status = migrator.status().await?;
    print_status(&status);

    Ok(())
}

/// Run `tidemark unlock` - remove a stale advisory lock
pub async fn run_unlock(settings: &Settings) -> CliResult<()> {
    output::header("Unlock");

    let migrator = open_migrator(settings).await?;
    if migrator.unlock().await? {
        success("Released migration lock");
    } else {
        output::info("No migration lock was held");
    }

    Ok(())
}

fn print_report(report: &RunReport) {
    if report.is_noop() {
        output::info(&report.summary());
        return;
    }

    let verb = match report.direction {
        tidemark_migrate::Direction::Up => "Applied",
        tidemark_migrate::Direction::Down => "Rolled back",
    };
    let total = report.count();
    for (i, step) in report.steps.iter().enumerate() {
        output::step(
            i + 1,
            total,
            &format!(
                "{} {} {}",
                verb,
                step.file_name,
                output::dim_text(&format!("({}ms)", step.duration_ms))
            ),
        );
    }

    output::newline();
    success(&report.summary());
    output::kv(
        "Current version",
        report.current.as_ref().map(|v| v.as_str()).unwrap_or("none"),
    );
}

fn print_status(status: &StatusReport) {
    output::kv(
        "Current version",
        status
            .current
            .as_ref()
            .map(|v| v.as_str())
            .unwrap_or("none (unmigrated)"),
    );
    output::newline();

    output::section("History");
    if status.history.is_empty() {
        output::dim("  No migrations applied");
    }
    for entry in &status.history {
        let marker = if entry.is_current { "*" } else { " " };
        let description = entry.description.as_deref().unwrap_or("(file missing)");
        let applied_at = entry
            .applied_at
            .as_deref()
            .map(|at| output::dim_text(&format!("applied {}", at)))
            .unwrap_or_default();
        output::list(&format!(
            "  {} {} {} {}",
            marker, entry.version, description, applied_at
        ));
    }
    output::newline();

    output::section("Catalog");
    if status.catalog.is_empty() {
        output::dim("  No migration files found");
    }
    for entry in &status.catalog {
        let state = if entry.applied {
            output::style_success("applied    ")
        } else {
            output::style_pending("not applied")
        };
        output::list(&format!(
            "  {} {} {}",
            state,
            entry.version,
            entry.description.as_deref().unwrap_or("")
        ));
    }

    let pending = status.pending().count();
    output::newline();
    output::kv("Total", &status.catalog.len().to_string());
    output::kv("Applied", &(status.catalog.len() - pending).to_string());
    output::kv("Pending", &pending.to_string());
}
