//! Integration tests for the Tidemark CLI

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// A scratch project with a SQLite database and a migrations directory
struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("db/migrations")).unwrap();
        Self { dir }
    }

    /// Project with three create-table migrations
    fn with_migrations() -> Self {
        let project = Self::new();
        project.migration("20240101000000", "create_users", "CREATE TABLE users (id INTEGER PRIMARY KEY, email TEXT);", "DROP TABLE users;");
        project.migration("20240102000000", "create_posts", "CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT);", "DROP TABLE posts;");
        project.migration("20240103000000", "create_tags", "CREATE TABLE tags (id INTEGER PRIMARY KEY, name TEXT);", "DROP TABLE tags;");
        project
    }

    fn migration(&self, version: &str, name: &str, up: &str, down: &str) {
        let dir = self.migrations_dir();
        fs::write(dir.join(format!("{version}_{name}.up.sql")), up).unwrap();
        fs::write(dir.join(format!("{version}_{name}.down.sql")), down).unwrap();
    }

    fn path(&self) -> &std::path::Path {
        self.dir.path()
    }

    fn migrations_dir(&self) -> PathBuf {
        self.path().join("db/migrations")
    }

    fn database_url(&self) -> String {
        format!("sqlite://{}", self.path().join("app.db").display())
    }

    /// `tidemark` running inside the project against its database
    fn cmd(&self) -> Command {
        let mut cmd = tidemark_cmd();
        cmd.current_dir(self.path())
            .env_remove("DATABASE_URL")
            .env("DATABASE_URL", self.database_url());
        cmd
    }
}

/// Get the tidemark binary
#[allow(deprecated)]
fn tidemark_cmd() -> Command {
    Command::cargo_bin("tidemark").unwrap()
}

#[test]
fn test_help_command() {
    tidemark_cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Tidemark"))
        .stdout(predicate::str::contains("create"))
        .stdout(predicate::str::contains("up"))
        .stdout(predicate::str::contains("down"))
        .stdout(predicate::str::contains("goto"))
        .stdout(predicate::str::contains("import"))
        .stdout(predicate::str::contains("export"));
}

#[test]
fn test_goto_help() {
    tidemark_cmd()
        .args(["goto", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("exact version"))
        .stdout(predicate::str::contains("--database-url"));
}

#[test]
fn test_invalid_command() {
    tidemark_cmd()
        .arg("invalid-command")
        .assert()
        .failure()
        .stderr(predicate::str::contains("error"));
}

#[test]
fn test_create_writes_pair() {
    let project = Project::new();

    project
        .cmd()
        .args(["create", "add_users"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created migration"));

    let files: Vec<String> = fs::read_dir(project.migrations_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files.len(), 2);
    assert!(files.iter().any(|f| f.ends_with("_add_users.up.sql")));
    assert!(files.iter().any(|f| f.ends_with("_add_users.down.sql")));

    let up = files.iter().find(|f| f.ends_with(".up.sql")).unwrap();
    let content = fs::read_to_string(project.migrations_dir().join(up)).unwrap();
    assert!(content.starts_with("-- Migration: add_users (UP)\n-- Version: "));
}

#[test]
fn test_create_rejects_path_separators() {
    let project = Project::new();

    project
        .cmd()
        .args(["create", "../escape"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Invalid migration file name"));
}

#[test]
fn test_up_applies_all_and_reports_status() {
    let project = Project::with_migrations();

    project
        .cmd()
        .arg("up")
        .assert()
        .success()
        .stdout(predicate::str::contains("20240101000000_create_users.up.sql"))
        .stdout(predicate::str::contains("Applied 3 migration(s)"));

    project
        .cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("* 20240103000000 create_tags"))
        .stdout(predicate::str::contains("20240101000000 create_users"));

    project
        .cmd()
        .arg("up")
        .assert()
        .success()
        .stdout(predicate::str::contains("No pending migrations"));
}

#[test]
fn test_up_steps_then_goto_both_directions() {
    let project = Project::with_migrations();

    project.cmd().args(["up", "2"]).assert().success();
    project
        .cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("* 20240102000000 create_posts"));

    project
        .cmd()
        .args(["goto", "20240103000000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("20240103000000_create_tags.up.sql"))
        .stdout(predicate::str::contains("Applied 1 migration(s)"));

    project
        .cmd()
        .args(["goto", "20240101000000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("20240103000000_create_tags.down.sql"))
        .stdout(predicate::str::contains("20240102000000_create_posts.down.sql"))
        .stdout(predicate::str::contains("Rolled back 2 migration(s)"));

    project
        .cmd()
        .args(["goto", "20240101000000"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Already at version 20240101000000"));
}

#[test]
fn test_down_with_nothing_applied() {
    let project = Project::with_migrations();

    project
        .cmd()
        .arg("down")
        .assert()
        .success()
        .stdout(predicate::str::contains("Nothing to roll back"));
}

#[test]
fn test_down_more_steps_than_applied() {
    let project = Project::with_migrations();

    project.cmd().args(["up", "2"]).assert().success();
    project
        .cmd()
        .args(["down", "10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rolled back 2 migration(s)"));
}

#[test]
fn test_goto_unknown_version_fails() {
    let project = Project::with_migrations();

    project
        .cmd()
        .args(["goto", "99999999999999"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Target version 99999999999999 does not exist"));
}

#[test]
fn test_failed_migration_names_file_and_keeps_earlier_steps() {
    let project = Project::with_migrations();
    project.migration("20240104000000", "broken", "CREATE TABLEX nope;", "SELECT 1;");

    project
        .cmd()
        .arg("up")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("20240104000000_broken.up.sql"));

    project
        .cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("* 20240103000000 create_tags"));
}

#[test]
fn test_missing_rollback_file() {
    let project = Project::with_migrations();
    project.cmd().arg("up").assert().success();
    fs::remove_file(
        project
            .migrations_dir()
            .join("20240103000000_create_tags.down.sql"),
    )
    .unwrap();

    project
        .cmd()
        .arg("down")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No rollback file found for version 20240103000000"));
}

#[test]
fn test_missing_migrations_directory() {
    let project = Project::new();
    fs::remove_dir_all(project.migrations_dir()).unwrap();

    project
        .cmd()
        .arg("up")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("is unavailable"));
}

#[test]
fn test_missing_database_url() {
    let project = Project::with_migrations();

    tidemark_cmd()
        .current_dir(project.path())
        .env_remove("DATABASE_URL")
        .arg("up")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no database URL"));
}

#[test]
fn test_config_file_supplies_settings() {
    let project = Project::new();
    let custom = project.path().join("sql");
    fs::create_dir_all(&custom).unwrap();
    fs::write(
        custom.join("20240101000000_init.up.sql"),
        "CREATE TABLE t (x INTEGER);",
    )
    .unwrap();
    fs::write(custom.join("20240101000000_init.down.sql"), "DROP TABLE t;").unwrap();
    fs::write(
        project.path().join("tidemark.toml"),
        format!(
            "[database]\nurl = \"{}\"\n\n[migrations]\ndirectory = \"sql\"\ntable_name = \"_versions\"\n",
            project.database_url()
        ),
    )
    .unwrap();

    tidemark_cmd()
        .current_dir(project.path())
        .env_remove("DATABASE_URL")
        .arg("up")
        .assert()
        .success()
        .stdout(predicate::str::contains("20240101000000_init.up.sql"));

    // The custom tracking table is skipped by export
    let dump = project.path().join("dump.sql");
    tidemark_cmd()
        .current_dir(project.path())
        .env_remove("DATABASE_URL")
        .args(["export", "sql"])
        .arg(&dump)
        .assert()
        .success();
    let content = fs::read_to_string(&dump).unwrap();
    assert!(content.contains("-- Table: t\n"));
    assert!(!content.contains("_versions"));
}

#[test]
fn test_named_config_file_must_exist() {
    let project = Project::with_migrations();

    project
        .cmd()
        .args(["--config", "missing.toml", "up"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("missing.toml"));

    assert!(!project.path().join("app.db").exists());
}

#[test]
fn test_up_with_script_owned_transaction() {
    let project = Project::new();
    project.migration("20240101000000", "create_items", "CREATE TABLE items (id INTEGER PRIMARY KEY);", "DROP TABLE items;");
    project.migration(
        "20240102000000",
        "rebuild_items",
        "BEGIN TRANSACTION;\nCREATE TABLE items_new (id INTEGER PRIMARY KEY, label TEXT);\nINSERT INTO items_new (id) SELECT id FROM items;\nDROP TABLE items;\nALTER TABLE items_new RENAME TO items;\nCOMMIT;",
        "ALTER TABLE items DROP COLUMN label;",
    );

    project
        .cmd()
        .arg("up")
        .assert()
        .success()
        .stdout(predicate::str::contains("Applied 2 migration(s)"));

    project
        .cmd()
        .args(["--no-transaction", "down"])
        .assert()
        .success()
        .stdout(predicate::str::contains("20240102000000_rebuild_items.down.sql"));

    project
        .cmd()
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("* 20240101000000 create_items"));
}

#[test]
fn test_import_csv_and_export_csv() {
    let project = Project::with_migrations();
    project.cmd().arg("up").assert().success();

    let csv = project.path().join("users.csv");
    fs::write(&csv, "id,email\n1,ada@example.com\n2,\"o'brien@example.com\"\n").unwrap();

    project
        .cmd()
        .arg("import")
        .arg(&csv)
        .assert()
        .success()
        .stdout(predicate::str::contains("Imported 2 row(s) into users"));

    let out = project.path().join("export");
    project
        .cmd()
        .args(["export", "csv"])
        .arg(&out)
        .assert()
        .success();

    let users = fs::read_to_string(out.join("users.csv")).unwrap();
    assert_eq!(users, "id,email\n1,ada@example.com\n2,o'brien@example.com\n");
    assert!(out.join("posts.csv").exists());
    assert!(!out.join("schema_migrations.csv").exists());
}

#[test]
fn test_import_unsupported_format() {
    let project = Project::new();
    let file = project.path().join("data.json");
    fs::write(&file, "{}").unwrap();

    project
        .cmd()
        .arg("import")
        .arg(&file)
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unsupported format: .json"));
}

#[test]
fn test_export_unsupported_format() {
    let project = Project::new();

    project
        .cmd()
        .args(["export", "xml", "out.xml"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Unsupported format: xml"));
}

#[test]
fn test_lock_blocks_and_unlock_releases() {
    let project = Project::with_migrations();

    // Simulate a lock left behind by another process
    let seed = project.path().join("lock.sql");
    fs::write(
        &seed,
        "CREATE TABLE schema_migrations_lock (\n\
         id INTEGER NOT NULL PRIMARY KEY,\n\
         owner TEXT NOT NULL,\n\
         locked_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP);\n\
         INSERT INTO schema_migrations_lock (id, owner) VALUES (1, 'ci-runner:42');",
    )
    .unwrap();
    project.cmd().arg("import").arg(&seed).assert().success();

    project
        .cmd()
        .args(["up", "--lock"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("held by ci-runner:42"));

    project
        .cmd()
        .arg("unlock")
        .assert()
        .success()
        .stdout(predicate::str::contains("Released migration lock"));

    project
        .cmd()
        .args(["up", "--lock"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Applied 3 migration(s)"));

    project
        .cmd()
        .arg("unlock")
        .assert()
        .success()
        .stdout(predicate::str::contains("No migration lock was held"));
}
