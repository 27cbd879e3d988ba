//! Migration catalog: discovery of migration file pairs on disk.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use crate::error::{MigrateResult, MigrationError};
use crate::version::Version;

/// Direction of a migration script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Forward script.
    Up,
    /// Backward script.
    Down,
}

impl Direction {
    /// File suffix for this direction, e.g. `.up.sql`.
    pub fn suffix(&self) -> &'static str {
        match self {
            Self::Up => ".up.sql",
            Self::Down => ".down.sql",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
        }
    }
}

/// One migration script on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MigrationScript {
    /// Full path to the script.
    pub path: PathBuf,
    /// File name without directories.
    pub file_name: String,
    /// Version parsed from the file name.
    pub version: Version,
    /// Free-text label between the first `_` and the direction suffix.
    pub description: String,
    /// Script direction.
    pub direction: Direction,
}

impl MigrationScript {
    /// Parse a file name of the form `{version}_{description}.{up|down}.sql`.
    ///
    /// Returns `Ok(None)` for files that are not migration scripts.
    pub fn parse(path: &Path) -> MigrateResult<Option<Self>> {
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            return Ok(None);
        };

        let (stem, direction) = if let Some(stem) = file_name.strip_suffix(Direction::Up.suffix())
        {
            (stem, Direction::Up)
        } else if let Some(stem) = file_name.strip_suffix(Direction::Down.suffix()) {
            (stem, Direction::Down)
        } else {
            return Ok(None);
        };

        let Some((raw_version, description)) = stem.split_once('_') else {
            return Err(MigrationError::InvalidMigrationName(file_name.to_string()));
        };

        let version = Version::parse(raw_version)
            .map_err(|_| MigrationError::InvalidMigrationName(file_name.to_string()))?;

        Ok(Some(Self {
            path: path.to_path_buf(),
            file_name: file_name.to_string(),
            version,
            description: description.to_string(),
            direction,
        }))
    }

    /// Read the script's SQL text.
    pub async fn read_sql(&self) -> MigrateResult<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| MigrationError::FileRead {
                path: self.path.clone(),
                source,
            })
    }
}

/// The version part of a migration file name: everything before the first `_`.
///
/// Returns `None` when there is no `_` or the prefix is not a valid version.
pub fn version_of(file_name: &str) -> Option<Version> {
    let (raw, _) = file_name.split_once('_')?;
    Version::parse(raw).ok()
}

/// Snapshot of the migrations directory.
///
/// Scripts are kept sorted by version, then direction, then file name.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    scripts: Vec<MigrationScript>,
}

impl Catalog {
    /// Build a catalog from already-parsed scripts.
    pub fn from_scripts(mut scripts: Vec<MigrationScript>) -> Self {
        scripts.sort_by(|a, b| {
            (&a.version, a.direction, &a.file_name).cmp(&(&b.version, b.direction, &b.file_name))
        });
        Self { scripts }
    }

    /// All scripts.
    pub fn scripts(&self) -> &[MigrationScript] {
        &self.scripts
    }

    /// Forward scripts, ascending by version.
    pub fn up_files(&self) -> impl Iterator<Item = &MigrationScript> {
        self.scripts.iter().filter(|s| s.direction == Direction::Up)
    }

    /// Backward scripts, ascending by version.
    pub fn down_files(&self) -> impl Iterator<Item = &MigrationScript> {
        self.scripts.iter().filter(|s| s.direction == Direction::Down)
    }

    /// Every version with at least one script, ascending and deduplicated.
    pub fn versions(&self) -> Vec<Version> {
        self.scripts
            .iter()
            .map(|s| s.version.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Whether `version` has any script.
    pub fn contains(&self, version: &Version) -> bool {
        self.scripts.iter().any(|s| &s.version == version)
    }

    /// The script for `version` in `direction`.
    ///
    /// More than one match is a [`MigrationError::DuplicateMigrationFile`].
    pub fn find(
        &self,
        version: &Version,
        direction: Direction,
    ) -> MigrateResult<Option<&MigrationScript>> {
        let mut matches = self
            .scripts
            .iter()
            .filter(|s| &s.version == version && s.direction == direction);

        let first = matches.next();
        let rest: Vec<_> = matches.collect();
        match first {
            Some(first) if !rest.is_empty() => Err(MigrationError::DuplicateMigrationFile {
                version: version.to_string(),
                direction,
                files: std::iter::once(first)
                    .chain(rest)
                    .map(|s| s.file_name.clone())
                    .collect(),
            }),
            other => Ok(other),
        }
    }

    /// Description of a version, taken from its up script or else its down script.
    pub fn description_of(&self, version: &Version) -> Option<&str> {
        self.up_files()
            .find(|s| &s.version == version)
            .or_else(|| self.down_files().find(|s| &s.version == version))
            .map(|s| s.description.as_str())
    }
}

/// A freshly created migration pair.
#[derive(Debug, Clone)]
pub struct CreatedMigration {
    /// Version stamped on the pair.
    pub version: Version,
    /// Path of the up script.
    pub up_path: PathBuf,
    /// Path of the down script.
    pub down_path: PathBuf,
}

/// Reader/writer for the migrations directory.
pub struct MigrationCatalog {
    /// Directory where migrations are stored.
    migrations_dir: PathBuf,
}

impl MigrationCatalog {
    /// Create a catalog over a directory.
    pub fn new(migrations_dir: impl Into<PathBuf>) -> Self {
        Self {
            migrations_dir: migrations_dir.into(),
        }
    }

    /// Get the migrations directory.
    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    /// Scan the directory recursively and build a [`Catalog`].
    pub async fn load(&self) -> MigrateResult<Catalog> {
        let metadata = tokio::fs::metadata(&self.migrations_dir)
            .await
            .map_err(|e| MigrationError::catalog_unavailable(&self.migrations_dir, e))?;
        if !metadata.is_dir() {
            return Err(MigrationError::catalog_unavailable(
                &self.migrations_dir,
                "not a directory",
            ));
        }

        let mut scripts = Vec::new();
        let mut pending = vec![self.migrations_dir.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| MigrationError::catalog_unavailable(&dir, e))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| MigrationError::catalog_unavailable(&dir, e))?
            {
                let path = entry.path();
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| MigrationError::catalog_unavailable(&dir, e))?;

                if file_type.is_dir() {
                    pending.push(path);
                } else if let Some(script) = MigrationScript::parse(&path)? {
                    scripts.push(script);
                }
            }
        }

        debug!(
            dir = %self.migrations_dir.display(),
            scripts = scripts.len(),
            "Scanned migrations directory"
        );
        Ok(Catalog::from_scripts(scripts))
    }

    /// Write a new up/down pair stamped with the current time.
    pub async fn create(&self, name: &str) -> MigrateResult<CreatedMigration> {
        self.create_at(name, Utc::now()).await
    }

    /// Write a new up/down pair stamped with `at`.
    pub async fn create_at(&self, name: &str, at: DateTime<Utc>) -> MigrateResult<CreatedMigration> {
        let name = name.trim();
        if name.is_empty() || name.contains(['/', '\\']) {
            return Err(MigrationError::InvalidMigrationName(name.to_string()));
        }

        tokio::fs::create_dir_all(&self.migrations_dir).await?;

        let version = Version::from_datetime(at);
        let base = format!("{}_{}", version, name);
        let up_path = self.migrations_dir.join(format!("{}{}", base, Direction::Up.suffix()));
        let down_path = self
            .migrations_dir
            .join(format!("{}{}", base, Direction::Down.suffix()));

        let header = |direction: Direction| {
            format!(
                "-- Migration: {} ({})\n-- Version: {}\n-- Created at: {}\n\n",
                name,
                direction.label(),
                version,
                at.format("%Y-%m-%d %H:%M:%S UTC")
            )
        };

        write_new(&up_path, &header(Direction::Up)).await?;
        if let Err(e) = write_new(&down_path, &header(Direction::Down)).await {
            // Never leave half a pair behind
            if let Err(cleanup) = tokio::fs::remove_file(&up_path).await {
                warn!(path = %up_path.display(), error = %cleanup, "Failed to remove up script");
            }
            return Err(e.into());
        }

        debug!(version = %version, name = %name, "Created migration pair");
        Ok(CreatedMigration {
            version,
            up_path,
            down_path,
        })
    }
}

/// Create `path` with `content`, failing if it already exists.
async fn write_new(path: &Path, content: &str) -> std::io::Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await?;
    file.write_all(content.as_bytes()).await?;
    file.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn v(raw: &str) -> Version {
        Version::parse(raw).unwrap()
    }

    #[test]
    fn test_parse_script_name() {
        let script = MigrationScript::parse(Path::new("m/20231215120000_create_users.up.sql"))
            .unwrap()
            .unwrap();
        assert_eq!(script.version, v("20231215120000"));
        assert_eq!(script.description, "create_users");
        assert_eq!(script.direction, Direction::Up);
        assert_eq!(script.file_name, "20231215120000_create_users.up.sql");
    }

    #[test]
    fn test_parse_ignores_other_files() {
        assert!(MigrationScript::parse(Path::new("README.md")).unwrap().is_none());
        assert!(MigrationScript::parse(Path::new("20231215120000_x.sql")).unwrap().is_none());
    }

    #[test]
    fn test_parse_rejects_malformed_names() {
        assert!(MigrationScript::parse(Path::new("nounderscore.up.sql")).is_err());
        assert!(MigrationScript::parse(Path::new("9_short.up.sql")).is_err());
    }

    #[test]
    fn test_version_of() {
        assert_eq!(version_of("20240101000000_a_b.up.sql"), Some(v("20240101000000")));
        assert_eq!(version_of("20240101000000.up.sql"), None);
        assert_eq!(version_of("abc_x.up.sql"), None);
    }

    fn script(version: &str, desc: &str, direction: Direction) -> MigrationScript {
        let file_name = format!("{}_{}{}", version, desc, direction.suffix());
        MigrationScript {
            path: PathBuf::from(&file_name),
            file_name,
            version: v(version),
            description: desc.to_string(),
            direction,
        }
    }

    #[test]
    fn test_versions_union_and_order() {
        let catalog = Catalog::from_scripts(vec![
            script("20240103000000", "c", Direction::Up),
            script("20240101000000", "a", Direction::Down),
            script("20240102000000", "b", Direction::Up),
            script("20240102000000", "b", Direction::Down),
        ]);
        assert_eq!(
            catalog.versions(),
            vec![v("20240101000000"), v("20240102000000"), v("20240103000000")]
        );
        assert_eq!(catalog.up_files().count(), 2);
        assert_eq!(catalog.down_files().count(), 2);
        assert_eq!(catalog.description_of(&v("20240101000000")), Some("a"));
    }

    #[test]
    fn test_find_duplicate_is_error() {
        let catalog = Catalog::from_scripts(vec![
            script("20240101000000", "one", Direction::Down),
            script("20240101000000", "two", Direction::Down),
        ]);
        let err = catalog.find(&v("20240101000000"), Direction::Down).unwrap_err();
        assert!(matches!(err, MigrationError::DuplicateMigrationFile { .. }));
        assert!(catalog.find(&v("20240101000000"), Direction::Up).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_scans_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("2024");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(dir.path().join("20240101000000_init.up.sql"), "SELECT 1;").unwrap();
        std::fs::write(nested.join("20240102000000_more.down.sql"), "SELECT 1;").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let catalog = MigrationCatalog::new(dir.path()).load().await.unwrap();
        assert_eq!(
            catalog.versions(),
            vec![v("20240101000000"), v("20240102000000")]
        );
    }

    #[tokio::test]
    async fn test_load_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = MigrationCatalog::new(dir.path().join("missing"))
            .load()
            .await
            .unwrap_err();
        assert!(matches!(err, MigrationError::CatalogUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_create_writes_pair_with_headers() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = MigrationCatalog::new(dir.path().join("migrations"));
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();

        let created = catalog.create_at("add_users_table", at).await.unwrap();
        assert_eq!(created.version, v("20240506070809"));
        assert!(created.up_path.ends_with("20240506070809_add_users_table.up.sql"));

        let up = std::fs::read_to_string(&created.up_path).unwrap();
        assert!(up.starts_with("-- Migration: add_users_table (UP)"));
        assert!(up.contains("-- Version: 20240506070809"));
        let down = std::fs::read_to_string(&created.down_path).unwrap();
        assert!(down.contains("(DOWN)"));

        // Same second, same name: refuse to overwrite.
        assert!(catalog.create_at("add_users_table", at).await.is_err());
    }

    #[tokio::test]
    async fn test_create_rejects_bad_names() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = MigrationCatalog::new(dir.path());
        assert!(catalog.create("").await.is_err());
        assert!(catalog.create("../escape").await.is_err());
    }

    #[tokio::test]
    async fn test_create_keeps_pairs_whole() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = MigrationCatalog::new(dir.path());
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let down = dir.path().join("20240506070809_add_index.down.sql");
        std::fs::write(&down, "-- hand written\n").unwrap();

        assert!(catalog.create_at("add_index", at).await.is_err());
        assert!(!dir.path().join("20240506070809_add_index.up.sql").exists());
        assert_eq!(std::fs::read_to_string(&down).unwrap(), "-- hand written\n");
    }
}
