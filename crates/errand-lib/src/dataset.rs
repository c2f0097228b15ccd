use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use tracing::debug;

use crate::error::{Error, Result};
use crate::spatial::spatial_index_path;

/// Default filename for the POI database.
const DATABASE_FILENAME: &str = "pois.db";

/// Environment variable overriding the database location.
pub const DATABASE_ENV_VAR: &str = "ERRAND_DATABASE";

/// Paths to the POI database and its companion files.
#[derive(Debug, Clone)]
pub struct DatabasePaths {
    /// Path to the SQLite database file.
    pub database: PathBuf,
    /// Path to the spatial index file, if it exists.
    pub spatial_index: Option<PathBuf>,
}

impl DatabasePaths {
    /// Create paths for a database, checking for an existing spatial index.
    pub fn for_database(database: PathBuf) -> Self {
        let index_path = spatial_index_path(&database);
        let spatial_index = index_path.exists().then_some(index_path);
        Self {
            database,
            spatial_index,
        }
    }
}

/// Resolve the default database location using platform-specific project directories.
pub fn default_database_path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("org", "errand", "errand").ok_or(Error::ProjectDirsUnavailable)?;
    Ok(dirs.data_dir().join(DATABASE_FILENAME))
}

/// Locate the POI database.
///
/// Resolution order:
/// 1. Explicit `target` argument when provided.
/// 2. `ERRAND_DATABASE` environment variable.
/// 3. Platform-specific project data directory.
///
/// A directory (or extension-less path) resolves to `pois.db` inside it.
/// Fails with [`Error::DatabaseNotFound`] when the resolved file is missing.
pub fn resolve_database(target: Option<&Path>) -> Result<DatabasePaths> {
    resolve_with(target, env::var_os(DATABASE_ENV_VAR))
}

fn resolve_with(target: Option<&Path>, env_value: Option<OsString>) -> Result<DatabasePaths> {
    let path = match (target, env_value) {
        (Some(explicit), _) => canonical_database_path(explicit),
        (None, Some(value)) if !value.is_empty() => canonical_database_path(Path::new(&value)),
        _ => default_database_path()?,
    };

    if !path.is_file() {
        return Err(Error::DatabaseNotFound { path });
    }
    debug!(path = %path.display(), "resolved POI database");
    Ok(DatabasePaths::for_database(path))
}

fn canonical_database_path(path: &Path) -> PathBuf {
    if path.is_dir() || path.extension().is_none() {
        return path.join(DATABASE_FILENAME);
    }
    path.to_path_buf()
}
