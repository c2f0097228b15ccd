// Module exports for CLI subcommands
//
// Each module handles a specific CLI subcommand. main.rs parses arguments and
// dispatches to these handlers.

pub mod convert;
pub mod index;
pub mod nearest;
pub mod route;
pub mod within;

use std::path::Path;

use anyhow::{Context, Result};

use errand_lib::{resolve_database, Error as LibError, LocalBackend, Metric, DATABASE_ENV_VAR};

/// Resolve and load the POI database, reusing a cached spatial index when present.
pub fn open_backend(target: Option<&Path>) -> Result<LocalBackend> {
    let paths = resolve_database(target).map_err(friendly_error)?;
    LocalBackend::open_paths(&paths)
        .map_err(friendly_error)
        .with_context(|| format!("failed to load POIs from {}", paths.database.display()))
}

/// Metric implied by the `--planar-srid` flag.
pub fn metric_for(planar_srid: Option<u32>) -> Metric {
    match planar_srid {
        Some(srid) => Metric::Planar { srid },
        None => Metric::Spherical,
    }
}

/// Add actionable hints to library errors users commonly hit.
pub fn friendly_error(err: LibError) -> anyhow::Error {
    match err {
        LibError::DatabaseNotFound { path } => anyhow::anyhow!(
            "POI database not found at {}. Pass --database or set {}.",
            path.display(),
            DATABASE_ENV_VAR
        ),
        LibError::UnsupportedSchema => anyhow::anyhow!(
            "{} Expected a 'pois' table with lon/lat (or coordinates) columns.",
            LibError::UnsupportedSchema
        ),
        other => anyhow::Error::new(other),
    }
}
