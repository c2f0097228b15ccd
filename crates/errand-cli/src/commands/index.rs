//! Index build command handler.

use std::path::Path;

use anyhow::{Context, Result};

use errand_lib::{load_pois, resolve_database, spatial_index_path, PoiIndex};

use crate::commands::friendly_error;

/// Arguments for the index-build command.
#[derive(Debug, Clone)]
pub struct IndexBuildArgs {
    /// Force rebuild even if index already exists.
    pub force: bool,
}

/// Handle the index-build subcommand.
///
/// Builds the POI index next to the database so later commands skip the build.
pub fn handle_index_build(target: Option<&Path>, args: &IndexBuildArgs) -> Result<()> {
    let paths = resolve_database(target).map_err(friendly_error)?;

    if let (Some(existing), false) = (&paths.spatial_index, args.force) {
        println!(
            "Spatial index already exists at {}\nUse --force to rebuild.",
            existing.display()
        );
        return Ok(());
    }
    let index_path = spatial_index_path(&paths.database);

    println!("Loading POIs from {}...", paths.database.display());
    let store = load_pois(&paths.database)
        .map_err(friendly_error)
        .with_context(|| format!("failed to load POIs from {}", paths.database.display()))?;

    println!("Building spatial index for {} POIs...", store.len());
    let index = PoiIndex::build(&store);

    println!("Saving index to {}...", index_path.display());
    index
        .save(&index_path)
        .context("failed to save spatial index")?;

    let file_size = std::fs::metadata(&index_path).map(|m| m.len()).unwrap_or(0);

    println!("Spatial index built successfully:");
    println!("  Path: {}", index_path.display());
    println!("  POIs indexed: {}", index.len());
    println!("  File size: {} bytes", file_size);

    Ok(())
}
