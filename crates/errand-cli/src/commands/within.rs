//! Within command handler: list POIs contained in a user-supplied area.

use std::path::Path;

use anyhow::{Context, Result};

use errand_lib::{
    shops_within, AreaGeometry, BoundaryRule, CategoryFilter, PoiSummary, SpatialBackend,
};

use crate::commands::{friendly_error, open_backend};
use crate::output::{OutputFormat, WithinSummary};

/// Arguments for the within command.
#[derive(Debug, Clone)]
pub struct WithinArgs {
    /// Polygon (or closed line string) in WKT, EWKT, hex WKB or GeoJSON.
    pub area: String,
    pub category: Option<CategoryFilter>,
    pub boundary: BoundaryRule,
}

pub fn handle_within(target: Option<&Path>, args: &WithinArgs, format: OutputFormat) -> Result<()> {
    let area = AreaGeometry::from_text(&args.area).context("failed to parse --area")?;
    let backend = open_backend(target)?;
    let pois = backend.pois().map_err(friendly_error)?;

    let inside = shops_within(&area, &pois, args.category.as_ref(), args.boundary);
    let summary = WithinSummary {
        boundary: args.boundary,
        filter: args.category.as_ref().map(ToString::to_string),
        pois: inside.iter().map(PoiSummary::from_poi).collect(),
    };
    print!("{}", format.render_within(&summary)?);
    Ok(())
}
