//! Nearest command handler: one category, one stop.

use std::path::Path;

use anyhow::Result;

use errand_lib::{select_nearest, CategoryFilter, Position, StopSummary};

use crate::commands::{friendly_error, metric_for, open_backend};
use crate::output::{NearestSummary, OutputFormat};

/// Arguments for the nearest command.
#[derive(Debug, Clone)]
pub struct NearestArgs {
    pub category: CategoryFilter,
    pub origin: Position,
    /// Search radius in metres (coordinate units with a planar SRID).
    pub radius: f64,
    pub planar_srid: Option<u32>,
}

pub fn handle_nearest(target: Option<&Path>, args: &NearestArgs, format: OutputFormat) -> Result<()> {
    let backend = open_backend(target)?;
    let metric = metric_for(args.planar_srid);

    let selection = select_nearest(&backend, args.origin, &args.category, args.radius, metric)
        .map_err(friendly_error)?;

    let summary = NearestSummary {
        origin: args.origin,
        filter: args.category.to_string(),
        radius: args.radius,
        metric,
        unit: metric.length_unit(),
        stop: StopSummary::from_selection(1, &selection),
    };
    print!("{}", format.render_nearest(&summary)?);
    Ok(())
}
