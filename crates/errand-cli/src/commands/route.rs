//! Route command handler: select every stop and measure the errand loop.

use std::path::Path;

use anyhow::{Context, Result};

use errand_lib::{
    plan_errand, BoundaryRule, CategoryFilter, ErrandRequest, ErrandSummary, GeometryFormat,
    Position,
};

use crate::commands::{friendly_error, metric_for, open_backend};
use crate::output::OutputFormat;

/// Arguments for the route command.
#[derive(Debug, Clone)]
pub struct RouteCommandArgs {
    /// Category filters, visited in order.
    pub stops: Vec<CategoryFilter>,
    pub origin: Position,
    pub radius: f64,
    pub planar_srid: Option<u32>,
    /// Stop at the last POI instead of returning to the origin.
    pub open: bool,
    /// Fail when a stop finds nothing instead of skipping it.
    pub strict: bool,
    /// List every POI enclosed by the loop.
    pub list_within: bool,
    pub boundary: BoundaryRule,
    pub geometry_format: GeometryFormat,
}

impl RouteCommandArgs {
    fn to_request(&self) -> ErrandRequest {
        ErrandRequest {
            origin: self.origin,
            radius: self.radius,
            stops: self.stops.clone(),
            metric: metric_for(self.planar_srid),
            close_loop: !self.open,
            strict: self.strict,
            boundary: self.boundary,
            list_within: self.list_within,
        }
    }
}

pub fn handle_route(
    target: Option<&Path>,
    args: &RouteCommandArgs,
    format: OutputFormat,
) -> Result<()> {
    let backend = open_backend(target)?;
    let request = args.to_request();

    let plan = plan_errand(&backend, &request).map_err(friendly_error)?;
    let summary = ErrandSummary::from_plan(&plan, args.geometry_format)
        .context("failed to encode the errand path")?;

    if plan.matched_stops() < request.stops.len() {
        tracing::warn!(
            missed = request.stops.len() - plan.matched_stops(),
            "some stops found no POI within the radius"
        );
    }

    print!("{}", format.render_errand(&summary)?);
    Ok(())
}
