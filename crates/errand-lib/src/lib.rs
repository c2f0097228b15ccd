//! Errand library entry points.
//!
//! This crate locates and loads a POI database, answers nearest-category
//! queries through a [`SpatialBackend`], and composes the selected stops into
//! a route whose path, length, enclosed area and perimeter it can measure.
//! Higher-level consumers (the CLI) should only depend on the functions
//! exported here instead of reimplementing behavior.
//!

#![deny(warnings)]

pub mod backend;
pub mod compose;
pub mod dataset;
pub mod db;
pub mod error;
pub mod filter;
pub mod format;
pub mod geometry;
pub mod output;
pub mod routing;
pub mod spatial;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use backend::{LocalBackend, SpatialBackend};
pub use compose::{
    close_path, compose_route, enclosed_area, path_length, perimeter, select_nearest,
    shops_within, suggest_names, to_path, AreaGeometry, PathGeometry, Route, StopSelection,
};
pub use dataset::{default_database_path, resolve_database, DatabasePaths, DATABASE_ENV_VAR};
pub use db::{load_pois, Address, Poi, PoiId, PoiStore};
pub use error::{Error, Result};
pub use filter::{CategoryFilter, TagKey};
pub use format::{
    detect_format, from_text, from_text_with_srid, position_from_text, position_to_text, to_text,
    GeometryFormat,
};
pub use geometry::{BoundaryRule, Metric, Position, EARTH_RADIUS_METERS, WGS84_SRID};
pub use output::{ErrandSummary, PoiSummary, StopSummary, SummaryRenderMode};
pub use routing::{
    plan_errand, ErrandPlan, ErrandRequest, DEFAULT_ORIGIN, DEFAULT_RADIUS_METERS,
};
pub use spatial::{spatial_index_path, try_load_index_file, try_load_spatial_index, PoiIndex};
