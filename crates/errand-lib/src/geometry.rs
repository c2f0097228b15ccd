//! Geometric primitives consumed by the route composer.
//!
//! Every measurement is parameterised by a [`Metric`]. `Metric::Spherical`
//! treats coordinates as WGS84 longitude/latitude and measures great-circle
//! metres on a sphere of mean Earth radius, the way a GEOGRAPHY column does.
//! `Metric::Planar` treats them as flat Cartesian coordinates in the units of
//! the tagged SRID, the way a GEOMETRY column does.

use std::fmt;
use std::str::FromStr;

use geo::{
    Area, ChamberlainDuquetteArea, Contains, Coord, EuclideanDistance, EuclideanLength,
    HaversineDistance, HaversineLength, Intersects, LineString, Point, Polygon,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Mean Earth radius in metres, matching the radius used by `geo`'s haversine code.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// SRID of WGS84 longitude/latitude.
pub const WGS84_SRID: u32 = 4326;

/// A geographic position, longitude first.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lon: f64,
    pub lat: f64,
}

impl Position {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Build a position after checking it lies in the longitude/latitude domain.
    pub fn checked(lon: f64, lat: f64) -> Result<Self> {
        let position = Self { lon, lat };
        if !position.is_geographic() {
            return Err(Error::InvalidPosition { lon, lat });
        }
        Ok(position)
    }

    /// True when the coordinates are a finite WGS84 longitude/latitude pair.
    pub fn is_geographic(self) -> bool {
        self.lon.is_finite()
            && self.lat.is_finite()
            && self.lon.abs() <= 180.0
            && self.lat.abs() <= 90.0
    }

    /// Check the position can be measured under `metric`.
    ///
    /// Spherical measurement needs longitude/latitude; planar coordinates only
    /// need to be finite.
    pub fn validate_for(self, metric: Metric) -> Result<Self> {
        let valid = match metric {
            Metric::Spherical => self.is_geographic(),
            Metric::Planar { .. } => self.lon.is_finite() && self.lat.is_finite(),
        };
        if valid {
            Ok(self)
        } else {
            Err(Error::InvalidPosition {
                lon: self.lon,
                lat: self.lat,
            })
        }
    }

    pub fn to_point(self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    /// Cartesian coordinates of this position on the unit sphere.
    pub fn unit_vector(self) -> [f64; 3] {
        let lon = self.lon.to_radians();
        let lat = self.lat.to_radians();
        [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()]
    }
}

impl From<Position> for Point<f64> {
    fn from(position: Position) -> Self {
        position.to_point()
    }
}

impl From<Position> for Coord<f64> {
    fn from(position: Position) -> Self {
        Coord {
            x: position.lon,
            y: position.lat,
        }
    }
}

impl From<Point<f64>> for Position {
    fn from(point: Point<f64>) -> Self {
        Position::new(point.x(), point.y())
    }
}

impl From<Coord<f64>> for Position {
    fn from(coord: Coord<f64>) -> Self {
        Position::new(coord.x, coord.y)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.lon, self.lat)
    }
}

/// Parses `LON,LAT` (or `X,Y` for projected coordinates).
///
/// Only finiteness is checked here; the longitude/latitude range depends on
/// the metric and is enforced by [`Position::validate_for`].
impl FromStr for Position {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = || Error::GeometryFormat {
            message: format!("expected LON,LAT but got '{input}'"),
        };
        let (lon, lat) = input.split_once(',').ok_or_else(invalid)?;
        let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;
        let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
        if !lon.is_finite() || !lat.is_finite() {
            return Err(invalid());
        }
        Ok(Position::new(lon, lat))
    }
}

/// Coordinate system choice for every distance, length and area computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Metric {
    /// Great-circle metres over WGS84 longitude/latitude.
    #[default]
    Spherical,
    /// Euclidean distance in the coordinate units of `srid`.
    Planar { srid: u32 },
}

impl Metric {
    pub fn srid(self) -> u32 {
        match self {
            Metric::Spherical => WGS84_SRID,
            Metric::Planar { srid } => srid,
        }
    }

    /// Unit label used when rendering lengths.
    pub fn length_unit(self) -> &'static str {
        match self {
            Metric::Spherical => "m",
            Metric::Planar { .. } => "units",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Spherical => f.write_str("spherical"),
            Metric::Planar { srid } => write!(f, "planar (SRID {srid})"),
        }
    }
}

/// How points lying exactly on a polygon boundary are treated by [`contains`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryRule {
    /// OGC `ST_CONTAINS`: boundary points are outside.
    #[default]
    Exclusive,
    /// Boundary points are inside (`ST_COVERS`).
    Inclusive,
}

impl fmt::Display for BoundaryRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BoundaryRule::Exclusive => "exclusive",
            BoundaryRule::Inclusive => "inclusive",
        })
    }
}

impl FromStr for BoundaryRule {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        match input.to_ascii_lowercase().as_str() {
            "exclusive" => Ok(BoundaryRule::Exclusive),
            "inclusive" => Ok(BoundaryRule::Inclusive),
            other => Err(Error::InvalidFilter {
                input: other.to_string(),
                reason: "boundary rule must be 'exclusive' or 'inclusive'".to_string(),
            }),
        }
    }
}

/// Distance between two positions under `metric`.
pub fn distance(a: Position, b: Position, metric: Metric) -> f64 {
    match metric {
        Metric::Spherical => a.to_point().haversine_distance(&b.to_point()),
        Metric::Planar { .. } => a.to_point().euclidean_distance(&b.to_point()),
    }
}

/// True when `b` lies within `limit` of `a`, inclusive.
pub fn within_distance(a: Position, b: Position, limit: f64, metric: Metric) -> bool {
    distance(a, b, metric) <= limit
}

/// Join positions in order into a line.
pub fn make_line(positions: &[Position]) -> Result<LineString<f64>> {
    if positions.len() < 2 {
        return Err(Error::InsufficientPoints {
            count: positions.len(),
        });
    }
    Ok(positions.iter().copied().map(Coord::from).collect())
}

/// True when the line has at least two coordinates and its ends coincide exactly.
pub fn is_closed(line: &LineString<f64>) -> bool {
    match (line.0.first(), line.0.last()) {
        (Some(first), Some(last)) => line.0.len() >= 2 && first == last,
        _ => false,
    }
}

/// Turn a closed line into a polygon with no holes.
pub fn make_polygon(line: &LineString<f64>) -> Result<Polygon<f64>> {
    if !is_closed(line) {
        return Err(Error::NotClosed);
    }
    Ok(Polygon::new(line.clone(), Vec::new()))
}

pub fn length(line: &LineString<f64>, metric: Metric) -> f64 {
    match metric {
        Metric::Spherical => line.haversine_length(),
        Metric::Planar { .. } => line.euclidean_length(),
    }
}

/// Total boundary length of a polygon, holes included.
pub fn perimeter(polygon: &Polygon<f64>, metric: Metric) -> f64 {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(|ring| length(ring, metric))
        .sum()
}

/// Unsigned area; square metres for `Metric::Spherical`.
pub fn area(polygon: &Polygon<f64>, metric: Metric) -> f64 {
    match metric {
        Metric::Spherical => polygon.chamberlain_duquette_unsigned_area(),
        Metric::Planar { .. } => polygon.unsigned_area(),
    }
}

pub fn contains(polygon: &Polygon<f64>, position: Position, rule: BoundaryRule) -> bool {
    let point = position.to_point();
    match rule {
        BoundaryRule::Exclusive => polygon.contains(&point),
        BoundaryRule::Inclusive => polygon.intersects(&point),
    }
}

/// Chord length on the unit sphere subtending a great-circle distance of `meters`.
pub(crate) fn unit_chord(meters: f64) -> f64 {
    let angle = (meters / EARTH_RADIUS_METERS).min(std::f64::consts::PI);
    2.0 * (angle / 2.0).sin()
}
