//! Route composer: nearest-stop selection and the path built from it.
//!
//! Every operation here is a pure function of its inputs and the backend
//! snapshot. Selection reads through a [`SpatialBackend`]; path, length, area
//! and containment work on values already in hand.

use geo::{Geometry, LineString, Polygon};
use serde::Serialize;
use strsim::jaro_winkler;
use tracing::debug;

use crate::backend::SpatialBackend;
use crate::db::Poi;
use crate::error::{Error, Result};
use crate::filter::CategoryFilter;
use crate::format;
use crate::geometry::{self, BoundaryRule, Metric, Position};

/// Minimum Jaro-Winkler similarity for a name to be offered as a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// Maximum number of name suggestions attached to a `NoMatch` error.
const MAX_SUGGESTIONS: usize = 3;

/// Outcome of [`select_nearest`] for one category filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StopSelection {
    pub filter: CategoryFilter,
    pub poi: Option<Poi>,
    /// Exact distance from the origin, in the metric's units.
    pub distance: Option<f64>,
}

impl StopSelection {
    pub fn empty(filter: CategoryFilter) -> Self {
        Self {
            filter,
            poi: None,
            distance: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.poi.is_none()
    }

    pub fn position(&self) -> Option<Position> {
        self.poi.as_ref().map(|poi| poi.position)
    }

    /// Distance rounded to two decimals, as reported to users.
    pub fn distance_meters(&self) -> Option<f64> {
        self.distance.map(round_to_hundredths)
    }
}

pub fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Ordered positions to visit; the first is always the origin.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Route {
    positions: Vec<Position>,
}

impl Route {
    pub fn origin(&self) -> Position {
        self.positions[0]
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    /// Positions after the origin.
    pub fn stops(&self) -> &[Position] {
        &self.positions[1..]
    }
}

/// A line through route positions, optionally closed into a loop.
#[derive(Debug, Clone, PartialEq)]
pub struct PathGeometry {
    line: LineString<f64>,
}

impl PathGeometry {
    pub fn line(&self) -> &LineString<f64> {
        &self.line
    }

    pub fn is_closed(&self) -> bool {
        geometry::is_closed(&self.line)
    }

    pub fn positions(&self) -> Vec<Position> {
        self.line.coords().copied().map(Position::from).collect()
    }

    /// Distinct positions in first-seen order.
    pub fn unique_positions(&self) -> Vec<Position> {
        let mut unique: Vec<Position> = Vec::new();
        for position in self.positions() {
            if !unique.contains(&position) {
                unique.push(position);
            }
        }
        unique
    }

    pub fn to_geometry(&self) -> Geometry<f64> {
        Geometry::LineString(self.line.clone())
    }
}

/// Polygon enclosed by a closed path.
#[derive(Debug, Clone, PartialEq)]
pub struct AreaGeometry {
    polygon: Polygon<f64>,
}

impl AreaGeometry {
    /// Build the area enclosed by `path`; fails with `NotClosed` for open paths.
    pub fn from_path(path: &PathGeometry) -> Result<Self> {
        Ok(Self {
            polygon: geometry::make_polygon(&path.line)?,
        })
    }

    /// Wrap an arbitrary polygon, e.g. one parsed from text.
    pub fn from_polygon(polygon: Polygon<f64>) -> Self {
        Self { polygon }
    }

    /// Decode a polygon, or a closed line string, from any supported text format.
    pub fn from_text(text: &str) -> Result<Self> {
        match format::from_text(text)? {
            Geometry::Polygon(polygon) => Ok(Self::from_polygon(polygon)),
            Geometry::LineString(line) => Ok(Self {
                polygon: geometry::make_polygon(&line)?,
            }),
            other => Err(Error::GeometryFormat {
                message: format!(
                    "expected a polygon or closed line string, got {}",
                    format::geometry_kind(&other)
                ),
            }),
        }
    }

    pub fn polygon(&self) -> &Polygon<f64> {
        &self.polygon
    }

    pub fn contains(&self, position: Position, rule: BoundaryRule) -> bool {
        geometry::contains(&self.polygon, position, rule)
    }

    pub fn to_geometry(&self) -> Geometry<f64> {
        Geometry::Polygon(self.polygon.clone())
    }
}

/// Nearest POI matching `filter` within `radius` of `origin`.
///
/// Equidistant candidates resolve to the lowest POI identifier. A filter that
/// matches nothing inside the radius yields an empty selection, not an error.
pub fn select_nearest<B: SpatialBackend + ?Sized>(
    backend: &B,
    origin: Position,
    filter: &CategoryFilter,
    radius: f64,
    metric: Metric,
) -> Result<StopSelection> {
    check_radius(radius)?;
    let origin = origin.validate_for(metric)?;

    let candidates = backend.pois_within(origin, radius, metric, Some(filter))?;
    let candidate_count = candidates.len();

    let nearest = candidates
        .into_iter()
        .filter(|poi| filter.matches(poi))
        .map(|poi| (geometry::distance(origin, poi.position, metric), poi))
        .filter(|(distance, _)| *distance <= radius)
        .min_by(|(da, a), (db, b)| da.total_cmp(db).then(a.id.cmp(&b.id)));

    debug!(
        %filter,
        radius,
        candidates = candidate_count,
        found = nearest.is_some(),
        "selected nearest POI"
    );

    Ok(match nearest {
        Some((distance, poi)) => StopSelection {
            filter: filter.clone(),
            poi: Some(poi),
            distance: Some(distance),
        },
        None => StopSelection::empty(filter.clone()),
    })
}

/// Names of same-category POIs inside the radius that resemble the filter's name.
pub fn suggest_names<B: SpatialBackend + ?Sized>(
    backend: &B,
    origin: Position,
    filter: &CategoryFilter,
    radius: f64,
    metric: Metric,
) -> Result<Vec<String>> {
    let Some(wanted) = filter.name.as_deref() else {
        return Ok(Vec::new());
    };
    let category = CategoryFilter::new(filter.key, filter.value.clone());

    let mut scored: Vec<(f64, String)> = backend
        .pois_within(origin, radius, metric, Some(&category))?
        .into_iter()
        .filter(|poi| geometry::within_distance(origin, poi.position, radius, metric))
        .filter_map(|poi| poi.name)
        .map(|name| (jaro_winkler(wanted, &name), name))
        .filter(|(score, _)| *score >= SUGGESTION_THRESHOLD)
        .collect();

    scored.sort_by(|(sa, na), (sb, nb)| sb.total_cmp(sa).then_with(|| na.cmp(nb)));
    let mut names: Vec<String> = Vec::new();
    for (_, name) in scored {
        if !names.contains(&name) {
            names.push(name);
        }
        if names.len() == MAX_SUGGESTIONS {
            break;
        }
    }
    Ok(names)
}

/// `[origin]` followed by each non-empty selection's position, in input order.
pub fn compose_route(origin: Position, selections: &[StopSelection]) -> Route {
    let positions = std::iter::once(origin)
        .chain(selections.iter().filter_map(StopSelection::position))
        .collect();
    Route { positions }
}

/// Connect route positions in sequence.
pub fn to_path(route: &Route) -> Result<PathGeometry> {
    Ok(PathGeometry {
        line: geometry::make_line(&route.positions)?,
    })
}

/// Connect route positions in sequence and return to the origin.
pub fn close_path(route: &Route) -> Result<PathGeometry> {
    if route.positions.len() < 2 {
        return Err(Error::InsufficientPoints {
            count: route.positions.len(),
        });
    }
    let mut positions = route.positions.clone();
    positions.push(route.origin());
    Ok(PathGeometry {
        line: geometry::make_line(&positions)?,
    })
}

pub fn path_length(path: &PathGeometry, metric: Metric) -> f64 {
    geometry::length(&path.line, metric)
}

/// Area enclosed by a closed path; square metres under `Metric::Spherical`.
pub fn enclosed_area(path: &PathGeometry, metric: Metric) -> Result<f64> {
    let area = AreaGeometry::from_path(path)?;
    Ok(geometry::area(&area.polygon, metric))
}

pub fn perimeter(path: &PathGeometry, metric: Metric) -> Result<f64> {
    let area = AreaGeometry::from_path(path)?;
    Ok(geometry::perimeter(&area.polygon, metric))
}

/// POIs inside `area`, optionally narrowed by `filter`, ordered by identifier.
pub fn shops_within(
    area: &AreaGeometry,
    pois: &[Poi],
    filter: Option<&CategoryFilter>,
    rule: BoundaryRule,
) -> Vec<Poi> {
    let mut inside: Vec<Poi> = pois
        .iter()
        .filter(|poi| filter.map_or(true, |f| f.matches(poi)))
        .filter(|poi| area.contains(poi.position, rule))
        .cloned()
        .collect();
    inside.sort_by_key(|poi| poi.id);
    inside
}

fn check_radius(radius: f64) -> Result<()> {
    if radius.is_finite() && radius > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidRadius { radius })
    }
}
