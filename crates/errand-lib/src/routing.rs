use tracing::{debug, info};

use crate::backend::SpatialBackend;
use crate::compose::{
    close_path, compose_route, enclosed_area, path_length, perimeter, select_nearest,
    shops_within, suggest_names, to_path, AreaGeometry, PathGeometry, Route, StopSelection,
};
use crate::db::Poi;
use crate::error::{Error, Result};
use crate::filter::CategoryFilter;
use crate::geometry::{BoundaryRule, Metric, Position};

/// Origin used when none is supplied: Times Square, Manhattan.
pub const DEFAULT_ORIGIN: Position = Position::new(-73.986226, 40.755702);

/// Default search radius in metres (one mile).
pub const DEFAULT_RADIUS_METERS: f64 = 1600.0;

/// High-level errand planning request.
#[derive(Debug, Clone)]
pub struct ErrandRequest {
    pub origin: Position,
    pub radius: f64,
    pub stops: Vec<CategoryFilter>,
    pub metric: Metric,
    /// Return to the origin after the last stop.
    pub close_loop: bool,
    /// Fail with `NoMatch` instead of dropping a stop that found nothing.
    pub strict: bool,
    pub boundary: BoundaryRule,
    /// Also list every POI enclosed by the loop.
    pub list_within: bool,
}

impl ErrandRequest {
    /// Closed-loop request from `origin` over `stops` with default settings.
    pub fn new(origin: Position, stops: Vec<CategoryFilter>) -> Self {
        Self {
            origin,
            radius: DEFAULT_RADIUS_METERS,
            stops,
            metric: Metric::Spherical,
            close_loop: true,
            strict: false,
            boundary: BoundaryRule::default(),
            list_within: false,
        }
    }

    #[must_use]
    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    #[must_use]
    pub fn with_metric(mut self, metric: Metric) -> Self {
        self.metric = metric;
        self
    }
}

/// Planned errand returned by the library.
#[derive(Debug, Clone)]
pub struct ErrandPlan {
    pub metric: Metric,
    pub radius: f64,
    pub selections: Vec<StopSelection>,
    pub route: Route,
    /// Absent when no stop matched, since a single position forms no line.
    pub path: Option<PathGeometry>,
    pub length: Option<f64>,
    pub area: Option<f64>,
    pub perimeter: Option<f64>,
    pub shops_within: Option<Vec<Poi>>,
}

impl ErrandPlan {
    pub fn matched_stops(&self) -> usize {
        self.selections.iter().filter(|s| !s.is_empty()).count()
    }

    pub fn missed_filters(&self) -> Vec<&CategoryFilter> {
        self.selections
            .iter()
            .filter(|s| s.is_empty())
            .map(|s| &s.filter)
            .collect()
    }
}

/// Select every stop, compose the route and measure the resulting path.
pub fn plan_errand<B: SpatialBackend + ?Sized>(
    backend: &B,
    request: &ErrandRequest,
) -> Result<ErrandPlan> {
    request.origin.validate_for(request.metric)?;

    let mut selections = Vec::with_capacity(request.stops.len());
    for filter in &request.stops {
        let selection = select_nearest(
            backend,
            request.origin,
            filter,
            request.radius,
            request.metric,
        )?;
        if selection.is_empty() && request.strict {
            let suggestions =
                suggest_names(backend, request.origin, filter, request.radius, request.metric)?;
            return Err(Error::NoMatch {
                filter: filter.to_string(),
                radius: request.radius,
                suggestions,
            });
        }
        selections.push(selection);
    }

    let route = compose_route(request.origin, &selections);
    let mut plan = ErrandPlan {
        metric: request.metric,
        radius: request.radius,
        selections,
        route,
        path: None,
        length: None,
        area: None,
        perimeter: None,
        shops_within: None,
    };

    if plan.route.stops().is_empty() {
        info!(stops = request.stops.len(), "no stop matched; route is the origin only");
        return Ok(plan);
    }

    let path = if request.close_loop {
        close_path(&plan.route)?
    } else {
        to_path(&plan.route)?
    };
    plan.length = Some(path_length(&path, request.metric));

    if path.is_closed() {
        plan.area = Some(enclosed_area(&path, request.metric)?);
        plan.perimeter = Some(perimeter(&path, request.metric)?);

        if request.list_within {
            let area = AreaGeometry::from_path(&path)?;
            let pois = backend.pois()?;
            plan.shops_within = Some(shops_within(&area, &pois, None, request.boundary));
        }
    }

    debug!(
        matched = plan.matched_stops(),
        requested = request.stops.len(),
        length = ?plan.length,
        "errand planned"
    );
    plan.path = Some(path);
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::db::PoiStore;
    use crate::test_helpers::PoiBuilder;

    fn backend() -> LocalBackend {
        LocalBackend::new(PoiStore::from_pois(vec![
            PoiBuilder::new(1).at(4.0, 0.0).shop("bakery").build(),
            PoiBuilder::new(2).at(4.0, 3.0).amenity("cafe").build(),
            PoiBuilder::new(3).at(3.0, 1.0).shop("florist").name("Rosa").build(),
        ]))
    }

    fn request(stops: &[&str]) -> ErrandRequest {
        ErrandRequest::new(
            Position::new(0.0, 0.0),
            stops.iter().map(|s| s.parse().unwrap()).collect(),
        )
        .with_radius(10.0)
        .with_metric(Metric::Planar { srid: 0 })
    }

    #[test]
    fn closed_loop_measures_area_and_lists_enclosed_pois() {
        let mut request = request(&["shop=bakery", "amenity=cafe"]);
        request.list_within = true;

        let plan = plan_errand(&backend(), &request).unwrap();
        assert_eq!(plan.matched_stops(), 2);
        assert_eq!(plan.length, Some(12.0));
        assert_eq!(plan.area, Some(6.0));
        assert_eq!(plan.perimeter, Some(12.0));
        let inside: Vec<_> = plan
            .shops_within
            .unwrap()
            .into_iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(inside, vec![3]);
    }

    #[test]
    fn open_route_has_no_area() {
        let mut request = request(&["shop=bakery", "amenity=cafe"]);
        request.close_loop = false;

        let plan = plan_errand(&backend(), &request).unwrap();
        assert_eq!(plan.length, Some(7.0));
        assert_eq!(plan.area, None);
        assert_eq!(plan.perimeter, None);
    }

    #[test]
    fn missing_stops_shrink_the_route() {
        let plan = plan_errand(&backend(), &request(&["amenity=pharmacy", "shop=bakery"])).unwrap();
        assert_eq!(plan.route.positions().len(), 2);
        assert_eq!(plan.missed_filters().len(), 1);

        let plan = plan_errand(&backend(), &request(&["amenity=pharmacy"])).unwrap();
        assert!(plan.path.is_none());
        assert_eq!(plan.length, None);
    }

    #[test]
    fn strict_mode_reports_no_match_with_suggestions() {
        let mut request = request(&["shop=florist:Rose"]);
        request.strict = true;

        match plan_errand(&backend(), &request) {
            Err(Error::NoMatch {
                filter,
                suggestions,
                ..
            }) => {
                assert_eq!(filter, "shop=florist:Rose");
                assert_eq!(suggestions, vec!["Rosa".to_string()]);
            }
            other => panic!("expected NoMatch, got {other:?}"),
        }
    }
}
