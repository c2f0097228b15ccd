//! Integration tests for nearest-stop selection and route composition over
//! the midtown fixture database.

mod common;

use common::{
    FixtureDb, BEST_BUY_5TH_AVE, BLUE_BOTTLE, DUANE_READE, MIDTOWN_WINE, ORIGIN, WHOLE_FOODS,
};
use errand_lib::{
    close_path, compose_route, enclosed_area, path_length, perimeter, select_nearest, to_path,
    CategoryFilter, Error, LocalBackend, Metric, Position, StopSelection,
};

fn backend() -> (FixtureDb, LocalBackend) {
    let fixture = FixtureDb::midtown();
    let backend = LocalBackend::open(&fixture.db_path).expect("fixture loads");
    (fixture, backend)
}

fn filters() -> Vec<CategoryFilter> {
    [
        "shop=electronics",
        "shop=electronics:Best Buy",
        "shop=alcohol",
        "amenity=cafe",
        "amenity=pharmacy",
        "shop=supermarket",
    ]
    .iter()
    .map(|s| s.parse().expect("valid filter"))
    .collect()
}

#[test]
fn best_buy_loop_backtracks_to_origin() {
    let (_fixture, backend) = backend();
    let filter: CategoryFilter = "shop=electronics:Best Buy".parse().unwrap();

    let selection =
        select_nearest(&backend, ORIGIN, &filter, 1600.0, Metric::Spherical).expect("selects");
    let poi = selection.poi.as_ref().expect("one Best Buy within 1600 m");
    assert_eq!(poi.id, BEST_BUY_5TH_AVE);

    let meters = selection.distance_meters().expect("distance present");
    assert!((500.0..550.0).contains(&meters), "got {meters}");
    assert_eq!(meters, (meters * 100.0).round() / 100.0);

    let route = compose_route(ORIGIN, std::slice::from_ref(&selection));
    let path = close_path(&route).expect("loop builds");
    assert!(path.is_closed());
    assert_eq!(path.unique_positions().len(), 2);

    let one_way = selection.distance.expect("raw distance");
    let length = path_length(&path, Metric::Spherical);
    assert!((length - 2.0 * one_way).abs() < 1e-6, "{length} vs {one_way}");
}

#[test]
fn growing_radius_never_loses_or_worsens_a_match() {
    let (_fixture, backend) = backend();
    let radii = [50.0, 150.0, 300.0, 600.0, 1000.0, 1600.0, 2500.0, 5000.0];

    for filter in filters() {
        let mut previous: Option<f64> = None;
        for radius in radii {
            let selection = select_nearest(&backend, ORIGIN, &filter, radius, Metric::Spherical)
                .expect("selects");
            match (previous, selection.distance) {
                (Some(before), Some(now)) => assert!(now <= before, "{filter} at {radius}"),
                (Some(_), None) => panic!("{filter} lost its match at {radius} m"),
                _ => {}
            }
            if let Some(distance) = selection.distance {
                assert!(distance <= radius);
            }
            previous = selection.distance.or(previous);
        }
    }
}

#[test]
fn radius_excludes_distant_matches() {
    let (_fixture, backend) = backend();
    let electronics = CategoryFilter::shop("electronics");

    let tight = select_nearest(&backend, ORIGIN, &electronics, 500.0, Metric::Spherical).unwrap();
    assert!(tight.is_empty());

    let wide = select_nearest(&backend, ORIGIN, &electronics, 1600.0, Metric::Spherical).unwrap();
    assert_eq!(wide.poi.map(|p| p.id), Some(BEST_BUY_5TH_AVE));
}

#[test]
fn route_length_counts_non_empty_selections() {
    let (_fixture, backend) = backend();
    let stops: Vec<CategoryFilter> = [
        "shop=alcohol",
        "amenity=library",
        "amenity=cafe",
        "shop=supermarket",
        "amenity=pharmacy",
    ]
    .iter()
    .map(|s| s.parse().unwrap())
    .collect();

    let selections: Vec<StopSelection> = stops
        .iter()
        .map(|filter| select_nearest(&backend, ORIGIN, filter, 1600.0, Metric::Spherical).unwrap())
        .collect();
    let route = compose_route(ORIGIN, &selections);

    let found = selections.iter().filter(|s| !s.is_empty()).count();
    assert_eq!(found, 4);
    assert_eq!(route.positions().len(), 1 + found);
    assert_eq!(route.origin(), ORIGIN);

    let expected: Vec<Position> = selections.iter().filter_map(|s| s.position()).collect();
    assert_eq!(route.stops(), expected.as_slice());

    let ids: Vec<i64> = selections
        .iter()
        .filter_map(|s| s.poi.as_ref().map(|p| p.id))
        .collect();
    assert_eq!(ids, vec![MIDTOWN_WINE, BLUE_BOTTLE, WHOLE_FOODS, DUANE_READE]);
}

#[test]
fn path_needs_two_positions() {
    let origin_only = compose_route(ORIGIN, &[]);
    assert!(matches!(
        to_path(&origin_only),
        Err(Error::InsufficientPoints { count: 1 })
    ));

    let (_fixture, backend) = backend();
    let cafe = select_nearest(
        &backend,
        ORIGIN,
        &CategoryFilter::amenity("cafe"),
        1600.0,
        Metric::Spherical,
    )
    .unwrap();
    let route = compose_route(ORIGIN, &[cafe]);
    let path = to_path(&route).expect("two positions form a line");
    assert_eq!(path.positions().len(), 2);
}

#[test]
fn area_and_perimeter_require_a_closed_path() {
    let (_fixture, backend) = backend();
    let selections: Vec<StopSelection> = ["shop=alcohol", "amenity=cafe", "shop=supermarket"]
        .iter()
        .map(|s| {
            select_nearest(
                &backend,
                ORIGIN,
                &s.parse().unwrap(),
                1600.0,
                Metric::Spherical,
            )
            .unwrap()
        })
        .collect();
    let route = compose_route(ORIGIN, &selections);

    let open = to_path(&route).unwrap();
    assert!(matches!(
        enclosed_area(&open, Metric::Spherical),
        Err(Error::NotClosed)
    ));
    assert!(matches!(
        perimeter(&open, Metric::Spherical),
        Err(Error::NotClosed)
    ));

    let closed = close_path(&route).unwrap();
    let area = enclosed_area(&closed, Metric::Spherical).unwrap();
    let loop_perimeter = perimeter(&closed, Metric::Spherical).unwrap();
    assert!(area > 0.0);
    assert!((loop_perimeter - path_length(&closed, Metric::Spherical)).abs() < 1e-6);
}
