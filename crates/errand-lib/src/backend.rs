//! Spatial data backend seam.
//!
//! The route composer only ever talks to a [`SpatialBackend`]. The shipped
//! [`LocalBackend`] answers from a SQLite snapshot held in memory, with a
//! [`PoiIndex`] as the distance-bounded pre-filter.

use std::path::Path;

use tracing::{debug, warn};

use crate::dataset::DatabasePaths;
use crate::db::{load_pois, Poi, PoiStore};
use crate::error::Result;
use crate::filter::CategoryFilter;
use crate::geometry::{Metric, Position};
use crate::spatial::{try_load_index_file, PoiIndex};

/// Read interface over the POI reference data.
pub trait SpatialBackend {
    /// POIs matching `filter` that may lie within `radius` of `origin`.
    ///
    /// Implementations are allowed to over-approximate; callers perform the
    /// exact distance check themselves.
    fn pois_within(
        &self,
        origin: Position,
        radius: f64,
        metric: Metric,
        filter: Option<&CategoryFilter>,
    ) -> Result<Vec<Poi>>;

    /// Every POI in the snapshot, ordered by identifier.
    fn pois(&self) -> Result<Vec<Poi>>;
}

/// In-process backend over a loaded [`PoiStore`].
#[derive(Debug)]
pub struct LocalBackend {
    store: PoiStore,
    index: PoiIndex,
}

impl LocalBackend {
    pub fn new(store: PoiStore) -> Self {
        let index = PoiIndex::build(&store);
        Self { store, index }
    }

    /// Pair a store with a prebuilt index, rebuilding it when it no longer matches.
    pub fn with_index(store: PoiStore, index: PoiIndex) -> Self {
        if index.is_consistent_with(&store) {
            return Self { store, index };
        }
        warn!(
            indexed = index.len(),
            stored = store.len(),
            "POI index is stale, rebuilding"
        );
        Self::new(store)
    }

    /// Load the database at `db_path`, reusing `<db>.spatial.bin` when present.
    pub fn open(db_path: &Path) -> Result<Self> {
        Self::open_paths(&DatabasePaths::for_database(db_path.to_path_buf()))
    }

    /// Load a resolved database, reusing its spatial index file when one was found.
    pub fn open_paths(paths: &DatabasePaths) -> Result<Self> {
        let store = load_pois(&paths.database)?;
        debug!(pois = store.len(), "POI store loaded");

        let Some(index_path) = paths.spatial_index.as_deref() else {
            return Ok(Self::new(store));
        };
        match try_load_index_file(index_path) {
            Some(index) => {
                debug!(path = %index_path.display(), "using cached POI index");
                Ok(Self::with_index(store, index))
            }
            None => Ok(Self::new(store)),
        }
    }

    pub fn store(&self) -> &PoiStore {
        &self.store
    }

    pub fn index(&self) -> &PoiIndex {
        &self.index
    }
}

impl SpatialBackend for LocalBackend {
    fn pois_within(
        &self,
        origin: Position,
        radius: f64,
        metric: Metric,
        filter: Option<&CategoryFilter>,
    ) -> Result<Vec<Poi>> {
        let mut ids = self.index.candidates_within(origin, radius, metric);
        ids.sort_unstable();

        Ok(ids
            .into_iter()
            .filter_map(|id| self.store.get(id))
            .filter(|poi| metric != Metric::Spherical || poi.position.is_geographic())
            .filter(|poi| filter.map_or(true, |f| f.matches(poi)))
            .cloned()
            .collect())
    }

    fn pois(&self) -> Result<Vec<Poi>> {
        Ok(self.store.as_slice().to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::PoiBuilder;

    fn backend() -> LocalBackend {
        LocalBackend::new(PoiStore::from_pois(vec![
            PoiBuilder::new(10).at(-73.9806, 40.7538).shop("electronics").build(),
            PoiBuilder::new(11).at(-73.9850, 40.7565).amenity("cafe").build(),
            PoiBuilder::new(12).at(-73.9897, 40.7359).shop("electronics").build(),
        ]))
    }

    #[test]
    fn pois_within_applies_filter_and_orders_by_id() {
        let backend = backend();
        let origin = Position::new(-73.986226, 40.755702);

        let all = backend
            .pois_within(origin, 1600.0, Metric::Spherical, None)
            .unwrap();
        assert_eq!(all.iter().map(|p| p.id).collect::<Vec<_>>(), vec![10, 11]);

        let electronics = CategoryFilter::shop("electronics");
        let shops = backend
            .pois_within(origin, 1600.0, Metric::Spherical, Some(&electronics))
            .unwrap();
        assert_eq!(shops.iter().map(|p| p.id).collect::<Vec<_>>(), vec![10]);
    }

    #[test]
    fn spherical_reads_skip_projected_rows() {
        let origin = Position::new(-73.986226, 40.755702);
        let backend = LocalBackend::new(PoiStore::from_pois(vec![
            PoiBuilder::new(1).at(-73.9850, 40.7565).amenity("cafe").build(),
            PoiBuilder::new(2).at(583960.0, 4507523.0).amenity("cafe").build(),
        ]));

        let spherical = backend
            .pois_within(origin, 1.0e9, Metric::Spherical, None)
            .unwrap();
        assert_eq!(spherical.iter().map(|p| p.id).collect::<Vec<_>>(), vec![1]);

        let planar = backend
            .pois_within(origin, 1.0e9, Metric::Planar { srid: 0 }, None)
            .unwrap();
        assert_eq!(planar.len(), 2);
    }

    #[test]
    fn stale_index_is_rebuilt() {
        let stale = PoiIndex::build(&PoiStore::default());
        let store = PoiStore::from_pois(vec![PoiBuilder::new(1).build()]);
        let backend = LocalBackend::with_index(store, stale);
        assert_eq!(backend.index().len(), 1);
    }
}
